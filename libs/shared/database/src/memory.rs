//! In-process document collections.
//!
//! Every operation takes the collection lock once, so a single call is atomic
//! with respect to every other call on the same collection. Repositories build
//! their compare-and-set style updates on top of `modify` and
//! `update_many_ordered`.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate key {id} in collection {collection}")]
    DuplicateKey { collection: String, id: Uuid },
}

/// A record that can live in a `MemoryCollection`.
pub trait Document: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

pub struct MemoryCollection<T: Document> {
    name: &'static str,
    docs: RwLock<HashMap<Uuid, T>>,
}

impl<T: Document> MemoryCollection<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            docs: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn insert(&self, doc: T) -> Result<T, StoreError> {
        let mut docs = self.docs.write().await;
        let id = doc.id();
        if docs.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                collection: self.name.to_string(),
                id,
            });
        }
        docs.insert(id, doc.clone());
        debug!(collection = self.name, %id, "Document inserted");
        Ok(doc)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        Ok(self.docs.read().await.get(&id).cloned())
    }

    pub async fn find<F>(&self, filter: F) -> Result<Vec<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let docs = self.docs.read().await;
        Ok(docs.values().filter(|d| filter(d)).cloned().collect())
    }

    pub async fn find_one<F>(&self, filter: F) -> Result<Option<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let docs = self.docs.read().await;
        Ok(docs.values().find(|d| filter(d)).cloned())
    }

    pub async fn count<F>(&self, filter: F) -> Result<usize, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let docs = self.docs.read().await;
        Ok(docs.values().filter(|d| filter(d)).count())
    }

    /// Runs `f` against the stored document under the write lock and returns
    /// its result, or `None` when no document has that id.
    pub async fn modify<R, F>(&self, id: Uuid, f: F) -> Result<Option<R>, StoreError>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut docs = self.docs.write().await;
        Ok(docs.get_mut(&id).map(f))
    }

    /// Applies `f` to every matching document and returns how many matched.
    pub async fn update_many<P, F>(&self, filter: P, mut f: F) -> Result<usize, StoreError>
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let mut docs = self.docs.write().await;
        let mut affected = 0;
        for doc in docs.values_mut().filter(|d| filter(d)) {
            f(doc);
            affected += 1;
        }
        debug!(collection = self.name, affected, "Bulk update applied");
        Ok(affected)
    }

    /// Selects up to `limit` matching documents ordered by `sort_key`, applies
    /// `f` to each and returns the updated copies, all in one locked step.
    pub async fn update_many_ordered<P, K, S, F>(
        &self,
        filter: P,
        sort_key: S,
        limit: usize,
        mut f: F,
    ) -> Result<Vec<T>, StoreError>
    where
        P: Fn(&T) -> bool,
        K: Ord,
        S: Fn(&T) -> K,
        F: FnMut(&mut T),
    {
        let mut docs = self.docs.write().await;

        let mut selected: Vec<(K, Uuid)> = docs
            .values()
            .filter(|d| filter(d))
            .map(|d| (sort_key(d), d.id()))
            .collect();
        selected.sort_by(|a, b| a.0.cmp(&b.0));
        selected.truncate(limit);

        let mut updated = Vec::with_capacity(selected.len());
        for (_, id) in selected {
            if let Some(doc) = docs.get_mut(&id) {
                f(doc);
                updated.push(doc.clone());
            }
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.docs.write().await.remove(&id).is_some();
        if removed {
            debug!(collection = self.name, %id, "Document deleted");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: Uuid,
        rank: u32,
        flag: bool,
    }

    impl Document for Item {
        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn item(rank: u32) -> Item {
        Item {
            id: Uuid::new_v4(),
            rank,
            flag: false,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let collection = MemoryCollection::new("items");
        let first = item(1);
        collection.insert(first.clone()).await.unwrap();

        let err = tokio_test::assert_err!(collection.insert(first.clone()).await);
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                collection: "items".to_string(),
                id: first.id
            }
        );
    }

    #[tokio::test]
    async fn modify_returns_none_for_unknown_id() {
        let collection: MemoryCollection<Item> = MemoryCollection::new("items");
        let result = collection.modify(Uuid::new_v4(), |d| d.rank).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_many_ordered_respects_order_and_limit() {
        let collection = MemoryCollection::new("items");
        for rank in [5, 1, 3, 2, 4] {
            collection.insert(item(rank)).await.unwrap();
        }

        let claimed = collection
            .update_many_ordered(|d| !d.flag, |d| d.rank, 3, |d| d.flag = true)
            .await
            .unwrap();

        let ranks: Vec<u32> = claimed.iter().map(|d| d.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);

        // A second pass only sees what the first one left behind.
        let rest = collection
            .update_many_ordered(|d| !d.flag, |d| d.rank, 10, |d| d.flag = true)
            .await
            .unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(collection.count(|d| d.flag).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn delete_reports_whether_document_existed() {
        let collection = MemoryCollection::new("items");
        let doc = collection.insert(item(1)).await.unwrap();
        assert!(collection.delete(doc.id).await.unwrap());
        assert!(!collection.delete(doc.id).await.unwrap());
    }
}
