pub mod memory;

pub use memory::{Document, MemoryCollection, StoreError};
