mod common;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::TestHarness;
use notification_cell::*;

#[tokio::test]
async fn test_tick_reports_batch_summary() {
    let harness = TestHarness::new();
    harness.insert_pending(harness.now()).await;
    let processor = QueueProcessor::new(harness.service.clone(), Duration::from_secs(300));

    let summary = processor.tick().await.expect("tick succeeds");
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.successful, 1);

    let idle = processor.tick().await.expect("tick succeeds");
    assert_eq!(idle.processed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_processor_runs_on_start_and_stops_on_cancel() {
    let harness = TestHarness::new();
    let due = harness.insert_pending(harness.now()).await;
    let cancel = CancellationToken::new();

    let handle = QueueProcessor::new(harness.service.clone(), Duration::from_secs(300))
        .spawn(cancel.clone());

    // The first interval tick fires immediately.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.reload(due.id).await.status, NotificationStatus::Sent);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("processor stops after cancel")
        .expect("processor task does not panic");
}
