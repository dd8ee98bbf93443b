use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use sheaf_bulk::BulkService;
use sheaf_core::{BulkState, decode_command};
use sheaf_data::MemoryStatusStore;
use sheaf_stream::{MemoryLog, RecordSource};
use sheaf_test_support::fixtures::sample_command;

const SUBMISSIONS: usize = 10_000;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_get_unique_ids() -> Result<()> {
    let store = MemoryStatusStore::new();
    let log = MemoryLog::new("documentSet", 4);
    let service = BulkService::new(Arc::new(store.clone()), Arc::new(log.clone()));

    let mut tasks = Vec::with_capacity(SUBMISSIONS);
    for n in 0..SUBMISSIONS {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .run_action(sample_command().with_param("n", json!(n)))
                .await
        }));
    }

    let mut ids = HashSet::with_capacity(SUBMISSIONS);
    for task in tasks {
        let status = task.await??;
        assert_eq!(status.state, BulkState::Scheduled);
        ids.insert(status.id);
    }

    assert_eq!(ids.len(), SUBMISSIONS);
    assert_eq!(store.len(), SUBMISSIONS * 3);
    let mut logged = 0;
    for partition in 0..log.partitions() {
        logged += log.len(partition)?;
    }
    assert_eq!(logged, SUBMISSIONS as u64);
    Ok(())
}

#[tokio::test]
async fn logged_record_is_keyed_by_action_id() -> Result<()> {
    let store = MemoryStatusStore::new();
    let log = MemoryLog::new("documentSet", 8);
    let service = BulkService::new(Arc::new(store), Arc::new(log.clone()));

    let status = service.run_action(sample_command()).await?;
    let partition = log.partition_for(&status.id.to_string());
    assert_eq!(log.len(partition)?, 1);

    log.close();
    let mut tailer = log.tailer(partition)?;
    let read = tailer.next_record().await.expect("logged command");
    assert_eq!(read.record.key, status.id.to_string());
    assert_eq!(decode_command(&read.record.payload)?, status.command);
    assert!(tailer.next_record().await.is_none());
    Ok(())
}
