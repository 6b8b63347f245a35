use std::sync::Arc;

use storage::{CounterStore, Storage};

async fn file_storage(dir: &tempfile::TempDir) -> Arc<Storage> {
    let db_path = dir.path().join("counters.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    Arc::new(Storage::new(&database_url).await.expect("db"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_get_or_create_converges_on_one_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = file_storage(&dir).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let storage = storage.clone();
        tasks.push(tokio::spawn(async move {
            storage.get_or_create("contested").await
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        let counter = task.await.expect("join").expect("get_or_create");
        assert_eq!(counter.value, 0);
        ids.push(counter.id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "every caller should see the same row");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_not_lost() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = file_storage(&dir).await;
    storage.create("busy", 0).await.expect("create");

    let mut tasks = Vec::new();
    for _ in 0..25 {
        let storage = storage.clone();
        tasks.push(tokio::spawn(async move { storage.increment("busy").await }));
    }
    for task in tasks {
        task.await.expect("join").expect("increment");
    }

    let counter = storage
        .get_by_name("busy")
        .await
        .expect("lookup")
        .expect("row");
    assert_eq!(counter.value, 25);
}

#[tokio::test]
async fn values_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let storage = file_storage(&dir).await;
        storage.increment("persistence_test").await.expect("inc");
        storage.increment("persistence_test").await.expect("inc");
        storage.pool().close().await;
    }

    let reopened = file_storage(&dir).await;
    let counter = reopened
        .get_by_name("persistence_test")
        .await
        .expect("lookup")
        .expect("row");
    assert_eq!(counter.value, 2);
}
