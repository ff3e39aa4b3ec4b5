//! Integration tests for the link store backends
//!
//! Every backend runs the same contract checks. PostgreSQL tests only run
//! when `POSTGRES_TEST_URL` points at a database:
//! - `POSTGRES_TEST_URL=postgres://localhost/clipr_test cargo test`

use chrono::{Duration, Utc};
use clipr::models::{ClickEvent, LinkRecord};
use clipr::storage::{LinkStore, MemoryStorage, PostgresStorage, SqliteStorage};
use std::sync::Arc;

/// Helper to create SQLite test storage
async fn create_sqlite_storage() -> Arc<dyn LinkStore> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Helper to create PostgreSQL test storage
async fn create_postgres_storage() -> Option<Arc<dyn LinkStore>> {
    let db_url = std::env::var("POSTGRES_TEST_URL").ok()?;
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

fn create_memory_storage() -> Arc<dyn LinkStore> {
    Arc::new(MemoryStorage::new())
}

/// Codes unique per test run so a shared PostgreSQL database can be reused.
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn click(source: &str) -> ClickEvent {
    ClickEvent {
        timestamp: Utc::now(),
        source: source.to_string(),
        location: "192.0.2.1".to_string(),
    }
}

async fn check_insert_and_get(storage: Arc<dyn LinkStore>) {
    let code = unique("get");
    let record = LinkRecord::new(&code, "https://example.com/a", Utc::now(), 30).unwrap();

    assert!(storage.try_insert(&record).await.unwrap());

    let stored = storage.get(&code).await.unwrap().expect("record should exist");
    assert_eq!(stored.code, code);
    assert_eq!(stored.original_url, "https://example.com/a");
    assert_eq!(stored.expires_at - stored.created_at, Duration::minutes(30));
    assert!(stored.clicks.is_empty());

    assert!(storage.get(&unique("missing")).await.unwrap().is_none());
}

async fn check_conflict_does_not_overwrite(storage: Arc<dyn LinkStore>) {
    let code = unique("dup");
    let first = LinkRecord::new(&code, "https://example.com/first", Utc::now(), 30).unwrap();
    let second = LinkRecord::new(&code, "https://example.com/second", Utc::now(), 90).unwrap();

    assert!(storage.try_insert(&first).await.unwrap());
    storage.append_click(&code, &click("direct")).await.unwrap();
    assert!(!storage.try_insert(&second).await.unwrap());

    let stored = storage.get(&code).await.unwrap().unwrap();
    assert_eq!(stored.original_url, "https://example.com/first");
    assert_eq!(stored.expires_at, first.expires_at);
    assert_eq!(stored.clicks.len(), 1);
}

async fn check_expired_code_still_reserved(storage: Arc<dyn LinkStore>) {
    let code = unique("old");
    let created = Utc::now() - Duration::days(2);
    let expired = LinkRecord::new(&code, "https://example.com/old", created, 1).unwrap();
    assert!(storage.try_insert(&expired).await.unwrap());

    let fresh = LinkRecord::new(&code, "https://example.com/new", Utc::now(), 30).unwrap();
    assert!(!storage.try_insert(&fresh).await.unwrap());
}

async fn check_clicks_append_in_order(storage: Arc<dyn LinkStore>) {
    let code = unique("clicks");
    let record = LinkRecord::new(&code, "https://example.com", Utc::now(), 30).unwrap();
    storage.try_insert(&record).await.unwrap();

    for source in ["first", "second", "third"] {
        assert!(storage.append_click(&code, &click(source)).await.unwrap());
    }
    assert!(!storage.append_click(&unique("nobody"), &click("x")).await.unwrap());

    let stored = storage.get(&code).await.unwrap().unwrap();
    let sources: Vec<&str> = stored.clicks.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, vec!["first", "second", "third"]);
    assert_eq!(stored.clicks[0].location, "192.0.2.1");
}

async fn check_list_all(storage: Arc<dyn LinkStore>) {
    let codes: Vec<String> = (0..3).map(|i| unique(&format!("list{i}"))).collect();
    for code in &codes {
        let record = LinkRecord::new(code, "https://example.com", Utc::now(), 30).unwrap();
        storage.try_insert(&record).await.unwrap();
    }
    storage.append_click(&codes[1], &click("direct")).await.unwrap();
    storage.append_click(&codes[1], &click("direct")).await.unwrap();

    let all = storage.list_all().await.unwrap();
    for code in &codes {
        let entry = all.iter().find(|r| &r.code == code).expect("listed");
        let expected = if code == &codes[1] { 2 } else { 0 };
        assert_eq!(entry.clicks.len(), expected);
    }
}

async fn check_concurrent_insert_single_winner(storage: Arc<dyn LinkStore>) {
    let code = unique("race");
    let mut handles = vec![];

    for i in 0..10 {
        let storage = Arc::clone(&storage);
        let record = LinkRecord::new(&code, format!("https://example.com/{i}"), Utc::now(), 30).unwrap();
        handles.push(tokio::spawn(async move { storage.try_insert(&record).await }));
    }

    let mut success_count = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            success_count += 1;
        }
    }

    assert_eq!(success_count, 1, "Exactly one insert should win");
}

async fn check_concurrent_appends(storage: Arc<dyn LinkStore>) {
    let code = unique("hot");
    let record = LinkRecord::new(&code, "https://example.com", Utc::now(), 30).unwrap();
    storage.try_insert(&record).await.unwrap();

    let mut handles = vec![];
    for _ in 0..50 {
        let storage = Arc::clone(&storage);
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            storage.append_click(&code, &click("direct")).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let stored = storage.get(&code).await.unwrap().unwrap();
    assert_eq!(stored.clicks.len(), 50, "No click may be lost");
}

async fn run_contract(storage: Arc<dyn LinkStore>) {
    check_insert_and_get(Arc::clone(&storage)).await;
    check_conflict_does_not_overwrite(Arc::clone(&storage)).await;
    check_expired_code_still_reserved(Arc::clone(&storage)).await;
    check_clicks_append_in_order(Arc::clone(&storage)).await;
    check_list_all(Arc::clone(&storage)).await;
    check_concurrent_insert_single_winner(Arc::clone(&storage)).await;
    check_concurrent_appends(storage).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_storage_contract() {
    run_contract(create_memory_storage()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_storage_contract() {
    run_contract(create_sqlite_storage().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_storage_contract() {
    let Some(storage) = create_postgres_storage().await else {
        eprintln!("POSTGRES_TEST_URL not set, skipping PostgreSQL storage tests");
        return;
    };
    run_contract(storage.clone()).await;
    storage.close().await;
}

#[tokio::test]
async fn test_sqlite_file_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!("clipr-test-{}.db", unique("file")));
    let url = format!("sqlite://{}", path.display());

    {
        let storage = SqliteStorage::new(&url, 2).await.unwrap();
        storage.init().await.unwrap();
        let record = LinkRecord::new("persist", "https://example.com/kept", Utc::now(), 30).unwrap();
        assert!(storage.try_insert(&record).await.unwrap());
        storage.append_click("persist", &click("direct")).await.unwrap();
        storage.close().await;
    }

    let reopened = SqliteStorage::new(&url, 2).await.unwrap();
    reopened.init().await.unwrap();
    let stored = reopened.get("persist").await.unwrap().unwrap();
    assert_eq!(stored.original_url, "https://example.com/kept");
    assert_eq!(stored.clicks.len(), 1);
    reopened.close().await;

    let _ = std::fs::remove_file(&path);
}
