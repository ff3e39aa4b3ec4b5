use crate::models::{ClickEvent, LinkRecord};
use crate::storage::{LinkStore, StorageResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-process link table backed by a sharded `DashMap`.
///
/// Inserts go through `entry()` and appends through `get_mut()`, so both hold
/// the shard write lock for the whole operation.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    links: DashMap<String, LinkRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl LinkStore for MemoryStorage {
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn try_insert(&self, record: &LinkRecord) -> StorageResult<bool> {
        match self.links.entry(record.code.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, code: &str) -> StorageResult<Option<LinkRecord>> {
        Ok(self.links.get(code).map(|entry| entry.value().clone()))
    }

    async fn list_all(&self) -> StorageResult<Vec<LinkRecord>> {
        let mut links: Vec<LinkRecord> = self
            .links
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        links.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(links)
    }

    async fn append_click(&self, code: &str, event: &ClickEvent) -> StorageResult<bool> {
        match self.links.get_mut(code) {
            Some(mut entry) => {
                entry.clicks.push(event.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn click(source: &str) -> ClickEvent {
        ClickEvent {
            timestamp: Utc::now(),
            source: source.to_string(),
            location: "127.0.0.1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_conflict_keeps_original() {
        let storage = MemoryStorage::new();
        let first = LinkRecord::new("dup", "https://example.com/a", Utc::now(), 30).unwrap();
        let second = LinkRecord::new("dup", "https://example.com/b", Utc::now(), 30).unwrap();

        assert!(storage.try_insert(&first).await.unwrap());
        assert!(!storage.try_insert(&second).await.unwrap());

        let stored = storage.get("dup").await.unwrap().unwrap();
        assert_eq!(stored.original_url, "https://example.com/a");
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_append_click_to_missing_code() {
        let storage = MemoryStorage::new();
        assert!(!storage.append_click("nope", &click("direct")).await.unwrap());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_appends_preserve_order() {
        let storage = MemoryStorage::new();
        let record = LinkRecord::new("ordered", "https://example.com", Utc::now(), 30).unwrap();
        storage.try_insert(&record).await.unwrap();

        for source in ["a", "b", "c"] {
            assert!(storage.append_click("ordered", &click(source)).await.unwrap());
        }

        let stored = storage.get("ordered").await.unwrap().unwrap();
        let sources: Vec<&str> = stored.clicks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_not_lost() {
        let storage = Arc::new(MemoryStorage::new());
        let record = LinkRecord::new("hot", "https://example.com", Utc::now(), 30).unwrap();
        storage.try_insert(&record).await.unwrap();

        let mut handles = vec![];
        for _ in 0..200 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage.append_click("hot", &click("direct")).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        let stored = storage.get("hot").await.unwrap().unwrap();
        assert_eq!(stored.clicks.len(), 200);
    }
}
