//! In-memory `KvStore` test double, following `risingwave_meta`'s pattern
//! of shipping an in-memory mock meta client alongside the real trait.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::kv::KvStore;

#[derive(Default)]
pub struct MemKvStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes() {
        let store = MemKvStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(vec![1, 2, 3]));
    }
}
