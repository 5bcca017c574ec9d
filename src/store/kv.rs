//! §6 persistent blob store contract and the generic blob wrapper (§4.3)
//! that every typed store in `store::stores` is built on.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SchedulerError};

/// The external key-value backend. Must provide durability and
/// read-your-writes (spec §6); this crate does not implement one, only
/// depends on it and ships `store::mem::MemKvStore` as a test double.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()>;
}

/// Wraps a single JSON-encoded blob in a `KvStore` under a stable key name.
///
/// `get` returns `default()` when the key is absent, and fails with
/// `StateCorrupt` when the stored bytes don't decode as `T`. `set` encodes
/// and overwrites, returning only once the backend has acknowledged the
/// write — there is no in-memory caching beyond the most recently read
/// value (spec §4.3).
pub struct PersistedBlob<T> {
    kv: Arc<dyn KvStore>,
    key: &'static str,
    _marker: PhantomData<T>,
}

impl<T> PersistedBlob<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    pub fn new(kv: Arc<dyn KvStore>, key: &'static str) -> Self {
        Self {
            kv,
            key,
            _marker: PhantomData,
        }
    }

    pub async fn get(&self) -> Result<T> {
        match self
            .kv
            .get(self.key)
            .await
            .map_err(|e| SchedulerError::state_corrupt(self.key, e))?
        {
            None => Ok(T::default()),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| SchedulerError::state_corrupt(self.key, e)),
        }
    }

    pub async fn set(&self, value: &T) -> Result<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| SchedulerError::state_corrupt(self.key, e))?;
        self.kv
            .set(self.key, bytes)
            .await
            .map_err(|e| SchedulerError::state_corrupt(self.key, e))
    }
}
