//! §4.3 typed accessors layered atop the five persisted blobs named in §6.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{
    CassandraClusterJobs, ClusterState, ExecutorId, FrameworkConfiguration,
    HealthCheckHistoryEntry,
};

use super::kv::{KvStore, PersistedBlob};

pub const CLUSTER_STATE_KEY: &str = "CassandraClusterState";
pub const HEALTH_HISTORY_KEY: &str = "CassandraClusterHealthCheckHistory";
pub const FRAMEWORK_CONFIGURATION_KEY: &str = "CassandraFrameworkConfiguration";
pub const CLUSTER_JOBS_KEY: &str = "CassandraClusterJobs";
pub const EXECUTOR_COUNTER_KEY: &str = "ExecutorCounter";

/// Bundles the five persisted stores the core depends on. Every mutation
/// goes through one of these methods and is applied before the caller's
/// `await` resolves (spec §4.3).
#[derive(Clone)]
pub struct Stores {
    cluster_state: Arc<PersistedBlob<ClusterState>>,
    health_history: Arc<PersistedBlob<Vec<HealthCheckHistoryEntry>>>,
    framework_config: Arc<PersistedBlob<FrameworkConfiguration>>,
    cluster_jobs: Arc<PersistedBlob<CassandraClusterJobs>>,
    executor_counter: Arc<PersistedBlob<u64>>,
}

impl Stores {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            cluster_state: Arc::new(PersistedBlob::new(kv.clone(), CLUSTER_STATE_KEY)),
            health_history: Arc::new(PersistedBlob::new(kv.clone(), HEALTH_HISTORY_KEY)),
            framework_config: Arc::new(PersistedBlob::new(kv.clone(), FRAMEWORK_CONFIGURATION_KEY)),
            cluster_jobs: Arc::new(PersistedBlob::new(kv.clone(), CLUSTER_JOBS_KEY)),
            executor_counter: Arc::new(PersistedBlob::new(kv, EXECUTOR_COUNTER_KEY)),
        }
    }

    pub async fn cluster_state(&self) -> Result<ClusterState> {
        self.cluster_state.get().await
    }

    pub async fn set_cluster_state(&self, state: &ClusterState) -> Result<()> {
        self.cluster_state.set(state).await
    }

    pub async fn framework_config(&self) -> Result<FrameworkConfiguration> {
        self.framework_config.get().await
    }

    /// Administrative mutation (spec §3): on invariant failure the previous
    /// value is retained and `InvalidConfiguration` is returned for the
    /// caller to log, not propagate.
    pub async fn set_framework_config(&self, config: &FrameworkConfiguration) -> Result<()> {
        if let Err(reason) = config.validate() {
            tracing::warn!(%reason, "rejecting framework configuration update");
            return Err(crate::error::SchedulerError::InvalidConfiguration(reason));
        }
        self.framework_config.set(config).await
    }

    pub async fn health_history(&self) -> Result<Vec<HealthCheckHistoryEntry>> {
        self.health_history.get().await
    }

    pub async fn append_health_entry(&self, entry: HealthCheckHistoryEntry) -> Result<()> {
        let mut history = self.health_history().await?;
        history.push(entry);
        self.health_history.set(&history).await
    }

    /// The last recorded entry for a given executor, by insertion order.
    pub async fn last_entry_for(
        &self,
        executor_id: &ExecutorId,
    ) -> Result<Option<HealthCheckHistoryEntry>> {
        let history = self.health_history().await?;
        Ok(history
            .into_iter()
            .rev()
            .find(|e| &e.executor_id == executor_id))
    }

    /// The most-recent entry per executor, across all executors that have
    /// ever reported (used by §4.6 topology quiescence).
    pub async fn most_recent_entry_per_executor(
        &self,
    ) -> Result<std::collections::HashMap<ExecutorId, HealthCheckHistoryEntry>> {
        let history = self.health_history().await?;
        let mut latest: std::collections::HashMap<ExecutorId, HealthCheckHistoryEntry> =
            std::collections::HashMap::new();
        for entry in history {
            match latest.get(&entry.executor_id) {
                Some(existing) if existing.timestamp_ms >= entry.timestamp_ms => {}
                _ => {
                    latest.insert(entry.executor_id.clone(), entry);
                }
            }
        }
        Ok(latest)
    }

    pub async fn cluster_jobs(&self) -> Result<CassandraClusterJobs> {
        self.cluster_jobs.get().await
    }

    pub async fn set_cluster_jobs(&self, jobs: &CassandraClusterJobs) -> Result<()> {
        self.cluster_jobs.set(jobs).await
    }

    /// Mints the next executor sequence number. Safe without locking
    /// because the scheduler is strictly single-threaded (spec §4.3, §5).
    pub async fn next_executor_sequence(&self) -> Result<u64> {
        let current = self.executor_counter.get().await?;
        let next = current + 1;
        self.executor_counter.set(&next).await?;
        Ok(next)
    }
}
