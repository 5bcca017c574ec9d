//! Data model shared by the scheduler core (spec §3).
//!
//! Kept deliberately flat: nodes reference executors by id, job status
//! references nodes by id, never by pointer. Node count is bounded by
//! `FrameworkConfiguration::number_of_nodes`, so lookups by id are a linear
//! scan over an insertion-ordered `Vec` rather than a secondary index.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Identifies an executor, minted by the node state machine as
/// `"<framework_name>.node.<n>.executor"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutorId(pub String);

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExecutorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExecutorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A maintenance operation type ("repair", "cleanup", ...). Modeled as an
/// open string rather than a closed enum: spec.md names these as examples,
/// and `lastClusterJobs` is keyed generically "by jobType".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobType(pub String);

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// §3 FrameworkConfiguration (persistent, singleton).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkConfiguration {
    pub framework_name: String,
    pub database_version: String,
    pub number_of_nodes: u32,
    pub number_of_seeds: u32,
    pub cpu_cores: f64,
    pub mem_mb: u64,
    pub disk_mb: u64,
    /// <= 0 disables periodic health checks.
    pub health_check_interval_seconds: i64,
    pub bootstrap_grace_time_seconds: i64,
    pub port_mappings: HashMap<String, u16>,
}

impl FrameworkConfiguration {
    /// Invariant: `number_of_seeds <= number_of_nodes`.
    pub fn validate(&self) -> Result<(), String> {
        if self.number_of_seeds > self.number_of_nodes {
            return Err(format!(
                "number_of_seeds ({}) must be <= number_of_nodes ({})",
                self.number_of_seeds, self.number_of_nodes
            ));
        }
        if self.number_of_nodes == 0 {
            return Err("number_of_nodes must be >= 1".to_string());
        }
        if self.number_of_seeds == 0 {
            return Err("number_of_seeds must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn throttle_window_millis(&self) -> i64 {
        self.bootstrap_grace_time_seconds
            .max(self.health_check_interval_seconds)
            * 1000
    }
}

/// A management endpoint: an IP plus a port (spec §3 `jmxConnect`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JmxConnect {
    pub ip: IpAddr,
    pub port: u16,
}

/// A launched unit of work, referenced by id. Both the metadata probe and
/// the server process are modeled this way; `executor_id` is denormalized
/// onto the task so removal handlers (§4.5) don't need the owning node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub executor_id: ExecutorId,
}

/// §3 Node (persistent, keyed by hostname).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub hostname: String,
    pub ip: IpAddr,
    pub seed: bool,
    pub jmx_connect: JmxConnect,
    pub executor_id: Option<ExecutorId>,
    pub metadata_task: Option<TaskDescriptor>,
    pub server_task: Option<TaskDescriptor>,
}

impl Node {
    pub fn is_metadata_probing(&self) -> bool {
        self.metadata_task.is_some()
    }

    pub fn is_serving(&self) -> bool {
        self.server_task.is_some()
    }
}

/// §3 ExecutorMetadata (persistent, keyed by executorId): the IP the
/// executor reported once its metadata probe completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorMetadata {
    pub ip: IpAddr,
}

/// §3 HealthCheckHistoryEntry (append-only per executor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckHistoryEntry {
    pub executor_id: ExecutorId,
    pub timestamp_ms: i64,
    pub details: HealthDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDetails {
    pub healthy: bool,
    pub msg: String,
    pub info: HealthInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInfo {
    pub joined: bool,
    pub operation_mode: String,
    /// Any other fields reported by the health probe that the core does not
    /// interpret itself.
    pub extra: HashMap<String, String>,
}

pub const OPERATION_MODE_NORMAL: &str = "NORMAL";

/// §3 NodeJobStatus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJobStatus {
    pub executor_id: ExecutorId,
    pub task_id: String,
    pub job_type: JobType,
    pub started_timestamp_ms: i64,
    pub running: bool,
    pub failed: bool,
    pub failure_message: String,
}

/// §3 ClusterJobStatus (persistent; at most one active).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterJobStatus {
    pub job_type: JobType,
    pub started_timestamp_ms: i64,
    pub finished_timestamp_ms: Option<i64>,
    pub aborted: bool,
    pub remaining_nodes: Vec<ExecutorId>,
    pub current_node: Option<NodeJobStatus>,
    pub completed_nodes: Vec<NodeJobStatus>,
}

/// §3 CassandraClusterJobs (persistent, singleton).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CassandraClusterJobs {
    pub current_cluster_job: Option<ClusterJobStatus>,
    /// At most one entry per `JobType`; newest wins.
    pub last_cluster_jobs: HashMap<JobType, ClusterJobStatus>,
}

/// §3 ClusterState: the `CassandraClusterState` blob. Bundles `Node`,
/// `ExecutorMetadata`, and `LastServerLaunchTimestamp` into the single
/// store key spec §6 actually lists (the External Interfaces key list has
/// no separate entry for the launch timestamp; see DESIGN.md).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterState {
    /// Insertion-ordered by registration; node count is bounded by
    /// `number_of_nodes` so lookups are a linear scan (Design Notes §9).
    pub nodes: Vec<Node>,
    pub executor_metadata: HashMap<ExecutorId, ExecutorMetadata>,
    pub last_server_launch_timestamp_ms: Option<i64>,
}

impl ClusterState {
    pub fn find_node(&self, hostname: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.hostname == hostname)
    }

    pub fn find_node_mut(&mut self, hostname: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.hostname == hostname)
    }

    pub fn find_node_by_executor(&self, executor_id: &ExecutorId) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.executor_id.as_ref() == Some(executor_id))
    }

    pub fn find_node_by_executor_mut(&mut self, executor_id: &ExecutorId) -> Option<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.executor_id.as_ref() == Some(executor_id))
    }

    pub fn seed_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.seed).count()
    }
}

/// §6 Offer stream (inbound from cluster manager).
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub id: String,
    pub hostname: String,
    pub resources: OfferResources,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfferResources {
    pub cpus: f64,
    pub mem: f64,
    pub disk: f64,
    /// Closed ranges of available ports, e.g. `[(31000, 32000)]`.
    pub ports: Vec<(u32, u32)>,
}

impl OfferResources {
    pub fn has_port(&self, port: u16) -> bool {
        let port = port as u32;
        self.ports.iter().any(|(lo, hi)| *lo <= port && port <= *hi)
    }
}

/// §6 Task status stream (inbound).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub task_id: String,
    pub state: TaskState,
    pub reason: String,
    pub source: String,
    pub healthy: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Finished,
    Failed,
    Lost,
    Killed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Running)
    }
}

/// §6 Executor uplink (outbound): a fresh task launch.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchTask {
    pub task_id: String,
    pub executor_id: ExecutorId,
    pub cpus: f64,
    pub mem_mb: u64,
    pub disk_mb: u64,
    pub ports: HashMap<String, u16>,
    pub payload: TaskPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    ExecutorMetadata,
    CassandraServerRun(ServerRunConfig),
    NodeJob { job_type: JobType },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerRunConfig {
    pub cluster_name: String,
    pub broadcast_address: IpAddr,
    pub rpc_address: IpAddr,
    pub listen_address: IpAddr,
    /// Every node's IP, joined by comma, used as `cassandra.yaml`'s seeds.
    pub seeds: String,
    pub ports: HashMap<String, u16>,
    pub env: HashMap<String, String>,
}

/// §6 submitted payload, delivered to an already-running executor.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTask {
    pub executor_id: ExecutorId,
    pub payload: SubmitPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitPayload {
    HealthCheck,
    NodeJobStatus { job_type: JobType },
}

/// §4.8 return type of `decide`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TasksForOffer {
    pub launch_tasks: Vec<LaunchTask>,
    pub submit_tasks: Vec<SubmitTask>,
}

impl TasksForOffer {
    pub fn is_empty(&self) -> bool {
        self.launch_tasks.is_empty() && self.submit_tasks.is_empty()
    }
}
