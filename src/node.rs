//! §4.5 Node State Machine: per-host lifecycle from `ABSENT` through
//! `SERVING`. Pure, synchronous logic over an in-memory `ClusterState`
//! snapshot — `decision::Scheduler` is the only caller, and it is
//! responsible for reading the snapshot from `Stores` before and
//! persisting it after (spec §4.3).

use std::collections::HashMap;
use std::net::IpAddr;

use crate::error::Result;
use crate::model::{
    ClusterState, ExecutorId, FrameworkConfiguration, HealthCheckHistoryEntry, JmxConnect,
    LaunchTask, Node, ServerRunConfig, TaskDescriptor, TaskPayload,
};
use crate::ports;
use crate::resolver::HostResolver;

/// A small fixed-cost task used for both the metadata probe and a single
/// cluster-job step (spec §4.5, §4.7).
const PROBE_CPU: f64 = 0.1;
const PROBE_MEM_MB: u64 = 16;
const PROBE_DISK_MB: u64 = 16;

/// Outcome of `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A node for this hostname now exists (freshly created or pre-existing).
    Present,
    /// The hostname is unknown and `number_of_nodes` nodes are already
    /// registered; the caller must return `None` for this offer.
    CapReached,
}

/// §4.5 register: at most one per offer, requires
/// `|registeredNodes| < number_of_nodes`, resolves the hostname's IP
/// exactly once, and assigns `seed` at creation time only.
pub fn register(
    state: &mut ClusterState,
    config: &FrameworkConfiguration,
    hostname: &str,
    resolver: &dyn HostResolver,
) -> Result<RegisterOutcome> {
    if state.find_node(hostname).is_some() {
        return Ok(RegisterOutcome::Present);
    }
    if state.nodes.len() >= config.number_of_nodes as usize {
        return Ok(RegisterOutcome::CapReached);
    }

    let ip = resolver.resolve(hostname)?;
    let loopback = resolver.is_loopback(hostname, ip);
    let jmx_port = if loopback {
        resolver.allocate_loopback_port()?
    } else {
        ports::port_for(config, ports::JMX_PORT)?
    };
    let seed = state.seed_count() < config.number_of_seeds as usize;

    tracing::info!(hostname, %ip, seed, "registering node");

    state.nodes.push(Node {
        hostname: hostname.to_string(),
        ip,
        seed,
        jmx_connect: JmxConnect { ip, port: jmx_port },
        executor_id: None,
        metadata_task: None,
        server_task: None,
    });
    Ok(RegisterOutcome::Present)
}

/// An executor already bound to `hostname` among any tracked node, so a
/// fresh one is not minted (spec §4.5 "assign executor").
pub fn find_existing_executor(state: &ClusterState, hostname: &str) -> Option<ExecutorId> {
    state
        .nodes
        .iter()
        .find(|n| n.hostname == hostname && n.executor_id.is_some())
        .and_then(|n| n.executor_id.clone())
}

pub fn mint_executor_id(framework_name: &str, sequence: u64) -> ExecutorId {
    ExecutorId(format!("{framework_name}.node.{sequence}.executor"))
}

pub fn set_executor(state: &mut ClusterState, hostname: &str, executor_id: ExecutorId) {
    if let Some(node) = state.find_node_mut(hostname) {
        tracing::info!(hostname, executor_id = %executor_id, "assigned executor");
        node.executor_id = Some(executor_id);
    }
}

/// §4.5 launch metadata task: taskId equals executorId.
pub fn metadata_launch_task(executor_id: &ExecutorId) -> LaunchTask {
    LaunchTask {
        task_id: executor_id.0.clone(),
        executor_id: executor_id.clone(),
        cpus: PROBE_CPU,
        mem_mb: PROBE_MEM_MB,
        disk_mb: PROBE_DISK_MB,
        ports: HashMap::new(),
        payload: TaskPayload::ExecutorMetadata,
    }
}

pub fn set_metadata_task(state: &mut ClusterState, hostname: &str, executor_id: &ExecutorId) {
    if let Some(node) = state.find_node_mut(hostname) {
        node.metadata_task = Some(TaskDescriptor {
            task_id: executor_id.0.clone(),
            executor_id: executor_id.clone(),
        });
    }
}

/// §4.5 launch server task: resource reservation equals
/// `config.cpuCores / memMb / diskMb` plus every port in `allPorts`.
pub fn server_launch_task(
    config: &FrameworkConfiguration,
    node: &Node,
    all_ips: &[IpAddr],
) -> Result<LaunchTask> {
    let executor_id = node
        .executor_id
        .clone()
        .expect("server task is only launched once an executor is bound");
    let port_map = ports::all_ports(config);
    let jmx_port = ports::port_for(config, ports::JMX_PORT)?;

    let seeds = all_ips
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut env = HashMap::new();
    env.insert("JMX_PORT".to_string(), jmx_port.to_string());
    env.insert("MAX_HEAP_SIZE".to_string(), format!("{}m", config.mem_mb));
    env.insert(
        "HEAP_NEWSIZE".to_string(),
        format!("{}m", (config.cpu_cores * 100.0) as i64),
    );

    let run_config = ServerRunConfig {
        cluster_name: config.framework_name.clone(),
        broadcast_address: node.ip,
        rpc_address: node.ip,
        listen_address: node.ip,
        seeds,
        ports: port_map.clone(),
        env,
    };

    Ok(LaunchTask {
        task_id: format!("{executor_id}.server"),
        executor_id: executor_id.clone(),
        cpus: config.cpu_cores,
        mem_mb: config.mem_mb,
        disk_mb: config.disk_mb,
        ports: port_map,
        payload: TaskPayload::CassandraServerRun(run_config),
    })
}

pub fn set_server_task(state: &mut ClusterState, hostname: &str, task_id: String) {
    if let Some(node) = state.find_node_mut(hostname) {
        let executor_id = node
            .executor_id
            .clone()
            .expect("server task requires an executor");
        node.server_task = Some(TaskDescriptor {
            task_id,
            executor_id,
        });
    }
}

/// §4.5 "submit health check" due condition: disabled when the interval is
/// non-positive; otherwise due when there is no prior entry, or the prior
/// entry is older than the interval.
pub fn health_check_due(
    config: &FrameworkConfiguration,
    last_entry: Option<&HealthCheckHistoryEntry>,
    now_millis: i64,
) -> bool {
    if config.health_check_interval_seconds <= 0 {
        return false;
    }
    match last_entry {
        None => true,
        Some(entry) => {
            now_millis - entry.timestamp_ms > config.health_check_interval_seconds * 1000
        }
    }
}

/// What a terminal task-status notification invalidated (spec §4.5
/// Removal). `decision::Scheduler` uses this to additionally fail any
/// cluster-job step in flight on the affected executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalEffect {
    None,
    ServerTaskCleared { executor_id: ExecutorId },
    MetadataTaskCleared { executor_id: ExecutorId },
}

/// Handles removal of a `serverTask` or `metadataTask` by task id. A
/// metadata-task removal also clears the server task and drops the
/// `ExecutorMetadata` entry, since metadata loss invalidates the server
/// (spec §4.5, §9.b).
pub fn handle_task_terminal(state: &mut ClusterState, task_id: &str) -> RemovalEffect {
    if let Some(node) = state
        .nodes
        .iter_mut()
        .find(|n| n.server_task.as_ref().map(|t| t.task_id.as_str()) == Some(task_id))
    {
        let executor_id = node.server_task.take().expect("just matched").executor_id;
        tracing::info!(%executor_id, task_id, "server task removed");
        return RemovalEffect::ServerTaskCleared { executor_id };
    }

    if let Some(node) = state
        .nodes
        .iter_mut()
        .find(|n| n.metadata_task.as_ref().map(|t| t.task_id.as_str()) == Some(task_id))
    {
        let executor_id = node.metadata_task.take().expect("just matched").executor_id;
        node.server_task = None;
        tracing::info!(%executor_id, task_id, "metadata task removed, server task invalidated");
        state.executor_metadata.remove(&executor_id);
        return RemovalEffect::MetadataTaskCleared { executor_id };
    }

    RemovalEffect::None
}

/// Handles removal of an entire executor: clears both task fields across
/// every node sharing that executor id and drops its `ExecutorMetadata`.
pub fn handle_executor_lost(state: &mut ClusterState, executor_id: &ExecutorId) -> bool {
    let mut affected = false;
    for node in state
        .nodes
        .iter_mut()
        .filter(|n| n.executor_id.as_ref() == Some(executor_id))
    {
        if node.metadata_task.is_some() || node.server_task.is_some() {
            affected = true;
        }
        node.metadata_task = None;
        node.server_task = None;
    }
    state.executor_metadata.remove(executor_id);
    if affected {
        tracing::info!(%executor_id, "executor lost, cleared tasks");
    }
    affected
}
