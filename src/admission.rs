//! §4.6 Cluster-Level Admission: the gate a node must pass before the
//! decision core may launch its server task.

use std::collections::HashMap;

use crate::model::{
    ClusterState, ExecutorId, FrameworkConfiguration, HealthCheckHistoryEntry, Node,
    OPERATION_MODE_NORMAL,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParkReason {
    /// Fewer `ExecutorMetadata` entries than `number_of_seeds`: only seeds
    /// may proceed.
    SeedsNotYetEstablished,
    /// Less than `max(bootstrapGrace, healthCheckInterval)` has elapsed
    /// since the last successful server launch.
    ThrottleWindowActive,
    /// No seed is healthy, joined, and in `NORMAL` mode yet.
    NoHealthySeedNormal,
    /// Some serving node is in a transitional state (healthy but not
    /// joined, or not in `NORMAL` mode).
    TransitionalTopology(ExecutorId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    Park(ParkReason),
}

fn is_normal(entry: &HealthCheckHistoryEntry) -> bool {
    entry.details.healthy
        && entry.details.info.joined
        && entry.details.info.operation_mode == OPERATION_MODE_NORMAL
}

fn is_transitional(entry: &HealthCheckHistoryEntry) -> bool {
    entry.details.healthy
        && (!entry.details.info.joined
            || entry.details.info.operation_mode != OPERATION_MODE_NORMAL)
}

/// All three conditions in spec §4.6 must hold before `node`'s server task
/// may launch. `health_latest` is the most-recent health entry per
/// executor (`Stores::most_recent_entry_per_executor`).
pub fn check(
    config: &FrameworkConfiguration,
    state: &ClusterState,
    node: &Node,
    health_latest: &HashMap<ExecutorId, HealthCheckHistoryEntry>,
    now_millis: i64,
) -> AdmissionDecision {
    if state.executor_metadata.len() < config.number_of_seeds as usize && !node.seed {
        return AdmissionDecision::Park(ParkReason::SeedsNotYetEstablished);
    }

    let last_launch = state.last_server_launch_timestamp_ms.unwrap_or(i64::MIN);
    if !(now_millis > last_launch.saturating_add(config.throttle_window_millis())) {
        return AdmissionDecision::Park(ParkReason::ThrottleWindowActive);
    }

    if !node.seed {
        let any_seed_normal = state.nodes.iter().any(|n| {
            n.seed
                && n.is_serving()
                && n.executor_id
                    .as_ref()
                    .and_then(|e| health_latest.get(e))
                    .map(is_normal)
                    .unwrap_or(false)
        });
        if !any_seed_normal {
            return AdmissionDecision::Park(ParkReason::NoHealthySeedNormal);
        }

        for serving in state.nodes.iter().filter(|n| n.is_serving()) {
            if let Some(entry) = serving.executor_id.as_ref().and_then(|e| health_latest.get(e)) {
                if is_transitional(entry) {
                    return AdmissionDecision::Park(ParkReason::TransitionalTopology(
                        serving.executor_id.clone().unwrap(),
                    ));
                }
            }
        }
    }

    AdmissionDecision::Admit
}
