//! §4.7 Cluster Job Orchestrator: drives a maintenance job across every
//! node one at a time.

use crate::model::{
    CassandraClusterJobs, ClusterJobStatus, ClusterState, ExecutorId, JobType, NodeJobStatus,
    TaskStatus,
};

const JOB_STEP_CPU: f64 = 0.1;
const JOB_STEP_MEM_MB: u64 = 16;
const JOB_STEP_DISK_MB: u64 = 16;

/// §4.7 `startClusterJob`: snapshots the registered node ids (in
/// registration order) into `remainingNodes`. Returns `false` without
/// mutating anything if a job is already current.
pub fn start(
    jobs: &mut CassandraClusterJobs,
    job_type: JobType,
    registered_executors_in_order: Vec<ExecutorId>,
    now_millis: i64,
) -> bool {
    if jobs.current_cluster_job.is_some() {
        return false;
    }
    tracing::info!(
        job_type = %job_type,
        nodes = registered_executors_in_order.len(),
        "starting cluster job"
    );
    jobs.current_cluster_job = Some(ClusterJobStatus {
        job_type,
        started_timestamp_ms: now_millis,
        finished_timestamp_ms: None,
        aborted: false,
        remaining_nodes: registered_executors_in_order,
        current_node: None,
        completed_nodes: Vec::new(),
    });
    true
}

/// §4.7 `abortClusterJob`: soft abort — the in-flight node still completes.
/// Returns `false` if there is no current job of this type, or it is
/// already aborted.
pub fn abort(jobs: &mut CassandraClusterJobs, job_type: &JobType) -> bool {
    match jobs.current_cluster_job.as_mut() {
        Some(job) if &job.job_type == job_type && !job.aborted => {
            tracing::info!(job_type = %job_type, "aborting cluster job");
            job.aborted = true;
            true
        }
        _ => false,
    }
}

/// Moves the current job into `lastClusterJobs`, displacing any prior
/// entry of the same `jobType`.
fn finish(jobs: &mut CassandraClusterJobs, now_millis: i64) {
    if let Some(mut job) = jobs.current_cluster_job.take() {
        job.finished_timestamp_ms = Some(now_millis);
        tracing::info!(job_type = %job.job_type, "cluster job finished");
        jobs.last_cluster_jobs.insert(job.job_type.clone(), job);
    }
}

/// §4.7 `onNodeJobStatus`. Status updates for a job type other than the
/// current one are logged and ignored, per spec.
pub fn on_node_job_status(jobs: &mut CassandraClusterJobs, status: NodeJobStatus, now_millis: i64) {
    let Some(job) = jobs.current_cluster_job.as_mut() else {
        tracing::warn!(
            job_type = %status.job_type,
            "node job status with no current job, ignoring"
        );
        return;
    };
    if job.job_type != status.job_type {
        tracing::warn!(
            expected = %job.job_type,
            got = %status.job_type,
            "node job status for mismatched job type, ignoring"
        );
        return;
    }

    let matches_current = job
        .current_node
        .as_ref()
        .map(|n| n.executor_id == status.executor_id)
        .unwrap_or(false);
    if !matches_current {
        tracing::warn!(
            executor_id = %status.executor_id,
            "node job status for non-current node, ignoring"
        );
        return;
    }

    if status.running {
        job.current_node = Some(status);
        return;
    }

    let finished = job.current_node.take().expect("matched above");
    job.completed_nodes.push(finished);
    if job.remaining_nodes.is_empty() {
        finish(jobs, now_millis);
    }
}

/// What the step driver decided to do for this offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    None,
    /// Submit a `NODE_JOB_STATUS` probe to the node already running a job step.
    SubmitStatusProbe { executor_id: ExecutorId, job_type: JobType },
    /// Launch a fresh `NODE_JOB` task on this node.
    LaunchNodeJob {
        executor_id: ExecutorId,
        job_type: JobType,
        task_id: String,
    },
}

pub const STEP_CPU: f64 = JOB_STEP_CPU;
pub const STEP_MEM_MB: u64 = JOB_STEP_MEM_MB;
pub const STEP_DISK_MB: u64 = JOB_STEP_DISK_MB;

/// §4.7 step driver, invoked per offer once the offer's node is serving.
pub fn step(
    jobs: &mut CassandraClusterJobs,
    state: &ClusterState,
    offer_executor_id: &ExecutorId,
    now_millis: i64,
) -> StepOutcome {
    let Some(job) = jobs.current_cluster_job.as_mut() else {
        return StepOutcome::None;
    };

    if let Some(current) = &job.current_node {
        return if &current.executor_id == offer_executor_id {
            StepOutcome::SubmitStatusProbe {
                executor_id: offer_executor_id.clone(),
                job_type: job.job_type.clone(),
            }
        } else {
            StepOutcome::None
        };
    }

    if job.aborted {
        jobs.current_cluster_job = None;
        return StepOutcome::None;
    }

    if job.remaining_nodes.is_empty() {
        finish(jobs, now_millis);
        return StepOutcome::None;
    }

    let position = job.remaining_nodes.iter().position(|e| e == offer_executor_id);
    let Some(position) = position else {
        return StepOutcome::None;
    };
    job.remaining_nodes.remove(position);

    if state.find_node_by_executor(offer_executor_id).is_none() {
        // Node no longer exists; skip it. remaining_nodes is already shortened.
        return StepOutcome::None;
    }

    let job_type = job.job_type.clone();
    let task_id = format!("{offer_executor_id}.{job_type}");
    job.current_node = Some(NodeJobStatus {
        executor_id: offer_executor_id.clone(),
        task_id: task_id.clone(),
        job_type: job_type.clone(),
        started_timestamp_ms: now_millis,
        running: true,
        failed: false,
        failure_message: String::new(),
    });

    StepOutcome::LaunchNodeJob {
        executor_id: offer_executor_id.clone(),
        job_type,
        task_id,
    }
}

/// Called when the executor running the current job step is lost (spec
/// §4.5 removal interacting with §4.7): marks the in-flight `NodeJobStatus`
/// failed, recording the termination details, and moves it to
/// `completedNodes`.
pub fn fail_current_node_if_matches(
    jobs: &mut CassandraClusterJobs,
    executor_id: &ExecutorId,
    status: &TaskStatus,
) {
    let Some(job) = jobs.current_cluster_job.as_mut() else {
        return;
    };
    let matches = job
        .current_node
        .as_ref()
        .map(|n| &n.executor_id == executor_id)
        .unwrap_or(false);
    if !matches {
        return;
    }
    let mut current = job.current_node.take().expect("matched above");
    current.running = false;
    current.failed = true;
    current.failure_message = format!(
        "state={:?} reason={} source={} healthy={} message={}",
        status.state, status.reason, status.source, status.healthy, status.message
    );
    tracing::warn!(executor_id = %executor_id, "cluster job node failed, task lost");
    job.completed_nodes.push(current);
}
