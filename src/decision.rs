//! §4.8 Offer Decision: the single entry point that ties the node state
//! machine (§4.5), cluster admission (§4.6), and cluster job orchestrator
//! (§4.7) into one serialized decision step per offer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::admission::{self, AdmissionDecision};
use crate::clock::Clock;
use crate::error::Result;
use crate::job;
use crate::model::{
    ExecutorId, JobType, LaunchTask, Offer, SubmitPayload, SubmitTask, TaskPayload, TaskStatus,
    TasksForOffer,
};
use crate::node;
use crate::resolver::HostResolver;
use crate::resource;
use crate::store::Stores;

/// Owns the persisted stores, clock, and host resolver, and serializes every
/// public operation behind one mutex (spec §5: no operation may be
/// re-entered, all public operations are strictly serialized).
pub struct Scheduler {
    stores: Stores,
    clock: Arc<dyn Clock>,
    resolver: Arc<dyn HostResolver>,
    lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            stores,
            clock,
            resolver,
            lock: Mutex::new(()),
        }
    }

    /// §4.8 `decide`: the seven-step ordering over a single offer.
    pub async fn decide(&self, offer: &Offer) -> Result<Option<TasksForOffer>> {
        let _guard = self.lock.lock().await;
        let config = self.stores.framework_config().await?;
        let mut state = self.stores.cluster_state().await?;
        let now = self.clock.now_millis();

        // 1. Locate or register the node.
        let register_outcome =
            node::register(&mut state, &config, &offer.hostname, self.resolver.as_ref())?;
        if register_outcome == node::RegisterOutcome::CapReached {
            return Ok(None);
        }

        // 2. Bind executor if missing.
        if state
            .find_node(&offer.hostname)
            .expect("just registered")
            .executor_id
            .is_none()
        {
            let executor_id = match node::find_existing_executor(&state, &offer.hostname) {
                Some(existing) => existing,
                None => {
                    let sequence = self.stores.next_executor_sequence().await?;
                    node::mint_executor_id(&config.framework_name, sequence)
                }
            };
            node::set_executor(&mut state, &offer.hostname, executor_id);
        }

        let node_snapshot = state
            .find_node(&offer.hostname)
            .expect("just bound")
            .clone();
        let executor_id = node_snapshot
            .executor_id
            .clone()
            .expect("bound above");

        // 3. No metadata task yet: launch it.
        if !node_snapshot.is_metadata_probing() {
            let launch = node::metadata_launch_task(&executor_id);
            node::set_metadata_task(&mut state, &offer.hostname, &executor_id);
            self.stores.set_cluster_state(&state).await?;
            return Ok(Some(TasksForOffer {
                launch_tasks: vec![launch],
                submit_tasks: Vec::new(),
            }));
        }

        // 4. Metadata not yet reported: park.
        if !state.executor_metadata.contains_key(&executor_id) {
            self.stores.set_cluster_state(&state).await?;
            return Ok(None);
        }

        // 5. No server task yet: apply admission, launch or park.
        if node_snapshot.server_task.is_none() {
            let health_latest = self.stores.most_recent_entry_per_executor().await?;
            match admission::check(&config, &state, &node_snapshot, &health_latest, now) {
                AdmissionDecision::Park(reason) => {
                    tracing::debug!(hostname = %offer.hostname, ?reason, "server launch parked");
                    self.stores.set_cluster_state(&state).await?;
                    return Ok(None);
                }
                AdmissionDecision::Admit => {
                    let all_ips: Vec<_> = state.nodes.iter().map(|n| n.ip).collect();
                    let launch = node::server_launch_task(&config, &node_snapshot, &all_ips)?;
                    let shortfalls = resource::has_resources(
                        &offer.resources,
                        launch.cpus,
                        launch.mem_mb as f64,
                        launch.disk_mb as f64,
                        &launch.ports,
                    );
                    if !shortfalls.is_empty() {
                        for shortfall in &shortfalls {
                            tracing::warn!(
                                hostname = %offer.hostname,
                                %shortfall,
                                "parking server launch"
                            );
                        }
                        self.stores.set_cluster_state(&state).await?;
                        return Ok(None);
                    }
                    node::set_server_task(&mut state, &offer.hostname, launch.task_id.clone());
                    state.last_server_launch_timestamp_ms = Some(now);
                    self.stores.set_cluster_state(&state).await?;
                    return Ok(Some(TasksForOffer {
                        launch_tasks: vec![launch],
                        submit_tasks: Vec::new(),
                    }));
                }
            }
        }

        // 6. Serving: submit health check if due, then drive the job step.
        let mut tasks = TasksForOffer::default();

        let last_health = self.stores.last_entry_for(&executor_id).await?;
        if node::health_check_due(&config, last_health.as_ref(), now) {
            tasks.submit_tasks.push(SubmitTask {
                executor_id: executor_id.clone(),
                payload: SubmitPayload::HealthCheck,
            });
        }

        let mut jobs = self.stores.cluster_jobs().await?;
        match job::step(&mut jobs, &state, &executor_id, now) {
            job::StepOutcome::None => {}
            job::StepOutcome::SubmitStatusProbe { executor_id, job_type } => {
                tasks.submit_tasks.push(SubmitTask {
                    executor_id,
                    payload: SubmitPayload::NodeJobStatus { job_type },
                });
            }
            job::StepOutcome::LaunchNodeJob {
                executor_id,
                job_type,
                task_id,
            } => {
                tasks.launch_tasks.push(LaunchTask {
                    task_id,
                    executor_id,
                    cpus: job::STEP_CPU,
                    mem_mb: job::STEP_MEM_MB,
                    disk_mb: job::STEP_DISK_MB,
                    ports: HashMap::new(),
                    payload: TaskPayload::NodeJob { job_type },
                });
            }
        }
        self.stores.set_cluster_jobs(&jobs).await?;
        self.stores.set_cluster_state(&state).await?;

        // 7. Empty result collapses to None.
        if tasks.is_empty() {
            Ok(None)
        } else {
            Ok(Some(tasks))
        }
    }

    /// §4.5 removal driven by a single task-status notification. Only
    /// terminal states (`state.is_terminal()`) represent a removal; running
    /// updates are not meaningful here and are ignored.
    pub async fn on_task_status(&self, status: TaskStatus) -> Result<()> {
        let _guard = self.lock.lock().await;
        if !status.state.is_terminal() {
            return Ok(());
        }
        let mut state = self.stores.cluster_state().await?;
        let effect = node::handle_task_terminal(&mut state, &status.task_id);
        if let node::RemovalEffect::ServerTaskCleared { executor_id } = effect {
            let mut jobs = self.stores.cluster_jobs().await?;
            job::fail_current_node_if_matches(&mut jobs, &executor_id, &status);
            self.stores.set_cluster_jobs(&jobs).await?;
        }
        self.stores.set_cluster_state(&state).await?;
        Ok(())
    }

    /// §4.5 removal of an entire executor (e.g. the agent hosting it is
    /// gone). `status` carries the termination details recorded against any
    /// in-flight cluster-job step on that executor.
    pub async fn on_executor_lost(
        &self,
        executor_id: ExecutorId,
        status: &TaskStatus,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.stores.cluster_state().await?;
        if node::handle_executor_lost(&mut state, &executor_id) {
            let mut jobs = self.stores.cluster_jobs().await?;
            job::fail_current_node_if_matches(&mut jobs, &executor_id, status);
            self.stores.set_cluster_jobs(&jobs).await?;
        }
        self.stores.set_cluster_state(&state).await?;
        Ok(())
    }

    /// §4.7 `startClusterJob`.
    pub async fn start_cluster_job(&self, job_type: JobType) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let state = self.stores.cluster_state().await?;
        let mut jobs = self.stores.cluster_jobs().await?;
        let now = self.clock.now_millis();
        let executor_ids: Vec<ExecutorId> = state
            .nodes
            .iter()
            .filter_map(|n| n.executor_id.clone())
            .collect();
        let started = job::start(&mut jobs, job_type, executor_ids, now);
        if started {
            self.stores.set_cluster_jobs(&jobs).await?;
        }
        Ok(started)
    }

    /// §4.7 `abortClusterJob`.
    pub async fn abort_cluster_job(&self, job_type: &JobType) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.stores.cluster_jobs().await?;
        let aborted = job::abort(&mut jobs, job_type);
        if aborted {
            self.stores.set_cluster_jobs(&jobs).await?;
        }
        Ok(aborted)
    }

    /// §4.7 `onNodeJobStatus`.
    pub async fn on_node_job_status(&self, status: crate::model::NodeJobStatus) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.stores.cluster_jobs().await?;
        let now = self.clock.now_millis();
        job::on_node_job_status(&mut jobs, status, now);
        self.stores.set_cluster_jobs(&jobs).await?;
        Ok(())
    }
}
