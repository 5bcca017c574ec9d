//! End-to-end coverage of the concrete scenarios against the public
//! `Scheduler` API, backed by the in-memory store and a fixed resolver.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use cassandra_scheduler::clock::ManualClock;
use cassandra_scheduler::model::{
    ExecutorMetadata, FrameworkConfiguration, HealthCheckHistoryEntry, HealthDetails, HealthInfo,
    JobType, NodeJobStatus, Offer, OfferResources, TaskPayload, OPERATION_MODE_NORMAL,
};
use cassandra_scheduler::resolver::FixedHostResolver;
use cassandra_scheduler::store::mem::MemKvStore;
use cassandra_scheduler::store::Stores;
use cassandra_scheduler::Scheduler;

fn config(num_nodes: u32, num_seeds: u32) -> FrameworkConfiguration {
    FrameworkConfiguration {
        framework_name: "cassandra".to_string(),
        database_version: "3.0.10".to_string(),
        number_of_nodes: num_nodes,
        number_of_seeds: num_seeds,
        cpu_cores: 1.0,
        mem_mb: 2048,
        disk_mb: 10240,
        health_check_interval_seconds: 60,
        bootstrap_grace_time_seconds: 30,
        port_mappings: HashMap::new(),
    }
}

fn plenty_of_resources() -> OfferResources {
    OfferResources {
        cpus: 4.0,
        mem: 4096.0,
        disk: 20480.0,
        ports: vec![(31000, 32000)],
    }
}

fn offer(hostname: &str) -> Offer {
    Offer {
        id: format!("offer-{hostname}"),
        hostname: hostname.to_string(),
        resources: plenty_of_resources(),
    }
}

fn resolver_for(hosts: &[&str]) -> FixedHostResolver {
    let mut resolver = FixedHostResolver::new();
    for (i, host) in hosts.iter().enumerate() {
        resolver = resolver.with(host, IpAddr::V4(Ipv4Addr::new(10, 0, 0, (i + 1) as u8)));
    }
    resolver
}

#[tokio::test]
async fn scenario_1_first_node_bring_up() {
    let stores = Stores::new(Arc::new(MemKvStore::new()));
    stores.set_framework_config(&config(3, 2)).await.unwrap();
    let clock = Arc::new(ManualClock::new(1_000_000));
    let scheduler = Scheduler::new(stores.clone(), clock.clone(), Arc::new(resolver_for(&["h1"])));

    let result = scheduler.decide(&offer("h1")).await.unwrap().unwrap();
    assert_eq!(result.launch_tasks.len(), 1);
    assert!(matches!(result.launch_tasks[0].payload, TaskPayload::ExecutorMetadata));
    let executor_id = result.launch_tasks[0].executor_id.clone();

    let mut state = stores.cluster_state().await.unwrap();
    assert!(state.find_node("h1").unwrap().seed);
    state.executor_metadata.insert(
        executor_id,
        ExecutorMetadata { ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)) },
    );
    stores.set_cluster_state(&state).await.unwrap();

    clock.advance(61_001);
    let result = scheduler.decide(&offer("h1")).await.unwrap().unwrap();
    assert_eq!(result.launch_tasks.len(), 1);
    assert!(matches!(result.launch_tasks[0].payload, TaskPayload::CassandraServerRun(_)));
}

#[tokio::test]
async fn scenario_2_seed_gating_admits_fresh_seed() {
    let stores = Stores::new(Arc::new(MemKvStore::new()));
    stores.set_framework_config(&config(3, 2)).await.unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::new(
        stores.clone(),
        clock.clone(),
        Arc::new(resolver_for(&["h1", "h2"])),
    );

    // h1 registers, becomes a serving seed.
    let result = scheduler.decide(&offer("h1")).await.unwrap().unwrap();
    let e1 = result.launch_tasks[0].executor_id.clone();
    let mut state = stores.cluster_state().await.unwrap();
    state.executor_metadata.insert(
        e1,
        ExecutorMetadata {
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
        },
    );
    stores.set_cluster_state(&state).await.unwrap();
    clock.advance(61_001);
    scheduler.decide(&offer("h1")).await.unwrap();

    // fresh h2: seeds count (metadata entries) is still 1 < 2, so h2 is
    // admitted as a seed and registers with a metadata task.
    let result = scheduler.decide(&offer("h2")).await.unwrap().unwrap();
    assert_eq!(result.launch_tasks.len(), 1);
    assert!(matches!(result.launch_tasks[0].payload, TaskPayload::ExecutorMetadata));
    let state = stores.cluster_state().await.unwrap();
    assert!(state.find_node("h2").unwrap().seed);
}

#[tokio::test]
async fn scenario_3_non_seed_parked_on_transitional_topology() {
    let stores = Stores::new(Arc::new(MemKvStore::new()));
    stores.set_framework_config(&config(3, 2)).await.unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::new(
        stores.clone(),
        clock.clone(),
        Arc::new(resolver_for(&["h1", "h2", "h3"])),
    );

    let mut executor_ids = Vec::new();
    for host in ["h1", "h2"] {
        let result = scheduler.decide(&offer(host)).await.unwrap().unwrap();
        let executor_id = result.launch_tasks[0].executor_id.clone();
        let mut state = stores.cluster_state().await.unwrap();
        state.executor_metadata.insert(
            executor_id.clone(),
            ExecutorMetadata { ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)) },
        );
        stores.set_cluster_state(&state).await.unwrap();
        executor_ids.push(executor_id);
    }

    clock.advance(61_001);
    scheduler.decide(&offer("h1")).await.unwrap();
    clock.advance(61_001);
    scheduler.decide(&offer("h2")).await.unwrap();
    clock.advance(61_001);

    stores
        .append_health_entry(HealthCheckHistoryEntry {
            executor_id: executor_ids[0].clone(),
            timestamp_ms: 0,
            details: HealthDetails {
                healthy: true,
                msg: String::new(),
                info: HealthInfo {
                    joined: true,
                    operation_mode: OPERATION_MODE_NORMAL.to_string(),
                    extra: HashMap::new(),
                },
            },
        })
        .await
        .unwrap();
    // e2 reports healthy but not yet joined: transitional.
    stores
        .append_health_entry(HealthCheckHistoryEntry {
            executor_id: executor_ids[1].clone(),
            timestamp_ms: 0,
            details: HealthDetails {
                healthy: true,
                msg: String::new(),
                info: HealthInfo {
                    joined: false,
                    operation_mode: OPERATION_MODE_NORMAL.to_string(),
                    extra: HashMap::new(),
                },
            },
        })
        .await
        .unwrap();

    // h3 past metadata, attempts a server launch and is parked.
    let result = scheduler.decide(&offer("h3")).await.unwrap().unwrap();
    let e3 = result.launch_tasks[0].executor_id.clone();
    let mut state = stores.cluster_state().await.unwrap();
    state
        .executor_metadata
        .insert(e3, ExecutorMetadata { ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)) });
    stores.set_cluster_state(&state).await.unwrap();

    let result = scheduler.decide(&offer("h3")).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn scenario_4_throttle_window() {
    let stores = Stores::new(Arc::new(MemKvStore::new()));
    let mut cfg = config(3, 2);
    cfg.bootstrap_grace_time_seconds = 30;
    cfg.health_check_interval_seconds = 60;
    stores.set_framework_config(&cfg).await.unwrap();
    let mut state = cassandra_scheduler::model::ClusterState::default();
    state.last_server_launch_timestamp_ms = Some(1000);
    stores.set_cluster_state(&state).await.unwrap();

    let clock = Arc::new(ManualClock::new(55_000));
    let scheduler = Scheduler::new(stores.clone(), clock.clone(), Arc::new(resolver_for(&["h1"])));

    // register h1, bind executor, metadata reported, then attempt server launch.
    let result = scheduler.decide(&offer("h1")).await.unwrap().unwrap();
    let e1 = result.launch_tasks[0].executor_id.clone();
    let mut state = stores.cluster_state().await.unwrap();
    state.executor_metadata.insert(
        e1,
        ExecutorMetadata {
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
        },
    );
    stores.set_cluster_state(&state).await.unwrap();

    // window = max(30, 60) * 1000 = 60000; now=55000 < 1000+60000: parked.
    let result = scheduler.decide(&offer("h1")).await.unwrap();
    assert!(result.is_none());

    clock.set(61_001);
    let result = scheduler.decide(&offer("h1")).await.unwrap().unwrap();
    assert!(matches!(result.launch_tasks[0].payload, TaskPayload::CassandraServerRun(_)));
}

#[tokio::test]
async fn scenario_5_cluster_job_walk_out_of_order() {
    // All three nodes are seeds so every server launch clears admission on
    // the seed-first gate alone, without needing synthetic health reports
    // for the non-seed topology-quiescence check.
    let stores = Stores::new(Arc::new(MemKvStore::new()));
    stores.set_framework_config(&config(3, 3)).await.unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::new(
        stores.clone(),
        clock.clone(),
        Arc::new(resolver_for(&["h1", "h2", "h3"])),
    );

    let mut executors = HashMap::new();
    for host in ["h1", "h2", "h3"] {
        let result = scheduler.decide(&offer(host)).await.unwrap().unwrap();
        let executor_id = result.launch_tasks[0].executor_id.clone();
        let mut state = stores.cluster_state().await.unwrap();
        state.executor_metadata.insert(
            executor_id.clone(),
            ExecutorMetadata { ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)) },
        );
        stores.set_cluster_state(&state).await.unwrap();
        clock.advance(61_001);
        scheduler.decide(&offer(host)).await.unwrap();
        executors.insert(host, executor_id);
    }

    assert!(scheduler.start_cluster_job(JobType::from("repair")).await.unwrap());

    clock.advance(1);
    let e1 = executors["h1"].clone();
    let result = scheduler.decide(&offer("h1")).await.unwrap().unwrap();
    assert!(result.launch_tasks.iter().any(|t| matches!(t.payload, TaskPayload::NodeJob { .. })));

    scheduler
        .on_node_job_status(NodeJobStatus {
            executor_id: e1.clone(),
            task_id: format!("{e1}.repair"),
            job_type: JobType::from("repair"),
            started_timestamp_ms: 0,
            running: true,
            failed: false,
            failure_message: String::new(),
        })
        .await
        .unwrap();
    scheduler
        .on_node_job_status(NodeJobStatus {
            executor_id: e1.clone(),
            task_id: format!("{e1}.repair"),
            job_type: JobType::from("repair"),
            started_timestamp_ms: 0,
            running: false,
            failed: false,
            failure_message: String::new(),
        })
        .await
        .unwrap();

    // E3 offered before E2: removed from remaining, launched.
    clock.advance(1);
    let e3 = executors["h3"].clone();
    let result = scheduler.decide(&offer("h3")).await.unwrap().unwrap();
    assert!(result.launch_tasks.iter().any(|t| matches!(t.payload, TaskPayload::NodeJob { .. })));
    scheduler
        .on_node_job_status(NodeJobStatus {
            executor_id: e3.clone(),
            task_id: format!("{e3}.repair"),
            job_type: JobType::from("repair"),
            started_timestamp_ms: 0,
            running: false,
            failed: false,
            failure_message: String::new(),
        })
        .await
        .unwrap();

    clock.advance(1);
    let e2 = executors["h2"].clone();
    let result = scheduler.decide(&offer("h2")).await.unwrap().unwrap();
    assert!(result.launch_tasks.iter().any(|t| matches!(t.payload, TaskPayload::NodeJob { .. })));
    scheduler
        .on_node_job_status(NodeJobStatus {
            executor_id: e2.clone(),
            task_id: format!("{e2}.repair"),
            job_type: JobType::from("repair"),
            started_timestamp_ms: 0,
            running: false,
            failed: false,
            failure_message: String::new(),
        })
        .await
        .unwrap();

    let jobs = stores.cluster_jobs().await.unwrap();
    assert!(jobs.current_cluster_job.is_none());
    let finished = jobs.last_cluster_jobs.get(&JobType::from("repair")).unwrap();
    assert_eq!(finished.completed_nodes.len(), 3);
}

#[tokio::test]
async fn scenario_6_abort_mid_job() {
    // Both nodes are seeds, for the same reason as scenario 5.
    let stores = Stores::new(Arc::new(MemKvStore::new()));
    stores.set_framework_config(&config(2, 2)).await.unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::new(
        stores.clone(),
        clock.clone(),
        Arc::new(resolver_for(&["h1", "h2"])),
    );

    let mut executors = HashMap::new();
    for host in ["h1", "h2"] {
        let result = scheduler.decide(&offer(host)).await.unwrap().unwrap();
        let executor_id = result.launch_tasks[0].executor_id.clone();
        let mut state = stores.cluster_state().await.unwrap();
        state.executor_metadata.insert(
            executor_id.clone(),
            ExecutorMetadata { ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)) },
        );
        stores.set_cluster_state(&state).await.unwrap();
        clock.advance(61_001);
        scheduler.decide(&offer(host)).await.unwrap();
        executors.insert(host, executor_id);
    }

    assert!(scheduler.start_cluster_job(JobType::from("cleanup")).await.unwrap());

    clock.advance(1);
    let e1 = executors["h1"].clone();
    scheduler.decide(&offer("h1")).await.unwrap();

    assert!(scheduler.abort_cluster_job(&JobType::from("cleanup")).await.unwrap());

    scheduler
        .on_node_job_status(NodeJobStatus {
            executor_id: e1.clone(),
            task_id: format!("{e1}.cleanup"),
            job_type: JobType::from("cleanup"),
            started_timestamp_ms: 0,
            running: false,
            failed: false,
            failure_message: String::new(),
        })
        .await
        .unwrap();

    // h2 never starts: the aborted job clears on the next touching offer.
    clock.advance(1);
    let result = scheduler.decide(&offer("h2")).await.unwrap();
    assert!(
        result.is_none()
            || !result
                .unwrap()
                .launch_tasks
                .iter()
                .any(|t| matches!(t.payload, TaskPayload::NodeJob { .. }))
    );

    let jobs = stores.cluster_jobs().await.unwrap();
    assert!(jobs.current_cluster_job.is_none());
}

#[tokio::test]
async fn on_task_status_ignored_for_running_state() {
    // A `Running` notification is not terminal and must not clear anything;
    // exercised as a property directly on the public entry point.
    let stores = Stores::new(Arc::new(MemKvStore::new()));
    stores.set_framework_config(&config(3, 2)).await.unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::new(stores.clone(), clock, Arc::new(resolver_for(&["h1"])));

    let result = scheduler.decide(&offer("h1")).await.unwrap().unwrap();
    let task_id = result.launch_tasks[0].task_id.clone();

    scheduler
        .on_task_status(cassandra_scheduler::model::TaskStatus {
            task_id,
            state: cassandra_scheduler::model::TaskState::Running,
            reason: String::new(),
            source: String::new(),
            healthy: true,
            message: String::new(),
        })
        .await
        .unwrap();

    let state = stores.cluster_state().await.unwrap();
    assert!(state.find_node("h1").unwrap().metadata_task.is_some());
}

