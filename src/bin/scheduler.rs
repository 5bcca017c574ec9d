//! Process entry point: parses configuration, wires the persisted stores
//! to the decision core, and seeds the framework configuration once at
//! startup. The offer and task-status transport that drives `Scheduler`
//! afterwards is external to this crate (spec Non-goals).

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cassandra_scheduler::cli::SchedulerOpts;
use cassandra_scheduler::clock::SystemClock;
use cassandra_scheduler::resolver::SystemHostResolver;
use cassandra_scheduler::store::mem::MemKvStore;
use cassandra_scheduler::store::Stores;
use cassandra_scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = SchedulerOpts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(opts.log_filter.clone()))
        .init();

    // MemKvStore has no durability; a production deployment wires a real
    // `KvStore` backend instead (spec §6 External Interfaces).
    tracing::warn!("using in-memory store, state will not survive a restart");
    let stores = Stores::new(Arc::new(MemKvStore::new()));

    let config = opts.framework_configuration();
    config
        .validate()
        .map_err(|reason| anyhow::anyhow!("invalid startup configuration: {reason}"))?;
    stores.set_framework_config(&config).await?;

    let _scheduler = Scheduler::new(stores, Arc::new(SystemClock), Arc::new(SystemHostResolver));

    tracing::info!(
        framework_name = %config.framework_name,
        number_of_nodes = config.number_of_nodes,
        number_of_seeds = config.number_of_seeds,
        "scheduler core ready, awaiting offers"
    );

    Ok(())
}
