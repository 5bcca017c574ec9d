//! Command-line configuration, mirroring `risingwave_meta::MetaNodeOpts`'s
//! shape: one `clap::Parser` struct whose fields seed `FrameworkConfiguration`
//! once at process startup.

use std::collections::HashMap;

use clap::Parser;

use crate::model::FrameworkConfiguration;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "cassandra-scheduler",
    about = "Scheduler core for a Cassandra-like database on a two-level resource-offer cluster manager"
)]
pub struct SchedulerOpts {
    /// Name of the database cluster and the scheduling framework.
    #[arg(long, env = "FRAMEWORK_NAME", default_value = "cassandra")]
    pub framework_name: String,

    /// Cassandra distribution version to launch.
    #[arg(long, env = "DATABASE_VERSION", default_value = "3.0.10")]
    pub database_version: String,

    /// Total number of nodes the cluster will be grown to.
    #[arg(long, env = "NUM_NODES", default_value_t = 3)]
    pub num_nodes: u32,

    /// Number of nodes elected as seeds, in registration order.
    #[arg(long, env = "NUM_SEEDS", default_value_t = 2)]
    pub num_seeds: u32,

    /// CPU cores reserved per database node.
    #[arg(long, env = "CPU_CORES", default_value_t = 1.0)]
    pub cpu_cores: f64,

    /// Memory reserved per database node, in MiB.
    #[arg(long, env = "MEM_MB", default_value_t = 2048)]
    pub mem_mb: u64,

    /// Disk reserved per database node, in MiB.
    #[arg(long, env = "DISK_MB", default_value_t = 10240)]
    pub disk_mb: u64,

    /// Health-check polling interval in seconds; <= 0 disables polling.
    #[arg(long, env = "HEALTH_CHECK_INTERVAL_SECONDS", default_value_t = 60)]
    pub health_check_interval_seconds: i64,

    /// Minimum grace period after a server launch before another may begin.
    #[arg(long, env = "BOOTSTRAP_GRACE_TIME_SECONDS", default_value_t = 120)]
    pub bootstrap_grace_time_seconds: i64,

    /// Base URL artifacts (JRE, database distribution, executor bundle)
    /// are fetched from.
    #[arg(long, env = "ARTIFACT_BASE_URL")]
    pub artifact_base_url: Option<String>,

    /// Port name overrides as `name=port` pairs, e.g. `jmx_port=17199`.
    #[arg(long = "port-mapping", value_parser = parse_port_mapping)]
    pub port_mappings: Vec<(String, u16)>,

    /// Verbosity of structured log output.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

fn parse_port_mapping(raw: &str) -> Result<(String, u16), String> {
    let (name, port) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=port, got {raw:?}"))?;
    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid port number in {raw:?}"))?;
    Ok((name.to_string(), port))
}

impl SchedulerOpts {
    /// Builds the initial `FrameworkConfiguration` to seed the persisted
    /// store with at startup (spec §4.3: production wiring always seeds it
    /// once from CLI args before serving any offers).
    pub fn framework_configuration(&self) -> FrameworkConfiguration {
        let mut port_mappings = HashMap::new();
        for (name, port) in &self.port_mappings {
            port_mappings.insert(name.clone(), *port);
        }
        FrameworkConfiguration {
            framework_name: self.framework_name.clone(),
            database_version: self.database_version.clone(),
            number_of_nodes: self.num_nodes,
            number_of_seeds: self.num_seeds,
            cpu_cores: self.cpu_cores,
            mem_mb: self.mem_mb,
            disk_mb: self.disk_mb,
            health_check_interval_seconds: self.health_check_interval_seconds,
            bootstrap_grace_time_seconds: self.bootstrap_grace_time_seconds,
            port_mappings,
        }
    }
}
