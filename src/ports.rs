//! §4.1 Port Registry: resolves symbolic port names to numeric ports.

use std::collections::HashMap;

use crate::error::{Result, SchedulerError};
use crate::model::FrameworkConfiguration;

pub const STORAGE_PORT: &str = "storage_port";
pub const SSL_STORAGE_PORT: &str = "ssl_storage_port";
pub const JMX_PORT: &str = "jmx_port";
pub const NATIVE_TRANSPORT_PORT: &str = "native_transport_port";
pub const RPC_PORT: &str = "rpc_port";

fn default_port(name: &str) -> Option<u16> {
    match name {
        STORAGE_PORT => Some(7000),
        SSL_STORAGE_PORT => Some(7001),
        JMX_PORT => Some(7199),
        NATIVE_TRANSPORT_PORT => Some(9042),
        RPC_PORT => Some(9160),
        _ => None,
    }
}

/// Returns the configured override for `name` if present, otherwise the
/// default. Fails with `UnknownPort` if `name` is neither overridden nor
/// defaulted.
pub fn port_for(config: &FrameworkConfiguration, name: &str) -> Result<u16> {
    if let Some(port) = config.port_mappings.get(name) {
        return Ok(*port);
    }
    default_port(name).ok_or_else(|| SchedulerError::UnknownPort(name.to_string()))
}

/// The mapping over every default port name, applying overrides.
pub fn all_ports(config: &FrameworkConfiguration) -> HashMap<String, u16> {
    [
        STORAGE_PORT,
        SSL_STORAGE_PORT,
        JMX_PORT,
        NATIVE_TRANSPORT_PORT,
        RPC_PORT,
    ]
    .into_iter()
    .map(|name| {
        let port = port_for(config, name).expect("default port names always resolve");
        (name.to_string(), port)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FrameworkConfiguration {
        FrameworkConfiguration {
            framework_name: "cassandra".to_string(),
            database_version: "3.0.10".to_string(),
            number_of_nodes: 3,
            number_of_seeds: 2,
            cpu_cores: 1.0,
            mem_mb: 2048,
            disk_mb: 10240,
            health_check_interval_seconds: 60,
            bootstrap_grace_time_seconds: 120,
            port_mappings: HashMap::new(),
        }
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config();
        assert_eq!(port_for(&config, JMX_PORT).unwrap(), 7199);
        assert_eq!(port_for(&config, NATIVE_TRANSPORT_PORT).unwrap(), 9042);
    }

    #[test]
    fn override_wins_over_default() {
        let mut config = config();
        config.port_mappings.insert(JMX_PORT.to_string(), 17199);
        assert_eq!(port_for(&config, JMX_PORT).unwrap(), 17199);
    }

    #[test]
    fn unknown_port_name_fails() {
        let config = config();
        assert!(matches!(
            port_for(&config, "not_a_port"),
            Err(SchedulerError::UnknownPort(_))
        ));
    }

    #[test]
    fn all_ports_applies_overrides() {
        let mut config = config();
        config.port_mappings.insert(RPC_PORT.to_string(), 19160);
        let ports = all_ports(&config);
        assert_eq!(ports.len(), 5);
        assert_eq!(ports[RPC_PORT], 19160);
        assert_eq!(ports[STORAGE_PORT], 7000);
    }
}
