//! §4.4 Resource Matcher: never errors, only reports shortfalls.

use std::collections::HashMap;

use crate::model::OfferResources;

/// Returns one shortfall message per failing constraint, in order:
/// cpus, mem, disk, then one line per missing named port. An empty list
/// means the offer satisfies the requirement.
///
/// Intentionally conservative: the offer's resource must be *strictly
/// greater than* the requirement, not merely sufficient (spec §4.4, §9.c).
pub fn has_resources(
    offer: &OfferResources,
    cpu: f64,
    mem_mb: f64,
    disk_mb: f64,
    port_map: &HashMap<String, u16>,
) -> Vec<String> {
    let mut shortfalls = Vec::new();

    if !(offer.cpus > cpu) {
        shortfalls.push(format!(
            "insufficient cpus: offer has {}, need > {}",
            offer.cpus, cpu
        ));
    }
    if !(offer.mem > mem_mb) {
        shortfalls.push(format!(
            "insufficient mem: offer has {} MB, need > {} MB",
            offer.mem, mem_mb
        ));
    }
    if !(offer.disk > disk_mb) {
        shortfalls.push(format!(
            "insufficient disk: offer has {} MB, need > {} MB",
            offer.disk, disk_mb
        ));
    }

    let mut missing_ports: Vec<_> = port_map
        .iter()
        .filter(|(_, port)| !offer.has_port(**port))
        .collect();
    missing_ports.sort_by_key(|(name, _)| name.clone());
    for (name, port) in missing_ports {
        shortfalls.push(format!("missing port {name} ({port}) in offer"));
    }

    shortfalls
}
