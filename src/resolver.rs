//! Hostname resolution and loopback JMX port allocation used by node
//! registration (§4.5). Behind a trait so tests can supply deterministic
//! results instead of touching DNS or real sockets.

use std::net::{IpAddr, Ipv4Addr, TcpListener, ToSocketAddrs};

use crate::error::{Result, SchedulerError};

pub trait HostResolver: Send + Sync {
    /// Resolves a hostname to an IP exactly once, at registration time.
    fn resolve(&self, hostname: &str) -> Result<IpAddr>;

    /// Whether `hostname` should be treated as loopback for JMX port
    /// allocation purposes.
    fn is_loopback(&self, hostname: &str, ip: IpAddr) -> bool {
        let _ = hostname;
        ip.is_loopback()
    }

    /// Opens and immediately closes a listening socket on port 0 to
    /// discover a free OS-assigned port. There is a TOCTOU race between
    /// this call returning and the executor actually binding the port;
    /// spec §9 accepts this as a known limitation.
    fn allocate_loopback_port(&self) -> Result<u16> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .map_err(|e| SchedulerError::Other(e.into()))?;
        let port = listener
            .local_addr()
            .map_err(|e| SchedulerError::Other(e.into()))?
            .port();
        // Socket is released here, before registration returns (spec §5).
        drop(listener);
        Ok(port)
    }
}

/// Production resolver: standard library DNS resolution via
/// `ToSocketAddrs`, real OS socket for loopback port discovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHostResolver;

impl HostResolver for SystemHostResolver {
    fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        (hostname, 0u16)
            .to_socket_addrs()
            .map_err(|_| SchedulerError::HostUnresolvable(hostname.to_string()))?
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| SchedulerError::HostUnresolvable(hostname.to_string()))
    }
}

/// Deterministic resolver for tests: a fixed table of hostname -> IP, with
/// everything else failing as unresolvable.
#[derive(Debug, Default)]
pub struct FixedHostResolver {
    table: std::collections::HashMap<String, IpAddr>,
    next_loopback_port: std::sync::atomic::AtomicU16,
}

impl FixedHostResolver {
    pub fn new() -> Self {
        Self {
            table: std::collections::HashMap::new(),
            next_loopback_port: std::sync::atomic::AtomicU16::new(31000),
        }
    }

    pub fn with(mut self, hostname: &str, ip: IpAddr) -> Self {
        self.table.insert(hostname.to_string(), ip);
        self
    }
}

impl HostResolver for FixedHostResolver {
    fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        self.table
            .get(hostname)
            .copied()
            .ok_or_else(|| SchedulerError::HostUnresolvable(hostname.to_string()))
    }

    fn allocate_loopback_port(&self) -> Result<u16> {
        use std::sync::atomic::Ordering;
        Ok(self.next_loopback_port.fetch_add(1, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_resolver_fails_unknown_hosts() {
        let resolver = FixedHostResolver::new();
        assert!(matches!(
            resolver.resolve("h1"),
            Err(SchedulerError::HostUnresolvable(_))
        ));
    }

    #[test]
    fn fixed_resolver_returns_configured_ip() {
        let resolver = FixedHostResolver::new().with("h1", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(
            resolver.resolve("h1").unwrap(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
        );
    }
}
