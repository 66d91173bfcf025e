//! Interface enumeration.

use crate::error::IfaceError;
use std::fmt;
use std::net::IpAddr;
use tracing::debug;

/// Snapshot of one local network interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// OS interface index (stable, > 0)
    pub index: u32,
    /// Display name, e.g. `eth0`
    pub name: String,
    /// Formatted hardware address; empty when the interface has none
    pub hardware_addr: String,
    /// Assigned addresses in OS order
    pub addrs: Vec<IpAddr>,
}

impl Interface {
    /// Create an interface record
    pub fn new(index: u32, name: impl Into<String>, addrs: Vec<IpAddr>) -> Self {
        Self {
            index,
            name: name.into(),
            hardware_addr: String::new(),
            addrs,
        }
    }

    /// Set the hardware address
    #[must_use]
    pub fn with_hardware_addr(mut self, mac: impl Into<String>) -> Self {
        self.hardware_addr = mac.into();
        self
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. ({})", self.index, self.name)
    }
}

/// Source of interface snapshots
pub trait InterfaceSource {
    /// List all interfaces visible right now
    ///
    /// # Errors
    ///
    /// Returns [`IfaceError::Enumeration`] if the platform cannot report interfaces.
    fn interfaces(&self) -> Result<Vec<Interface>, IfaceError>;
}

/// Interfaces reported by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

const ZERO_MAC: &str = "00:00:00:00:00:00";

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<Interface>, IfaceError> {
        let raw = netdev::get_interfaces();
        // Every host has at least a loopback interface; an empty table means the query failed.
        if raw.is_empty() {
            return Err(IfaceError::Enumeration(
                "the operating system reported no network interfaces".to_string(),
            ));
        }

        let interfaces: Vec<Interface> = raw
            .into_iter()
            .map(|iface| {
                let hardware_addr = iface
                    .mac_addr
                    .map(|mac| mac.to_string())
                    .filter(|mac| mac != ZERO_MAC)
                    .unwrap_or_default();
                let addrs = iface
                    .ipv4
                    .iter()
                    .map(|net| IpAddr::V4(net.addr()))
                    .chain(iface.ipv6.iter().map(|net| IpAddr::V6(net.addr())))
                    .collect();
                Interface {
                    index: iface.index,
                    name: iface.name,
                    hardware_addr,
                    addrs,
                }
            })
            .collect();

        debug!(count = interfaces.len(), "enumerated network interfaces");
        Ok(interfaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_display() {
        let iface = Interface::new(2, "eth0", vec!["203.0.113.5".parse().unwrap()]);
        assert_eq!(iface.to_string(), "2. (eth0)");
        assert!(iface.hardware_addr.is_empty());

        let iface = iface.with_hardware_addr("52:54:00:12:34:56");
        assert_eq!(iface.hardware_addr, "52:54:00:12:34:56");
    }
}
