//! Filtered address records.

use crate::error::ProbeError;
use std::net::IpAddr;

/// One filtered address of an interface.
///
/// Records are recomputed on every filter call and never cached.
#[derive(Debug)]
pub struct AddressRecord {
    /// Index of the interface the address is bound to
    pub interface_index: u32,
    /// Address as assigned locally
    pub local_ip: IpAddr,
    /// Externally visible address, `None` while unresolved
    pub remote_ip: Option<IpAddr>,
    /// Probe failure for this address alone
    pub error: Option<ProbeError>,
}

impl AddressRecord {
    /// Unresolved record for a local address
    #[must_use]
    pub fn new(interface_index: u32, local_ip: IpAddr) -> Self {
        Self {
            interface_index,
            local_ip,
            remote_ip: None,
            error: None,
        }
    }

    /// Set the externally visible address
    #[must_use]
    pub fn with_remote(mut self, remote: IpAddr) -> Self {
        self.remote_ip = Some(remote);
        self
    }

    /// Attach a probe failure
    #[must_use]
    pub fn with_error(mut self, error: ProbeError) -> Self {
        self.error = Some(error);
        self
    }

    /// Whether the address is translated; `None` when the remote side is unknown
    #[must_use]
    pub fn has_nat(&self) -> Option<bool> {
        self.remote_ip.map(|remote| remote != self.local_ip)
    }

    /// Local address followed by its NAT mapping or probe failure
    #[must_use]
    pub fn ip_nat_str(&self) -> String {
        match (&self.error, self.remote_ip) {
            (Some(err), _) => format!("{} (probe failed: {err})", self.local_ip),
            (None, Some(remote)) if remote != self.local_ip => {
                format!("{} (NAT: {remote})", self.local_ip)
            }
            _ => self.local_ip.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nat_flag() {
        let local: IpAddr = "192.168.1.20".parse().unwrap();
        let record = AddressRecord::new(2, local);
        assert_eq!(record.has_nat(), None);
        assert_eq!(record.ip_nat_str(), "192.168.1.20");

        let record = record.with_remote("203.0.113.5".parse().unwrap());
        assert_eq!(record.has_nat(), Some(true));
        assert_eq!(record.ip_nat_str(), "192.168.1.20 (NAT: 203.0.113.5)");

        let public: IpAddr = "203.0.113.5".parse().unwrap();
        let record = AddressRecord::new(2, public).with_remote(public);
        assert_eq!(record.has_nat(), Some(false));
        assert_eq!(record.ip_nat_str(), "203.0.113.5");
    }

    #[test]
    fn test_probe_error_rendering() {
        let record = AddressRecord::new(3, "10.0.0.4".parse().unwrap())
            .with_error(ProbeError::Timeout(2000));
        assert_eq!(
            record.ip_nat_str(),
            "10.0.0.4 (probe failed: no STUN server answered within 2000 ms)"
        );
    }
}
