//! Interface snapshot and public-IP selection.

use crate::error::{IfaceError, Scope};
use crate::filter::filter_interface_ips;
use crate::interface::{Interface, InterfaceSource, SystemInterfaces};
use crate::mask::{WantMask, filter_to_string};
use crate::probe::{PublicIpProbe, StunProbe};
use crate::record::AddressRecord;
use crate::trace::{DEFAULT_HOP_TIMEOUT, DEFAULT_MAX_HOPS, HopSource, UdpHopSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One enumeration of the host's interfaces plus a default want-mask.
///
/// Re-create the list to observe interface changes.
pub struct InterfaceList {
    interfaces: Vec<Interface>,
    filter: WantMask,
    pub(crate) probe: Arc<dyn PublicIpProbe>,
    pub(crate) hops: Arc<dyn HopSource>,
    pub(crate) hop_timeout: Duration,
    pub(crate) max_hops: u8,
}

impl std::fmt::Debug for InterfaceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceList")
            .field("interfaces", &self.interfaces)
            .field("filter", &self.filter)
            .field("hop_timeout", &self.hop_timeout)
            .field("max_hops", &self.max_hops)
            .finish_non_exhaustive()
    }
}

impl InterfaceList {
    /// Enumerate the system's interfaces, keeping `want` as default filter
    ///
    /// # Errors
    ///
    /// Returns [`IfaceError::Enumeration`] if the OS cannot list interfaces.
    pub fn new(want: WantMask) -> Result<Self, IfaceError> {
        Self::from_source(&SystemInterfaces, want)
    }

    /// Enumerate interfaces through `source`
    ///
    /// # Errors
    ///
    /// Propagates the source's enumeration error.
    pub fn from_source(source: &dyn InterfaceSource, want: WantMask) -> Result<Self, IfaceError> {
        Ok(Self::from_interfaces(source.interfaces()?, want))
    }

    /// Wrap an existing snapshot
    #[must_use]
    pub fn from_interfaces(interfaces: Vec<Interface>, want: WantMask) -> Self {
        Self {
            interfaces,
            filter: want,
            probe: Arc::new(StunProbe::default()),
            hops: Arc::new(UdpHopSource),
            hop_timeout: DEFAULT_HOP_TIMEOUT,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Use another live probe
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn PublicIpProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Use another hop source for path tracing
    #[must_use]
    pub fn with_hop_source(mut self, hops: Arc<dyn HopSource>) -> Self {
        self.hops = hops;
        self
    }

    /// Per-hop timeout and maximum hop limit for path tracing
    #[must_use]
    pub fn with_trace_settings(mut self, hop_timeout: Duration, max_hops: u8) -> Self {
        self.hop_timeout = hop_timeout;
        self.max_hops = max_hops;
        self
    }

    /// Enumerated interfaces in OS order
    #[must_use]
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Default want-mask
    #[must_use]
    pub fn filter(&self) -> WantMask {
        self.filter
    }

    /// Index of the first interface whose name matches case-insensitively, 0 if none.
    ///
    /// Case folding is Unicode-aware, so localized adapter names match too.
    #[must_use]
    pub fn interface_number(&self, name: &str) -> u32 {
        let wanted = name.to_lowercase();
        self.interfaces
            .iter()
            .find(|iface| iface.name.to_lowercase() == wanted)
            .map_or(0, |iface| iface.index)
    }

    fn resolve(&self, filter: WantMask) -> WantMask {
        if filter.is_empty() { self.filter } else { filter }
    }

    /// Filter one interface with this list's probe
    ///
    /// # Errors
    ///
    /// Returns [`IfaceError::EmptyMask`] when `filter` carries no address family.
    pub fn filter_interface(
        &self,
        iface: &Interface,
        filter: WantMask,
    ) -> Result<Vec<AddressRecord>, IfaceError> {
        filter_interface_ips(iface, filter, self.probe.as_ref())
    }

    /// The single externally reachable address for `interface_num`, or across
    /// all interfaces when `interface_num` is 0.
    ///
    /// A zero `filter` uses the list default. [`WantMask::LIVE_IP`] is always
    /// added, and only records with a resolved remote address count.
    ///
    /// # Errors
    ///
    /// - [`IfaceError::NoPublicIp`] when nothing qualifies
    /// - [`IfaceError::AmbiguousPublicIp`] when more than one address qualifies
    /// - [`IfaceError::EmptyMask`] when the filter has no address family
    pub fn get_public_ip(
        &self,
        interface_num: u32,
        filter: WantMask,
    ) -> Result<AddressRecord, IfaceError> {
        let filter = self.resolve(filter).with(WantMask::LIVE_IP);
        let filter_name = filter_to_string(filter);

        if interface_num != 0 {
            let Some(iface) = self.interfaces.iter().find(|i| i.index == interface_num) else {
                return Err(IfaceError::NoPublicIp {
                    scope: Scope::Unknown(interface_num),
                    filter: filter_name,
                    listing: self.listing(filter, &[])?,
                });
            };
            let scope = Scope::Interface {
                index: iface.index,
                name: iface.name.clone(),
            };
            let records = self.filter_interface(iface, filter)?;
            let listing = format!(" - {}", summary_line(iface, filter, &records, true));
            let mut found = qualifying(records);
            return match found.len() {
                0 => Err(IfaceError::NoPublicIp {
                    scope,
                    filter: filter_name,
                    listing,
                }),
                1 => Ok(found.remove(0)),
                _ => Err(IfaceError::AmbiguousPublicIp {
                    scope,
                    filter: filter_name,
                    candidates: found.iter().filter_map(|r| r.remote_ip).collect(),
                    listing,
                }),
            };
        }

        let mut per_interface = Vec::with_capacity(self.interfaces.len());
        let mut total = 0;
        for iface in &self.interfaces {
            let records = self.filter_interface(iface, filter)?;
            total += records.iter().filter(|r| r.remote_ip.is_some()).count();
            per_interface.push(records);
        }
        debug!(filter = %filter_name, total, "public IP candidates across interfaces");

        match total {
            0 => Err(IfaceError::NoPublicIp {
                scope: Scope::All,
                filter: filter_name,
                listing: self.listing(filter, &per_interface)?,
            }),
            1 => per_interface
                .into_iter()
                .flat_map(qualifying)
                .next()
                .ok_or(IfaceError::NoPublicIp {
                    scope: Scope::All,
                    filter: filter_name,
                    listing: String::new(),
                }),
            _ => Err(IfaceError::AmbiguousPublicIp {
                scope: Scope::All,
                candidates: per_interface
                    .iter()
                    .flatten()
                    .filter_map(|r| r.remote_ip)
                    .collect(),
                listing: self.listing(filter, &per_interface)?,
                filter: filter_name,
            }),
        }
    }

    /// Every record matching `filter` (or the list default) across all interfaces
    ///
    /// # Errors
    ///
    /// Returns [`IfaceError::EmptyMask`] when the filter has no address family.
    pub fn get_filtered_list(&self, filter: WantMask) -> Result<Vec<AddressRecord>, IfaceError> {
        let filter = self.resolve(filter);
        let mut out = Vec::new();
        for iface in &self.interfaces {
            out.extend(self.filter_interface(iface, filter)?);
        }
        Ok(out)
    }

    /// Terse per-interface summary used in diagnostics.
    ///
    /// `computed` holds records already filtered per interface in list order;
    /// interfaces without computed records are filtered again.
    fn listing(
        &self,
        filter: WantMask,
        computed: &[Vec<AddressRecord>],
    ) -> Result<String, IfaceError> {
        let mut out = String::new();
        for (pos, iface) in self.interfaces.iter().enumerate() {
            let line = match computed.get(pos) {
                Some(records) => summary_line(iface, filter, records, true),
                None => interface_to_public_ip_string(iface, filter, self.probe.as_ref(), true)?,
            };
            out.push_str(" - ");
            out.push_str(&line);
        }
        if out.is_empty() {
            out.push_str("<none available>\n");
        }
        Ok(out)
    }
}

fn qualifying(records: Vec<AddressRecord>) -> Vec<AddressRecord> {
    records.into_iter().filter(|r| r.remote_ip.is_some()).collect()
}

/// One-line summary of the live addresses of `iface`.
///
/// Terse form: `2. (eth0) 192.168.1.20 (NAT: 203.0.113.5)`; the long form
/// spells out the filter, e.g. `2. (eth0) has public v4 IP: 203.0.113.5`.
///
/// # Errors
///
/// Returns [`IfaceError::EmptyMask`] when `filter` has no address family.
pub fn interface_to_public_ip_string(
    iface: &Interface,
    filter: WantMask,
    probe: &dyn PublicIpProbe,
    terse: bool,
) -> Result<String, IfaceError> {
    let records = filter_interface_ips(iface, filter.with(WantMask::LIVE_IP), probe)?;
    Ok(summary_line(iface, filter, &records, terse))
}

fn summary_line(iface: &Interface, filter: WantMask, records: &[AddressRecord], terse: bool) -> String {
    let head = format!("{}. ({})", iface.index, iface.name);
    let name = filter_to_string(filter);
    match records {
        [] if terse => format!("{head} <none>\n"),
        [] if name == "any" => format!("{head} no IPs.\n"),
        [] => format!("{head} no {name} IPs.\n"),
        [one] if terse => format!("{head} {}\n", one.ip_nat_str()),
        [one] if name == "any" => format!("{head} has IP: {}\n", one.ip_nat_str()),
        [one] => format!("{head} has {name} IP: {}\n", one.ip_nat_str()),
        many => {
            let ips = many
                .iter()
                .map(|r| format!("'{}'", r.ip_nat_str()))
                .collect::<Vec<_>>()
                .join(", ");
            if terse {
                format!("{head} {ips}\n")
            } else if name == "any" {
                format!("{head} contains multiple IPs: {ips}.\n")
            } else {
                format!("{head} contains multiple {name} IPs: {ips}.\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use std::net::IpAddr;

    struct NoProbe;

    impl PublicIpProbe for NoProbe {
        fn probe(&self, _local: IpAddr) -> Result<IpAddr, ProbeError> {
            Err(ProbeError::Timeout(1))
        }
    }

    fn list() -> InterfaceList {
        InterfaceList::from_interfaces(
            vec![
                Interface::new(1, "lo", vec!["127.0.0.1".parse().unwrap()]),
                Interface::new(2, "eth0", vec!["203.0.113.5".parse().unwrap()]),
                Interface::new(5, "WLAN0", vec!["192.168.1.20".parse().unwrap()]),
                Interface::new(7, "wlan0", vec![]),
            ],
            WantMask::PUBLIC_V4,
        )
        .with_probe(Arc::new(NoProbe))
    }

    #[test]
    fn test_interface_number_case_insensitive_first_match() {
        let list = list();
        assert_eq!(list.interface_number("ETH0"), 2);
        assert_eq!(list.interface_number("wlan0"), 5);
        assert_eq!(list.interface_number("ppp0"), 0);
    }

    #[test]
    fn test_zero_filter_uses_default() {
        let list = list();
        let records = list.get_filtered_list(WantMask::NONE).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].interface_index, 2);
    }

    #[test]
    fn test_unknown_interface_number() {
        let err = list().get_public_ip(9, WantMask::PUBLIC_V4).unwrap_err();
        match err {
            IfaceError::NoPublicIp { scope, listing, .. } => {
                assert_eq!(scope, Scope::Unknown(9));
                assert!(listing.contains("2. (eth0) 203.0.113.5"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failed_probe_does_not_qualify() {
        let err = list().get_public_ip(5, WantMask::PRIVATE_V4).unwrap_err();
        assert!(matches!(err, IfaceError::NoPublicIp { .. }));
    }

    #[test]
    fn test_interface_lookup_reports_probe_failure() {
        let err = list().get_public_ip(5, WantMask::ANY_V4).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("No suitable v4 IPs were found in interface 5. (WLAN0)"));
        assert!(text.contains("Known interfaces were:\n - 5. (WLAN0) 192.168.1.20 (probe failed: "));
    }

    #[test]
    fn test_interface_number_folds_non_ascii_case() {
        let list = InterfaceList::from_interfaces(
            vec![Interface::new(4, "Ethernet-Ü", vec![])],
            WantMask::NONE,
        );
        assert_eq!(list.interface_number("ethernet-ü"), 4);
        assert_eq!(list.interface_number("ETHERNET-Ü"), 4);
    }

    #[test]
    fn test_summary_forms() {
        let list = list();
        let eth0 = &list.interfaces()[1];
        let terse = interface_to_public_ip_string(eth0, WantMask::PUBLIC_V4, &NoProbe, true).unwrap();
        assert_eq!(terse, "2. (eth0) 203.0.113.5\n");
        let long = interface_to_public_ip_string(eth0, WantMask::PUBLIC_V4, &NoProbe, false).unwrap();
        assert_eq!(long, "2. (eth0) has public v4 IP: 203.0.113.5\n");
        let none = interface_to_public_ip_string(eth0, WantMask::PUBLIC_V6, &NoProbe, false).unwrap();
        assert_eq!(none, "2. (eth0) no public v6 IPs.\n");
    }
}
