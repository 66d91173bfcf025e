//! Per-interface address filtering.

use crate::classify::AddressClass;
use crate::error::IfaceError;
use crate::interface::Interface;
use crate::mask::WantMask;
use crate::probe::PublicIpProbe;
use crate::record::AddressRecord;
use tracing::debug;

/// Filter the addresses of `iface` against `mask`.
///
/// Every address whose class bit is in `mask` yields one record, in interface
/// order. With [`WantMask::LIVE_IP`] a public address is its own remote
/// address and a private one is probed; a failed probe is stored in the
/// record rather than dropping it. Without it the remote side stays unknown.
///
/// # Errors
///
/// Returns [`IfaceError::EmptyMask`] when `mask` carries no address family.
pub fn filter_interface_ips(
    iface: &Interface,
    mask: WantMask,
    probe: &dyn PublicIpProbe,
) -> Result<Vec<AddressRecord>, IfaceError> {
    if !mask.has_family() {
        return Err(IfaceError::EmptyMask);
    }

    let records = iface
        .addrs
        .iter()
        .filter_map(|&ip| {
            let class = AddressClass::classify(ip)?;
            if !mask.contains(class.mask()) {
                return None;
            }
            let record = AddressRecord::new(iface.index, ip);
            if !mask.wants_live() {
                return Some(record);
            }
            if class.is_public() {
                return Some(record.with_remote(ip));
            }
            Some(match probe.probe(ip) {
                Ok(remote) => record.with_remote(remote),
                Err(e) => {
                    debug!(iface = %iface.name, local = %ip, error = %e, "live probe failed");
                    record.with_error(e)
                }
            })
        })
        .collect();

    Ok(records)
}
