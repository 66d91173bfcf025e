//! IP update delta

use parvati_api::{Backend, Delta, User, UserDelta};
use parvati_iface::{IfaceError, InterfaceList, WantMask};
use std::io::Write;
use std::net::IpAddr;
use tracing::debug;

/// Public addresses found per family; `None` when the family was not requested
#[derive(Debug, Default)]
pub struct PublicAddrs {
    /// IPv4 lookup
    pub v4: Option<Result<IpAddr, IfaceError>>,
    /// IPv6 lookup
    pub v6: Option<Result<IpAddr, IfaceError>>,
}

impl PublicAddrs {
    /// Look up one public address per family requested in `want`, on the
    /// preferred interface of each family (0 for any).
    ///
    /// Blocks while probing.
    #[must_use]
    pub fn resolve(list: &InterfaceList, want: WantMask, v4_id: u32, v6_id: u32) -> Self {
        let lookup = |id, family: WantMask| {
            let filter = family | WantMask::LIVE_IP;
            list.get_public_ip(id, filter)
                .map(|record| record.remote_ip.unwrap_or(record.local_ip))
        };
        Self {
            v4: want
                .intersects(WantMask::PUBLIC_V4)
                .then(|| lookup(v4_id, WantMask::ANY_V4)),
            v6: want
                .intersects(WantMask::PUBLIC_V6)
                .then(|| lookup(v6_id, WantMask::ANY_V6)),
        }
    }
}

/// `found` if it differs from the stored address. Lookup errors go to `error`
/// unless one is already there.
fn changed(
    stored: &str,
    found: Option<Result<IpAddr, IfaceError>>,
    error: &mut Option<IfaceError>,
) -> Option<IpAddr> {
    match found? {
        Ok(ip) => match stored.parse::<IpAddr>() {
            Ok(current) if current == ip => None,
            _ => Some(ip),
        },
        Err(e) => {
            error.get_or_insert(e);
            None
        }
    }
}

/// Compare `found` with the stored addresses and push any change.
///
/// Without changes the result carries no delta, unless a lookup failed, in
/// which case the first failure is returned. With `apply` unset the delta is
/// built locally and nothing is sent.
pub async fn update_ips(
    backend: &dyn Backend,
    found: PublicAddrs,
    apply: bool,
) -> anyhow::Result<UserDelta> {
    let user = backend.details().await?;
    let mut error = None;
    let v4 = changed(&user.ipv4, found.v4, &mut error);
    let v6 = changed(&user.ipv6, found.v6, &mut error);

    if v4.is_none() && v6.is_none() {
        if let Some(e) = error {
            return Err(e.into());
        }
        return Ok(UserDelta {
            player: user,
            delta: None,
        });
    }

    if !apply {
        return Ok(manual_delta(user, v4, v6));
    }
    debug!(?v4, ?v6, "sending address update");
    Ok(backend.update_ips(v4, v6).await?)
}

fn manual_delta(user: User, v4: Option<IpAddr>, v6: Option<IpAddr>) -> UserDelta {
    let mut delta = Delta::default();
    if let Some(v4) = v4 {
        delta.ipv4 = vec![user.ipv4.clone(), v4.to_string()];
    }
    if let Some(v6) = v6 {
        delta.ipv6 = vec![user.ipv6.clone(), v6.to_string()];
    }
    UserDelta {
        player: user,
        delta: Some(delta),
    }
}

/// Report a delta. `comment_same` also reports addresses that were already
/// current.
pub fn process_delta(
    delta: &UserDelta,
    check_only: bool,
    comment_same: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let Some(changes) = &delta.delta else {
        let player = &delta.player;
        let stored = [("IPv4", &player.ipv4), ("IPv6", &player.ipv6)];
        let mut found = false;
        for (family, ip) in stored.into_iter().filter(|(_, ip)| !ip.is_empty()) {
            found = true;
            if comment_same {
                writeln!(out, "{family} already set to '{ip}', no need to update")?;
            }
        }
        if !found {
            anyhow::bail!("Unable to find any public IPs for you");
        }
        return Ok(());
    };

    let what = if check_only { "Would update" } else { "Updated" };
    let mut updated = 0;
    for (family, pair) in [("IPv4", &changes.ipv4), ("IPv6", &changes.ipv6)] {
        if let [from, to, ..] = pair.as_slice() {
            writeln!(out, "{what} {family} from {from} to {to}")?;
            updated += 1;
        }
    }
    if updated == 0 {
        anyhow::bail!("No update details returned.");
    }
    Ok(())
}
