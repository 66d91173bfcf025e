//! Subcommand implementations

pub mod config_help;
pub mod details;
pub mod host_watch;
pub mod interface_list;
pub mod list_games;
pub mod update_ip;

use crate::config::{Config, ProbeConfig};
use crate::delta::PublicAddrs;
use crate::games::{GameConfig, enabled_games, filter_games, ip_flags_from_games};
use parvati_api::Backend;
use parvati_iface::{IfaceError, InterfaceConfig, InterfaceList, StunProbe, WantMask};
use std::sync::Arc;

/// Interface list probing with the configured STUN servers and trace limits.
///
/// Blocks while enumerating.
pub fn interface_list(probe: &ProbeConfig, want: WantMask) -> Result<InterfaceList, IfaceError> {
    let stun = StunProbe::new(probe.stun_servers.clone(), probe.timeout());
    Ok(InterfaceList::new(want)?
        .with_probe(Arc::new(stun))
        .with_trace_settings(probe.trace_timeout(), probe.max_hops))
}

/// Find the public address of each family in `want` off the async runtime
pub async fn resolve_addrs(
    probe: &ProbeConfig,
    want: WantMask,
    ifaces: &InterfaceConfig,
) -> anyhow::Result<PublicAddrs> {
    let probe = probe.clone();
    let (v4_id, v6_id) = (ifaces.v4_id, ifaces.v6_id);
    let found = tokio::task::spawn_blocking(move || -> Result<PublicAddrs, IfaceError> {
        let list = interface_list(&probe, want | WantMask::LIVE_IP)?;
        Ok(PublicAddrs::resolve(&list, want, v4_id, v6_id))
    })
    .await??;
    Ok(found)
}

/// Interface preferences from the config file with command-line overrides
pub fn configure_ifaces(
    config: &Config,
    iface4: Option<String>,
    iface6: Option<String>,
) -> anyhow::Result<InterfaceConfig> {
    let mut ifaces = config.interfaces.clone();
    if let Some(v4) = iface4.filter(|s| !s.is_empty()) {
        ifaces.v4_iface = v4;
    }
    if let Some(v6) = iface6.filter(|s| !s.is_empty()) {
        ifaces.v6_iface = v6;
    }
    ifaces.configure(None)?;
    Ok(ifaces)
}

/// Backend games enabled by the config file and `-E`/`-D` overrides
pub async fn select_games(
    backend: &dyn Backend,
    config: &Config,
    enable: &[String],
    disable: &[String],
    hint: &str,
) -> anyhow::Result<Vec<GameConfig>> {
    let known = backend.games().await?;
    if known.is_empty() {
        anyhow::bail!("Parvati's backend is not configured; no known games were found.\n{hint}");
    }
    let configured = enabled_games(&config.game, enable, disable);
    if configured.is_empty() {
        anyhow::bail!("Your configuration file and/or options do not enable any games.\n{hint}");
    }
    let games = filter_games(&known, &configured, true)?;
    if games.is_empty() {
        anyhow::bail!("You have filtered out all known games.\n{hint}");
    }
    Ok(games)
}

/// Public families the selected games need
pub fn games_ip_flags(games: &[GameConfig], hint: &str) -> anyhow::Result<WantMask> {
    let flags = ip_flags_from_games(games);
    if flags.is_empty() {
        anyhow::bail!("Your filtered games have no IP information.\n{hint}");
    }
    Ok(flags)
}
