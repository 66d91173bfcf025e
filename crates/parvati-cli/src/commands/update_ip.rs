//! `update-ip`: push your current public addresses to Parvati

use super::{configure_ifaces, games_ip_flags, resolve_addrs, select_games};
use crate::config::Config;
use crate::delta::{process_delta, update_ips};
use crate::progress::format_duration;
use clap::Args;
use parvati_api::Backend;
use parvati_iface::WantMask;
use std::time::Duration;
use tokio::time::{Instant, interval_at};
use tracing::error;

/// Time between repeated updates
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(15);

const FORCE_HINT: &str = "You can still force set v4/v6 with -4 and/or -6.";

/// Update Parvati's stored IP for you
#[derive(Debug, Args)]
pub struct UpdateIpArgs {
    /// Update v4 IP (ignores enabled games)
    #[arg(short = '4')]
    pub v4: bool,

    /// Update v6 IP (ignores enabled games)
    #[arg(short = '6')]
    pub v6: bool,

    /// Just show what would be done, do not actually update
    #[arg(short = 'n', long = "no-update")]
    pub check: bool,

    /// Use this interface name/number for public v4 IP
    #[arg(long, value_name = "NAME|ID")]
    pub iface4: Option<String>,

    /// Use this interface name/number for public v6 IP
    #[arg(long, value_name = "NAME|ID")]
    pub iface6: Option<String>,

    /// Keep updating every 15 seconds
    #[arg(short, long)]
    pub repeat: bool,
}

/// Families to update: forced by flags, otherwise from enabled games
async fn wanted_families(
    args: &UpdateIpArgs,
    config: &Config,
    backend: &dyn Backend,
) -> anyhow::Result<WantMask> {
    let mut forced = WantMask::NONE;
    if args.v4 {
        forced |= WantMask::PUBLIC_V4;
    }
    if args.v6 {
        forced |= WantMask::PUBLIC_V6;
    }
    if !forced.is_empty() {
        return Ok(forced);
    }
    let games = select_games(backend, config, &[], &[], FORCE_HINT).await?;
    games_ip_flags(&games, FORCE_HINT)
}

pub async fn run(args: UpdateIpArgs, config: &Config, backend: &dyn Backend) -> anyhow::Result<()> {
    let want = wanted_families(&args, config, backend).await?;
    let ifaces = configure_ifaces(config, args.iface4.clone(), args.iface6.clone())?;
    let apply = !args.check;
    let mut stdout = std::io::stdout();

    let found = resolve_addrs(&config.probe, want, &ifaces).await?;
    let delta = update_ips(backend, found, apply).await?;
    if !args.repeat {
        return process_delta(&delta, args.check, true, &mut stdout);
    }

    println!(
        "Running update continually at {} intervals. Hit CTRL+C to stop.",
        format_duration(UPDATE_INTERVAL)
    );
    if let Err(e) = process_delta(&delta, args.check, true, &mut stdout) {
        error!("{e:#}");
    }

    let mut ticker = interval_at(Instant::now() + UPDATE_INTERVAL, UPDATE_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cycle = async {
                    let found = resolve_addrs(&config.probe, want, &ifaces).await?;
                    let delta = update_ips(backend, found, apply).await?;
                    process_delta(&delta, args.check, true, &mut stdout)
                };
                if let Err(e) = cycle.await {
                    error!("{e:#}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping on signal: interrupt");
                return Ok(());
            }
        }
    }
}
