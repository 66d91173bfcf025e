//! `interface-list`: show interfaces and their NAT paths

use super::{interface_list, select_games};
use crate::config::{Config, ProbeConfig};
use crate::games::ip_flags_from_games;
use crate::progress::ProbeSpinner;
use clap::Args;
use parvati_api::Backend;
use parvati_iface::WantMask;
use std::io::Write;

/// Show your active interface list
#[derive(Debug, Args)]
pub struct InterfaceListArgs {
    /// Include v4 IPs. Implies --ignore-config
    #[arg(short = '4')]
    pub v4: bool,

    /// Include v6 IPs. Implies --ignore-config
    #[arg(short = '6')]
    pub v6: bool,

    /// Ignore enabled games when choosing IP families
    #[arg(short, long)]
    pub ignore_config: bool,
}

/// Address filter and heading for the requested families
fn list_filter(v4: bool, v6: bool, filtered: bool) -> (WantMask, String) {
    let suffix = if filtered { " [auto-filtered]" } else { "" };
    let (families, label) = match (v4, v6) {
        (true, true) => (WantMask::ALL_FAMILIES, "v4 and v6"),
        (false, true) => (WantMask::ANY_V6, "v6 only"),
        _ => (WantMask::ANY_V4, "v4 only"),
    };
    (families | WantMask::LIVE_IP, format!("({label}{suffix})"))
}

pub async fn run(
    args: InterfaceListArgs,
    config: &Config,
    backend: Option<&dyn Backend>,
) -> anyhow::Result<()> {
    let InterfaceListArgs {
        mut v4,
        mut v6,
        mut ignore_config,
    } = args;
    if v4 || v6 {
        ignore_config = true;
    } else if ignore_config {
        v4 = true;
        v6 = true;
    }

    match backend {
        Some(backend) if !ignore_config => {
            let games = select_games(backend, config, &[], &[], "").await?;
            let flags = ip_flags_from_games(&games);
            show_default_list(
                &config.probe,
                flags.intersects(WantMask::PUBLIC_V4),
                flags.intersects(WantMask::PUBLIC_V6),
                true,
            )
            .await
        }
        _ => show_default_list(&config.probe, v4, v6, false).await,
    }
}

async fn show_default_list(
    probe: &ProbeConfig,
    v4: bool,
    v6: bool,
    filtered: bool,
) -> anyhow::Result<()> {
    let (want, label) = list_filter(v4, v6, filtered);
    let probe = probe.clone();

    let spinner = ProbeSpinner::start("Probing interfaces");
    let rendered = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
        let list = interface_list(&probe, want)?;
        let mut buf = Vec::new();
        list.show(&mut buf)?;
        Ok(buf)
    })
    .await;
    spinner.finish();

    let rendered = rendered??;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Default Interface list {label}:")?;
    stdout.write_all(&rendered)?;
    Ok(())
}
