//! Parvati CLI
//!
//! Public IP discovery, NAT inspection and hosting announcements for the
//! Parvati matchmaking service.

mod commands;
mod config;
mod delta;
mod executor;
mod games;
mod progress;
#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use console::style;
use parvati_api::{Backend, HttpBackend};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::config_help::ConfigHelpArgs;
use commands::details::DetailsArgs;
use commands::host_watch::HostWatchArgs;
use commands::interface_list::InterfaceListArgs;
use commands::list_games::ListGamesArgs;
use commands::update_ip::UpdateIpArgs;
use config::Config;

/// Parvati matchmaking client
#[derive(Parser)]
#[command(name = "parvati")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path [default: ~/.parvati.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Parvati username, overriding the config file
    #[arg(long, global = true, value_name = "NICK")]
    username: Option<String>,

    /// Parvati API URI, overriding the config file
    #[arg(long, global = true, value_name = "URL")]
    uri: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show your active interfaces and NAT setup
    #[command(visible_aliases = ["ls-ifaces", "ls-interfaces"])]
    InterfaceList(InterfaceListArgs),

    /// Update Parvati's stored IP for you
    #[command(visible_alias = "set-ip")]
    UpdateIp(UpdateIpArgs),

    /// Watch for you hosting and announce it
    #[command(visible_alias = "watch")]
    HostWatch(HostWatchArgs),

    /// Show Parvati's information on yourself or someone else
    #[command(visible_alias = "user-info")]
    Details(DetailsArgs),

    /// Show all games Parvati knows about
    #[command(visible_alias = "ls-games")]
    ListKnownGames(ListGamesArgs),

    /// Show configuration file help
    #[command(visible_alias = "help-config")]
    ConfigHelp(ConfigHelpArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", style("error:").red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Help never needs a readable config file
    let command = match cli.command {
        Commands::ConfigHelp(args) => {
            init_logging(cli.verbose, "info");
            return commands::config_help::run(args, &mut std::io::stdout());
        }
        command => command,
    };

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(uri) = cli.uri {
        config.parvati.uri = uri;
    }
    if let Some(username) = cli.username {
        config.parvati.username = username;
    }

    init_logging(cli.verbose, &config.logging.level);
    config.validate()?;

    let mut stdout = std::io::stdout();
    match command {
        Commands::InterfaceList(args) => {
            let backend = connect(&config).ok();
            let backend = backend.as_ref().map(|b| b as &dyn Backend);
            commands::interface_list::run(args, &config, backend).await
        }
        Commands::UpdateIp(args) => {
            let backend = connect(&config)?;
            commands::update_ip::run(args, &config, &backend).await
        }
        Commands::HostWatch(args) => {
            let backend = connect(&config)?;
            commands::host_watch::run(args, &config, &backend).await
        }
        Commands::Details(args) => {
            let backend = connect(&config)?;
            commands::details::run(args, &backend, &mut stdout).await
        }
        Commands::ListKnownGames(args) => {
            let backend = connect(&config)?;
            commands::list_games::run(args, &backend, &mut stdout).await
        }
        Commands::ConfigHelp(_) => Ok(()),
    }
}

/// `-v` selects debug, otherwise the configured level; `RUST_LOG` wins over both
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Backend client; fails without credentials
fn connect(config: &Config) -> anyhow::Result<HttpBackend> {
    if config.parvati.password.is_empty() {
        anyhow::bail!(
            "No Parvati password configured.\n\
             Set password in the [parvati] section of {} or pass --config",
            Config::default_path().display()
        );
    }
    let backend = HttpBackend::new(config.parvati.clone(), env!("CARGO_PKG_VERSION"))?;
    tracing::debug!("{}", backend.info());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_aliases_and_flags() {
        let cli = Cli::try_parse_from(["parvati", "ls-ifaces", "-4", "-6"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::InterfaceList(InterfaceListArgs { v4: true, v6: true, .. })
        ));

        let cli = Cli::try_parse_from([
            "parvati", "watch", "-E", "th123", "-D", "th155", "-m", "hi", "--no-ip-update",
        ])
        .unwrap();
        let Commands::HostWatch(args) = cli.command else {
            panic!("expected host-watch");
        };
        assert_eq!(args.enable, ["th123"]);
        assert_eq!(args.disable, ["th155"]);
        assert_eq!(args.host_message.as_deref(), Some("hi"));
        assert!(args.no_ip_update);

        let cli = Cli::try_parse_from(["parvati", "set-ip", "-n", "--iface4", "eth0", "-r"]).unwrap();
        let Commands::UpdateIp(args) = cli.command else {
            panic!("expected update-ip");
        };
        assert!(args.check && args.repeat);
        assert_eq!(args.iface4.as_deref(), Some("eth0"));

        let cli = Cli::try_parse_from(["parvati", "help-config", "-l", "game"]).unwrap();
        assert!(matches!(cli.command, Commands::ConfigHelp(_)));
    }

    #[test]
    fn test_connect_requires_password() {
        let mut config = Config::default();
        assert!(connect(&config).is_err());
        config.parvati.password = "hunter2".to_string();
        assert!(connect(&config).is_ok());
    }
}
