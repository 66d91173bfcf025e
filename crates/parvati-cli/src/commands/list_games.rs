//! `list-known-games`

use clap::Args;
use parvati_api::{Backend, Game};
use std::collections::BTreeSet;
use std::io::Write;

/// Show Parvati's game information
#[derive(Debug, Args)]
pub struct ListGamesArgs {
    /// Print known checking API endpoints
    #[arg(short, long)]
    pub apis: bool,

    /// Print additional name/url information
    #[arg(short, long)]
    pub info: bool,

    /// Print supported protocol information
    #[arg(short, long)]
    pub protocols: bool,
}

pub fn render_game(game: &Game, args: &ListGamesArgs, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "{}. {}", game.id, game.name)?;
    if args.info {
        writeln!(out, "Aka: {}", game.url_short_name)?;
        writeln!(out, "Discord name: {}", game.discord_name)?;
        writeln!(out, "Info Url: {}", game.url)?;
    }
    if game.port != 0 {
        writeln!(out, "Default Port: {}", game.port)?;
    }
    if args.protocols {
        let names: BTreeSet<&str> = game
            .protocols
            .iter()
            .filter_map(|p| p.get(..p.len().checked_sub(1)?))
            .collect();
        if names.is_empty() {
            writeln!(out, "Protocols: unknown")?;
        } else {
            let names: Vec<&str> = names.into_iter().collect();
            writeln!(out, "Protocols: {}", names.join(", "))?;
            writeln!(out, "IPv4 Support: {}", game.speaks_v4())?;
            writeln!(out, "IPv6 Support: {}", game.speaks_v6())?;
        }
    }
    if args.apis {
        if game.apis.is_empty() {
            writeln!(out, "No Parvati checking API information")?;
        } else {
            writeln!(out, "Parvati Checking URIs:")?;
            for api in &game.apis {
                writeln!(out, " - {}", api.uri)?;
            }
        }
    }
    Ok(())
}

pub async fn run(args: ListGamesArgs, backend: &dyn Backend, out: &mut dyn Write) -> anyhow::Result<()> {
    for game in backend.games().await? {
        render_game(&game, &args, out)?;
    }
    Ok(())
}
