//! `config-help`: document the configuration file

use crate::config::Config;
use clap::Args;
use std::collections::BTreeSet;
use std::io::Write;

/// Show config file help
#[derive(Debug, Args)]
pub struct ConfigHelpArgs {
    /// Just list (matching) sections
    #[arg(short, long = "ls-sections")]
    pub list_sections: bool,

    /// Print the default file path; alone, print only the path
    #[arg(short = 'p', long = "path")]
    pub file_path: bool,

    /// Section names or prefixes; all sections when empty
    pub sections: Vec<String>,
}

const SECTIONS: &[(&str, &str)] = &[
    (
        "parvati",
        "[parvati]
  uri = \"...\"          Override the backend URI (default https://parvati.phi.al).
  username = \"...\"     Your username registered with Parvati.
  password = \"...\"     Your password, registered via e.g. IRC or Discord.
  announcer = \"...\"    Name recorded as announcer of your hosts (default ApiClient).
",
    ),
    (
        "interfaces",
        "[interfaces]
  ipv4 = \"...\"         Use this interface name or number for your public IPv4.
  ipv6 = \"...\"         Use this interface name or number for your public IPv6.
",
    ),
    (
        "probe",
        "[probe]
  stun_servers = [...]  STUN servers as host:port used to find your public IP.
  timeout_ms = 2000     How long to wait for a STUN answer.
  trace_timeout_ms = 500
                        How long to wait for each traceroute hop.
  max_hops = 30         Give up tracing a NAT path after this many hops.
",
    ),
    (
        "logging",
        "[logging]
  level = \"info\"       One of trace, debug, info, warn, error. RUST_LOG overrides.
",
    ),
    (
        "game",
        "[game.NAME]
  name = \"...\"         Backend short name of the game (default NAME).
  enabled = true        Check this game (default true).
  host_messages = [...] Host messages to pick from.
  host_message_order = \"round-robin\"
                        Either 'round-robin' or 'random'.
  wait_messages = [...] Wait messages to pick from.
  wait_message_order = \"round-robin\"
  watch_port = 10800    Check for hosting on this port instead of your default.
  on_joined = [\"prog\", \"arg\", ...]
                        Run this program when your host is first joined.
                        ${NICK} in arguments becomes the opponent's nick.
",
    ),
];

fn known() -> impl Iterator<Item = &'static str> {
    SECTIONS.iter().map(|(name, _)| *name)
}

/// Sections selected by `args`: exact names, prefixes, or `all`
fn select_sections(args: &[String]) -> anyhow::Result<BTreeSet<&'static str>> {
    if args.is_empty() {
        return Ok(known().collect());
    }
    let mut out = BTreeSet::new();
    for arg in args {
        let arg = arg.to_lowercase();
        if arg == "all" {
            return Ok(known().collect());
        }
        let matched: Vec<&str> = known().filter(|s| s.starts_with(&arg)).collect();
        if matched.is_empty() {
            anyhow::bail!(
                "Unknown section name or prefix: '{arg}'\nKnown sections are: {}",
                known().collect::<Vec<_>>().join(", ")
            );
        }
        out.extend(matched);
    }
    Ok(out)
}

pub fn run(args: ConfigHelpArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let path = Config::default_path();
    let everything = args.sections.is_empty();
    let selected = select_sections(&args.sections)?;
    let mut show_path = args.file_path;

    if everything && args.file_path {
        writeln!(out, "{}", path.display())?;
        return Ok(());
    }
    if everything && !args.list_sections {
        writeln!(out, "The configuration file is TOML.")?;
        writeln!(out, "It can contain the following settings:\n")?;
        show_path = true;
    }

    for (name, doc) in SECTIONS.iter().filter(|(n, _)| selected.contains(n)) {
        if args.list_sections {
            writeln!(out, "{name}")?;
        } else {
            writeln!(out, "{doc}")?;
        }
    }
    if show_path {
        writeln!(out, "The default configuration file path is:\n{}", path.display())?;
    }
    Ok(())
}
