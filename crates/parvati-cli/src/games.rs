//! Game selection and hosting messages

use parvati_api::Game;
use parvati_iface::WantMask;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};
use std::fmt;

/// How messages are picked from a list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageOrder {
    /// In order, wrapping around
    #[default]
    RoundRobin,
    /// Uniformly at random
    Random,
}

impl fmt::Display for MessageOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RoundRobin => "round-robin",
            Self::Random => "random",
        })
    }
}

/// A `[game.<NAME>]` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInfo {
    /// Backend short name; defaults to the section name
    #[serde(default)]
    pub name: String,
    /// Section name, filled in by [`enabled_games`]
    #[serde(skip)]
    pub config_name: String,
    /// Check this game
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Messages used when announcing a host
    #[serde(default)]
    pub host_messages: Vec<String>,
    /// Host message order
    #[serde(default)]
    pub host_message_order: MessageOrder,
    /// Messages used when waiting
    #[serde(default)]
    pub wait_messages: Vec<String>,
    /// Wait message order
    #[serde(default)]
    pub wait_message_order: MessageOrder,
    /// Port to check instead of the account default
    #[serde(default)]
    pub watch_port: u16,
    /// Program and arguments run when a host is first joined
    #[serde(default)]
    pub on_joined: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            config_name: String::new(),
            enabled: true,
            host_messages: Vec::new(),
            host_message_order: MessageOrder::default(),
            wait_messages: Vec::new(),
            wait_message_order: MessageOrder::default(),
            watch_port: 0,
            on_joined: Vec::new(),
        }
    }
}

impl GameInfo {
    /// Section name if known, else the game name
    #[must_use]
    pub fn pretty_name(&self) -> &str {
        if self.config_name.is_empty() {
            &self.name
        } else {
            &self.config_name
        }
    }

    fn matches(&self, wanted: &str) -> bool {
        wanted.eq_ignore_ascii_case(&self.name) || wanted.eq_ignore_ascii_case(&self.config_name)
    }
}

impl fmt::Display for GameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game: '{}'", self.name)?;
        if self.name != self.config_name {
            write!(f, "({})", self.config_name)?;
        }
        write!(
            f,
            " {} host message(s) picked {}.",
            self.host_messages.len(),
            self.host_message_order
        )?;
        if !self.wait_messages.is_empty() {
            write!(
                f,
                " {} wait message(s) picked {}.",
                self.wait_messages.len(),
                self.wait_message_order
            )?;
        }
        if self.watch_port != 0 {
            write!(f, " Watching port: {}", self.watch_port)?;
        }
        writeln!(f)?;
        if self.host_messages.is_empty() && self.wait_messages.is_empty() {
            return writeln!(f, "No default messages.");
        }
        write_messages(f, "Host", &self.host_messages)?;
        write_messages(f, "Wait", &self.wait_messages)
    }
}

fn write_messages(f: &mut fmt::Formatter<'_>, title: &str, messages: &[String]) -> fmt::Result {
    match messages {
        [] => writeln!(f, "No default {} messages.", title.to_lowercase()),
        [only] => writeln!(f, "{title} Message: {only}"),
        many => {
            writeln!(f, "{title} Messages:")?;
            for (i, m) in many.iter().enumerate() {
                writeln!(f, "{:>2}: {m}", i + 1)?;
            }
            Ok(())
        }
    }
}

/// Picks messages in the configured order, remembering its position
#[derive(Debug, Clone, Default)]
pub struct MessagePicker {
    messages: Vec<String>,
    order: MessageOrder,
    next: usize,
}

impl MessagePicker {
    /// Create a picker over `messages`
    #[must_use]
    pub fn new(messages: Vec<String>, order: MessageOrder) -> Self {
        Self {
            messages,
            order,
            next: 0,
        }
    }

    /// Next message, or an empty string if there are none
    pub fn pick(&mut self) -> String {
        if self.messages.is_empty() {
            return String::new();
        }
        let index = match self.order {
            MessageOrder::RoundRobin => {
                let index = if self.next >= self.messages.len() { 0 } else { self.next };
                self.next = index + 1;
                index
            }
            MessageOrder::Random => rand::thread_rng().gen_range(0..self.messages.len()),
        };
        self.messages[index].clone()
    }
}

/// A backend game paired with its enabled config section
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Game as known to the backend
    pub game: Game,
    /// Config section
    pub info: GameInfo,
    /// Host message state
    pub host_picker: MessagePicker,
}

impl GameConfig {
    fn new(game: Game, info: GameInfo) -> Self {
        let host_picker = MessagePicker::new(info.host_messages.clone(), info.host_message_order);
        Self {
            game,
            info,
            host_picker,
        }
    }
}

/// Enabled game sections after `-E`/`-D` overrides.
///
/// A game named in `disable` is dropped even if also named in `enable`.
/// Names match the game name or section name, ignoring case.
#[must_use]
pub fn enabled_games(
    configured: &BTreeMap<String, GameInfo>,
    enable: &[String],
    disable: &[String],
) -> Vec<GameInfo> {
    let mut out = Vec::with_capacity(configured.len());
    for (section, game) in configured {
        let mut game = game.clone();
        game.config_name = section.clone();
        if game.name.is_empty() {
            game.name = section.clone();
        }
        if disable.iter().any(|d| game.matches(d)) {
            continue;
        }
        if enable.iter().any(|e| game.matches(e)) {
            game.enabled = true;
        }
        if game.enabled {
            out.push(game);
        }
    }
    out
}

/// Pair backend games with enabled config sections by short name.
///
/// Two enabled sections for the same game are an error unless
/// `ignore_dups` is set, in which case the first wins.
pub fn filter_games(
    known: &[Game],
    configured: &[GameInfo],
    ignore_dups: bool,
) -> anyhow::Result<Vec<GameConfig>> {
    let mut out = Vec::new();
    let mut found: HashMap<String, &GameInfo> = HashMap::new();
    for game in known {
        for info in configured.iter().filter(|i| i.enabled) {
            if !info.name.eq_ignore_ascii_case(&game.url_short_name) {
                continue;
            }
            match found.entry(info.name.to_lowercase()) {
                Entry::Occupied(first) => {
                    if ignore_dups {
                        continue;
                    }
                    anyhow::bail!(
                        "Multiple active conflicting configurations found:\n{}--vs-\n{info}",
                        first.get()
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(info);
                    out.push(GameConfig::new(game.clone(), info.clone()));
                }
            }
        }
    }
    Ok(out)
}

/// Public address families needed by `games`
#[must_use]
pub fn ip_flags_from_games(games: &[GameConfig]) -> WantMask {
    let mut flags = WantMask::NONE;
    for game in games {
        if game.game.speaks_v4() {
            flags |= WantMask::PUBLIC_V4;
        }
        if game.game.speaks_v6() {
            flags |= WantMask::PUBLIC_V6;
        }
    }
    flags
}
