//! Backend data model.
//!
//! Every field is defaulted so partial payloads from older backends decode.

use serde::{Deserialize, Serialize};

/// A game known to the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Game {
    /// Backend id
    pub id: i32,
    /// Short name used in URLs and config sections
    pub url_short_name: String,
    /// Display name
    pub name: String,
    /// Name used on Discord
    pub discord_name: String,
    /// Project homepage
    pub url: String,
    /// Default netplay port
    pub port: u16,
    /// Host check services for this game
    #[serde(rename = "api_entries")]
    pub apis: Vec<ApiEntry>,
    /// Netplay protocols, suffixed `4` or `6` by address family
    pub protocols: Vec<String>,
}

impl Game {
    /// True if any protocol runs over IPv4
    #[must_use]
    pub fn speaks_v4(&self) -> bool {
        self.protocols.iter().any(|p| p.ends_with('4'))
    }

    /// True if any protocol runs over IPv6
    #[must_use]
    pub fn speaks_v6(&self) -> bool {
        self.protocols.iter().any(|p| p.ends_with('6'))
    }
}

/// Host check service of a game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEntry {
    /// Base URI of the check service
    pub uri: String,
    /// Game this service checks
    pub game_id: i32,
}

/// A registered player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Account id
    pub id: u64,
    /// Nickname
    pub nick: String,
    /// Privilege level
    pub priv_level: String,
    /// Creation timestamp as sent by the backend
    pub created: String,
    /// Whether a password is set
    pub has_password: bool,
    /// Stored IPv4 address, may be empty
    pub ipv4: String,
    /// Stored IPv6 address, may be empty
    pub ipv6: String,
    /// IP updates are locked
    #[serde(rename = "ip_lock")]
    pub static_ip: bool,
    /// Default hosting port
    pub port: u16,
    /// Joins are not announced
    pub private: bool,
    /// Stated gender
    #[serde(rename = "preferred_gender")]
    pub gender: String,
    /// Avatar URL
    #[serde(rename = "avatar")]
    pub picture: String,
    /// Registered email
    pub email: String,
    /// Linked chat identities, only sent to the owner or admins
    #[serde(rename = "credentials")]
    pub identities: Vec<Identity>,
}

/// A chat identity linked to a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    /// Realm the identity belongs to, e.g. `discord`
    pub realm: String,
    /// Nick in that realm
    pub nick: String,
    /// Realm-specific credential string
    pub credential: String,
    /// Link timestamp
    pub created: String,
}

/// Changed fields as `[old, new]` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delta {
    /// Combined `ip:port`
    #[serde(rename = "ip", skip_serializing_if = "Vec::is_empty")]
    pub ip_port: Vec<String>,
    /// IPv4 address
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv4: Vec<String>,
    /// IPv6 address
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv6: Vec<String>,
    /// Default port
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub port: Vec<u16>,
    /// Nickname
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nick: Vec<String>,
    /// Hosting message
    #[serde(rename = "hosting_message", skip_serializing_if = "Vec::is_empty")]
    pub host_message: Vec<String>,
}

/// A user after an update, with what changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDelta {
    /// User after the update
    pub player: User,
    /// Changed fields; absent when nothing changed
    pub delta: Option<Delta>,
}

/// One check of a listed host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCheck {
    /// Check id
    pub id: u64,
    /// Status reported by the check, e.g. `Waiting` or `Playing`
    pub status: String,
}

/// A user hosting a game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostEntry {
    /// Hosting user
    pub user_id: u64,
    /// Hosting user's nick
    pub nick: String,
    /// Announced IPv4 address
    pub ipv4: String,
    /// Announced IPv6 address
    pub ipv6: String,
    /// Announced port
    pub port: u16,
    /// Game version
    pub version: String,
    /// `Yes`, `No` or unknown
    pub spectateable: String,
    /// Opponent chose to stay anonymous
    pub op_private: bool,
    /// Opponent account id, 0 if none
    pub opponent_id: u64,
    /// Checks in chronological order
    pub checks: Vec<HostCheck>,
}

/// A user waiting for a host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitEntry {
    /// Waiting user
    pub user_id: u64,
    /// Waiting user's nick
    pub nick: String,
    /// Wait message
    pub message: String,
}

/// Host list of one game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostList {
    /// Current hosts
    pub hosts: Vec<HostEntry>,
    /// Users waiting for a host
    pub waits: Vec<WaitEntry>,
}

/// Where a user appears in a host list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// The user is hosting
    Hosting(HostEntry),
    /// The user is waiting
    Waiting(WaitEntry),
}

impl HostList {
    /// Find `user_id`, hosts first
    #[must_use]
    pub fn find(&self, user_id: u64) -> Option<Listing> {
        if let Some(host) = self.hosts.iter().find(|h| h.user_id == user_id) {
            return Some(Listing::Hosting(host.clone()));
        }
        self.waits
            .iter()
            .find(|w| w.user_id == user_id)
            .map(|w| Listing::Waiting(w.clone()))
    }
}

/// Result of a host check service call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameCheckResult {
    /// Request as understood by the service
    pub request: String,
    /// Checked `ip:port`, empty when the check never ran
    #[serde(rename = "hostport")]
    pub host_port: String,
    /// Check outcome
    #[serde(rename = "result")]
    pub info: GameCheckInfo,
    /// Service error
    pub error: String,
}

/// Outcome of checking a host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameCheckInfo {
    /// Checked address
    pub address: String,
    /// `Waiting`, `Playing`, `Relay`, `Unreachable`, `Unknown`...
    pub status: String,
    /// Game version
    pub version: String,
    /// Spectating possible: `y`, `n` or `u` as a character code
    pub spectate: u32,
    /// Opponent nick
    pub opponent: String,
    /// Player profiles
    pub profiles: Vec<String>,
    /// Lookup error while building the info
    pub error: String,
}

impl GameCheckInfo {
    /// Spectate flag as a character
    #[must_use]
    pub fn spectate_char(&self) -> char {
        char::from_u32(self.spectate).unwrap_or('u')
    }
}
