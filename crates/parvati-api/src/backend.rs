//! Backend abstraction.
//!
//! Commands talk to the backend only through [`Backend`], so they can be
//! driven by an in-memory fake in tests.

use crate::error::ApiError;
use crate::models::{Game, GameCheckInfo, GameCheckResult, HostEntry, Listing, User, UserDelta};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Backend used when no URI is configured
pub const DEFAULT_URI: &str = "https://parvati.phi.al";

/// Announcer recorded on posted hosts when none is configured
pub const DEFAULT_ANNOUNCER: &str = "ApiClient";

/// Connection settings, the `[parvati]` config section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URI
    pub uri: String,
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
    /// Name recorded as announcer of posted hosts
    pub announcer: String,
}

impl ApiConfig {
    /// Base URI, falling back to [`DEFAULT_URI`]
    #[must_use]
    pub fn uri_or_default(&self) -> &str {
        if self.uri.is_empty() { DEFAULT_URI } else { &self.uri }
    }

    /// Announcer, falling back to [`DEFAULT_ANNOUNCER`]
    #[must_use]
    pub fn announcer_or_default(&self) -> &str {
        if self.announcer.is_empty() {
            DEFAULT_ANNOUNCER
        } else {
            &self.announcer
        }
    }

    /// True when both user name and password are set
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Depth of a host check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckLevel {
    /// Is the host reachable at all
    #[default]
    Basic,
    /// Also who is playing and whether spectating is possible
    State,
}

impl CheckLevel {
    /// Query parameter value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::State => "state",
        }
    }
}

/// Operations the client needs from the Parvati backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// All games known to the backend
    async fn games(&self) -> Result<Vec<Game>, ApiError>;

    /// Details of the configured user. The first successful call remembers
    /// the account id for later updates.
    async fn details(&self) -> Result<User, ApiError>;

    /// Details of any user, by id, nick or address
    async fn user_details(&self, user: &str) -> Result<User, ApiError>;

    /// Store new addresses for the configured user. Both `None` is a no-op
    /// returning an empty delta.
    async fn update_ips(
        &self,
        v4: Option<IpAddr>,
        v6: Option<IpAddr>,
    ) -> Result<UserDelta, ApiError>;

    /// Where `user` appears in the host list of `game`
    async fn hostlist_entry(&self, game: &Game, user: &User) -> Result<Option<Listing>, ApiError>;

    /// Ask the game's check services whether `user` is hosting.
    ///
    /// A service answering with a failed check yields `Ok` with that result;
    /// `Err` means no service produced a result at all.
    async fn check_hosting(
        &self,
        game: &Game,
        user: &User,
        level: CheckLevel,
        port: u16,
    ) -> Result<GameCheckResult, ApiError>;

    /// Announce `user` as hosting `game` at `addr`
    async fn post_host(
        &self,
        game: &Game,
        user: &User,
        addr: SocketAddr,
        message: &str,
    ) -> Result<(), ApiError>;

    /// One-line connection summary
    fn info(&self) -> String;

    /// Present a host list entry the way a check service would
    async fn host_check_info(&self, host: &HostEntry) -> GameCheckInfo {
        let mut info = host_info(host);
        if !host.op_private && host.opponent_id != 0 {
            let id = host.opponent_id.to_string();
            match self.user_details(&id).await {
                Ok(user) => info.opponent = user.nick,
                Err(e) => {
                    info.opponent = format!("id: {id}");
                    info.error = e.to_string();
                }
            }
        }
        info
    }
}

/// Check info of a host entry without resolving the opponent's nick
#[must_use]
pub fn host_info(host: &HostEntry) -> GameCheckInfo {
    let status = host
        .checks
        .last()
        .map_or_else(|| "New".to_string(), |c| c.status.clone());
    let ip = if host.ipv4.is_empty() { &host.ipv6 } else { &host.ipv4 };
    let spectate = match host.spectateable.as_str() {
        "Yes" => 'y',
        "No" => 'n',
        _ => 'u',
    };
    let address = match ip.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, host.port).to_string(),
        Err(_) => format!("{ip}:{}", host.port),
    };
    GameCheckInfo {
        address,
        status,
        version: host.version.clone(),
        spectate: u32::from(spectate),
        opponent: if host.op_private {
            "Anonymous".to_string()
        } else {
            String::new()
        },
        ..GameCheckInfo::default()
    }
}

/// Check URLs for `user` hosting `game`, IPv6 before IPv4 within each service.
///
/// Only families the game has a protocol for are checked. The port is
/// `port` if non-zero, else the user's port, else the game's.
pub fn check_targets(game: &Game, user: &User, port: u16) -> Result<Vec<String>, ApiError> {
    if game.apis.is_empty() {
        return Err(ApiError::NoCheckApi {
            game: game.name.clone(),
        });
    }

    let mut ips = Vec::with_capacity(2);
    if game.speaks_v6() {
        ips.extend(user.ipv6.parse::<IpAddr>().ok());
    }
    if game.speaks_v4() {
        ips.extend(user.ipv4.parse::<IpAddr>().ok());
    }
    if ips.is_empty() {
        return Err(ApiError::NoUserIps {
            nick: user.nick.clone(),
            game: game.name.clone(),
        });
    }

    let port = [port, user.port, game.port]
        .into_iter()
        .find(|p| *p != 0)
        .unwrap_or(0);

    let mut targets = Vec::with_capacity(game.apis.len() * ips.len());
    for api in &game.apis {
        let base = api.uri.trim_end_matches('/');
        for ip in &ips {
            targets.push(format!("{base}/check/{}", SocketAddr::new(*ip, port)));
        }
    }
    Ok(targets)
}

/// True if a check result says the host is not usable
#[must_use]
pub fn check_failed(result: &GameCheckResult) -> bool {
    !result.error.is_empty() || matches!(result.info.status.as_str(), "Unreachable" | "Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiEntry, HostCheck};

    fn game() -> Game {
        Game {
            name: "Hisoutensoku".to_string(),
            port: 10800,
            apis: vec![
                ApiEntry {
                    uri: "https://a.example/".to_string(),
                    game_id: 1,
                },
                ApiEntry {
                    uri: "https://b.example".to_string(),
                    game_id: 1,
                },
            ],
            protocols: vec!["udp4".to_string(), "udp6".to_string()],
            ..Game::default()
        }
    }

    fn user() -> User {
        User {
            nick: "marisa".to_string(),
            ipv4: "198.51.100.7".to_string(),
            ipv6: "2001:db8::7".to_string(),
            ..User::default()
        }
    }

    #[test]
    fn test_check_targets_order_and_port() {
        let targets = check_targets(&game(), &user(), 0).unwrap();
        assert_eq!(
            targets,
            [
                "https://a.example/check/[2001:db8::7]:10800",
                "https://a.example/check/198.51.100.7:10800",
                "https://b.example/check/[2001:db8::7]:10800",
                "https://b.example/check/198.51.100.7:10800",
            ]
        );

        let mut u = user();
        u.port = 7500;
        assert!(check_targets(&game(), &u, 0).unwrap()[0].ends_with(":7500"));
        assert!(check_targets(&game(), &u, 9000).unwrap()[0].ends_with(":9000"));
    }

    #[test]
    fn test_check_targets_respects_protocols() {
        let mut g = game();
        g.protocols = vec!["udp4".to_string()];
        let targets = check_targets(&g, &user(), 0).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.contains("198.51.100.7")));
    }

    #[test]
    fn test_check_targets_errors() {
        let mut g = game();
        g.apis.clear();
        assert!(matches!(
            check_targets(&g, &user(), 0),
            Err(ApiError::NoCheckApi { .. })
        ));
        assert!(matches!(
            check_targets(&game(), &User::default(), 0),
            Err(ApiError::NoUserIps { .. })
        ));
    }

    #[test]
    fn test_host_info() {
        let host = HostEntry {
            ipv6: "2001:db8::7".to_string(),
            port: 10800,
            spectateable: "No".to_string(),
            op_private: true,
            checks: vec![
                HostCheck {
                    id: 1,
                    status: "Waiting".to_string(),
                },
                HostCheck {
                    id: 2,
                    status: "Playing".to_string(),
                },
            ],
            ..HostEntry::default()
        };
        let info = host_info(&host);
        assert_eq!(info.address, "[2001:db8::7]:10800");
        assert_eq!(info.status, "Playing");
        assert_eq!(info.spectate_char(), 'n');
        assert_eq!(info.opponent, "Anonymous");

        assert_eq!(host_info(&HostEntry::default()).status, "New");
    }

    #[test]
    fn test_check_failed() {
        let mut result = GameCheckResult::default();
        result.info.status = "Waiting".to_string();
        assert!(!check_failed(&result));
        result.info.status = "Unreachable".to_string();
        assert!(check_failed(&result));
        result.info.status = "Playing".to_string();
        result.error = "timeout".to_string();
        assert!(check_failed(&result));
    }

    #[test]
    fn test_config_defaults() {
        let cfg = ApiConfig::default();
        assert_eq!(cfg.uri_or_default(), DEFAULT_URI);
        assert_eq!(cfg.announcer_or_default(), DEFAULT_ANNOUNCER);
        assert!(!cfg.has_credentials());
    }
}
