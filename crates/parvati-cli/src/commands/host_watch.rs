//! `host-watch`: detect hosting, announce it and react to joins

use super::{configure_ifaces, games_ip_flags, resolve_addrs, select_games};
use crate::config::Config;
use crate::delta::{process_delta, update_ips};
use crate::executor::{JoinTask, ProcessExecutor, TaskExecutor};
use crate::games::GameConfig;
use crate::progress::format_duration;
use anyhow::anyhow;
use clap::Args;
use parvati_api::{Backend, CheckLevel, GameCheckInfo, Listing, User};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info, warn};

/// Time between watch cycles
pub const WATCH_INTERVAL: Duration = Duration::from_secs(10);

/// Watch for you hosting
#[derive(Debug, Args)]
pub struct HostWatchArgs {
    /// Enable a game by (game) name or config section name
    #[arg(short = 'E', long = "enable", value_name = "GAME")]
    pub enable: Vec<String>,

    /// Disable a game by (game) name or config section name. Wins over --enable
    #[arg(short = 'D', long = "disable", value_name = "GAME")]
    pub disable: Vec<String>,

    /// Use this interface name/number for public v4 IP
    #[arg(long, value_name = "NAME|ID")]
    pub iface4: Option<String>,

    /// Use this interface name/number for public v6 IP
    #[arg(long, value_name = "NAME|ID")]
    pub iface6: Option<String>,

    /// Host with this message, overriding the config file
    #[arg(short = 'm', long = "host-message", value_name = "TEXT")]
    pub host_message: Option<String>,

    /// Do not also update IPs
    #[arg(long)]
    pub no_ip_update: bool,
}

/// Check one game: report an existing listing, or check hosting and
/// announce the host when the check finds it.
///
/// `Ok(None)` means the user is only waiting and not hosting.
pub async fn check_auto_host(
    backend: &dyn Backend,
    game: &mut GameConfig,
    last_status: &str,
    user: &User,
    host_message: Option<&str>,
    out: &mut (dyn Write + Send),
) -> anyhow::Result<Option<GameCheckInfo>> {
    let listing = backend
        .hostlist_entry(&game.game, user)
        .await
        .map_err(|e| anyhow!("Unable to check existing hostlist: {e}"))?;
    if let Some(Listing::Hosting(host)) = &listing {
        return Ok(Some(backend.host_check_info(host).await));
    }

    let result = backend
        .check_hosting(&game.game, user, CheckLevel::Basic, game.info.watch_port)
        .await?;
    if result.host_port.is_empty() {
        anyhow::bail!("{} host checking failed: {}", game.game.name, result.error);
    }

    let status = result.info.status.clone();
    match status.as_str() {
        "Waiting" | "Playing" | "Relay" => {
            let addr: SocketAddr = result.host_port.parse().map_err(|e| {
                anyhow!("Failed to parse ip:port result '{}': {e}", result.host_port)
            })?;
            let message = match host_message {
                Some(m) if !m.is_empty() => m.to_string(),
                _ => game.host_picker.pick(),
            };
            backend
                .post_host(&game.game, user, addr, &message)
                .await
                .map_err(|e| {
                    anyhow!("{} host announce on {} failed: {e}", game.game.name, result.host_port)
                })?;
            writeln!(out, "{} host announce succeeded.", game.game.name)?;
            Ok(Some(result.info))
        }
        _ => {
            if status != last_status {
                writeln!(
                    out,
                    "{} host check on {} gave result {status}",
                    game.game.name, result.host_port
                )?;
            }
            if matches!(listing, Some(Listing::Waiting(_))) {
                return Ok(None);
            }
            Ok(Some(result.info))
        }
    }
}

/// Per-game hosting state across watch cycles
pub struct HostWatcher<'a> {
    backend: &'a dyn Backend,
    executor: &'a dyn TaskExecutor,
    games: Vec<GameConfig>,
    host_message: Option<String>,
    last_status: HashMap<String, String>,
}

impl<'a> HostWatcher<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        executor: &'a dyn TaskExecutor,
        games: Vec<GameConfig>,
        host_message: Option<String>,
    ) -> Self {
        Self {
            backend,
            executor,
            games,
            host_message,
            last_status: HashMap::new(),
        }
    }

    /// Last seen status of a game by its pretty name
    pub fn status(&self, game: &str) -> Option<&str> {
        self.last_status.get(game).map(String::as_str)
    }

    /// Check every game once. The first switch to `Playing` runs the game's
    /// on-joined program.
    pub async fn check_games(&mut self, user: &User, out: &mut (dyn Write + Send)) {
        for game in &mut self.games {
            let name = game.info.pretty_name().to_string();
            let last = self.last_status.get(&name).cloned().unwrap_or_default();
            let info = match check_auto_host(
                self.backend,
                game,
                &last,
                user,
                self.host_message.as_deref(),
                out,
            )
            .await
            {
                Ok(info) => info,
                Err(e) => {
                    error!(game = %name, "{e:#}");
                    continue;
                }
            };

            let status = info.as_ref().map(|i| i.status.clone()).unwrap_or_default();
            if status == "Playing" && last != "Playing" {
                let opponent = info.map(|i| i.opponent).unwrap_or_default();
                info!(game = %name, "You have been joined by opponent {opponent}");
                if let Some(task) = JoinTask::from_template(&game.info.on_joined, &opponent) {
                    self.executor.submit(task);
                }
            }
            self.last_status.insert(name, status);
        }
    }
}

pub async fn run(args: HostWatchArgs, config: &Config, backend: &dyn Backend) -> anyhow::Result<()> {
    let games = select_games(backend, config, &args.enable, &args.disable, "").await?;
    for game in &games {
        debug!("{}", game.info);
    }
    let want = games_ip_flags(&games, "")?;
    let ifaces = configure_ifaces(config, args.iface4.clone(), args.iface6.clone())?;

    let executor = ProcessExecutor;
    let mut watcher = HostWatcher::new(backend, &executor, games, args.host_message.clone());
    let mut stdout = std::io::stdout();
    let mut first = true;

    println!(
        "Running update continually at {} intervals. Hit CTRL+C to stop.",
        format_duration(WATCH_INTERVAL)
    );
    let mut ticker = interval_at(Instant::now() + WATCH_INTERVAL, WATCH_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let delta = async {
                    let found = resolve_addrs(&config.probe, want, &ifaces).await?;
                    update_ips(backend, found, !args.no_ip_update).await
                };
                let delta = match delta.await {
                    Ok(delta) => delta,
                    Err(e) => {
                        error!("{e:#}");
                        println!("Aborting host check on this iteration");
                        continue;
                    }
                };
                if let Err(e) = process_delta(&delta, args.no_ip_update, first, &mut stdout) {
                    warn!("{e:#}");
                }
                first = false;
                watcher.check_games(&delta.player, &mut stdout).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping on signal: interrupt");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{GameInfo, filter_games};
    use crate::testing::FakeBackend;
    use parvati_api::{Game, HostCheck, HostEntry, WaitEntry};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<JoinTask>>);

    impl TaskExecutor for Recorder {
        fn submit(&self, task: JoinTask) {
            self.0.lock().unwrap().push(task);
        }
    }

    fn games() -> Vec<GameConfig> {
        let known = vec![Game {
            name: "Hisoutensoku".to_string(),
            url_short_name: "th123".to_string(),
            protocols: vec!["udp4".to_string()],
            ..Game::default()
        }];
        let info = GameInfo {
            name: "th123".to_string(),
            config_name: "soku".to_string(),
            host_messages: vec!["first".to_string(), "second".to_string()],
            on_joined: vec!["notify".to_string(), "vs ${NICK}".to_string()],
            ..GameInfo::default()
        };
        filter_games(&known, &[info], false).unwrap()
    }

    fn user() -> User {
        User {
            id: 42,
            nick: "marisa".to_string(),
            ipv4: "198.51.100.7".to_string(),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn test_reachable_host_is_announced() {
        let backend = FakeBackend::with_user(user());
        backend.push_check("Waiting", "198.51.100.7:10800");
        backend.push_check("Waiting", "198.51.100.7:10800");
        let mut games = games();
        let mut out = Vec::new();

        let info = check_auto_host(&backend, &mut games[0], "", &user(), None, &mut out)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.status, "Waiting");
        check_auto_host(&backend, &mut games[0], "", &user(), None, &mut out)
            .await
            .unwrap();

        let posts = backend.posts();
        assert_eq!(posts[0].0, "th123");
        assert_eq!(posts[0].1, "198.51.100.7:10800".parse::<SocketAddr>().unwrap());
        assert_eq!(posts[0].2, "first");
        assert_eq!(posts[1].2, "second");
        assert!(String::from_utf8(out).unwrap().starts_with("Hisoutensoku host announce succeeded.\n"));
    }

    #[tokio::test]
    async fn test_explicit_message_wins() {
        let backend = FakeBackend::with_user(user());
        backend.push_check("Relay", "198.51.100.7:10800");
        let mut games = games();
        check_auto_host(&backend, &mut games[0], "", &user(), Some("hi"), &mut Vec::new())
            .await
            .unwrap();
        assert_eq!(backend.posts()[0].2, "hi");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_reported_once() {
        let backend = FakeBackend::with_user(user());
        backend.push_check("Unreachable", "198.51.100.7:10800");
        backend.push_check("Unreachable", "198.51.100.7:10800");
        let mut games = games();

        let mut out = Vec::new();
        let info = check_auto_host(&backend, &mut games[0], "", &user(), None, &mut out)
            .await
            .unwrap();
        assert_eq!(info.unwrap().status, "Unreachable");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Hisoutensoku host check on 198.51.100.7:10800 gave result Unreachable\n"
        );

        let mut out = Vec::new();
        check_auto_host(&backend, &mut games[0], "Unreachable", &user(), None, &mut out)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert!(backend.posts().is_empty());
    }

    #[tokio::test]
    async fn test_waiting_user_yields_nothing() {
        let backend = FakeBackend::with_user(user());
        *backend.listing.lock().unwrap() = Some(Listing::Waiting(WaitEntry {
            user_id: 42,
            ..WaitEntry::default()
        }));
        backend.push_check("Unknown", "198.51.100.7:10800");
        let mut games = games();
        let info = check_auto_host(&backend, &mut games[0], "", &user(), None, &mut Vec::new())
            .await
            .unwrap();
        assert!(info.is_none());
    }

    #[tokio::test]
    async fn test_failed_check_without_address_is_an_error() {
        let backend = FakeBackend::with_user(user());
        backend.push_check("Unknown", "");
        let mut games = games();
        let err = check_auto_host(&backend, &mut games[0], "", &user(), None, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Hisoutensoku host checking failed"));
    }

    #[tokio::test]
    async fn test_join_fires_once_per_transition() {
        let mut backend = FakeBackend::with_user(user());
        backend.others.insert(
            "7".to_string(),
            User {
                id: 7,
                nick: "reimu".to_string(),
                ..User::default()
            },
        );
        let listed = |status: &str| {
            Some(Listing::Hosting(HostEntry {
                user_id: 42,
                ipv4: "198.51.100.7".to_string(),
                port: 10800,
                opponent_id: 7,
                checks: vec![HostCheck {
                    id: 1,
                    status: status.to_string(),
                }],
                ..HostEntry::default()
            }))
        };
        let recorder = Recorder::default();
        let mut watcher = HostWatcher::new(&backend, &recorder, games(), None);
        let mut out = Vec::new();

        for status in ["Waiting", "Playing", "Playing", "Waiting", "Playing"] {
            *backend.listing.lock().unwrap() = listed(status);
            watcher.check_games(&user(), &mut out).await;
            assert_eq!(watcher.status("soku"), Some(status));
        }

        let tasks = recorder.0.lock().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].program, "notify");
        assert_eq!(tasks[0].args, ["vs reimu"]);
    }

    #[tokio::test]
    async fn test_failing_game_keeps_previous_status() {
        let backend = FakeBackend::with_user(user());
        let recorder = Recorder::default();
        let mut watcher = HostWatcher::new(&backend, &recorder, games(), None);
        // No queued check result makes the check fail
        watcher.check_games(&user(), &mut Vec::new()).await;
        assert_eq!(watcher.status("soku"), None);
        assert!(recorder.0.lock().unwrap().is_empty());
    }
}
