//! In-memory backend for command tests

use async_trait::async_trait;
use parvati_api::{
    ApiError, Backend, CheckLevel, Game, GameCheckResult, Listing, User, UserDelta,
};
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;

type Update = (Option<IpAddr>, Option<IpAddr>);

#[derive(Default)]
pub struct FakeBackend {
    pub games: Vec<Game>,
    pub user: Mutex<User>,
    pub others: HashMap<String, User>,
    pub listing: Mutex<Option<Listing>>,
    pub checks: Mutex<VecDeque<GameCheckResult>>,
    pub(crate) updates: Mutex<Vec<Update>>,
    pub(crate) posts: Mutex<Vec<(String, SocketAddr, String)>>,
}

impl FakeBackend {
    pub fn with_user(user: User) -> Self {
        Self {
            user: Mutex::new(user),
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Vec<Update> {
        self.updates.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<(String, SocketAddr, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn push_check(&self, status: &str, host_port: &str) {
        let mut result = GameCheckResult {
            request: "basic".to_string(),
            host_port: host_port.to_string(),
            ..GameCheckResult::default()
        };
        result.info.status = status.to_string();
        self.checks.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn games(&self) -> Result<Vec<Game>, ApiError> {
        Ok(self.games.clone())
    }

    async fn details(&self) -> Result<User, ApiError> {
        Ok(self.user.lock().unwrap().clone())
    }

    async fn user_details(&self, user: &str) -> Result<User, ApiError> {
        self.others.get(user).cloned().ok_or_else(|| ApiError::Status {
            method: "GET",
            url: format!("fake://users?user_id={user}"),
            status: 404,
            body: "no such user".to_string(),
        })
    }

    async fn update_ips(
        &self,
        v4: Option<IpAddr>,
        v6: Option<IpAddr>,
    ) -> Result<UserDelta, ApiError> {
        self.updates.lock().unwrap().push((v4, v6));
        let mut user = self.user.lock().unwrap();
        let mut delta = parvati_api::Delta::default();
        if let Some(v4) = v4 {
            delta.ipv4 = vec![user.ipv4.clone(), v4.to_string()];
            user.ipv4 = v4.to_string();
        }
        if let Some(v6) = v6 {
            delta.ipv6 = vec![user.ipv6.clone(), v6.to_string()];
            user.ipv6 = v6.to_string();
        }
        Ok(UserDelta {
            player: user.clone(),
            delta: Some(delta),
        })
    }

    async fn hostlist_entry(&self, _game: &Game, _user: &User) -> Result<Option<Listing>, ApiError> {
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn check_hosting(
        &self,
        game: &Game,
        _user: &User,
        _level: CheckLevel,
        _port: u16,
    ) -> Result<GameCheckResult, ApiError> {
        self.checks
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::NoCheckApi {
                game: game.name.clone(),
            })
    }

    async fn post_host(
        &self,
        game: &Game,
        _user: &User,
        addr: SocketAddr,
        message: &str,
    ) -> Result<(), ApiError> {
        self.posts
            .lock()
            .unwrap()
            .push((game.url_short_name.clone(), addr, message.to_string()));
        Ok(())
    }

    fn info(&self) -> String {
        "Connection to: fake://".to_string()
    }
}
