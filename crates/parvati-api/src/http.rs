//! reqwest implementation of [`Backend`]

use crate::backend::{ApiConfig, Backend, CheckLevel, check_failed, check_targets};
use crate::error::ApiError;
use crate::models::{Game, GameCheckResult, HostList, Listing, User, UserDelta};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

/// Talks JSON over HTTPS to a Parvati backend
pub struct HttpBackend {
    client: Client,
    base: Url,
    config: ApiConfig,
    user_id: OnceLock<u64>,
}

#[derive(Serialize)]
struct HostPost<'a> {
    user_id: u64,
    announcer: &'a str,
    message: &'a str,
    ip: String,
    port: u16,
}

impl HttpBackend {
    /// Create a client for `config`, identifying as build `version`
    pub fn new(config: ApiConfig, version: &str) -> Result<Self, ApiError> {
        let version = if version.is_empty() { "dev" } else { version };
        let client = Client::builder()
            .user_agent(format!("Parvati-Client/{version}/rust"))
            .build()?;
        let base = Url::parse(config.uri_or_default().trim_end_matches('/'))?;
        Ok(Self {
            client,
            base,
            config,
            user_id: OnceLock::new(),
        })
    }

    /// Account id learned from [`Backend::details`]
    #[must_use]
    pub fn user_id(&self) -> Option<u64> {
        self.user_id.get().copied()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.has_credentials() {
            request.basic_auth(&self.config.username, Some(&self.config.password))
        } else {
            request
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: &'static str,
        url: Url,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        debug!(method, %url, "backend request");
        let response = self.authed(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.client.get(url.clone());
        self.fetch("GET", url, request).await
    }

    async fn lookup(&self, user: &str) -> Result<User, ApiError> {
        let mut url = self.endpoint("users")?;
        url.query_pairs_mut().append_pair("user_id", user);
        self.get(url).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn games(&self) -> Result<Vec<Game>, ApiError> {
        self.get(self.endpoint("games")?).await
    }

    async fn details(&self) -> Result<User, ApiError> {
        if let Some(id) = self.user_id() {
            return self.lookup(&id.to_string()).await;
        }
        debug!(username = %self.config.username, "looking up own details");
        let user = self.lookup(&self.config.username).await?;
        let _ = self.user_id.set(user.id);
        debug!(id = user.id, "learned own user id");
        Ok(user)
    }

    async fn user_details(&self, user: &str) -> Result<User, ApiError> {
        self.lookup(user).await
    }

    async fn update_ips(
        &self,
        v4: Option<IpAddr>,
        v6: Option<IpAddr>,
    ) -> Result<UserDelta, ApiError> {
        if v4.is_none() && v6.is_none() {
            return Ok(UserDelta::default());
        }
        let Some(id) = self.user_id() else {
            return Err(ApiError::NoUserId {
                username: self.config.username.clone(),
            });
        };
        let mut ips = BTreeMap::new();
        if let Some(v4) = v4 {
            ips.insert("ip", v4.to_string());
        }
        if let Some(v6) = v6 {
            ips.insert("ipv6", v6.to_string());
        }
        let url = self.endpoint(&format!("users/{id}"))?;
        let request = self.client.post(url.clone()).json(&ips);
        self.fetch("POST", url, request).await
    }

    async fn hostlist_entry(&self, game: &Game, user: &User) -> Result<Option<Listing>, ApiError> {
        let mut url = self.endpoint(&format!("games/{}/hosts", game.url_short_name))?;
        url.query_pairs_mut()
            .append_pair("hoster", &user.id.to_string());
        let list: HostList = self.get(url).await?;
        let found = list.find(user.id);
        debug!(user = user.id, game = %game.url_short_name, listed = found.is_some(), "host list lookup");
        Ok(found)
    }

    async fn check_hosting(
        &self,
        game: &Game,
        user: &User,
        level: CheckLevel,
        port: u16,
    ) -> Result<GameCheckResult, ApiError> {
        let mut last_err = None;
        let mut last_result = None;

        for target in check_targets(game, user, port)? {
            let mut url = Url::parse(&target)?;
            url.query_pairs_mut().append_pair("level", level.as_str());
            debug!(%url, "checking host status");

            let request = self.authed(self.client.get(url));
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!(error = %e, "check failed");
                    last_err = Some(ApiError::from(e));
                    continue;
                }
            };
            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    last_err = Some(ApiError::from(e));
                    continue;
                }
            };
            let result: GameCheckResult = serde_json::from_str(&body)?;
            if !status.is_success() || check_failed(&result) {
                debug!(status = status.as_u16(), error = %result.error, "check reported failure");
                last_result = Some(result);
                continue;
            }
            return Ok(result);
        }

        match (last_result, last_err) {
            (Some(result), _) => Ok(result),
            (None, Some(e)) => Err(e),
            (None, None) => Err(ApiError::NoCheckApi {
                game: game.name.clone(),
            }),
        }
    }

    async fn post_host(
        &self,
        game: &Game,
        user: &User,
        addr: SocketAddr,
        message: &str,
    ) -> Result<(), ApiError> {
        debug!(user = user.id, game = %game.url_short_name, %addr, "posting host");
        let url = self.endpoint(&format!("games/{}/hosts", game.url_short_name))?;
        let body = HostPost {
            user_id: user.id,
            announcer: self.config.announcer_or_default(),
            message,
            ip: addr.ip().to_string(),
            port: addr.port(),
        };
        let request = self.client.post(url.clone()).json(&body);
        let _: serde_json::Value = self.fetch("POST", url, request).await?;
        Ok(())
    }

    fn info(&self) -> String {
        let mut info = format!("Connection to: {}", self.base);
        if self.config.has_credentials() {
            info.push_str(" as ");
            info.push_str(&self.config.username);
        } else {
            info.push_str(" (no credentials)");
        }
        info
    }
}
