//! # Parvati API
//!
//! Data model and HTTP client for the Parvati matchmaking backend.
//!
//! This crate provides:
//! - Serde models for games, users, IP deltas, host lists and host checks
//! - The [`Backend`] trait the client commands are written against
//! - [`HttpBackend`], a reqwest implementation with basic auth
//!
//! ## Example
//!
//! ```rust,no_run
//! use parvati_api::{ApiConfig, Backend, HttpBackend};
//!
//! # async fn run() -> Result<(), parvati_api::ApiError> {
//! let backend = HttpBackend::new(ApiConfig::default(), env!("CARGO_PKG_VERSION"))?;
//! for game in backend.games().await? {
//!     println!("{}: {}", game.url_short_name, game.name);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod http;
pub mod models;

pub use backend::{
    ApiConfig, Backend, CheckLevel, DEFAULT_ANNOUNCER, DEFAULT_URI, check_failed, check_targets,
    host_info,
};
pub use error::ApiError;
pub use http::HttpBackend;
pub use models::{
    ApiEntry, Delta, Game, GameCheckInfo, GameCheckResult, HostCheck, HostEntry, HostList,
    Identity, Listing, User, UserDelta, WaitEntry,
};
