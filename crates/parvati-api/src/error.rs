//! Backend error types

use thiserror::Error;

/// Errors raised while talking to the Parvati backend or a host check service
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or body decoding failure
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Request: {method} on {url}\nResponse: {status} - {body}")]
    Status {
        /// Request method
        method: &'static str,
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// A configured or derived URI is not valid
    #[error("invalid URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// A response body was not the expected JSON
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Updating requires the account id from a prior details lookup
    #[error("No user id for user: {username} must get details before updating.")]
    NoUserId {
        /// Configured user name
        username: String,
    },

    /// No host check service is registered for the game
    #[error("No API entries exist to check hosting for game: {game}")]
    NoCheckApi {
        /// Game display name
        game: String,
    },

    /// The user has no stored address to check
    #[error("User '{nick}' has no IPs set to check hosting for game: {game}")]
    NoUserIps {
        /// User nick
        nick: String,
        /// Game display name
        game: String,
    },
}

impl ApiError {
    /// HTTP status code, if the server answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
