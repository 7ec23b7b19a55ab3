//! Error types for API calls

use crate::validation::ValidationErrors;

/// Errors surfaced by the client and the auth actions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication error: {0}")]
    Auth(#[from] fitfriends_auth::Error),

    #[error("request interceptor failed: {0}")]
    Interceptor(#[from] interceptor::InterceptorError),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl Error {
    /// Whether the server refused the request for lack of valid credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Status { status: 401, .. })
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
