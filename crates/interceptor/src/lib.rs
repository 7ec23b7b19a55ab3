//! Request interception for the FitFriends API client
//!
//! Every outgoing request passes through a chain of `RequestInterceptor`s
//! before it is sent. Interceptors may add headers and report how the request
//! ended up authenticated. `StaticHeaders` injects configured headers; the
//! session-backed bearer interceptor lives in the client crate.

pub mod static_headers;

pub use static_headers::{HeaderInjection, StaticHeaders};

use std::future::Future;
use std::pin::Pin;

/// Why a request is sent without credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousReason {
    /// No access token in the store
    NoToken,
    /// Access token carries no `exp` claim
    NoExpiry,
    /// Access token expired and the refresh token is expired, missing or has no `exp`
    RefreshExpired,
    /// Refresh endpoint answered 401; tokens were dropped
    RefreshRejected,
    /// A stored token could not be decoded; tokens were dropped
    MalformedToken,
}

impl AnonymousReason {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            AnonymousReason::NoToken => "no_token",
            AnonymousReason::NoExpiry => "no_expiry",
            AnonymousReason::RefreshExpired => "refresh_expired",
            AnonymousReason::RefreshRejected => "refresh_rejected",
            AnonymousReason::MalformedToken => "malformed_token",
        }
    }

    /// Whether the session lost its tokens on the way.
    pub fn dropped_tokens(&self) -> bool {
        matches!(
            self,
            AnonymousReason::RefreshRejected | AnonymousReason::MalformedToken
        )
    }
}

/// Authentication outcome reported by an interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// The interceptor does not manage credentials
    Untouched,
    /// A still-valid access token was attached
    Bearer,
    /// The access token was refreshed and the new one attached
    Refreshed,
    /// No Authorization header was attached
    Anonymous(AnonymousReason),
}

/// Errors that stop a request before it is sent.
#[derive(Debug, thiserror::Error)]
pub enum InterceptorError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("internal interceptor error: {0}")]
    Internal(String),
}

/// Result alias for interceptor operations.
pub type Result<T> = std::result::Result<T, InterceptorError>;

/// Hook run on the headers of every outgoing request.
///
/// Uses `Pin<Box<dyn Future>>` return types so the client can hold a chain of
/// `Arc<dyn RequestInterceptor>`.
pub trait RequestInterceptor: Send + Sync {
    /// Identifier for logging (e.g. "static-headers", "session")
    fn id(&self) -> &str;

    /// Add or replace headers before the request is sent.
    fn prepare_request<'a>(
        &'a self,
        headers: &'a mut reqwest::header::HeaderMap,
    ) -> Pin<Box<dyn Future<Output = Result<Authorization>> + Send + 'a>>;
}
