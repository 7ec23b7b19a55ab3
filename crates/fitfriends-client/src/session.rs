//! Session context and the bearer-token interceptor
//!
//! A `Session` owns the token store for one signed-in user and decides, per
//! request, which credentials to attach:
//!
//! - no access token → anonymous
//! - valid access token → attach it unchanged
//! - expired access token, live refresh token → refresh once, attach the new token
//! - expired access token, expired refresh token → anonymous, no refresh call
//! - refresh endpoint answers 401 → drop both tokens, anonymous
//!
//! Refreshes are serialized by a mutex. A caller that waited on the lock
//! re-reads the store first and reuses a token another caller just obtained,
//! so concurrent requests that notice the same expired token cause a single
//! refresh call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use fitfriends_auth::{TokenStore, jwt};
use interceptor::{AnonymousReason, Authorization, InterceptorError, RequestInterceptor};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::metrics;

/// Credentials chosen for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorized {
    pub outcome: Authorization,
    /// Access token to send as bearer, if any
    pub token: Option<Secret<String>>,
}

impl Authorized {
    fn anonymous(reason: AnonymousReason) -> Self {
        Self {
            outcome: Authorization::Anonymous(reason),
            token: None,
        }
    }

    fn bearer(token: Secret<String>) -> Self {
        Self {
            outcome: Authorization::Bearer,
            token: Some(token),
        }
    }
}

/// Result of inspecting the stored access token without refreshing.
enum AccessCheck {
    Done(Authorized),
    Expired,
}

/// Token state shared by every request of one client.
pub struct Session {
    store: Arc<TokenStore>,
    http_client: reqwest::Client,
    refresh_url: String,
    expiry_grace: Duration,
    refresh_lock: Mutex<()>,
}

impl Session {
    /// Create a session over `store`, refreshing through `refresh_url`.
    pub fn new(store: Arc<TokenStore>, http_client: reqwest::Client, refresh_url: String) -> Self {
        Self {
            store,
            http_client,
            refresh_url,
            expiry_grace: Duration::ZERO,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Treat tokens as expired `grace` before their `exp`.
    pub fn with_expiry_grace(mut self, grace: Duration) -> Self {
        self.expiry_grace = grace;
        self
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Persist a pair received from login or registration.
    pub async fn sign_in(&self, access: String, refresh: String) -> fitfriends_auth::Result<()> {
        self.store.save(access, refresh).await?;
        info!("session signed in");
        Ok(())
    }

    /// Forget both tokens.
    pub async fn sign_out(&self) -> fitfriends_auth::Result<()> {
        self.store.drop_tokens().await?;
        info!("session signed out");
        Ok(())
    }

    /// Whether the store holds any token.
    pub async fn is_authenticated(&self) -> bool {
        self.store.has_tokens().await
    }

    /// Decide which credentials the next request carries.
    ///
    /// Errors only when the refresh endpoint fails for a reason other than
    /// rejecting the token (network failure, 5xx, bad body) or the store
    /// cannot be written; those reject the request outright.
    pub async fn authorize(&self) -> fitfriends_auth::Result<Authorized> {
        if let AccessCheck::Done(authorized) = self.check_access().await? {
            return Ok(authorized);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed or dropped the pair while we waited.
        if let AccessCheck::Done(authorized) = self.check_access().await? {
            debug!("token refreshed by a concurrent request");
            return Ok(authorized);
        }

        self.refresh().await
    }

    async fn check_access(&self) -> fitfriends_auth::Result<AccessCheck> {
        let Some(access) = self.store.access().await else {
            return Ok(AccessCheck::Done(Authorized::anonymous(
                AnonymousReason::NoToken,
            )));
        };

        let decoded = match jwt::decode(access.as_str()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "stored access token is malformed, dropping tokens");
                self.store.drop_tokens().await?;
                return Ok(AccessCheck::Done(Authorized::anonymous(
                    AnonymousReason::MalformedToken,
                )));
            }
        };

        match decoded.is_expired(self.expiry_grace) {
            None => {
                debug!("access token has no exp claim, sending request without it");
                Ok(AccessCheck::Done(Authorized::anonymous(
                    AnonymousReason::NoExpiry,
                )))
            }
            Some(false) => Ok(AccessCheck::Done(Authorized::bearer(access))),
            Some(true) => Ok(AccessCheck::Expired),
        }
    }

    /// Exchange the refresh token. Caller holds `refresh_lock`.
    async fn refresh(&self) -> fitfriends_auth::Result<Authorized> {
        let Some(refresh) = self.store.refresh().await else {
            debug!("access token expired and no refresh token stored");
            return Ok(Authorized::anonymous(AnonymousReason::RefreshExpired));
        };

        let decoded = match jwt::decode(refresh.as_str()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "stored refresh token is malformed, dropping tokens");
                self.store.drop_tokens().await?;
                return Ok(Authorized::anonymous(AnonymousReason::MalformedToken));
            }
        };

        if decoded.is_expired(self.expiry_grace) != Some(false) {
            debug!("refresh token expired, skipping refresh");
            return Ok(Authorized::anonymous(AnonymousReason::RefreshExpired));
        }

        debug!(url = %self.refresh_url, "access token expired, refreshing");
        match fitfriends_auth::refresh_tokens(&self.http_client, &self.refresh_url, refresh.as_str())
            .await
        {
            Ok(response) => {
                metrics::record_refresh("success");
                let access = Secret::new(response.access_token.clone());
                self.store
                    .save(response.access_token, response.refresh_token)
                    .await?;
                info!("token refresh succeeded");
                Ok(Authorized {
                    outcome: Authorization::Refreshed,
                    token: Some(access),
                })
            }
            Err(fitfriends_auth::Error::RefreshRejected(msg)) => {
                metrics::record_refresh("rejected");
                warn!(error = %msg, "refresh token rejected, dropping tokens");
                self.store.drop_tokens().await?;
                Ok(Authorized::anonymous(AnonymousReason::RefreshRejected))
            }
            Err(e) => {
                metrics::record_refresh("failed");
                warn!(error = %e, "token refresh failed");
                Err(e)
            }
        }
    }
}

/// Attaches the session's bearer token to outgoing requests.
pub struct SessionInterceptor {
    session: Arc<Session>,
}

impl SessionInterceptor {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl RequestInterceptor for SessionInterceptor {
    fn id(&self) -> &str {
        "session"
    }

    fn prepare_request<'a>(
        &'a self,
        headers: &'a mut HeaderMap,
    ) -> Pin<Box<dyn Future<Output = interceptor::Result<Authorization>> + Send + 'a>> {
        Box::pin(async move {
            let authorized = self
                .session
                .authorize()
                .await
                .map_err(|e| InterceptorError::Auth(e.to_string()))?;

            // The session is the only source of credentials.
            headers.remove(AUTHORIZATION);

            if let Some(token) = &authorized.token {
                let value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|e| InterceptorError::Internal(format!("invalid token value: {e}")))?;
                headers.insert(AUTHORIZATION, value);
            }

            Ok(authorized.outcome)
        })
    }
}
