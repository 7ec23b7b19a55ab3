//! JWT payload decoding
//!
//! Reads the claims segment of a compact JWT without checking the signature.
//! The client only needs `exp` to decide whether a token is still usable; the
//! server remains the authority on validity. Decoded tokens are never stored,
//! they are recomputed from the raw string on every request.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Token subject: the user id, which the server may encode as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Id(u64),
    Text(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Id(id) => write!(f, "{id}"),
            Subject::Text(text) => f.write_str(text),
        }
    }
}

/// Claims carried by FitFriends access and refresh tokens.
///
/// Every claim is optional: a token without `exp` is legal and is treated by
/// the interceptor as "cannot tell", never as "valid".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DecodedToken {
    /// Expiration as unix timestamp in seconds, possibly fractional
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(default)]
    pub sub: Option<Subject>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl DecodedToken {
    /// Whether the token is expired at `now_millis`, allowing `grace` of slack.
    ///
    /// A token counts as expired once less than one millisecond of its
    /// lifetime remains after the grace window. Returns `None` when the token
    /// carries no `exp` claim.
    pub fn is_expired_at(&self, now_millis: u64, grace: Duration) -> Option<bool> {
        // `as` saturates: negative or NaN becomes 0, huge values u64::MAX
        let exp_millis = (self.exp? * 1000.0) as u64;
        let deadline = now_millis.saturating_add(grace.as_millis() as u64);
        Some(exp_millis <= deadline)
    }

    /// `is_expired_at` against the system clock.
    pub fn is_expired(&self, grace: Duration) -> Option<bool> {
        self.is_expired_at(unix_now_millis(), grace)
    }
}

/// Decode the payload segment of a compact JWT.
pub fn decode(token: &str) -> Result<DecodedToken> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_header), Some(payload)) if !payload.is_empty() => payload,
        _ => {
            return Err(Error::MalformedToken(
                "expected header.payload.signature".into(),
            ));
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::MalformedToken(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::MalformedToken(format!("payload is not a claims object: {e}")))
}

/// Current unix time in milliseconds.
pub fn unix_now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
