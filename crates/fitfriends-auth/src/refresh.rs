//! Refresh endpoint call
//!
//! `POST {base}/auth/refresh` with the refresh token as bearer and an empty
//! JSON body. Only 200 yields a new pair; 401 means the refresh token is no
//! longer accepted and the caller should forget the session.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body returned by the refresh endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh_tokens(
    client: &reqwest::Client,
    refresh_url: &str,
    refresh: &str,
) -> Result<RefreshResponse> {
    let response = client
        .post(refresh_url)
        .bearer_auth(refresh)
        .json(&serde_json::json!({}))
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::RefreshRejected(format!(
            "refresh endpoint returned {status}: {body}"
        )));
    }

    if status != StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Refresh(format!(
            "refresh endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<RefreshResponse>()
        .await
        .map_err(|e| Error::Refresh(format!("invalid refresh response: {e}")))
}
