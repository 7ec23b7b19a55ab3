//! HTTP client for the FitFriends API
//!
//! Every request gets an `x-request-id`, runs through the interceptor chain
//! (static headers first, session last) and is sent with the configured
//! timeout. Non-2xx responses surface as `Error::Status`.

use std::sync::Arc;
use std::time::Duration;

use fitfriends_auth::{DEFAULT_SERVER_URL, REFRESH_PATH, REQUEST_TIMEOUT, TokenStore};
use interceptor::{Authorization, HeaderInjection, RequestInterceptor, StaticHeaders};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::session::{Session, SessionInterceptor};
use crate::validation::AvatarFile;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Connection settings for `ApiClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Treat tokens as expired this long before their `exp`
    pub expiry_grace: Duration,
    /// Extra headers sent with every request
    pub headers: Vec<HeaderInjection>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            expiry_grace: Duration::ZERO,
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Join `path` onto the base URL with exactly one `/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// reqwest client with this config's timeout.
    pub fn build_http(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))
    }
}

/// Session-aware API client.
pub struct ApiClient {
    http_client: reqwest::Client,
    config: ClientConfig,
    session: Arc<Session>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ApiClient {
    /// Client over an existing session. Requests share the session's reqwest client.
    pub fn new(config: ClientConfig, session: Arc<Session>) -> Self {
        let interceptors: Vec<Arc<dyn RequestInterceptor>> = vec![
            Arc::new(StaticHeaders::new(config.headers.clone())),
            Arc::new(SessionInterceptor::new(session.clone())),
        ];
        Self {
            http_client: session.http_client().clone(),
            config,
            session,
            interceptors,
        }
    }

    /// Build the HTTP client and session from `config` and `store`.
    pub fn connect(config: ClientConfig, store: Arc<TokenStore>) -> Result<Self> {
        let http_client = config.build_http()?;
        let session = Session::new(store, http_client, config.endpoint(REFRESH_PATH))
            .with_expiry_grace(config.expiry_grace);
        Ok(Self::new(config, Arc::new(session)))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, |r| r).await?;
        decode(response).await
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, |r| r.json(body)).await?;
        decode(response).await
    }

    /// PATCH a JSON body to `path` and decode the JSON response.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::PATCH, path, |r| r.json(body)).await?;
        decode(response).await
    }

    /// POST without a body, ignoring the response body.
    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(Method::POST, path, |r| r).await?;
        Ok(())
    }

    /// Upload `file` as multipart field `file` and decode the JSON response.
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, file: &AvatarFile) -> Result<T> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())
            .map_err(|e| Error::Http(format!("building multipart body: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self.send(Method::POST, path, |r| r.multipart(form)).await?;
        decode(response).await
    }

    /// GET `path` and return the raw body text.
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let response = self.send(Method::GET, path, |r| r).await?;
        response
            .text()
            .await
            .map_err(|e| Error::Decode(format!("reading response body: {e}")))
    }

    #[instrument(skip_all, fields(method = %method, path = %path, request_id = tracing::field::Empty))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response> {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let mut headers = HeaderMap::new();
        let id_value = HeaderValue::from_str(&request_id)
            .map_err(|e| Error::Http(format!("invalid request id: {e}")))?;
        headers.insert(REQUEST_ID_HEADER, id_value);

        for interceptor in &self.interceptors {
            let outcome = interceptor.prepare_request(&mut headers).await?;
            match outcome {
                Authorization::Anonymous(reason) if reason.dropped_tokens() => warn!(
                    interceptor = interceptor.id(),
                    reason = reason.label(),
                    "session ended, sending request without credentials"
                ),
                Authorization::Anonymous(reason) => debug!(
                    interceptor = interceptor.id(),
                    reason = reason.label(),
                    "sending request without credentials"
                ),
                Authorization::Refreshed => {
                    debug!(interceptor = interceptor.id(), "sending with refreshed token")
                }
                Authorization::Bearer | Authorization::Untouched => {}
            }
        }

        let url = self.config.endpoint(path);
        let request = build(self.http_client.request(method, &url).headers(headers));

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(timeout_ms = self.config.timeout.as_millis() as u64, "request timed out");
                Error::Timeout(format!("{url}: {e}"))
            } else {
                warn!(error = %e, "request failed");
                Error::Http(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        metrics::record_request(status.as_u16());

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            debug!(status = status.as_u16(), "request rejected by server");
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "request completed");
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Decode(e.to_string()))
}
