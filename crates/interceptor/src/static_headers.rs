//! Static header injection from configuration
//!
//! Adds configured `[[headers]]` to every request. The Authorization header
//! belongs to the session interceptor and is never written from config.

use crate::{Authorization, RequestInterceptor};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use tracing::warn;

/// Header injection rule (name + value pair from config).
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

/// Injects a fixed set of headers; replaces existing values of the same name.
pub struct StaticHeaders {
    headers: Vec<HeaderInjection>,
}

impl StaticHeaders {
    pub fn new(headers: Vec<HeaderInjection>) -> Self {
        Self { headers }
    }

    fn apply(&self, headers: &mut HeaderMap) {
        for injection in &self.headers {
            let name = match HeaderName::from_str(&injection.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            if name == reqwest::header::AUTHORIZATION {
                warn!(header = %injection.name, "refusing to inject authorization header from config");
                continue;
            }
            let value = match HeaderValue::from_str(&injection.value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            headers.insert(name, value);
        }
    }
}

impl RequestInterceptor for StaticHeaders {
    fn id(&self) -> &str {
        "static-headers"
    }

    fn prepare_request<'a>(
        &'a self,
        headers: &'a mut HeaderMap,
    ) -> Pin<Box<dyn Future<Output = crate::Result<Authorization>> + Send + 'a>> {
        self.apply(headers);
        Box::pin(async { Ok(Authorization::Untouched) })
    }
}
