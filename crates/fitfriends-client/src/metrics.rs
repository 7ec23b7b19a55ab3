//! Client-side counters
//!
//! - `client_requests_total` (counter): label `status`
//! - `client_token_refresh_total` (counter): label `outcome`
//!   (`success`, `rejected`, `failed`)
//!
//! Without an installed recorder these calls are no-ops; the embedding
//! application decides whether and how to export them.

/// Record a completed API request by HTTP status.
pub fn record_request(status: u16) {
    metrics::counter!("client_requests_total", "status" => status.to_string()).increment(1);
}

/// Record one call to the refresh endpoint.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("client_token_refresh_total", "outcome" => outcome).increment(1);
}
