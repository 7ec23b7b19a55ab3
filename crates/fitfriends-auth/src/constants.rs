//! FitFriends API constants
//!
//! Paths are relative to the server base URL. The base URL itself comes from
//! configuration, with a build-time default taken from `FITFRIENDS_SERVER_URL`.

use std::time::Duration;

/// Environment variable naming the API base URL (read at build and run time)
pub const SERVER_URL_ENV: &str = "FITFRIENDS_SERVER_URL";

/// Base URL used when neither the build nor the runtime environment sets one
pub const FALLBACK_SERVER_URL: &str = "http://localhost:4000/api";

/// Default base URL, baked in at compile time when the variable is set
pub const DEFAULT_SERVER_URL: &str = match option_env!("FITFRIENDS_SERVER_URL") {
    Some(url) => url,
    None => FALLBACK_SERVER_URL,
};

/// Fixed per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(200);

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "fitfriends-access-token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "fitfriends-refresh-token";

pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGIN_PATH: &str = "/auth/login";
pub const CHECK_PATH: &str = "/auth/check";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const UPDATE_USER_PATH: &str = "/users/update";
pub const UPLOAD_AVATAR_PATH: &str = "files/upload/img";
