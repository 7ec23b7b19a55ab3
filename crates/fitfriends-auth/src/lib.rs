//! FitFriends authentication primitives
//!
//! Token persistence, JWT payload decoding and the refresh endpoint call.
//! This crate knows nothing about the request pipeline; the client crate
//! combines these pieces into the session interceptor.
//!
//! Token lifecycle:
//! 1. Login/register response carries a pair → `TokenStore::save()`
//! 2. Every outgoing request decodes the access token via `jwt::decode()`
//! 3. An expired access token with a live refresh token → `refresh_tokens()`
//! 4. The new pair replaces the old one via `TokenStore::save()`
//! 5. Logout or a rejected refresh → `TokenStore::drop_tokens()`

pub mod constants;
pub mod error;
pub mod jwt;
pub mod refresh;
pub mod store;

pub use constants::*;
pub use error::{Error, Result};
pub use jwt::{DecodedToken, Subject, unix_now_millis};
pub use refresh::{RefreshResponse, refresh_tokens};
pub use store::{TokenPair, TokenStore};
