//! FitFriends API client
//!
//! Wraps the marketplace REST API behind a session-aware HTTP client. The
//! session (token store + refresh logic) is an explicit object handed to the
//! client; there is no global token state.
//!
//! Request flow:
//! 1. `ApiClient` builds the request and runs the interceptor chain
//! 2. `SessionInterceptor` asks the `Session` for credentials
//! 3. The session attaches a valid access token, or refreshes an expired one
//!    once, or lets the request go out anonymously
//! 4. `AuthDispatcher` wraps auth calls as pending/fulfilled/rejected actions
//! 5. `register_user` chains register → avatar upload → profile update

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use client::{ApiClient, ClientConfig};
pub use dispatcher::AuthDispatcher;
pub use error::{Error, Result};
pub use models::{
    AppRoute, CreateUserDto, Gender, Location, LoggedUser, UpdateUserDto, UploadedFile, User,
    UserRole,
};
pub use pipeline::{Navigator, RegistrationError, RegistrationStep, register_user};
pub use session::{Authorized, Session, SessionInterceptor};
pub use state::{ActionKind, AuthStatus, SliceStatus, UserSlice};
pub use validation::{AvatarFile, FieldError, RegisterForm, ValidationErrors};
