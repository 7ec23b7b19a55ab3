//! User slice: authentication status, current user and per-action progress

use std::collections::HashMap;
use std::fmt;

use crate::models::User;

/// Whether the current session is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStatus {
    Auth,
    NoAuth,
    #[default]
    Unknown,
}

/// Progress of one asynchronous action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliceStatus {
    #[default]
    Idle,
    Loading,
    Fulfilled,
    Rejected,
}

/// Actions tracked by the slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Register,
    Login,
    Check,
    UpdateUser,
    UploadAvatar,
    Logout,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Register => "user/register",
            ActionKind::Login => "user/login",
            ActionKind::Check => "user/checkAuth",
            ActionKind::UpdateUser => "user/update",
            ActionKind::UploadAvatar => "user/uploadAvatar",
            ActionKind::Logout => "user/logout",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of the auth state shown by the front end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSlice {
    pub auth_status: AuthStatus,
    pub user: Option<User>,
    pub statuses: HashMap<ActionKind, SliceStatus>,
    /// Message of the most recent rejected action
    pub last_error: Option<String>,
}

impl UserSlice {
    /// Status of `kind`; actions never dispatched are `Idle`.
    pub fn status(&self, kind: ActionKind) -> SliceStatus {
        self.statuses.get(&kind).copied().unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_status == AuthStatus::Auth
    }

    pub(crate) fn pending(&mut self, kind: ActionKind) {
        self.statuses.insert(kind, SliceStatus::Loading);
    }

    pub(crate) fn fulfilled(&mut self, kind: ActionKind) {
        self.statuses.insert(kind, SliceStatus::Fulfilled);
        self.last_error = None;
    }

    pub(crate) fn rejected(&mut self, kind: ActionKind, message: String) {
        self.statuses.insert(kind, SliceStatus::Rejected);
        self.last_error = Some(message);
    }

    pub(crate) fn signed_in(&mut self, user: User) {
        self.user = Some(user);
        self.auth_status = AuthStatus::Auth;
    }

    pub(crate) fn signed_out(&mut self) {
        self.user = None;
        self.auth_status = AuthStatus::NoAuth;
    }
}
