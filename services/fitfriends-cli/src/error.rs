//! Command errors reported to the user

use thiserror::Error;

/// Session problems the CLI explains instead of passing through.
#[derive(Error, Debug)]
pub enum Error {
    #[error("not signed in; run `fitfriends login` first")]
    NotSignedIn,

    #[error("session is no longer accepted by the server; sign in again")]
    SessionRejected,
}
