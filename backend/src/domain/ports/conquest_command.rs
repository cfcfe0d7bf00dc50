//! Driving port for state-changing game use-cases.
//!
//! Channel adapters translate their own request shapes into these calls and
//! map [`crate::domain::Error`] codes back onto their transport. None of the
//! operations know which channel invoked them beyond the explicit
//! [`Channel`] argument to `conquer`.

use async_trait::async_trait;

use crate::domain::{Channel, Error, LoginCredentials, SessionToken, User};

/// Domain use-case port for registration, login and claims.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConquestCommand: Send + Sync {
    /// Create a user. Fails with `AlreadyExists` when the name is taken.
    async fn register(&self, credentials: &LoginCredentials) -> Result<User, Error>;

    /// Verify credentials and issue a session token.
    async fn login(&self, credentials: &LoginCredentials) -> Result<SessionToken, Error>;

    /// Claim `field_id` on `channel` for the token's user.
    ///
    /// The raw id is validated here so adapters can pass through whatever
    /// the client sent.
    async fn conquer(
        &self,
        token: &SessionToken,
        field_id: i64,
        channel: Channel,
    ) -> Result<(), Error>;
}
