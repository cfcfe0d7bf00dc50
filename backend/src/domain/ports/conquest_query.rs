//! Driving port for read-only game queries.

use async_trait::async_trait;

use crate::domain::{Channel, Error, FieldId, FieldOwners, ScoreEntry, SessionToken, User};

/// Domain use-case port for map, history and scoreboard reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConquestQuery: Send + Sync {
    /// Check that the backing store answers.
    async fn ping(&self) -> Result<(), Error>;

    /// Every field the token's user has ever claimed on `channel`, ascending.
    async fn user_claims(
        &self,
        token: &SessionToken,
        channel: Channel,
    ) -> Result<Vec<FieldId>, Error>;

    /// Current owners of fields `start..=end` on every channel.
    async fn map(&self, start: i64, end: i64) -> Result<Vec<FieldOwners>, Error>;

    /// Claim counters for every registered user.
    async fn scoreboard(&self) -> Result<Vec<ScoreEntry>, Error>;

    /// All registered users, ordered by id. Requires a live token.
    async fn user_list(&self, token: &SessionToken) -> Result<Vec<User>, Error>;
}
