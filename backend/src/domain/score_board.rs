//! Claim counters per user, overall and per channel.
//!
//! Every successful claim counts, including repeat claims of the same field.
//! The total and channel counters live in separate ranked sets and are bumped
//! by two independent commands; a failure between them leaves the total one
//! ahead of the channel breakdown.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::ports::ConquestStore;
use crate::domain::{Channel, Error, ScoreEntry, Username, keys};

/// Ranked claim counters.
pub struct ScoreBoard<S> {
    store: Arc<S>,
}

impl<S> ScoreBoard<S> {
    /// Create a scoreboard over the shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> ScoreBoard<S>
where
    S: ConquestStore,
{
    /// Insert zeroed counters for a new user in the total set and every
    /// channel set.
    pub async fn seed_user(&self, username: &Username) -> Result<(), Error> {
        self.store
            .ranked_add(keys::TOTAL_SCORE, username.as_ref(), 0)
            .await?;
        for channel in Channel::ALL {
            self.store
                .ranked_add(&keys::channel_score(channel), username.as_ref(), 0)
                .await?;
        }
        Ok(())
    }

    /// Count one claim by `username` on `channel`.
    pub async fn increment(&self, username: &Username, channel: Channel) -> Result<(), Error> {
        self.store
            .ranked_increment(keys::TOTAL_SCORE, username.as_ref(), 1)
            .await?;
        if let Err(err) = self
            .store
            .ranked_increment(&keys::channel_score(channel), username.as_ref(), 1)
            .await
        {
            warn!(
                %username,
                %channel,
                error = %err,
                "total score incremented without channel score"
            );
            return Err(err.into());
        }
        Ok(())
    }

    /// Every user's counters, joined across the total and channel sets.
    ///
    /// Users missing from a channel set report 0 for that channel. Entries are
    /// returned in username order; ranking is left to presentation.
    pub async fn all(&self) -> Result<Vec<ScoreEntry>, Error> {
        let mut entries: BTreeMap<Username, ScoreEntry> = BTreeMap::new();

        for member in self.store.ranked_members(keys::TOTAL_SCORE).await? {
            let username = Username::from_stored(member.member);
            entries
                .entry(username.clone())
                .or_insert_with(|| ScoreEntry::zeroed(username))
                .total = member.score;
        }

        for channel in Channel::ALL {
            for member in self
                .store
                .ranked_members(&keys::channel_score(channel))
                .await?
            {
                let username = Username::from_stored(member.member);
                entries
                    .entry(username.clone())
                    .or_insert_with(|| ScoreEntry::zeroed(username))
                    .per_channel
                    .insert(channel, member.score);
            }
        }

        Ok(entries.into_values().collect())
    }
}
