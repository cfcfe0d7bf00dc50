//! Driven port over the shared key/value store that holds all conquest state.
//!
//! The commands mirror the primitives of a Redis-style server: plain strings
//! with expiry, an atomic counter, hashes, bitmaps addressed by bit offset,
//! and ranked (sorted) sets. Every command is atomic for the single key it
//! touches and nothing more; callers that update several keys get no
//! cross-key isolation.

use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by store adapters.
    pub enum StoreError {
        /// The store could not be reached or a connection could not be checked out.
        Connection { message: String } => "conquest store connection failed: {message}",
        /// The store rejected or failed to execute a command.
        Command { message: String } => "conquest store command failed: {message}",
        /// A reply could not be decoded into the expected shape.
        Decode { message: String } => "conquest store reply could not be decoded: {message}",
    }
}

/// Inclusive range of bit offsets within a bitmap.
///
/// ## Invariants
/// - `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRange {
    start: u64,
    end: u64,
}

impl BitRange {
    /// Build a range covering `start..=end`, or `None` when `start > end`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// First offset in the range.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last offset in the range (inclusive).
    pub fn end(&self) -> u64 {
        self.end
    }
}

/// One member of a ranked set with its integral score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedMember {
    /// Set member, usually a username.
    pub member: String,
    /// Score attached to the member.
    pub score: u64,
}

impl RankedMember {
    /// Convenience constructor.
    pub fn new(member: impl Into<String>, score: u64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Primitive store commands consumed by the conquest components.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConquestStore: Send + Sync {
    /// Round-trip to the store to confirm it is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Read a string value; `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a string value that expires after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically increment an integer value, treating a missing key as 0,
    /// and return the incremented value.
    async fn increment(&self, key: &str) -> Result<u64, StoreError>;

    /// Read several fields of a hash in one request. The reply has one slot
    /// per requested field, in request order.
    async fn hash_get(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, StoreError>;

    /// Write one or more hash fields, overwriting existing values.
    async fn hash_set(&self, key: &str, entries: &[(String, String)]) -> Result<(), StoreError>;

    /// Create a hash holding `entries` in one atomic step, only when no hash
    /// exists under `key`. Returns `true` when written.
    async fn hash_create(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> Result<bool, StoreError>;

    /// Set or clear a single bit, growing the bitmap as needed. Returns the
    /// previous value of the bit.
    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<bool, StoreError>;

    /// Count the set bits within `range`.
    async fn bit_count(&self, key: &str, range: BitRange) -> Result<u64, StoreError>;

    /// Offset of the first set bit within `range`, if any.
    async fn first_set_bit(&self, key: &str, range: BitRange) -> Result<Option<u64>, StoreError>;

    /// Insert a member into a ranked set with the given score, replacing any
    /// previous score.
    async fn ranked_add(&self, key: &str, member: &str, score: u64) -> Result<(), StoreError>;

    /// Atomically add `delta` to a member's score (missing members start at
    /// 0) and return the new score.
    async fn ranked_increment(
        &self,
        key: &str,
        member: &str,
        delta: u64,
    ) -> Result<u64, StoreError>;

    /// Every member of a ranked set in ascending score order.
    async fn ranked_members(&self, key: &str) -> Result<Vec<RankedMember>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, true)]
    #[case(0, 999, true)]
    #[case(5, 4, false)]
    fn bit_range_requires_ordered_bounds(#[case] start: u64, #[case] end: u64, #[case] ok: bool) {
        assert_eq!(BitRange::new(start, end).is_some(), ok);
    }

    #[rstest]
    fn store_error_messages_name_the_failure() {
        let err = StoreError::connection("timed out");
        assert_eq!(err.to_string(), "conquest store connection failed: timed out");
    }
}
