//! Per-user, per-channel history of every field ever claimed.
//!
//! Each `(user, channel)` pair owns a bitmap of [`FIELD_COUNT`] bits. Bits are
//! only ever set, never cleared, so the index keeps listing a field after
//! someone else takes it over in the ledger.
//!
//! Enumeration is a two-level scan. The field space is cut into windows of
//! [`BATCH_SIZE`] bits; each window costs one population count, empty windows
//! are skipped, and non-empty windows are walked with one "next set bit"
//! query per set bit. A sparse bitmap therefore costs about a thousand
//! cheap queries instead of a million bit tests.

use std::sync::Arc;

use crate::domain::ports::{BitRange, ConquestStore};
use crate::domain::{
    BATCH_SIZE, Channel, Error, FIELD_COUNT, FieldId, FieldRange, Username, keys,
};

/// Monotone "has this user ever claimed it" projection.
pub struct OwnershipIndex<S> {
    store: Arc<S>,
}

impl<S> OwnershipIndex<S> {
    /// Create an index over the shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> OwnershipIndex<S>
where
    S: ConquestStore,
{
    /// Create an all-zero bitmap for every channel so the user is visible to
    /// enumeration before any claim.
    pub async fn seed_user(&self, username: &Username) -> Result<(), Error> {
        for channel in Channel::ALL {
            self.store
                .set_bit(&keys::ownership(username, channel), 0, false)
                .await?;
        }
        Ok(())
    }

    /// Mark `field` as claimed by `username` on `channel`. Idempotent.
    ///
    /// Returns `true` when the bit was newly set.
    pub async fn set_bit(
        &self,
        username: &Username,
        channel: Channel,
        field: FieldId,
    ) -> Result<bool, Error> {
        let previous = self
            .store
            .set_bit(&keys::ownership(username, channel), field.bit_offset(), true)
            .await?;
        Ok(!previous)
    }

    /// Every field `username` has ever claimed on `channel`, ascending.
    pub async fn enumerate(
        &self,
        username: &Username,
        channel: Channel,
    ) -> Result<Vec<FieldId>, Error> {
        let key = keys::ownership(username, channel);
        let mut claimed = Vec::new();
        for window in FieldRange::all().batches(BATCH_SIZE) {
            let bounds = window_bits(window)?;
            let population = self.store.bit_count(&key, bounds).await?;
            if population == 0 {
                continue;
            }
            self.scan_window(&key, bounds, population, &mut claimed)
                .await?;
        }
        Ok(claimed)
    }

    async fn scan_window(
        &self,
        key: &str,
        bounds: BitRange,
        population: u64,
        claimed: &mut Vec<FieldId>,
    ) -> Result<(), Error> {
        let mut found = 0_u64;
        let mut cursor = Some(bounds.start());
        while let Some(range) = cursor.and_then(|start| BitRange::new(start, bounds.end())) {
            if found == population {
                break;
            }
            let Some(offset) = self.store.first_set_bit(key, range).await? else {
                break;
            };
            if offset < range.start() || offset > range.end() {
                return Err(Error::store_failure(format!(
                    "bit position {offset} reported outside {}..={}",
                    range.start(),
                    range.end()
                )));
            }
            claimed.push(FieldId::from_bit_offset(offset).map_err(|err| {
                Error::store_failure(format!("ownership bitmap holds an invalid offset: {err}"))
            })?);
            found += 1;
            cursor = offset.checked_add(1);
        }
        Ok(())
    }
}

fn window_bits(window: FieldRange) -> Result<BitRange, Error> {
    BitRange::new(window.start().bit_offset(), window.end().bit_offset()).ok_or_else(|| {
        Error::internal(format!("empty scan window inside 0..{FIELD_COUNT}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockConquestStore;
    use mockall::predicate::always;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn alice() -> Username {
        Username::new("alice").expect("valid username")
    }

    /// Store double answering bitmap queries from a fixed set of offsets.
    fn bitmap_store(set: Vec<u64>, positional_calls: Arc<AtomicUsize>) -> MockConquestStore {
        let mut store = MockConquestStore::new();
        let counted = set.clone();
        store
            .expect_bit_count()
            .times(usize::try_from(FIELD_COUNT / BATCH_SIZE).expect("window count"))
            .returning(move |_, range| {
                Ok(counted
                    .iter()
                    .filter(|o| **o >= range.start() && **o <= range.end())
                    .count() as u64)
            });
        store.expect_first_set_bit().returning(move |_, range| {
            positional_calls.fetch_add(1, Ordering::Relaxed);
            Ok(set
                .iter()
                .copied()
                .filter(|o| *o >= range.start() && *o <= range.end())
                .min())
        });
        store
    }

    #[rstest]
    #[tokio::test]
    async fn enumerate_returns_sorted_offsets_with_one_query_per_bit() {
        let set = vec![0, 42, 999, 1000, 500_500, 999_999];
        let calls = Arc::new(AtomicUsize::new(0));
        let index = OwnershipIndex::new(Arc::new(bitmap_store(set.clone(), Arc::clone(&calls))));

        let fields = index
            .enumerate(&alice(), Channel::Restful)
            .await
            .expect("enumerate");

        let ids: Vec<u64> = fields.iter().map(|f| f.bit_offset()).collect();
        assert_eq!(ids, set);
        assert_eq!(calls.load(Ordering::Relaxed), set.len());
    }

    #[rstest]
    #[tokio::test]
    async fn empty_bitmap_costs_only_window_counts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let index = OwnershipIndex::new(Arc::new(bitmap_store(Vec::new(), Arc::clone(&calls))));

        let fields = index
            .enumerate(&alice(), Channel::Grpc)
            .await
            .expect("enumerate");
        assert!(fields.is_empty());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn out_of_window_position_is_rejected() {
        let mut store = MockConquestStore::new();
        store.expect_bit_count().returning(|_, _| Ok(1));
        store
            .expect_first_set_bit()
            .returning(|_, _| Ok(Some(5_000)));

        let index = OwnershipIndex::new(Arc::new(store));
        let err = index
            .enumerate(&alice(), Channel::Webservice)
            .await
            .expect_err("bad reply");
        assert_eq!(err.code(), ErrorCode::StoreFailure);
    }

    #[rstest]
    #[case(false, true)]
    #[case(true, false)]
    #[tokio::test]
    async fn set_bit_reports_whether_bit_was_new(#[case] previous: bool, #[case] fresh: bool) {
        let mut store = MockConquestStore::new();
        store
            .expect_set_bit()
            .withf(|key, offset, value| {
                key == "user:alice:conquerField:restful" && *offset == 42 && *value
            })
            .times(1)
            .returning(move |_, _, _| Ok(previous));

        let index = OwnershipIndex::new(Arc::new(store));
        let field = FieldId::new(42).expect("valid field");
        let newly_set = index
            .set_bit(&alice(), Channel::Restful, field)
            .await
            .expect("set bit");
        assert_eq!(newly_set, fresh);
    }

    #[rstest]
    #[tokio::test]
    async fn seeding_touches_every_channel_bitmap() {
        let mut store = MockConquestStore::new();
        store
            .expect_set_bit()
            .with(always(), mockall::predicate::eq(0), mockall::predicate::eq(false))
            .times(Channel::ALL.len())
            .returning(|_, _, _| Ok(false));

        OwnershipIndex::new(Arc::new(store))
            .seed_user(&alice())
            .await
            .expect("seed");
    }
}
