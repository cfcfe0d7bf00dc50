//! Process-local [`ConquestStore`] for tests, demos and the `--in-memory` CLI
//! mode.
//!
//! Mirrors the Redis semantics the domain relies on: bitmaps are MSB-first
//! within each byte, ranked sets order by score then member, and string keys
//! expire against an injected [`Clock`]. Expired keys are dropped when read
//! and swept on every expiring write, so issued tokens do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{BitRange, ConquestStore, RankedMember, StoreError};

/// Largest bit offset Redis accepts in `SETBIT`.
const MAX_BIT_OFFSET: u64 = (1 << 32) - 1;

#[derive(Default)]
struct State {
    strings: HashMap<String, Entry>,
    hashes: HashMap<String, HashMap<String, String>>,
    bitmaps: HashMap<String, Vec<u8>>,
    ranked: HashMap<String, HashMap<String, u64>>,
}

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-memory store guarded by a single mutex.
pub struct InMemoryConquestStore {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryConquestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConquestStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Create an empty store whose expiries follow `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::connection("in-memory store lock poisoned"))
    }
}

fn bit_mask(offset: u64) -> u8 {
    0x80 >> (offset % 8)
}

fn byte_index(offset: u64) -> Result<usize, StoreError> {
    usize::try_from(offset / 8)
        .map_err(|_| StoreError::command(format!("bit offset {offset} out of range")))
}

fn bit_is_set(bitmap: &[u8], offset: u64) -> bool {
    byte_index(offset)
        .ok()
        .and_then(|index| bitmap.get(index))
        .is_some_and(|byte| byte & bit_mask(offset) != 0)
}

/// Offsets of `range` that fall inside the allocated part of `bitmap`.
fn allocated(bitmap: &[u8], range: BitRange) -> impl Iterator<Item = u64> + use<> {
    let len_bits = (bitmap.len() as u64).saturating_mul(8);
    let end = range.end().min(len_bits.saturating_sub(1));
    let start = if len_bits == 0 { 1 } else { range.start() };
    start..=end
}

#[async_trait]
impl ConquestStore for InMemoryConquestStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(drop)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.utc();
        let mut state = self.lock()?;
        match state.strings.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                state.strings.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|err| StoreError::command(format!("invalid expire time: {err}")))?;
        let now = self.clock.utc();
        let expires_at = now + ttl;
        let mut state = self.lock()?;
        state.strings.retain(|_, entry| entry.is_live(now));
        state.strings.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let now = self.clock.utc();
        let mut state = self.lock()?;
        let current = match state.strings.get(key) {
            Some(entry) if entry.is_live(now) => entry.value.parse::<u64>().map_err(|_| {
                StoreError::command("value is not an integer or out of range")
            })?,
            _ => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::command("increment or decrement would overflow"))?;
        state.strings.insert(
            key.to_owned(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn hash_get(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        let state = self.lock()?;
        let hash = state.hashes.get(key);
        Ok(fields
            .iter()
            .map(|field| hash.and_then(|h| h.get(field)).cloned())
            .collect())
    }

    async fn hash_set(&self, key: &str, entries: &[(String, String)]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let hash = state.hashes.entry(key.to_owned()).or_default();
        for (field, value) in entries {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hash_create(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> Result<bool, StoreError> {
        if entries.is_empty() {
            return Err(StoreError::command("wrong number of arguments for 'hset'"));
        }
        let mut state = self.lock()?;
        if state.hashes.get(key).is_some_and(|hash| !hash.is_empty()) {
            return Ok(false);
        }
        state
            .hashes
            .insert(key.to_owned(), entries.iter().cloned().collect());
        Ok(true)
    }

    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<bool, StoreError> {
        if offset > MAX_BIT_OFFSET {
            return Err(StoreError::command("bit offset is not an integer or out of range"));
        }
        let index = byte_index(offset)?;
        let mut state = self.lock()?;
        let bitmap = state.bitmaps.entry(key.to_owned()).or_default();
        if bitmap.len() <= index {
            bitmap.resize(index + 1, 0);
        }
        let mask = bit_mask(offset);
        let Some(byte) = bitmap.get_mut(index) else {
            return Err(StoreError::command(format!("bit offset {offset} out of range")));
        };
        let previous = *byte & mask != 0;
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        Ok(previous)
    }

    async fn bit_count(&self, key: &str, range: BitRange) -> Result<u64, StoreError> {
        let state = self.lock()?;
        let Some(bitmap) = state.bitmaps.get(key) else {
            return Ok(0);
        };
        Ok(allocated(bitmap, range)
            .filter(|offset| bit_is_set(bitmap, *offset))
            .count() as u64)
    }

    async fn first_set_bit(&self, key: &str, range: BitRange) -> Result<Option<u64>, StoreError> {
        let state = self.lock()?;
        let Some(bitmap) = state.bitmaps.get(key) else {
            return Ok(None);
        };
        Ok(allocated(bitmap, range).find(|offset| bit_is_set(bitmap, *offset)))
    }

    async fn ranked_add(&self, key: &str, member: &str, score: u64) -> Result<(), StoreError> {
        self.lock()?
            .ranked
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned(), score);
        Ok(())
    }

    async fn ranked_increment(
        &self,
        key: &str,
        member: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let score = state
            .ranked
            .entry(key.to_owned())
            .or_default()
            .entry(member.to_owned())
            .or_insert(0);
        *score = score.saturating_add(delta);
        Ok(*score)
    }

    async fn ranked_members(&self, key: &str) -> Result<Vec<RankedMember>, StoreError> {
        let state = self.lock()?;
        let mut members: Vec<RankedMember> = state
            .ranked
            .get(key)
            .map(|set| {
                set.iter()
                    .map(|(member, score)| RankedMember::new(member.clone(), *score))
                    .collect()
            })
            .unwrap_or_default();
        members.sort_by(|a, b| (a.score, &a.member).cmp(&(b.score, &b.member)));
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MutableClock;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> InMemoryConquestStore {
        InMemoryConquestStore::new()
    }

    fn range(start: u64, end: u64) -> BitRange {
        BitRange::new(start, end).expect("ordered range")
    }

    #[rstest]
    #[tokio::test]
    async fn bits_are_msb_first(store: InMemoryConquestStore) {
        store.set_bit("bm", 0, true).await.expect("set");
        store.set_bit("bm", 9, true).await.expect("set");

        let state = store.lock().expect("lock");
        assert_eq!(state.bitmaps.get("bm"), Some(&vec![0x80, 0x40]));
    }

    #[rstest]
    #[tokio::test]
    async fn set_bit_returns_previous_value(store: InMemoryConquestStore) {
        assert!(!store.set_bit("bm", 5, true).await.expect("first"));
        assert!(store.set_bit("bm", 5, true).await.expect("second"));
        assert!(store.set_bit("bm", 5, false).await.expect("clear"));
        assert_eq!(store.bit_count("bm", range(0, 7)).await.expect("count"), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn bit_queries_respect_inclusive_bounds(store: InMemoryConquestStore) {
        for offset in [3, 999, 1000, 1500] {
            store.set_bit("bm", offset, true).await.expect("set");
        }
        assert_eq!(store.bit_count("bm", range(0, 999)).await.expect("count"), 2);
        assert_eq!(store.bit_count("bm", range(1000, 1999)).await.expect("count"), 2);
        assert_eq!(
            store.first_set_bit("bm", range(4, 999)).await.expect("pos"),
            Some(999)
        );
        assert_eq!(
            store.first_set_bit("bm", range(1501, 90_000)).await.expect("pos"),
            None
        );
        assert_eq!(
            store.first_set_bit("missing", range(0, 10)).await.expect("pos"),
            None
        );
    }

    #[rstest]
    #[tokio::test]
    async fn zero_bit_seed_allocates_an_empty_bitmap(store: InMemoryConquestStore) {
        store.set_bit("bm", 0, false).await.expect("seed");
        assert_eq!(store.bit_count("bm", range(0, 999)).await.expect("count"), 0);
        assert_eq!(store.first_set_bit("bm", range(0, 999)).await.expect("pos"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn hash_create_keeps_first_writer_whole(store: InMemoryConquestStore) {
        let first = [
            ("id".to_owned(), "1".to_owned()),
            ("password".to_owned(), "pw1".to_owned()),
        ];
        let second = [("id".to_owned(), "2".to_owned())];
        assert!(store.hash_create("h", &first).await.expect("first"));
        assert!(!store.hash_create("h", &second).await.expect("second"));
        let slots = store
            .hash_get("h", &["id".to_owned(), "password".to_owned()])
            .await
            .expect("read");
        assert_eq!(slots, vec![Some("1".to_owned()), Some("pw1".to_owned())]);
    }

    #[rstest]
    #[tokio::test]
    async fn hash_create_refuses_an_existing_hash(store: InMemoryConquestStore) {
        store
            .hash_set("h", &[("legacy".to_owned(), "x".to_owned())])
            .await
            .expect("seed");
        let entries = [("id".to_owned(), "1".to_owned())];
        assert!(!store.hash_create("h", &entries).await.expect("create"));
    }

    #[rstest]
    #[tokio::test]
    async fn ranked_members_order_by_score_then_member(store: InMemoryConquestStore) {
        store.ranked_add("z", "carol", 2).await.expect("add");
        store.ranked_add("z", "bob", 1).await.expect("add");
        store.ranked_add("z", "alice", 2).await.expect("add");
        assert_eq!(store.ranked_increment("z", "bob", 5).await.expect("incr"), 6);

        let members: Vec<String> = store
            .ranked_members("z")
            .await
            .expect("members")
            .into_iter()
            .map(|m| m.member)
            .collect();
        assert_eq!(members, vec!["alice", "carol", "bob"]);
    }

    #[rstest]
    #[tokio::test]
    async fn increment_counts_from_one(store: InMemoryConquestStore) {
        assert_eq!(store.increment("n").await.expect("incr"), 1);
        assert_eq!(store.increment("n").await.expect("incr"), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn string_keys_expire_with_the_clock() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().expect("valid time");
        let clock = Arc::new(MutableClock::new(start));
        let store = InMemoryConquestStore::with_clock(clock.clone());

        store
            .set_with_ttl("token:x", "alice", Duration::from_secs(900))
            .await
            .expect("set");
        clock.advance_seconds(899);
        assert_eq!(store.get("token:x").await.expect("get"), Some("alice".to_owned()));
        clock.advance_seconds(1);
        assert_eq!(store.get("token:x").await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn expiring_writes_sweep_dead_keys() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().expect("valid time");
        let clock = Arc::new(MutableClock::new(start));
        let store = InMemoryConquestStore::with_clock(clock.clone());

        for key in ["token:a", "token:b"] {
            store
                .set_with_ttl(key, "alice", Duration::from_secs(60))
                .await
                .expect("set");
        }
        store.increment("usercount").await.expect("incr");
        clock.advance_seconds(60);
        store
            .set_with_ttl("token:c", "bob", Duration::from_secs(60))
            .await
            .expect("set");

        let state = store.lock().expect("lock");
        let mut keys: Vec<&str> = state.strings.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["token:c", "usercount"]);
    }
}
