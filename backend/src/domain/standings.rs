//! Read models returned to channel adapters: map rows and scoreboard entries.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Channel, FieldId, Username};

/// Current owner of a field on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOwner {
    /// Channel the ownership applies to.
    pub channel: Channel,
    /// Current owner, `None` while unclaimed.
    pub owner: Option<Username>,
}

/// One row of the map: a field with its owner on every channel.
///
/// ## Invariants
/// - `owners` holds one entry per channel in [`Channel::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOwners {
    /// The field.
    pub field_id: FieldId,
    /// Owner per channel.
    pub owners: Vec<ChannelOwner>,
}

impl FieldOwners {
    /// Owner on a given channel, if claimed.
    pub fn owner(&self, channel: Channel) -> Option<&Username> {
        self.owners
            .iter()
            .find(|entry| entry.channel == channel)
            .and_then(|entry| entry.owner.as_ref())
    }
}

/// Claim counters for one user.
///
/// ## Serialization
/// `{"username": "alice", "total": 2, "perChannel": {"webservice": 0, ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    /// The user.
    pub username: Username,
    /// Claims across all channels.
    pub total: u64,
    /// Claims per channel; every channel is present.
    pub per_channel: BTreeMap<Channel, u64>,
}

impl ScoreEntry {
    /// An entry with every counter at zero.
    pub fn zeroed(username: Username) -> Self {
        Self {
            username,
            total: 0,
            per_channel: Channel::ALL.into_iter().map(|c| (c, 0)).collect(),
        }
    }

    /// Claims on one channel.
    pub fn channel(&self, channel: Channel) -> u64 {
        self.per_channel.get(&channel).copied().unwrap_or(0)
    }

    /// Order entries for display: highest total first, ties by username.
    pub fn ranked(mut entries: Vec<Self>) -> Vec<Self> {
        entries.sort_by(|a, b| {
            (Reverse(a.total), &a.username).cmp(&(Reverse(b.total), &b.username))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> Username {
        Username::new(raw).expect("valid username")
    }

    fn entry(raw: &str, total: u64) -> ScoreEntry {
        ScoreEntry {
            total,
            ..ScoreEntry::zeroed(name(raw))
        }
    }

    #[test]
    fn zeroed_entry_lists_every_channel() {
        let entry = ScoreEntry::zeroed(name("alice"));
        assert_eq!(entry.per_channel.len(), Channel::ALL.len());
        assert!(Channel::ALL.iter().all(|c| entry.channel(*c) == 0));
    }

    #[test]
    fn ranking_orders_by_total_then_name() {
        let ranked =
            ScoreEntry::ranked(vec![entry("carol", 1), entry("bob", 5), entry("alice", 1)]);
        let names: Vec<&str> = ranked.iter().map(|e| e.username.as_ref()).collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);
    }

    #[test]
    fn score_entry_serialises_channel_labels() {
        let json = serde_json::to_value(entry("alice", 2)).expect("serialise");
        assert_eq!(json["perChannel"]["restful"], serde_json::json!(0));
        assert_eq!(json["total"], serde_json::json!(2));
    }

    #[test]
    fn owner_lookup_by_channel() {
        let row = FieldOwners {
            field_id: FieldId::new(42).expect("valid"),
            owners: vec![
                ChannelOwner {
                    channel: Channel::Webservice,
                    owner: None,
                },
                ChannelOwner {
                    channel: Channel::Restful,
                    owner: Some(name("bob")),
                },
            ],
        };
        assert_eq!(row.owner(Channel::Restful), Some(&name("bob")));
        assert_eq!(row.owner(Channel::Webservice), None);
    }
}
