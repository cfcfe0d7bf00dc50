//! The fixed set of access channels a field can be claimed through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a label does not name one of the four channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelParseError {
    label: String,
}

impl ChannelParseError {
    /// The label that failed to parse.
    pub fn label(&self) -> &str {
        self.label.as_str()
    }
}

impl fmt::Display for ChannelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown channel '{}'; expected one of webservice, restful, graphql, grpc",
            self.label
        )
    }
}

impl std::error::Error for ChannelParseError {}

/// Access path used to claim a field.
///
/// The set is closed: these four labels are part of the persisted key layout
/// and cannot be extended at runtime.
///
/// # Examples
/// ```
/// use field_conquest::domain::Channel;
///
/// let channel: Channel = "restful".parse().unwrap();
/// assert_eq!(channel, Channel::Restful);
/// assert_eq!(channel.as_str(), "restful");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Generic polling web service.
    Webservice,
    /// REST API.
    Restful,
    /// GraphQL API.
    Graphql,
    /// gRPC API.
    Grpc,
}

impl Channel {
    /// Every channel, in canonical order.
    pub const ALL: [Self; 4] = [Self::Webservice, Self::Restful, Self::Graphql, Self::Grpc];

    /// Label used in store keys and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Webservice => "webservice",
            Self::Restful => "restful",
            Self::Graphql => "graphql",
            Self::Grpc => "grpc",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s)
            .ok_or_else(|| ChannelParseError {
                label: s.to_owned(),
            })
    }
}
