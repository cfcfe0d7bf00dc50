//! Persisted key layout.
//!
//! These names are a storage contract shared with existing deployments and
//! must not change:
//!
//! | key                                       | kind       | contents                 |
//! |-------------------------------------------|------------|--------------------------|
//! | `user:<username>`                         | hash       | `password`, `id`         |
//! | `fields:<channel>:conquerer`              | hash       | field id → username      |
//! | `user:<username>:conquerField:<channel>`  | bitmap     | one bit per field        |
//! | `token:<token>`                           | string+TTL | username                 |
//! | `usercount`                               | integer    | last assigned user id    |
//! | `users`                                   | ranked set | username → id            |
//! | `score:conquerCount`                      | ranked set | username → total claims  |
//! | `score:conquerHistory:<channel>`          | ranked set | username → channel claims|

use crate::domain::{Channel, Username};

/// Hash field holding the password credential in a user record.
pub const USER_PASSWORD_FIELD: &str = "password";

/// Hash field holding the assigned id in a user record.
pub const USER_ID_FIELD: &str = "id";

/// Global user id counter.
pub const USER_COUNT: &str = "usercount";

/// Ranked set of every registered user, scored by id.
pub const USERS: &str = "users";

/// Ranked set of total claims per user.
pub const TOTAL_SCORE: &str = "score:conquerCount";

/// User record hash.
pub fn user(username: &Username) -> String {
    format!("user:{username}")
}

/// Current-owner hash for one channel.
pub fn ledger(channel: Channel) -> String {
    format!("fields:{channel}:conquerer")
}

/// Claim history bitmap for one user on one channel.
pub fn ownership(username: &Username, channel: Channel) -> String {
    format!("user:{username}:conquerField:{channel}")
}

/// Token-to-username mapping.
pub fn token(token: &str) -> String {
    format!("token:{token}")
}

/// Ranked set of claims on one channel.
pub fn channel_score(channel: Channel) -> String {
    format!("score:conquerHistory:{channel}")
}
