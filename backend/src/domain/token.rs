//! Opaque session tokens handed out at login.

use std::fmt;
use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Random bytes per token before hex encoding.
pub const TOKEN_BYTES: usize = 20;

/// How long a token stays resolvable after it is issued.
pub const TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// High-entropy bearer token mapping to a username until it expires.
///
/// The value is 40 lowercase hex characters. Tokens are never parsed or
/// validated on the way in; an unknown string simply fails to resolve.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Draw a fresh token from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token presented by a caller.
    pub fn from_presented(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The token string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}
