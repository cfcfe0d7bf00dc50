//! User data model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum allowed length for a username, in characters.
pub const USERNAME_MAX: usize = 64;

/// Validation errors returned by [`Username::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Username was empty or whitespace only.
    EmptyUsername,
    /// Username exceeded [`USERNAME_MAX`] characters.
    UsernameTooLong { max: usize },
    /// Username contained whitespace or the `:` key separator.
    UsernameInvalidCharacters,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::UsernameInvalidCharacters => {
                write!(f, "username must not contain whitespace or ':'")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Unique account name. Also the member key of every per-user store entry.
///
/// ## Invariants
/// - Names built with [`Username::new`] are non-empty, at most
///   [`USERNAME_MAX`] characters, and contain no whitespace and no `:`, so
///   they embed in store keys without ambiguity.
/// - Names read back from the store ([`Username::from_stored`]) are taken
///   verbatim; records written before these rules existed stay readable.
///
/// # Examples
/// ```
/// use field_conquest::domain::Username;
///
/// let name = Username::new("alice").unwrap();
/// assert_eq!(name.as_ref(), "alice");
/// assert!(Username::new("ali:ce").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(raw.as_ref().to_owned())
    }

    /// Wrap a name read back from the store without re-validating it.
    ///
    /// # Examples
    /// ```
    /// use field_conquest::domain::Username;
    ///
    /// let legacy = Username::from_stored("john doe");
    /// assert_eq!(legacy.as_ref(), "john doe");
    /// ```
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn from_owned(raw: String) -> Result<Self, UserValidationError> {
        if raw.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if raw.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        if raw.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        Ok(Self(raw))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Sequential identifier assigned at registration. Never reused or changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Wrap a raw id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Numeric value of the id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public view of a registered user.
///
/// ## Serialization
/// `{"id": 1, "username": "alice"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: Username,
}

impl User {
    /// Build a user from its parts.
    pub fn new(id: UserId, username: Username) -> Self {
        Self { id, username }
    }

    /// Assigned id.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Unique username.
    pub fn username(&self) -> &Username {
        &self.username
    }
}
