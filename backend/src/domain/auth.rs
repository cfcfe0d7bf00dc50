//! Authentication primitives: login credentials and stored password
//! credentials.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before an adapter talks to the service.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::domain::{UserValidationError, Username};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Username was missing, blank once trimmed, or otherwise malformed.
    InvalidUsername(UserValidationError),
    /// Password was empty.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUsername(err) => write!(f, "{err}"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated credentials used by registration and login.
///
/// ## Invariants
/// - `username` is trimmed and satisfies [`Username`] validation.
/// - `password` is non-empty but retains caller-provided whitespace to avoid
///   surprising credential comparisons.
///
/// # Examples
/// ```
/// use field_conquest::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" alice ", "pw1").unwrap();
/// assert_eq!(creds.username().as_ref(), "alice");
/// assert_eq!(creds.password(), "pw1");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: Username,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let username =
            Username::new(username.trim()).map_err(LoginValidationError::InvalidUsername)?;

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            username,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Construct credentials for signing in to an existing account.
    ///
    /// Only emptiness is checked: accounts created before the username rules
    /// existed must still be able to log in, so the name is used verbatim.
    ///
    /// # Examples
    /// ```
    /// use field_conquest::domain::LoginCredentials;
    ///
    /// let creds = LoginCredentials::for_existing("john doe", "pw1").unwrap();
    /// assert_eq!(creds.username().as_ref(), "john doe");
    /// ```
    pub fn for_existing(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        if username.trim().is_empty() {
            return Err(LoginValidationError::InvalidUsername(
                UserValidationError::EmptyUsername,
            ));
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            username: Username::from_stored(username),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Username suitable for user lookups.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Failure to derive a password hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to hash password: {message}")]
pub struct CredentialHashError {
    message: String,
}

/// Password credential as persisted in the user record.
///
/// New credentials are Argon2id PHC strings with a per-user random salt.
/// Records written before hashing was introduced hold the plaintext password;
/// those are still accepted and compared in constant time.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordCredential(String);

impl PasswordCredential {
    /// Hash a password with a fresh salt.
    ///
    /// # Examples
    /// ```
    /// use field_conquest::domain::PasswordCredential;
    ///
    /// let credential = PasswordCredential::hash("pw1").unwrap();
    /// assert!(credential.as_stored().starts_with("$argon2"));
    /// assert!(credential.verify("pw1"));
    /// assert!(!credential.verify("pw2"));
    /// ```
    pub fn hash(password: &str) -> Result<Self, CredentialHashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|err| CredentialHashError {
                message: err.to_string(),
            })
    }

    /// Wrap a value read back from the store.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Value to persist.
    pub fn as_stored(&self) -> &str {
        self.0.as_str()
    }

    /// Check a candidate password against this credential.
    pub fn verify(&self, password: &str) -> bool {
        match PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => self.0.as_bytes().ct_eq(password.as_bytes()).into(),
        }
    }
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordCredential(<redacted>)")
    }
}
