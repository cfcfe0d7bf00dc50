//! Domain primitives, components and the game service.
//!
//! Purpose: model the contested field grid, its four claim channels, users
//! and sessions, and implement the game rules over the [`ports::ConquestStore`]
//! abstraction. Nothing here knows which store backs it.
//!
//! Public surface:
//! - Value types: [`Channel`], [`FieldId`], [`FieldRange`], [`Username`],
//!   [`User`], [`LoginCredentials`], [`SessionToken`].
//! - Read models: [`FieldOwners`], [`ScoreEntry`].
//! - Components: [`TokenAuthority`], [`UserDirectory`], [`FieldLedger`],
//!   [`OwnershipIndex`], [`ScoreBoard`].
//! - [`ConquestService`], implementing the driving ports.
//! - [`Error`] and [`ErrorCode`], the failure vocabulary of every operation.

pub mod auth;
pub mod channel;
pub mod conquest_service;
pub mod error;
pub mod field;
pub mod field_ledger;
pub mod keys;
pub mod ownership_index;
pub mod ports;
pub mod score_board;
pub mod standings;
pub mod token;
pub mod token_authority;
pub mod user;
pub mod user_directory;

pub use self::auth::{
    CredentialHashError, LoginCredentials, LoginValidationError, PasswordCredential,
};
pub use self::channel::{Channel, ChannelParseError};
pub use self::conquest_service::ConquestService;
pub use self::error::{DomainError, Error, ErrorCode, ErrorValidationError};
pub use self::field::{
    BATCH_SIZE, Batches, FIELD_COUNT, FieldId, FieldRange, FieldValidationError,
};
pub use self::field_ledger::FieldLedger;
pub use self::ownership_index::OwnershipIndex;
pub use self::score_board::ScoreBoard;
pub use self::standings::{ChannelOwner, FieldOwners, ScoreEntry};
pub use self::token::{SessionToken, TOKEN_BYTES, TOKEN_TTL};
pub use self::token_authority::TokenAuthority;
pub use self::user::{USERNAME_MAX, User, UserId, UserValidationError, Username};
pub use self::user_directory::{UserDirectory, UserRecord};
