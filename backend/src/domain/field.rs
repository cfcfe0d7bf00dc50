//! Field identities and ranges over the fixed field space.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of claimable fields. Ids run over `0..FIELD_COUNT`.
pub const FIELD_COUNT: u32 = 1_000_000;

/// Upper bound on the number of fields touched by a single store request.
pub const BATCH_SIZE: u32 = 1000;

/// Validation errors for field ids and ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValidationError {
    /// The id lies outside `0..FIELD_COUNT`.
    OutOfRange { id: i64 },
    /// The range start is after its end.
    InvertedRange { start: i64, end: i64 },
}

impl fmt::Display for FieldValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { id } => {
                write!(f, "field id {id} is outside 0..{FIELD_COUNT}")
            }
            Self::InvertedRange { start, end } => {
                write!(f, "field range start {start} is after end {end}")
            }
        }
    }
}

impl std::error::Error for FieldValidationError {}

/// Identity of one field.
///
/// ## Invariants
/// - `0 <= id < FIELD_COUNT`.
///
/// # Examples
/// ```
/// use field_conquest::domain::{FieldId, FIELD_COUNT};
///
/// assert!(FieldId::new(42).is_ok());
/// assert!(FieldId::new(-1).is_err());
/// assert!(FieldId::new(i64::from(FIELD_COUNT)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct FieldId(u32);

impl FieldId {
    /// Validate a raw id received from a caller.
    pub fn new(raw: i64) -> Result<Self, FieldValidationError> {
        u32::try_from(raw)
            .ok()
            .filter(|id| *id < FIELD_COUNT)
            .map(Self)
            .ok_or(FieldValidationError::OutOfRange { id: raw })
    }

    /// Numeric value of the id.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Bit offset of this field inside an ownership bitmap.
    pub fn bit_offset(self) -> u64 {
        u64::from(self.0)
    }

    /// Decimal form used as a hash field name in the ledger.
    pub fn hash_field(self) -> String {
        self.0.to_string()
    }

    /// Recover a field id from a bitmap offset reported by the store.
    pub fn from_bit_offset(offset: u64) -> Result<Self, FieldValidationError> {
        let raw = i64::try_from(offset).unwrap_or(i64::MAX);
        Self::new(raw)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<FieldId> for u32 {
    fn from(value: FieldId) -> Self {
        value.0
    }
}

impl TryFrom<i64> for FieldId {
    type Error = FieldValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Inclusive range of field ids.
///
/// ## Invariants
/// - `start <= end`, both valid [`FieldId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRange {
    start: FieldId,
    end: FieldId,
}

impl FieldRange {
    /// Validate an inclusive `[start, end]` range from raw caller input.
    pub fn new(start: i64, end: i64) -> Result<Self, FieldValidationError> {
        if start > end {
            return Err(FieldValidationError::InvertedRange { start, end });
        }
        Ok(Self {
            start: FieldId::new(start)?,
            end: FieldId::new(end)?,
        })
    }

    /// The whole field space.
    pub fn all() -> Self {
        Self {
            start: FieldId(0),
            end: FieldId(FIELD_COUNT - 1),
        }
    }

    /// First field in the range.
    pub fn start(&self) -> FieldId {
        self.start
    }

    /// Last field in the range (inclusive).
    pub fn end(&self) -> FieldId {
        self.end
    }

    /// Number of fields covered.
    pub fn len(&self) -> usize {
        // Bounded by FIELD_COUNT, so the widening is lossless.
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always covers at least one field.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every id in the range, ascending.
    pub fn ids(&self) -> impl Iterator<Item = FieldId> + use<> {
        (self.start.0..=self.end.0).map(FieldId)
    }

    /// Split into consecutive sub-ranges of at most `size` fields, in order.
    ///
    /// A `size` of zero is treated as one.
    pub fn batches(&self, size: u32) -> Batches {
        Batches {
            next: Some(self.start.0),
            end: self.end.0,
            size: size.max(1),
        }
    }
}

/// Iterator returned by [`FieldRange::batches`].
#[derive(Debug, Clone)]
pub struct Batches {
    next: Option<u32>,
    end: u32,
    size: u32,
}

impl Iterator for Batches {
    type Item = FieldRange;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.size - 1).min(self.end);
        self.next = end.checked_add(1).filter(|next| *next <= self.end);
        Some(FieldRange {
            start: FieldId(start),
            end: FieldId(end),
        })
    }
}
