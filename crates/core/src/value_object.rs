//! Value objects: equality by value, not identity.
//!
//! Value objects are immutable and compared by their attribute values. Two
//! `VaccineName("BCG")` instances are the same vaccine; there is no identity to
//! track.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// The trait requires:
/// - **Clone**: value objects are cheap to copy
/// - **PartialEq**: value objects are compared by value
/// - **Debug**: value objects show up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Name of a vaccine type (e.g. `BCG`, `OPV-0 (Polio 0 dose)`).
///
/// Trimmed and non-empty. Matching is exact (case-sensitive), the way stock
/// entries, assignments and card entries are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VaccineName(String);

impl VaccineName {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("vaccine_name cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for VaccineName {}

impl TryFrom<String> for VaccineName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<VaccineName> for String {
    fn from(value: VaccineName) -> Self {
        value.0
    }
}

impl core::fmt::Display for VaccineName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Citizen birth-registration identifier.
///
/// Unique per citizen and independent of the citizen's account id; vaccine
/// cards are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BirthId(String);

impl BirthId {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("birth id cannot be empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("birth id cannot contain whitespace"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for BirthId {}

impl TryFrom<String> for BirthId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BirthId> for String {
    fn from(value: BirthId) -> Self {
        value.0
    }
}

impl core::fmt::Display for BirthId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
