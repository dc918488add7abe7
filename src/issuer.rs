//! Issuer identity types.
//!
//! An issuer is a policy author: anything from an individual operator to a
//! governmental agency. Every policy is owned by exactly one issuer, and the
//! authority hierarchy between issuers is what meta-policies rank.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Globally unique, stable issuer identifier.
///
/// # Examples
///
/// ```
/// use pathvet::IssuerId;
///
/// let id = IssuerId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerId(Uuid);

impl IssuerId {
    /// Creates a new random issuer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an issuer ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for IssuerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IssuerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for IssuerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<IssuerId> for Uuid {
    fn from(id: IssuerId) -> Self {
        id.0
    }
}

/// Name of the issuer created lazily when an installation has none.
pub const DEFAULT_ISSUER_NAME: &str = "local";

/// A policy author.
///
/// Immutable except for `name` (explicit rename) and the timestamps. At most
/// one issuer per installation carries the `default` flag; it is created on
/// first request if absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issuer {
    /// Unique identifier.
    pub id: IssuerId,
    /// Name of the issuing body or individual.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Whether this is the installation default issuer.
    pub default: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Issuer {
    /// Creates a new issuer.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IssuerNameTooShort` if `name` is not longer
    /// than one character.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        default: bool,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.chars().count() <= 1 {
            return Err(ValidationError::IssuerNameTooShort { name });
        }
        let now = Utc::now();
        Ok(Self {
            id: IssuerId::new(),
            name,
            description,
            default,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates the installation default issuer.
    pub fn new_default() -> Self {
        // The constant name always passes the length check.
        Self::new(
            DEFAULT_ISSUER_NAME,
            Some("Default issuer for this installation".to_string()),
            true,
        )
        .expect("default issuer name is valid")
    }

    /// Changes the name of the issuer.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IssuerNameTooShort` if the new name is not
    /// longer than one character.
    pub fn rename(&mut self, new_name: impl Into<String>) -> Result<(), ValidationError> {
        let new_name = new_name.into();
        if new_name.chars().count() <= 1 {
            return Err(ValidationError::IssuerNameTooShort { name: new_name });
        }
        self.name = new_name;
        self.updated_at = Utc::now();
        Ok(())
    }
}
