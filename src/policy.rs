//! Policy and meta-policy types.
//!
//! A policy is a named collection of declarative rules published by one
//! issuer. A meta-policy ranks issuer authority and only participates in
//! conflict resolution, never in path validation itself.
//!
//! Statement syntax is validated by the rule solver at creation/update time
//! (see [`crate::engine::PolicyManager`]); the types here only hold the
//! source text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::issuer::Issuer;

/// Globally unique, stable policy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(Uuid);

impl PolicyId {
    /// Creates a new random policy ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a policy ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PolicyId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Globally unique, stable meta-policy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaPolicyId(Uuid);

impl MetaPolicyId {
    /// Creates a new random meta-policy ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a meta-policy ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MetaPolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MetaPolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named collection of declarative rules from one issuer.
///
/// Only active policies participate in path validation. Deactivation is
/// one-directional: a policy overridden by a stronger one stays inactive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique identifier.
    pub id: PolicyId,
    /// The issuer that published the policy.
    pub issuer: Issuer,
    /// Short human-readable title.
    pub title: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Rule program source text as uploaded by the issuer.
    pub statements: String,
    /// Whether the policy is currently in use (false once overridden).
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    /// Creates a new active policy.
    #[must_use]
    pub fn new(
        issuer: Issuer,
        title: impl Into<String>,
        statements: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PolicyId::new(),
            issuer,
            title: title.into(),
            description,
            statements: statements.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flags this policy as non-active.
    ///
    /// One-directional: there is no reactivation.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Bumps the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Rules defining the power hierarchy between issuers.
///
/// All active meta-policies are merged into one program whenever a single
/// conflict is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaPolicy {
    /// Unique identifier.
    pub id: MetaPolicyId,
    /// Rule program source text.
    pub statements: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl MetaPolicy {
    /// Creates a new meta-policy.
    #[must_use]
    pub fn new(statements: impl Into<String>) -> Self {
        Self {
            id: MetaPolicyId::new(),
            statements: statements.into(),
            created_at: Utc::now(),
        }
    }
}
