//! Abstract store traits.
//!
//! These traits define the contract that storage backends must implement.
//! Mutations are committed by the caller's transaction boundary; the core
//! never caches entities across calls and re-reads active sets fresh on
//! every orchestrator call.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::issuer::{Issuer, IssuerId};
use crate::policy::{MetaPolicy, MetaPolicyId, Policy, PolicyId};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Policy not found.
    #[error("Policy not found: {0}")]
    PolicyNotFound(PolicyId),

    /// Meta-policy not found.
    #[error("Meta-policy not found: {0}")]
    MetaPolicyNotFound(MetaPolicyId),

    /// Issuer not found.
    #[error("Issuer not found: {0}")]
    IssuerNotFound(IssuerId),

    /// Backend error.
    #[error("Store backend error: {0}")]
    BackendError(String),
}

/// Store contract for `Policy` entities.
///
/// # Safety Considerations
/// - All mutations should be atomic where possible
/// - Implementations should handle concurrent access safely
pub trait PolicyStore: Send + Sync {
    /// Insert a new policy or replace the policy with the same identifier.
    fn add(&self, policy: Policy) -> Result<(), StoreError>;

    /// Remove a policy by ID. Returns error if not found.
    fn remove(&self, id: PolicyId) -> Result<(), StoreError>;

    /// Get a policy by ID.
    fn get_by_id(&self, id: PolicyId) -> Result<Option<Policy>, StoreError>;

    /// Fetch all policies, active or not (ascending by creation time).
    fn get_all(&self) -> Result<Vec<Policy>, StoreError>;

    /// Fetch all policies flagged as active (ascending by creation time).
    fn get_all_active(&self) -> Result<Vec<Policy>, StoreError>;

    /// Fetch all policies published by one issuer.
    fn get_by_issuer_id(&self, issuer_id: IssuerId) -> Result<Vec<Policy>, StoreError>;

    /// Latest policy creation timestamp, if any policy exists.
    fn get_max_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
}

/// Store contract for `MetaPolicy` entities.
pub trait MetaPolicyStore: Send + Sync {
    /// Insert a new meta-policy or replace the one with the same identifier.
    fn add(&self, meta_policy: MetaPolicy) -> Result<(), StoreError>;

    /// Remove a meta-policy by ID. Returns error if not found.
    fn remove(&self, id: MetaPolicyId) -> Result<(), StoreError>;

    /// Get a meta-policy by ID.
    fn get_by_id(&self, id: MetaPolicyId) -> Result<Option<MetaPolicy>, StoreError>;

    /// Fetch all active meta-policies (ascending by creation time).
    fn get_all_active(&self) -> Result<Vec<MetaPolicy>, StoreError>;

    /// Latest meta-policy creation timestamp, if any exists.
    fn get_max_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
}

/// Store contract for `Issuer` entities.
pub trait IssuerStore: Send + Sync {
    /// Insert a new issuer or replace the one with the same identifier.
    fn add(&self, issuer: Issuer) -> Result<(), StoreError>;

    /// Remove an issuer by ID. Returns error if not found.
    fn remove(&self, id: IssuerId) -> Result<(), StoreError>;

    /// Get an issuer by ID.
    fn get_by_id(&self, id: IssuerId) -> Result<Option<Issuer>, StoreError>;

    /// Fetch the installation default issuer, if one exists.
    fn get_one_default(&self) -> Result<Option<Issuer>, StoreError>;
}
