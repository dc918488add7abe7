//! In-memory store backends.
//!
//! Thread-safe reference implementations of the store traits, intended for
//! tests, embedded use, and the standalone server.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::issuer::{Issuer, IssuerId};
use crate::policy::{MetaPolicy, MetaPolicyId, Policy, PolicyId};
use crate::store::traits::{IssuerStore, MetaPolicyStore, PolicyStore, StoreError};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::BackendError(format!("poisoned lock: {context}"))
}

/// In-memory `PolicyStore`.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    state: RwLock<HashMap<PolicyId, Policy>>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn add(&self, policy: Policy) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("policies"))?;
        state.insert(policy.id, policy);
        Ok(())
    }

    fn remove(&self, id: PolicyId) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("policies"))?;
        state
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::PolicyNotFound(id))
    }

    fn get_by_id(&self, id: PolicyId) -> Result<Option<Policy>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("policies"))?;
        Ok(state.get(&id).cloned())
    }

    fn get_all(&self) -> Result<Vec<Policy>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("policies"))?;
        let mut out: Vec<Policy> = state.values().cloned().collect();
        out.sort_by_key(|p| p.created_at);
        Ok(out)
    }

    fn get_all_active(&self) -> Result<Vec<Policy>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("policies"))?;
        let mut out: Vec<Policy> = state.values().filter(|p| p.active).cloned().collect();
        out.sort_by_key(|p| p.created_at);
        Ok(out)
    }

    fn get_by_issuer_id(&self, issuer_id: IssuerId) -> Result<Vec<Policy>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("policies"))?;
        let mut out: Vec<Policy> = state
            .values()
            .filter(|p| p.issuer.id == issuer_id)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.created_at);
        Ok(out)
    }

    fn get_max_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("policies"))?;
        Ok(state.values().map(|p| p.created_at).max())
    }
}

/// In-memory `MetaPolicyStore`.
#[derive(Debug, Default)]
pub struct InMemoryMetaPolicyStore {
    state: RwLock<HashMap<MetaPolicyId, MetaPolicy>>,
}

impl InMemoryMetaPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetaPolicyStore for InMemoryMetaPolicyStore {
    fn add(&self, meta_policy: MetaPolicy) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("meta-policies"))?;
        state.insert(meta_policy.id, meta_policy);
        Ok(())
    }

    fn remove(&self, id: MetaPolicyId) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("meta-policies"))?;
        state
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::MetaPolicyNotFound(id))
    }

    fn get_by_id(&self, id: MetaPolicyId) -> Result<Option<MetaPolicy>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("meta-policies"))?;
        Ok(state.get(&id).cloned())
    }

    fn get_all_active(&self) -> Result<Vec<MetaPolicy>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("meta-policies"))?;
        let mut out: Vec<MetaPolicy> = state.values().cloned().collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    fn get_max_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("meta-policies"))?;
        Ok(state.values().map(|m| m.created_at).max())
    }
}

/// In-memory `IssuerStore`.
#[derive(Debug, Default)]
pub struct InMemoryIssuerStore {
    state: RwLock<HashMap<IssuerId, Issuer>>,
}

impl InMemoryIssuerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IssuerStore for InMemoryIssuerStore {
    fn add(&self, issuer: Issuer) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("issuers"))?;
        state.insert(issuer.id, issuer);
        Ok(())
    }

    fn remove(&self, id: IssuerId) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("issuers"))?;
        state
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::IssuerNotFound(id))
    }

    fn get_by_id(&self, id: IssuerId) -> Result<Option<Issuer>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("issuers"))?;
        Ok(state.get(&id).cloned())
    }

    fn get_one_default(&self) -> Result<Option<Issuer>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("issuers"))?;
        Ok(state.values().find(|i| i.default).cloned())
    }
}
