//! Policy lifecycle and path validation orchestrators.
//!
//! `PolicyManager` is the single entry point behind the service boundary.
//! Every call re-reads the active entity sets fresh and treats them as a
//! consistent snapshot; the core holds no caches across calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conflict::{ConflictResolution, ConflictResolver, MetaContext};
use crate::error::{ExecutionError, PathvetError, PathvetResult, ValidationError};
use crate::issuer::{Issuer, IssuerId};
use crate::path::Path;
use crate::policy::{Policy, PolicyId};
use crate::reading::HopReading;
use crate::solver::{RuleSolver, SolverError};
use crate::store::{IssuerStore, MetaPolicyStore, PolicyStore, StoreError};
use crate::telemetry::TelemetryProvider;
use crate::time::TimeInterval;
use crate::validate::PolicyValidator;

/// Verdict returned by path validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathVerdict {
    /// Fingerprint of the validated path.
    pub fingerprint: String,
    /// Whether the path complies with every standing policy.
    pub valid: bool,
}

/// Fields changed by a policy update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct PolicyUpdate {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement rule program source.
    pub statements: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
}

/// Solver failures outside syntax checks are dependency errors.
fn solver_failure(err: SolverError) -> PathvetError {
    PathvetError::Execution(ExecutionError::Solver(err))
}

/// The policy decision point.
///
/// Collaborators are injected once at construction and shared by reference;
/// there is no hidden global registry.
pub struct PolicyManager {
    policies: Arc<dyn PolicyStore>,
    meta_policies: Arc<dyn MetaPolicyStore>,
    issuers: Arc<dyn IssuerStore>,
    telemetry: Arc<dyn TelemetryProvider>,
    solver: Arc<dyn RuleSolver>,
}

impl PolicyManager {
    /// Creates a policy manager over the given collaborators.
    #[must_use]
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        meta_policies: Arc<dyn MetaPolicyStore>,
        issuers: Arc<dyn IssuerStore>,
        telemetry: Arc<dyn TelemetryProvider>,
        solver: Arc<dyn RuleSolver>,
    ) -> Self {
        Self {
            policies,
            meta_policies,
            issuers,
            telemetry,
            solver,
        }
    }

    // ------------------------------------------------------------------------
    // Policy lifecycle
    // ------------------------------------------------------------------------

    /// Creates a policy for an issuer.
    ///
    /// The statements are syntax-checked, then the new policy is compared
    /// against every currently active policy. For each conflicting pair the
    /// authority hierarchy decides a winner, and the loser is persisted
    /// deactivated. When the newcomer loses, creation still succeeds but
    /// the policy starts inactive. A conflict the hierarchy cannot resolve
    /// rejects the creation and leaves every existing policy untouched.
    ///
    /// # Errors
    ///
    /// `ValidationError::IssuerNotFound` for an unknown issuer,
    /// `ValidationError::InvalidStatements` for malformed rules,
    /// `ValidationError::UnresolvedConflictOnCreate` for an uncovered
    /// conflicting pair.
    pub fn create_policy(
        &self,
        issuer_id: IssuerId,
        title: impl Into<String>,
        statements: impl Into<String>,
        description: Option<String>,
    ) -> PathvetResult<Policy> {
        let issuer = self
            .issuers
            .get_by_id(issuer_id)?
            .ok_or(ValidationError::IssuerNotFound { id: issuer_id })?;

        let statements = statements.into();
        self.check_statements(&statements)?;

        let mut policy = Policy::new(issuer, title, statements, description);
        let resolver = ConflictResolver::new(self.solver.as_ref());

        let active = self.policies.get_all_active()?;
        let mut conflicting: Vec<&Policy> = Vec::new();
        for other in &active {
            if resolver
                .has_conflict(&policy, other)
                .map_err(solver_failure)?
            {
                debug!(new = %policy.id, other = %other.id, "conflict detected at creation");
                conflicting.push(other);
            }
        }

        // Nothing is persisted until every conflict has a winner, so a
        // rejected creation cannot leave a half-applied resolution behind.
        let mut demoted: Vec<Policy> = Vec::new();
        if !conflicting.is_empty() {
            let metas = self.meta_policies.get_all_active()?;
            let ctx = MetaContext::new(&metas);

            for other in conflicting {
                match resolver
                    .resolve(&ctx, &policy, other)
                    .map_err(solver_failure)?
                {
                    ConflictResolution::NotResolved => {
                        return Err(
                            ValidationError::UnresolvedConflictOnCreate { other: other.id }.into()
                        );
                    }
                    ConflictResolution::Resolved { strong, .. } if strong == policy.id => {
                        let mut loser = other.clone();
                        loser.deactivate();
                        demoted.push(loser);
                    }
                    ConflictResolution::Resolved { .. } => {
                        // The newcomer lost; it is stored deactivated and no
                        // longer participates, so remaining pairs are moot.
                        policy.deactivate();
                        break;
                    }
                }
            }
        }

        for loser in demoted {
            warn!(policy = %loser.id, "deactivating policy overridden by newcomer");
            self.policies.add(loser)?;
        }
        self.policies.add(policy.clone())?;
        Ok(policy)
    }

    /// Applies an update to an existing policy.
    ///
    /// New statements go through the same syntax validation as creation.
    /// Conflict resolution is not re-run on update; operators who need it
    /// recreate the policy.
    ///
    /// # Errors
    ///
    /// `ValidationError::PolicyNotFound` for an unknown id,
    /// `ValidationError::InvalidStatements` for malformed rules.
    pub fn update_policy(&self, id: PolicyId, update: PolicyUpdate) -> PathvetResult<Policy> {
        let mut policy = self
            .policies
            .get_by_id(id)?
            .ok_or(ValidationError::PolicyNotFound { id })?;

        if let Some(statements) = update.statements {
            self.check_statements(&statements)?;
            policy.statements = statements;
        }
        if let Some(title) = update.title {
            policy.title = title;
        }
        if let Some(description) = update.description {
            policy.description = Some(description);
        }
        policy.touch();

        self.policies.add(policy.clone())?;
        Ok(policy)
    }

    /// Removes a policy. Deleting an unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Surfaces store backend failures.
    pub fn delete_policy(&self, id: PolicyId) -> PathvetResult<()> {
        match self.policies.remove(id) {
            Ok(()) | Err(StoreError::PolicyNotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches a policy by id.
    ///
    /// # Errors
    ///
    /// Surfaces store backend failures.
    pub fn get_policy(&self, id: PolicyId) -> PathvetResult<Option<Policy>> {
        Ok(self.policies.get_by_id(id)?)
    }

    /// Lists every policy, active or not.
    ///
    /// # Errors
    ///
    /// Surfaces store backend failures.
    pub fn list_policies(&self) -> PathvetResult<Vec<Policy>> {
        Ok(self.policies.get_all()?)
    }

    /// Returns the installation default issuer, creating it on first use.
    ///
    /// # Errors
    ///
    /// Surfaces store backend failures.
    pub fn default_issuer(&self) -> PathvetResult<Issuer> {
        if let Some(issuer) = self.issuers.get_one_default()? {
            return Ok(issuer);
        }
        let issuer = Issuer::new_default();
        self.issuers.add(issuer.clone())?;
        Ok(issuer)
    }

    /// Latest creation timestamp across policies and meta-policies.
    ///
    /// Falls back to the current time when both stores are empty, so clients
    /// polling for changes always get a usable watermark.
    ///
    /// # Errors
    ///
    /// Surfaces store backend failures.
    pub fn latest_policy_timestamp(&self) -> PathvetResult<DateTime<Utc>> {
        let policies = self.policies.get_max_created_at()?;
        let metas = self.meta_policies.get_max_created_at()?;
        Ok(policies
            .into_iter()
            .chain(metas)
            .max()
            .unwrap_or_else(Utc::now))
    }

    // ------------------------------------------------------------------------
    // Path validation
    // ------------------------------------------------------------------------

    /// Validates a path against every active policy.
    ///
    /// Telemetry is fetched per hop concurrently, every active policy is
    /// evaluated against the path and its readings, and the set of rejecting
    /// policies is then narrowed to a fixed point: a policy is exonerated
    /// once it is overridden by a stronger policy it conflicts with. The
    /// path is valid when no rejecting policy survives.
    ///
    /// # Errors
    ///
    /// `ExecutionError::ExternalService` if any hop fetch fails (no partial
    /// verdicts), `ExecutionError::ConflictUnresolved` if a conflicting pair
    /// has no determinable authority relationship.
    pub async fn validate_path(
        &self,
        path: &Path,
        interval: Option<TimeInterval>,
    ) -> PathvetResult<PathVerdict> {
        let interval = interval.unwrap_or_default();
        let readings = self.fetch_readings(path, &interval).await?;
        debug!(
            fingerprint = %path.fingerprint,
            readings = readings.len(),
            "collected hop readings"
        );

        let active = self.policies.get_all_active()?;
        let validator = PolicyValidator::new(self.solver.as_ref());

        let mut unsat: Vec<&Policy> = Vec::new();
        for policy in &active {
            let accepted = validator
                .validate(policy, path, &readings)
                .map_err(solver_failure)?;
            debug!(policy = %policy.id, accepted, "evaluated policy");
            if !accepted {
                unsat.push(policy);
            }
        }

        if unsat.is_empty() {
            return Ok(PathVerdict {
                fingerprint: path.fingerprint.clone(),
                valid: true,
            });
        }

        let metas = self.meta_policies.get_all_active()?;
        let resolver = ConflictResolver::new(self.solver.as_ref());
        let ctx = MetaContext::new(&metas);

        // Iterate to a fixed point over the rejecting set. Each round either
        // removes at least one policy or terminates, so the loop runs at
        // most |unsat| + 1 times.
        loop {
            let mut remaining: Vec<&Policy> = Vec::with_capacity(unsat.len());
            for &policy in &unsat {
                if self.is_overridden(&resolver, &ctx, policy, &active)? {
                    warn!(policy = %policy.id, "rejecting policy overridden during validation");
                } else {
                    remaining.push(policy);
                }
            }
            if remaining.len() == unsat.len() {
                break;
            }
            unsat = remaining;
        }

        Ok(PathVerdict {
            fingerprint: path.fingerprint.clone(),
            valid: unsat.is_empty(),
        })
    }

    /// True if `policy` loses at least one resolved conflict against another
    /// active policy.
    ///
    /// An unresolvable pair is fatal: it means the meta-policies do not
    /// cover an issuer pair that is actively in contention.
    fn is_overridden(
        &self,
        resolver: &ConflictResolver<'_>,
        ctx: &MetaContext,
        policy: &Policy,
        active: &[Policy],
    ) -> PathvetResult<bool> {
        let mut overridden = false;
        for other in active.iter().filter(|q| q.id != policy.id) {
            if !resolver
                .has_conflict(policy, other)
                .map_err(solver_failure)?
            {
                continue;
            }
            match resolver.resolve(ctx, policy, other).map_err(solver_failure)? {
                ConflictResolution::NotResolved => {
                    return Err(PathvetError::Execution(ExecutionError::ConflictUnresolved {
                        policy_a: policy.id,
                        policy_b: other.id,
                    }));
                }
                ConflictResolution::Resolved { strong, .. } => {
                    if strong != policy.id {
                        overridden = true;
                    }
                }
            }
        }
        Ok(overridden)
    }

    /// Fetches readings for every hop concurrently and flattens the results.
    ///
    /// One request is in flight per hop, which bounds the fan-out at
    /// `max(1, hop count)`. The first failure aborts the whole call; when
    /// the enclosing future is dropped, outstanding fetches are cancelled
    /// with it.
    async fn fetch_readings(
        &self,
        path: &Path,
        interval: &TimeInterval,
    ) -> PathvetResult<Vec<HopReading>> {
        let fetches = path
            .hops
            .iter()
            .map(|hop| self.telemetry.readings_for_interval(interval, hop));
        let per_hop = try_join_all(fetches).await.map_err(|err| {
            PathvetError::Execution(ExecutionError::ExternalService {
                service: err.service,
                reason: err.reason,
            })
        })?;
        Ok(per_hop.into_iter().flatten().collect())
    }

    fn check_statements(&self, statements: &str) -> PathvetResult<()> {
        match self.solver.check_syntax(statements) {
            Ok(()) => Ok(()),
            Err(SolverError::Syntax { message }) => {
                Err(ValidationError::InvalidStatements { reason: message }.into())
            }
            Err(err) => Err(solver_failure(err)),
        }
    }
}
