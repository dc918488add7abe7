//! Conflict detection and resolution between policies.
//!
//! Two policies conflict when the union of their statements cannot hold in
//! any model. Which of the two prevails is decided by the authority
//! hierarchy: meta-policies assert `has_power_over` between issuers, and the
//! meta prelude lifts that to a directed `overrides` relation between their
//! policies. A cycle (equal authority) falls back to recency.

use crate::facts::{self, ConstantNamespacer};
use crate::policy::{MetaPolicy, Policy, PolicyId};
use crate::solver::{RuleSolver, SolverError};

/// Shared prelude for conflict resolution programs.
pub const META_PRELUDE: &str = r#"% type safety
:- policy(X), issuer(X).
:- has_issued(I1, P), has_issued(I2, P), I1 != I2.

% inference
issuer(I) :- has_issued(I, _).
policy(P) :- has_issued(_, P).

% definitions
overrides(P1, P2) :-
    has_issued(I1, P1),
    has_issued(I2, P2),
    has_power_over(I1, I2).
"#;

/// Outcome of resolving one policy pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Authority established: `strong` prevails over `weak`.
    Resolved { strong: PolicyId, weak: PolicyId },
    /// The meta-policies do not cover this issuer pair.
    NotResolved,
}

impl ConflictResolution {
    /// The prevailing policy, if resolution succeeded.
    #[must_use]
    pub const fn strong(&self) -> Option<PolicyId> {
        match self {
            Self::Resolved { strong, .. } => Some(*strong),
            Self::NotResolved => None,
        }
    }

    /// The overridden policy, if resolution succeeded.
    #[must_use]
    pub const fn weak(&self) -> Option<PolicyId> {
        match self {
            Self::Resolved { weak, .. } => Some(*weak),
            Self::NotResolved => None,
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// The merged meta-policy program for one orchestrator call.
///
/// Built once per call and passed by reference into every resolution within
/// that call, so the merge (and its constant namespacing) is not recomputed
/// pair by pair. Lives exactly as long as the call that created it.
#[derive(Debug)]
pub struct MetaContext {
    merged: String,
}

impl MetaContext {
    /// Merges the active meta-policies under the meta prelude.
    #[must_use]
    pub fn new(meta_policies: &[MetaPolicy]) -> Self {
        let mut namespacer = ConstantNamespacer::new();
        let mut sections = vec![META_PRELUDE.trim().to_string()];
        for meta in meta_policies {
            sections.push(namespacer.namespace(meta.statements.trim()));
        }
        Self {
            merged: sections.join("\n\n"),
        }
    }

    /// The merged program without pair-specific facts.
    #[must_use]
    pub fn merged_statements(&self) -> &str {
        &self.merged
    }

    /// The full resolution program for one policy pair.
    fn program_for(&self, a: &Policy, b: &Policy) -> String {
        let mut fact_list = vec![facts::issuer_fact(&a.issuer)];
        if b.issuer.id != a.issuer.id {
            fact_list.push(facts::issuer_fact(&b.issuer));
        }
        fact_list.extend(facts::policy_facts(a));
        fact_list.extend(facts::policy_facts(b));
        format!("{}\n\n{}", self.merged, facts::render(&fact_list))
    }
}

/// Decides whether and how two policies conflict.
pub struct ConflictResolver<'a> {
    solver: &'a dyn RuleSolver,
}

impl<'a> ConflictResolver<'a> {
    /// Creates a resolver borrowing the solver for one orchestrator call.
    #[must_use]
    pub fn new(solver: &'a dyn RuleSolver) -> Self {
        Self { solver }
    }

    /// Returns true if the two policies cannot both hold in any model.
    ///
    /// Each side's symbolic constants are namespaced before merging so that
    /// a coincidental shared constant name does not fabricate (or mask) a
    /// contradiction. A union that fails to ground counts as conflicting.
    ///
    /// # Errors
    ///
    /// Returns `SolverError::Backend` if the solver itself fails.
    pub fn has_conflict(&self, a: &Policy, b: &Policy) -> Result<bool, SolverError> {
        let mut namespacer = ConstantNamespacer::new();
        let merged = format!(
            "{}\n{}",
            namespacer.namespace(&a.statements),
            namespacer.namespace(&b.statements)
        );
        match self.solver.has_internal_conflict(&merged) {
            Ok(conflicting) => Ok(conflicting),
            Err(SolverError::Syntax { .. }) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Determines which of two conflicting policies has authority.
    ///
    /// Solves the meta program for both directed `overrides` atoms:
    /// exactly one holding decides strong/weak; neither means the hierarchy
    /// does not cover the pair; both (circular or equal authority) falls
    /// back to recency, where the more recently created policy prevails.
    ///
    /// # Errors
    ///
    /// Returns `SolverError` if the meta program fails to ground or solve.
    pub fn resolve(
        &self,
        ctx: &MetaContext,
        a: &Policy,
        b: &Policy,
    ) -> Result<ConflictResolution, SolverError> {
        let program = ctx.program_for(a, b);
        let a_over_b = self.solver.solve(&program, &facts::overrides_atom(a, b))?;
        let b_over_a = self.solver.solve(&program, &facts::overrides_atom(b, a))?;

        Ok(match (a_over_b, b_over_a) {
            (true, false) => ConflictResolution::Resolved {
                strong: a.id,
                weak: b.id,
            },
            (false, true) => ConflictResolution::Resolved {
                strong: b.id,
                weak: a.id,
            },
            (true, true) => {
                // Equal authority resolves via recency, never as a failure.
                if a.created_at >= b.created_at {
                    ConflictResolution::Resolved {
                        strong: a.id,
                        weak: b.id,
                    }
                } else {
                    ConflictResolution::Resolved {
                        strong: b.id,
                        weak: a.id,
                    }
                }
            }
            (false, false) => ConflictResolution::NotResolved,
        })
    }
}
