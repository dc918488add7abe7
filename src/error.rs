//! Error types for pathvet.
//!
//! All errors are strongly typed using thiserror and split along the cause
//! boundary: `ValidationError` for client-caused input problems,
//! `ExecutionError` for dependency failures and invariant violations, and
//! `PathvetError` as the top-level type the orchestrators return.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::issuer::IssuerId;
use crate::policy::PolicyId;
use crate::solver::SolverError;
use crate::store::StoreError;

/// Client-caused input errors.
///
/// These are never retried automatically: the same input will fail again.
/// Each variant names the offending field via [`ValidationError::field`] so
/// the service boundary can report field, value and reason.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Issuer does not exist: {id}")]
    IssuerNotFound { id: IssuerId },

    #[error("Policy does not exist: {id}")]
    PolicyNotFound { id: PolicyId },

    #[error("Issuer name must be longer than 1 character: {name:?}")]
    IssuerNameTooShort { name: String },

    #[error("Invalid rule syntax: {reason}")]
    InvalidStatements { reason: String },

    #[error(
        "Policy conflicts with active policy {other} and no meta-policy covers the issuer pair"
    )]
    UnresolvedConflictOnCreate { other: PolicyId },

    #[error("Path fingerprint cannot be empty")]
    EmptyFingerprint,

    #[error("Invalid time interval: start ({start}) must not be after end ({end})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl ValidationError {
    /// Name of the input field the error refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::IssuerNotFound { .. } => "issuer_id",
            Self::PolicyNotFound { .. } => "id",
            Self::IssuerNameTooShort { .. } => "name",
            Self::InvalidStatements { .. } | Self::UnresolvedConflictOnCreate { .. } => {
                "statements"
            }
            Self::EmptyFingerprint => "fingerprint",
            Self::InvalidInterval { .. } => "interval",
        }
    }
}

/// Failures of external collaborators or internal invariants.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A dependency outside the core failed; the enclosing call is aborted
    /// and no partial verdict is returned.
    #[error("Service '{service}' returned an error: {reason}")]
    ExternalService { service: String, reason: String },

    /// The fixed-point resolution loop hit a policy pair with no determinable
    /// authority relationship. Indicates missing meta-policy coverage.
    #[error("Conflict between policies {policy_a} and {policy_b} cannot be resolved")]
    ConflictUnresolved {
        policy_a: PolicyId,
        policy_b: PolicyId,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

/// Top-level error type for pathvet operations.
#[derive(Debug, Error)]
pub enum PathvetError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PathvetError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation (client input) error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution (dependency/invariant) error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this error is retryable.
    ///
    /// Only external-service failures may succeed on retry; input errors and
    /// missing meta-policy coverage will not change by themselves.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Internal { .. } => false,
            Self::Execution(e) => matches!(e, ExecutionError::ExternalService { .. }),
        }
    }
}

// Store errors surfacing directly from an orchestrator are execution errors.
impl From<StoreError> for PathvetError {
    fn from(err: StoreError) -> Self {
        Self::Execution(ExecutionError::Store(err))
    }
}

/// Result type alias for pathvet operations.
pub type PathvetResult<T> = Result<T, PathvetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_fields() {
        let err = ValidationError::IssuerNotFound { id: IssuerId::new() };
        assert_eq!(err.field(), "issuer_id");

        let err = ValidationError::InvalidStatements {
            reason: "unbalanced rule body".to_string(),
        };
        assert_eq!(err.field(), "statements");
        assert!(err.to_string().contains("unbalanced rule body"));
    }

    #[test]
    fn test_unresolved_conflict_names_other_policy() {
        let other = PolicyId::new();
        let err = ValidationError::UnresolvedConflictOnCreate { other };
        assert!(err.to_string().contains(&other.to_string()));
        assert_eq!(err.field(), "statements");
    }

    #[test]
    fn test_execution_error_display() {
        let err = ExecutionError::ExternalService {
            service: "telemetry".to_string(),
            reason: "connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("telemetry"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_pathvet_error_from_validation() {
        let err: PathvetError = ValidationError::EmptyFingerprint.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_pathvet_error_retryable() {
        let external: PathvetError = PathvetError::Execution(ExecutionError::ExternalService {
            service: "telemetry".to_string(),
            reason: "timeout".to_string(),
        });
        assert!(external.is_retryable());

        let unresolved: PathvetError = PathvetError::Execution(ExecutionError::ConflictUnresolved {
            policy_a: PolicyId::new(),
            policy_b: PolicyId::new(),
        });
        assert!(!unresolved.is_retryable());
    }

    #[test]
    fn test_pathvet_error_internal() {
        let err = PathvetError::internal("unexpected state");
        assert!(!err.is_validation());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("unexpected state"));
    }
}
