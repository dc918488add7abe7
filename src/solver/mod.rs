//! Rule evaluation interface.
//!
//! The satisfiability engine itself is an external capability: any
//! conforming answer set / constraint solver can back this trait as long as
//! it honors standard negation-as-failure and integrity-constraint
//! semantics over a finite grounded fact base. The core only depends on the
//! three operations below.

use thiserror::Error;

use crate::facts::Fact;

#[cfg(feature = "solver-clingo")]
pub mod clingo;

#[cfg(feature = "solver-clingo")]
pub use self::clingo::ClingoSolver;

/// Errors raised by a solver backend.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The program failed to parse or ground.
    #[error("Syntax error in rule program: {message}")]
    Syntax { message: String },

    /// The backend itself failed.
    #[error("Solver backend error: {message}")]
    Backend { message: String },
}

impl SolverError {
    /// Creates a syntax error.
    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns true if the program text itself is at fault.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

/// Declarative rule evaluator.
pub trait RuleSolver: Send + Sync {
    /// Parses and grounds the program, failing on malformed input.
    fn check_syntax(&self, program: &str) -> Result<(), SolverError>;

    /// Returns true if the grounded program has no satisfying model, i.e.
    /// its constraints are mutually contradictory.
    fn has_internal_conflict(&self, program: &str) -> Result<bool, SolverError>;

    /// Returns true if at least one model of the program contains `goal`.
    fn solve(&self, program: &str, goal: &Fact) -> Result<bool, SolverError>;
}
