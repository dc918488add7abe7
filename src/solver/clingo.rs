//! Clingo-backed rule solver.
//!
//! Adapter over the `clingo` answer set solver. Programs are grounded into
//! a single `base` part; goal queries enumerate models and look for the goal
//! atom.

use clingo::{control, ClingoError, Control, Part, Symbol};

use crate::facts::{Fact, FactArg};
use crate::solver::{RuleSolver, SolverError};

fn backend(err: ClingoError) -> SolverError {
    SolverError::backend(err.to_string())
}

/// Grounding failures come from the submitted program text.
fn syntax(err: ClingoError) -> SolverError {
    SolverError::syntax(err.to_string())
}

fn goal_symbol(goal: &Fact) -> Result<Symbol, SolverError> {
    let mut args = Vec::with_capacity(goal.args.len());
    for arg in &goal.args {
        let symbol = match arg {
            FactArg::Str(s) => Symbol::create_string(s).map_err(backend)?,
            // clingo numbers are 32-bit; encoded facts stay within range.
            #[allow(clippy::cast_possible_truncation)]
            FactArg::Int(v) => Symbol::create_number(*v as i32),
        };
        args.push(symbol);
    }
    Symbol::create_function(&goal.name, &args, true).map_err(backend)
}

/// Rule solver backed by the clingo grounder/solver.
#[derive(Debug, Default)]
pub struct ClingoSolver;

impl ClingoSolver {
    /// Creates a new solver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Grounds `program` into a fresh control handle enumerating all models.
    fn ground(program: &str) -> Result<Control, SolverError> {
        let mut ctl = control(vec!["--models=0".to_string()]).map_err(backend)?;
        ctl.add("base", &[], program).map_err(syntax)?;
        let parts = vec![Part::new("base", vec![]).map_err(backend)?];
        ctl.ground(&parts).map_err(syntax)?;
        Ok(ctl)
    }
}

impl RuleSolver for ClingoSolver {
    fn check_syntax(&self, program: &str) -> Result<(), SolverError> {
        Self::ground(program).map(|_| ())
    }

    fn has_internal_conflict(&self, program: &str) -> Result<bool, SolverError> {
        let mut ctl = Self::ground(program)?;
        let mut models = ctl.all_models().map_err(backend)?;
        Ok(models.next().is_none())
    }

    fn solve(&self, program: &str, goal: &Fact) -> Result<bool, SolverError> {
        let goal = goal_symbol(goal)?;
        let mut ctl = Self::ground(program)?;
        for model in ctl.all_models().map_err(backend)? {
            if model.symbols.contains(&goal) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
