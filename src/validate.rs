//! Policy validation engine.
//!
//! Builds the rule program for one policy against one path and its telemetry
//! readings, and asks the solver whether the path is accepted. A shared
//! prelude derives hop/path/data typing and the latest reading per hop;
//! policy statements constrain on top of it.

use crate::facts;
use crate::path::{Hop, Path};
use crate::policy::Policy;
use crate::reading::HopReading;
use crate::solver::{RuleSolver, SolverError};

/// Shared prelude for path validation programs.
///
/// Derives the basic types from the relationship facts, forbids one constant
/// from holding two types, and selects the most recently collected reading
/// per hop.
pub const VALIDATION_PRELUDE: &str = r#"% basic types
hop(Hop)    :- contains(Path, Hop), path(Path).
path(Path)  :- contains(Path, Hop), hop(Hop).
data(Data)  :- collected(Hop, Data), hop(Hop).
hop(Hop)    :- collected(Hop, Data), data(Data).

% sanity check for typization
:- hop(X), data(X).
:- hop(X), path(X).
:- data(X), path(X).

% utilities
latest_data_collected_date(Hop, MaxTmp) :-
    hop(Hop),
    MaxTmp = #max {
        Tmp : data_collected_date(Data, Tmp), collected(Hop, Data) }.

latest_data(Hop, Data) :-
    latest_data_collected_date(Hop, MaxTmp),
    data_collected_date(Data, MaxTmp).
"#;

/// Evaluates single policies against a path.
pub struct PolicyValidator<'a> {
    solver: &'a dyn RuleSolver,
}

impl<'a> PolicyValidator<'a> {
    /// Creates a validator borrowing the solver for one orchestrator call.
    #[must_use]
    pub fn new(solver: &'a dyn RuleSolver) -> Self {
        Self { solver }
    }

    /// Returns true if the path is accepted under `policy`.
    ///
    /// The program asserts the path, its hops, and each hop's single latest
    /// matching reading; the verdict is whether a model containing the path
    /// atom exists, i.e. no integrity constraint rejects it.
    ///
    /// # Errors
    ///
    /// Returns `SolverError::Syntax` if the policy statements fail to parse.
    /// Creation already validated them, so a failure here means the stored
    /// text changed underneath us.
    pub fn validate(
        &self,
        policy: &Policy,
        path: &Path,
        readings: &[HopReading],
    ) -> Result<bool, SolverError> {
        let program = build_program(policy, path, readings);
        self.solver.solve(&program, &facts::path_fact(path))
    }
}

/// Assembles prelude + policy statements + ground facts into one program.
fn build_program(policy: &Policy, path: &Path, readings: &[HopReading]) -> String {
    let mut fact_list = vec![facts::path_fact(path)];
    for hop in &path.hops {
        fact_list.push(facts::hop_fact(hop));
        fact_list.push(facts::contains_fact(path, hop));
        if let Some(reading) = latest_reading_for(hop, readings) {
            fact_list.extend(facts::reading_facts(reading));
            fact_list.push(facts::collected_fact(hop, reading));
        }
    }

    let rendered = facts::render(&fact_list);
    [VALIDATION_PRELUDE.trim(), policy.statements.trim(), rendered.as_str()].join("\n\n")
}

/// The single most recently collected reading for a hop, if any.
fn latest_reading_for<'r>(hop: &Hop, readings: &'r [HopReading]) -> Option<&'r HopReading> {
    readings
        .iter()
        .filter(|r| r.isd_as == hop.isd_as)
        .max_by_key(|r| r.collected_at)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::facts::Fact;
    use crate::issuer::Issuer;

    /// Records the submitted program and returns a fixed verdict.
    struct RecordingSolver {
        verdict: bool,
        last_program: Mutex<String>,
    }

    impl RecordingSolver {
        fn new(verdict: bool) -> Self {
            Self {
                verdict,
                last_program: Mutex::new(String::new()),
            }
        }

        fn program(&self) -> String {
            self.last_program.lock().unwrap().clone()
        }
    }

    impl RuleSolver for RecordingSolver {
        fn check_syntax(&self, _program: &str) -> Result<(), SolverError> {
            Ok(())
        }

        fn has_internal_conflict(&self, _program: &str) -> Result<bool, SolverError> {
            Ok(false)
        }

        fn solve(&self, program: &str, _goal: &Fact) -> Result<bool, SolverError> {
            *self.last_program.lock().unwrap() = program.to_string();
            Ok(self.verdict)
        }
    }

    fn policy(statements: &str) -> Policy {
        let issuer = Issuer::new("validator-tests", None, false).unwrap();
        Policy::new(issuer, "test policy", statements, None)
    }

    fn two_hop_path() -> Path {
        Path::new(
            "fp-validate",
            "1-ff00:0:110",
            "1-ff00:0:112",
            vec![
                Hop::new("1-ff00:0:110", "0", "2"),
                Hop::new("1-ff00:0:111", "1", "3"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_program_contains_prelude_policy_and_facts() {
        let solver = RecordingSolver::new(true);
        let validator = PolicyValidator::new(&solver);

        let path = two_hop_path();
        let readings = vec![
            HopReading::new("r-1", "1-ff00:0:110", Utc::now()).with_field("score", 5i64),
        ];

        let accepted = validator
            .validate(&policy(":- latest_data(H, D), score(D, X), X < 3."), &path, &readings)
            .unwrap();
        assert!(accepted);

        let program = solver.program();
        assert!(program.contains("latest_data(Hop, Data)")); // prelude
        assert!(program.contains("X < 3")); // policy statements
        assert!(program.contains("path(\"fp-validate\").")); // facts
        assert!(program.contains("contains(\"fp-validate\", \"1-ff00:0:111\")."));
        assert!(program.contains("score(\"r-1\", 5)."));
        assert!(program.contains("collected(\"1-ff00:0:110\", \"r-1\")."));
    }

    #[test]
    fn test_only_latest_reading_per_hop_is_encoded() {
        let solver = RecordingSolver::new(true);
        let validator = PolicyValidator::new(&solver);

        let path = two_hop_path();
        let now = Utc::now();
        let readings = vec![
            HopReading::new("r-old", "1-ff00:0:110", now - Duration::hours(4))
                .with_field("score", 1i64),
            HopReading::new("r-new", "1-ff00:0:110", now).with_field("score", 9i64),
        ];

        validator.validate(&policy(""), &path, &readings).unwrap();

        let program = solver.program();
        assert!(program.contains("data(\"r-new\")."));
        assert!(!program.contains("data(\"r-old\")."));
    }

    #[test]
    fn test_readings_for_foreign_hops_are_ignored() {
        let solver = RecordingSolver::new(true);
        let validator = PolicyValidator::new(&solver);

        let path = two_hop_path();
        let readings = vec![
            HopReading::new("r-elsewhere", "9-ff00:0:999", Utc::now()).with_field("score", 2i64),
        ];

        validator.validate(&policy(""), &path, &readings).unwrap();
        assert!(!solver.program().contains("r-elsewhere"));
    }

    #[test]
    fn test_verdict_is_forwarded() {
        let solver = RecordingSolver::new(false);
        let validator = PolicyValidator::new(&solver);
        let path = two_hop_path();

        let accepted = validator.validate(&policy(""), &path, &[]).unwrap();
        assert!(!accepted);
    }
}
