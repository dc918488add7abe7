//! Shared test doubles: a scripted rule solver and a static telemetry feed.
//!
//! The scripted solver stands in for a real grounder. Syntax and conflict
//! verdicts key off marker tokens embedded in the submitted program text;
//! authority queries are answered from the `has_power_over` / `has_issued`
//! facts the resolver actually renders; path verdicts apply configured
//! minimum thresholds to the integer facts the encoder actually emits.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use regex::Regex;

use pathvet::{
    Fact, FactArg, Hop, HopReading, RuleSolver, SolverError, TelemetryError, TelemetryProvider,
    TimeInterval,
};

/// Marker that makes [`ScriptedSolver`] report a syntax error.
pub const BAD_SYNTAX_MARKER: &str = "%% unbalanced";

/// A minimum-value constraint applied when a policy marker is present.
struct Threshold {
    marker: String,
    predicate: String,
    min: i64,
}

/// Scripted stand-in for the external rule solver.
#[derive(Default)]
pub struct ScriptedSolver {
    conflict_pairs: Vec<(String, String)>,
    thresholds: Vec<Threshold>,
    override_queries: AtomicUsize,
}

impl ScriptedSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs containing both markers are mutually contradictory.
    pub fn with_conflict(mut self, marker_a: &str, marker_b: &str) -> Self {
        self.conflict_pairs
            .push((marker_a.to_string(), marker_b.to_string()));
        self
    }

    /// When a program carries `marker`, any `predicate` fact below `min`
    /// rejects the path.
    pub fn with_threshold(mut self, marker: &str, predicate: &str, min: i64) -> Self {
        self.thresholds.push(Threshold {
            marker: marker.to_string(),
            predicate: predicate.to_string(),
            min,
        });
        self
    }

    /// Number of `overrides` goals solved so far.
    pub fn override_queries(&self) -> usize {
        self.override_queries.load(Ordering::SeqCst)
    }
}

fn string_pairs(program: &str, predicate: &str) -> Vec<(String, String)> {
    let re = Regex::new(&format!("{predicate}\\(\"([^\"]+)\",\\s*\"([^\"]+)\"\\)")).unwrap();
    re.captures_iter(program)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

fn int_facts(program: &str, predicate: &str) -> Vec<i64> {
    let re = Regex::new(&format!("{predicate}\\(\"[^\"]+\",\\s*(-?\\d+)\\)")).unwrap();
    re.captures_iter(program)
        .map(|c| c[1].parse().unwrap())
        .collect()
}

fn goal_string_args(goal: &Fact) -> Vec<String> {
    goal.args
        .iter()
        .map(|a| match a {
            FactArg::Str(s) => s.clone(),
            FactArg::Int(v) => v.to_string(),
        })
        .collect()
}

impl RuleSolver for ScriptedSolver {
    fn check_syntax(&self, program: &str) -> Result<(), SolverError> {
        if program.contains(BAD_SYNTAX_MARKER) {
            return Err(SolverError::syntax("unbalanced rule body"));
        }
        Ok(())
    }

    fn has_internal_conflict(&self, program: &str) -> Result<bool, SolverError> {
        Ok(self
            .conflict_pairs
            .iter()
            .any(|(a, b)| program.contains(a) && program.contains(b)))
    }

    fn solve(&self, program: &str, goal: &Fact) -> Result<bool, SolverError> {
        match goal.name.as_str() {
            // Authority queries during conflict resolution.
            "overrides" => {
                self.override_queries.fetch_add(1, Ordering::SeqCst);
                let args = goal_string_args(goal);
                let (policy_a, policy_b) = (&args[0], &args[1]);

                let issued = string_pairs(program, "has_issued");
                let power = string_pairs(program, "has_power_over");
                let issuer_of = |policy: &str| {
                    issued
                        .iter()
                        .find(|(_, p)| p == policy)
                        .map(|(i, _)| i.clone())
                };

                match (issuer_of(policy_a), issuer_of(policy_b)) {
                    (Some(a), Some(b)) => Ok(power.contains(&(a, b))),
                    _ => Ok(false),
                }
            }

            // Path validation: the goal is the path atom itself.
            "path" => {
                for threshold in &self.thresholds {
                    if !program.contains(&threshold.marker) {
                        continue;
                    }
                    if int_facts(program, &threshold.predicate)
                        .iter()
                        .any(|v| *v < threshold.min)
                    {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            _ => Ok(false),
        }
    }
}

/// Telemetry feed serving canned readings, filtered by hop and interval.
#[derive(Default)]
pub struct StaticTelemetry {
    readings: HashMap<String, Vec<HopReading>>,
    failing_isd_as: Option<String>,
    calls: AtomicUsize,
}

impl StaticTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reading(mut self, reading: HopReading) -> Self {
        self.readings
            .entry(reading.isd_as.clone())
            .or_default()
            .push(reading);
        self
    }

    /// Requests for this hop fail, simulating a provider outage.
    pub fn failing_for(mut self, isd_as: &str) -> Self {
        self.failing_isd_as = Some(isd_as.to_string());
        self
    }

    /// Number of per-hop fetches served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetryProvider for StaticTelemetry {
    async fn readings_for_interval(
        &self,
        interval: &TimeInterval,
        hop: &Hop,
    ) -> Result<Vec<HopReading>, TelemetryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_isd_as.as_deref() == Some(hop.isd_as.as_str()) {
            return Err(TelemetryError::new("nip-proxy", "simulated outage"));
        }

        Ok(self
            .readings
            .get(&hop.isd_as)
            .map(|readings| {
                readings
                    .iter()
                    .filter(|r| interval.contains(r.collected_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
