//! End-to-end coverage of path validation: telemetry fan-out, per-policy
//! evaluation, and the conflict-resolution fixed point.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{ScriptedSolver, StaticTelemetry};
use pathvet::store::{InMemoryIssuerStore, InMemoryMetaPolicyStore, InMemoryPolicyStore};
use pathvet::IssuerStore;
use pathvet::{
    ExecutionError, Hop, HopReading, Issuer, MetaPolicy, MetaPolicyStore, Path, PathvetError,
    PolicyManager, TimeInterval,
};

/// Marker comment carried by the sustainability policy's statements.
const MIN_SUSTAINABILITY_MARKER: &str = "% min-sustainability";
/// Marker comment carried by the permissive policy's statements.
const ACCEPT_ALL_MARKER: &str = "% accept-all";

fn sustainability_solver() -> ScriptedSolver {
    ScriptedSolver::new().with_threshold(MIN_SUSTAINABILITY_MARKER, "sustainability_index", 10)
}

fn three_hop_path() -> Path {
    Path::new(
        "fp-3hops",
        "1-ff00:0:110",
        "1-ff00:0:112",
        vec![
            Hop::new("1-ff00:0:110", "0", "2"),
            Hop::new("1-ff00:0:111", "1", "3"),
            Hop::new("1-ff00:0:112", "4", "0"),
        ],
    )
    .unwrap()
}

fn sustainability_readings(values: [i64; 3]) -> StaticTelemetry {
    let now = Utc::now();
    let hops = ["1-ff00:0:110", "1-ff00:0:111", "1-ff00:0:112"];
    let mut telemetry = StaticTelemetry::new();
    for (i, (isd_as, value)) in hops.iter().zip(values).enumerate() {
        telemetry = telemetry.with_reading(
            HopReading::new(format!("r-{i}"), *isd_as, now - Duration::minutes(i as i64))
                .with_field("sustainability_index", value),
        );
    }
    telemetry
}

struct World {
    policies: Arc<InMemoryPolicyStore>,
    meta_policies: Arc<InMemoryMetaPolicyStore>,
    issuers: Arc<InMemoryIssuerStore>,
    solver: Arc<ScriptedSolver>,
    telemetry: Arc<StaticTelemetry>,
    manager: PolicyManager,
}

impl World {
    fn new(solver: ScriptedSolver, telemetry: StaticTelemetry) -> Self {
        let policies = Arc::new(InMemoryPolicyStore::new());
        let meta_policies = Arc::new(InMemoryMetaPolicyStore::new());
        let issuers = Arc::new(InMemoryIssuerStore::new());
        let solver = Arc::new(solver);
        let telemetry = Arc::new(telemetry);
        let manager = PolicyManager::new(
            policies.clone(),
            meta_policies.clone(),
            issuers.clone(),
            telemetry.clone(),
            solver.clone(),
        );
        Self {
            policies,
            meta_policies,
            issuers,
            solver,
            telemetry,
            manager,
        }
    }

    fn issuer(&self, name: &str) -> Issuer {
        let issuer = Issuer::new(name, None, false).unwrap();
        self.issuers.add(issuer.clone()).unwrap();
        issuer
    }

    fn grant_authority(&self, strong: &Issuer, weak: &Issuer) {
        self.meta_policies
            .add(MetaPolicy::new(format!(
                "has_power_over(\"{}\", \"{}\").",
                strong.id, weak.id
            )))
            .unwrap();
    }

    fn add_sustainability_policy(&self, issuer: &Issuer) {
        self.manager
            .create_policy(
                issuer.id,
                "sustainable hops only",
                format!(
                    ":- latest_data(H, D), sustainability_index(D, X), X < 10. {MIN_SUSTAINABILITY_MARKER}"
                ),
                None,
            )
            .unwrap();
    }

    /// Inserted at the store level so both conflicting policies are active
    /// when validation starts; creation-time resolution would demote one.
    fn add_accepting_policy(&self, issuer: &Issuer) {
        use pathvet::{Policy, PolicyStore};
        self.policies
            .add(Policy::new(
                issuer.clone(),
                "open routing",
                ACCEPT_ALL_MARKER,
                None,
            ))
            .unwrap();
    }
}

// Scenario: one policy rejects a hop below the sustainability threshold and
// no meta-policy exists, so the rejection stands.
#[tokio::test]
async fn rejecting_policy_without_conflicts_invalidates_path() {
    let world = World::new(sustainability_solver(), sustainability_readings([20, 5, 50]));
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    let verdict = world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap();

    assert!(!verdict.valid);
    assert_eq!(verdict.fingerprint, "fp-3hops");
    // No conflicting policy exists, so authority was never consulted.
    assert_eq!(world.solver.override_queries(), 0);
}

#[tokio::test]
async fn compliant_readings_validate_path() {
    let world = World::new(sustainability_solver(), sustainability_readings([20, 15, 50]));
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    let verdict = world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap();
    assert!(verdict.valid);
}

// Scenario: the rejecting policy conflicts with an accepting policy whose
// issuer outranks it, so the rejection is overridden at the fixed point.
#[tokio::test]
async fn overridden_rejecting_policy_validates_path() {
    let solver = sustainability_solver().with_conflict(MIN_SUSTAINABILITY_MARKER, ACCEPT_ALL_MARKER);
    let world = World::new(solver, sustainability_readings([20, 5, 50]));

    let strict = world.issuer("carbon-watch");
    let open = world.issuer("federal-routing-board");
    world.grant_authority(&open, &strict);

    world.add_sustainability_policy(&strict);
    world.add_accepting_policy(&open);

    let verdict = world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap();

    assert!(verdict.valid);
    assert!(world.solver.override_queries() > 0);
}

// Scenario: the same conflict with the authority reversed leaves the
// rejection standing.
#[tokio::test]
async fn rejecting_policy_with_authority_keeps_path_invalid() {
    let solver = sustainability_solver().with_conflict(MIN_SUSTAINABILITY_MARKER, ACCEPT_ALL_MARKER);
    let world = World::new(solver, sustainability_readings([20, 5, 50]));

    let strict = world.issuer("carbon-watch");
    let open = world.issuer("regional-isp");
    world.grant_authority(&strict, &open);

    world.add_sustainability_policy(&strict);
    world.add_accepting_policy(&open);

    let verdict = world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap();
    assert!(!verdict.valid);
}

#[tokio::test]
async fn uncovered_conflict_during_validation_is_fatal() {
    let solver = sustainability_solver().with_conflict(MIN_SUSTAINABILITY_MARKER, ACCEPT_ALL_MARKER);
    let world = World::new(solver, sustainability_readings([20, 5, 50]));

    let strict = world.issuer("carbon-watch");
    let open = world.issuer("regional-isp");
    // No authority grant in either direction.

    world.add_sustainability_policy(&strict);
    world.add_accepting_policy(&open);

    let err = world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PathvetError::Execution(ExecutionError::ConflictUnresolved { .. })
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn telemetry_is_fetched_once_per_hop() {
    let world = World::new(ScriptedSolver::new(), sustainability_readings([20, 15, 50]));
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap();
    assert_eq!(world.telemetry.calls(), 3);
}

#[tokio::test]
async fn single_hop_fetch_failure_aborts_validation() {
    let telemetry = sustainability_readings([20, 15, 50]).failing_for("1-ff00:0:111");
    let world = World::new(sustainability_solver(), telemetry);
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    let err = world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap_err();

    match err {
        PathvetError::Execution(ExecutionError::ExternalService { service, reason }) => {
            assert_eq!(service, "nip-proxy");
            assert!(reason.contains("simulated outage"));
        }
        other => panic!("expected ExternalService, got {other:?}"),
    }
}

#[tokio::test]
async fn readings_outside_the_interval_are_ignored() {
    // The only low reading predates the requested window, so the policy has
    // nothing to reject.
    let now = Utc::now();
    let telemetry = StaticTelemetry::new()
        .with_reading(
            HopReading::new("r-stale", "1-ff00:0:110", now - Duration::days(30))
                .with_field("sustainability_index", 2i64),
        )
        .with_reading(
            HopReading::new("r-fresh", "1-ff00:0:110", now - Duration::hours(1))
                .with_field("sustainability_index", 40i64),
        );
    let world = World::new(sustainability_solver(), telemetry);
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    let path = Path::new("fp-1hop", "1-ff00:0:110", "1-ff00:0:110", vec![Hop::new(
        "1-ff00:0:110",
        "0",
        "1",
    )])
    .unwrap();

    let verdict = world.manager.validate_path(&path, None).await.unwrap();
    assert!(verdict.valid);

    // Narrowing the window to the stale reading flips the verdict.
    let stale_window = TimeInterval::new(now - Duration::days(31), now - Duration::days(29))
        .unwrap();
    let verdict = world
        .manager
        .validate_path(&path, Some(stale_window))
        .await
        .unwrap();
    assert!(!verdict.valid);
}

#[tokio::test]
async fn latest_reading_per_hop_decides() {
    // An old low reading is superseded by a fresh compliant one.
    let now = Utc::now();
    let telemetry = StaticTelemetry::new()
        .with_reading(
            HopReading::new("r-old", "1-ff00:0:110", now - Duration::hours(6))
                .with_field("sustainability_index", 3i64),
        )
        .with_reading(
            HopReading::new("r-new", "1-ff00:0:110", now)
                .with_field("sustainability_index", 25i64),
        );
    let world = World::new(sustainability_solver(), telemetry);
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    let path = Path::new("fp-1hop", "1-ff00:0:110", "1-ff00:0:110", vec![Hop::new(
        "1-ff00:0:110",
        "0",
        "1",
    )])
    .unwrap();

    let verdict = world.manager.validate_path(&path, None).await.unwrap();
    assert!(verdict.valid);
}

#[tokio::test]
async fn inactive_policies_do_not_participate() {
    let world = World::new(sustainability_solver(), sustainability_readings([20, 5, 50]));
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    // Deactivate the only policy; the path becomes valid by default.
    {
        use pathvet::PolicyStore;
        let listed = world.manager.list_policies().unwrap();
        let mut deactivated = listed[0].clone();
        deactivated.deactivate();
        world.policies.add(deactivated).unwrap();
    }

    let verdict = world
        .manager
        .validate_path(&three_hop_path(), None)
        .await
        .unwrap();
    assert!(verdict.valid);
}

#[tokio::test]
async fn path_without_hops_is_vacuously_valid() {
    let world = World::new(sustainability_solver(), StaticTelemetry::new());
    let issuer = world.issuer("carbon-watch");
    world.add_sustainability_policy(&issuer);

    let path = Path::new("fp-empty", "1-ff00:0:110", "1-ff00:0:110", vec![]).unwrap();
    let verdict = world.manager.validate_path(&path, None).await.unwrap();

    assert!(verdict.valid);
    assert_eq!(world.telemetry.calls(), 0);
}
