//! # pathvet - Policy Decision Point for Path-Aware Networks
//!
//! pathvet decides whether a candidate network path, an ordered sequence of
//! autonomous-system hops, complies with a set of independently authored,
//! potentially conflicting policies, using telemetry readings collected per
//! hop (energy and sustainability metrics, geo data, status fields).
//!
//! ## Core Concepts
//!
//! - **Policy**: declarative rules from one issuer constraining which paths
//!   are acceptable
//! - **Meta-policy**: rules ranking issuer authority, consulted only when
//!   policies conflict
//! - **Path / Hop / HopReading**: the validation subject and its telemetry
//! - **Verdict**: the fixed-point outcome after every conflict is resolved
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pathvet::{Hop, Path, PolicyManager};
//! use pathvet::store::{InMemoryIssuerStore, InMemoryMetaPolicyStore, InMemoryPolicyStore};
//!
//! let manager = PolicyManager::new(
//!     Arc::new(InMemoryPolicyStore::new()),
//!     Arc::new(InMemoryMetaPolicyStore::new()),
//!     Arc::new(InMemoryIssuerStore::new()),
//!     telemetry_client,
//!     solver,
//! );
//!
//! let issuer = manager.default_issuer()?;
//! manager.create_policy(
//!     issuer.id,
//!     "sustainable hops only",
//!     ":- latest_data(H, D), sustainability_index(D, X), X < 10.",
//!     None,
//! )?;
//!
//! let path = Path::with_derived_fingerprint("1-ff00:0:110", "1-ff00:0:112", hops);
//! let verdict = manager.validate_path(&path, None).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Domain model
pub mod error;
pub mod issuer;
pub mod path;
pub mod policy;
pub mod reading;
pub mod time;

// Program construction and evaluation
pub mod conflict;
pub mod facts;
pub mod solver;
pub mod validate;

// Collaborator seams and orchestration
pub mod engine;
pub mod store;
pub mod telemetry;

#[cfg(feature = "transport-grpc")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use conflict::{ConflictResolution, ConflictResolver, MetaContext};
pub use engine::{PathVerdict, PolicyManager, PolicyUpdate};
pub use error::{ExecutionError, PathvetError, PathvetResult, ValidationError};
pub use facts::{ConstantNamespacer, Fact, FactArg};
pub use issuer::{Issuer, IssuerId};
pub use path::{Hop, Path};
pub use policy::{MetaPolicy, MetaPolicyId, Policy, PolicyId};
pub use reading::{HopReading, ReadingValue};
pub use solver::{RuleSolver, SolverError};
pub use store::{IssuerStore, MetaPolicyStore, PolicyStore, StoreError};
pub use telemetry::{TelemetryError, TelemetryProvider};
pub use time::TimeInterval;
pub use validate::PolicyValidator;
