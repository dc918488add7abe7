//! Entity stores.
//!
//! Durable persistence is an external collaborator; the core only depends on
//! the trait contracts in [`traits`]. The in-memory backends exist for tests,
//! embedded use, and as reference implementations.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryIssuerStore, InMemoryMetaPolicyStore, InMemoryPolicyStore};
pub use traits::{IssuerStore, MetaPolicyStore, PolicyStore, StoreError};
