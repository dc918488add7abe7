//! Path and hop value objects.
//!
//! A path is the validation subject: an ordered sequence of AS hops between a
//! source and a destination. Paths are constructed fresh per validation call
//! and never persisted; the fingerprint is their stable identity.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One autonomous system traversed by a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    /// Isolation domain + AS address (e.g. `1-ff00:0:110`).
    pub isd_as: String,
    /// Inbound interface identifier for the hop.
    pub inbound_interface: String,
    /// Outbound interface identifier for the hop.
    pub outbound_interface: String,
}

impl Hop {
    /// Creates a new hop.
    #[must_use]
    pub fn new(
        isd_as: impl Into<String>,
        inbound_interface: impl Into<String>,
        outbound_interface: impl Into<String>,
    ) -> Self {
        Self {
            isd_as: isd_as.into(),
            inbound_interface: inbound_interface.into(),
            outbound_interface: outbound_interface.into(),
        }
    }
}

/// A candidate network path submitted for validation.
///
/// Immutable once constructed for a given validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// Stable content-derived identifier for this path instance.
    pub fingerprint: String,
    /// Source AS address.
    pub src_isd_as: String,
    /// Destination AS address.
    pub dst_isd_as: String,
    /// Ordered hops from source to destination.
    pub hops: Vec<Hop>,
}

impl Path {
    /// Creates a path with a caller-supplied fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyFingerprint` if the fingerprint is
    /// empty; a path without a stable identity cannot be reported on.
    pub fn new(
        fingerprint: impl Into<String>,
        src_isd_as: impl Into<String>,
        dst_isd_as: impl Into<String>,
        hops: Vec<Hop>,
    ) -> Result<Self, ValidationError> {
        let fingerprint = fingerprint.into();
        if fingerprint.is_empty() {
            return Err(ValidationError::EmptyFingerprint);
        }
        Ok(Self {
            fingerprint,
            src_isd_as: src_isd_as.into(),
            dst_isd_as: dst_isd_as.into(),
            hops,
        })
    }

    /// Creates a path, deriving the fingerprint from its content.
    #[must_use]
    pub fn with_derived_fingerprint(
        src_isd_as: impl Into<String>,
        dst_isd_as: impl Into<String>,
        hops: Vec<Hop>,
    ) -> Self {
        let src_isd_as = src_isd_as.into();
        let dst_isd_as = dst_isd_as.into();
        let fingerprint = derive_fingerprint(&src_isd_as, &dst_isd_as, &hops);
        Self {
            fingerprint,
            src_isd_as,
            dst_isd_as,
            hops,
        }
    }

    /// Number of hops in the path.
    #[must_use]
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }
}

/// Derives a stable hex fingerprint from path content.
///
/// Field boundaries are delimited so that shifted values cannot produce the
/// same digest.
#[must_use]
pub fn derive_fingerprint(src_isd_as: &str, dst_isd_as: &str, hops: &[Hop]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(src_isd_as.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(dst_isd_as.as_bytes());
    for hop in hops {
        hasher.update(b"\x1e");
        hasher.update(hop.isd_as.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(hop.inbound_interface.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(hop.outbound_interface.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
