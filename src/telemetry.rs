//! Telemetry provider interface.
//!
//! Hop readings come from an external network information provider. The core
//! only depends on this seam; transports, retries and timeouts belong to the
//! implementation behind it.

use async_trait::async_trait;
use thiserror::Error;

use crate::path::Hop;
use crate::reading::HopReading;
use crate::time::TimeInterval;

/// A telemetry fetch failure.
///
/// Aborts the enclosing validation call entirely; partial results are never
/// used.
#[derive(Debug, Error)]
#[error("Telemetry provider '{service}' failed: {reason}")]
pub struct TelemetryError {
    /// Name of the failing provider.
    pub service: String,
    /// Human-readable failure cause.
    pub reason: String,
}

impl TelemetryError {
    /// Creates a telemetry error.
    #[must_use]
    pub fn new(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

/// Supplier of per-hop telemetry readings.
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Fetches every reading collected for `hop` within `interval`.
    async fn readings_for_interval(
        &self,
        interval: &TimeInterval,
        hop: &Hop,
    ) -> Result<Vec<HopReading>, TelemetryError>;
}
