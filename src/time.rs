//! Temporal types for validation requests.
//!
//! A validation call only considers telemetry collected within a bounded
//! interval. When the caller does not supply one, the trailing seven days
//! are used.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of days covered by the default validation interval.
pub const DEFAULT_INTERVAL_DAYS: i64 = 7;

/// A closed interval of time (`[start, end]`).
///
/// Bounds which hop readings are relevant to one validation request.
///
/// # Examples
///
/// ```
/// use pathvet::TimeInterval;
/// use chrono::Utc;
///
/// let interval = TimeInterval::default();
/// assert!(interval.contains(Utc::now()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    /// Start of the interval (inclusive).
    pub start: DateTime<Utc>,
    /// End of the interval (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// Creates a time interval from two instants.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidInterval` if `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates the interval covering the last `days` days ending now.
    ///
    /// # Panics
    ///
    /// Panics if `days` is negative.
    #[must_use]
    pub fn last_days(days: i64) -> Self {
        assert!(days >= 0, "interval length must be non-negative");
        let end = Utc::now();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    /// Check if an instant falls within this interval.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time <= self.end
    }

    /// Length of the interval.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl Default for TimeInterval {
    fn default() -> Self {
        Self::last_days(DEFAULT_INTERVAL_DAYS)
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} → {}]", self.start, self.end)
    }
}
