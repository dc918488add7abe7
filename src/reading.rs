//! Telemetry reading types.
//!
//! Telemetry feeds attach open-ended key/value records to each hop (energy
//! figures, geo data, status fields; the set varies by feed). Readings are
//! supplied by an external provider per validation call and are never
//! persisted by this crate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scalar value carried by one telemetry field.
///
/// This is the full variant set the fact encoder has to render; keeping it
/// closed here means the rest of the crate stays oblivious to telemetry
/// schema evolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReadingValue {
    /// Free-form text (also used for categorical fields).
    String(String),
    /// Integer measurement.
    Integer(i64),
    /// Point in time.
    Timestamp(DateTime<Utc>),
}

impl ReadingValue {
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Integer(_))
    }

    pub const fn is_timestamp(&self) -> bool {
        matches!(self, Self::Timestamp(_))
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl std::fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(v) => write!(f, "{v:?}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ReadingValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ReadingValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for ReadingValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for ReadingValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<DateTime<Utc>> for ReadingValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

/// One telemetry record for a specific hop.
///
/// Multiple readings per hop may exist within an interval; policies reason
/// over the most recently collected one (see the validation prelude).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopReading {
    /// Unique identifier assigned by the telemetry feed.
    pub id: String,
    /// AS address of the hop this reading belongs to.
    pub isd_as: String,
    /// When the reading was collected.
    pub collected_at: DateTime<Utc>,
    /// Feed-specific fields. Ordered so rendering is deterministic.
    pub fields: BTreeMap<String, ReadingValue>,
}

impl HopReading {
    /// Creates a reading with no extra fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        isd_as: impl Into<String>,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            isd_as: isd_as.into(),
            collected_at,
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, builder-style.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<ReadingValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}
