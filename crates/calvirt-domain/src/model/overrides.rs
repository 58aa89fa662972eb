use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use super::Extensions;

/// A stored delta that replaces a virtualized occurrence at a specific
/// original instant.
///
/// `original_duration`/`original_extensions` are denormalized snapshots of
/// the parent recurrence's mutable fields taken at override-creation time,
/// so the override stays self-describing even if the parent later mutates
/// those fields (data model §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceOverride {
    pub id: Uuid,
    pub organization: String,
    pub resource_path: String,
    pub recurrence_id: Uuid,
    pub original_time_utc: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub extensions: Extensions,
    pub original_duration: TimeDelta,
    pub original_extensions: Extensions,
}

impl OccurrenceOverride {
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration
    }
}

#[derive(Debug, Clone)]
pub struct NewOccurrenceOverride {
    pub recurrence_id: Uuid,
    pub original_time_utc: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub extensions: Extensions,
    pub original_duration: TimeDelta,
    pub original_extensions: Extensions,
}
