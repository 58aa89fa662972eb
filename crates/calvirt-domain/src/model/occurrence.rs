use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use super::Extensions;

/// A standalone, non-recurring occurrence.
///
/// `organization`, `resource_path`, `time_zone` are immutable after creation
/// (invariant 5); `start_time`, `duration`, `extensions`, and -- per the open
/// question in `spec.md` §9 -- `kind` may change. `end_time` is never stored;
/// it is always recomputed from `start_time + duration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub id: Uuid,
    pub organization: String,
    pub resource_path: String,
    pub kind: String,
    pub start_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub time_zone: Tz,
    pub extensions: Extensions,
}

impl Occurrence {
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration
    }
}

/// Fields required to create an `Occurrence`.
#[derive(Debug, Clone)]
pub struct NewOccurrence {
    pub kind: String,
    pub start_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub time_zone: Tz,
    pub extensions: Extensions,
}
