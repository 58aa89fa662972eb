use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Extensions;

/// Monthly-day out-of-bounds policy: governs what happens in a month that
/// doesn't have the `BYMONTHDAY` the pattern anchors on (e.g. the 31st in
/// February).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthDayBehavior {
    /// Reject at creation time; never reaches expansion.
    Throw,
    /// Produce no instant for months that lack the day.
    Skip,
    /// Emit the last calendar day of the month instead.
    Clamp,
}

/// A compact rule that produces many would-be occurrences.
///
/// `start_time`, `rrule`, `time_zone`, `kind`, and the tenant scope are
/// immutable after creation (data model invariant 4); only `duration` and
/// `extensions` may be mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    pub id: Uuid,
    pub organization: String,
    pub resource_path: String,
    pub kind: String,
    pub start_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub recurrence_end_time: DateTime<Utc>,
    pub rrule: String,
    pub time_zone: Tz,
    pub month_day_behavior: Option<MonthDayBehavior>,
    pub extensions: Extensions,
}

/// Fields required to create a `Recurrence`, before an id is assigned.
///
/// `recurrence_end_time` is populated by the engine's creation validator
/// (`calvirt_engine::validate::validate_recurrence_creation`) after parsing
/// `rrule`'s `UNTIL` clause, not by the caller -- a repository implementation
/// persists it as given rather than re-deriving it from `rrule` text.
#[derive(Debug, Clone)]
pub struct NewRecurrence {
    pub kind: String,
    pub start_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub recurrence_end_time: DateTime<Utc>,
    pub rrule: String,
    pub time_zone: Tz,
    pub month_day_behavior: Option<MonthDayBehavior>,
    pub extensions: Extensions,
}
