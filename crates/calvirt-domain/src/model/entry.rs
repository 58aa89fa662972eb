use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use uuid::Uuid;

use super::Extensions;

/// The values a virtualized occurrence would have had absent any override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalOccurrence {
    pub start_time: DateTime<Tz>,
    pub duration: TimeDelta,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceEntry {
    pub id: Uuid,
    pub organization: String,
    pub resource_path: String,
    pub kind: String,
    pub start_time: DateTime<Tz>,
    pub duration: TimeDelta,
    pub recurrence_end_time: DateTime<Tz>,
    pub rrule: String,
    pub time_zone: Tz,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneEntry {
    pub id: Uuid,
    pub organization: String,
    pub resource_path: String,
    pub kind: String,
    pub start_time: DateTime<Tz>,
    pub duration: TimeDelta,
    pub end_time: DateTime<Tz>,
    pub time_zone: Tz,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualizedEntry {
    pub recurrence_id: Uuid,
    pub organization: String,
    pub resource_path: String,
    pub kind: String,
    pub start_time: DateTime<Tz>,
    pub duration: TimeDelta,
    pub end_time: DateTime<Tz>,
    pub time_zone: Tz,
    pub extensions: Extensions,
    /// Set iff this emission is backed by a stored `OccurrenceOverride`.
    pub override_id: Option<Uuid>,
    /// Present iff this entry is virtualized. `None` can't happen for a
    /// `VirtualizedEntry` in practice but is threaded through as `Option`
    /// because the mutation planner reuses this struct shape for entries
    /// coming back from callers, where it's the discriminator for
    /// "this came from a virtualized emission".
    pub original: Option<OriginalOccurrence>,
}

impl VirtualizedEntry {
    /// ## Summary
    /// True iff an `OccurrenceOverride` backs this entry.
    #[must_use]
    pub fn is_overridden(&self) -> bool {
        self.override_id.is_some()
    }
}

/// Unified surface DTO: a sum over the three kinds of calendar entry a
/// caller can see. Explicit discriminator by design (see `spec.md` §9 design
/// notes) -- the mutation planner's classification is a single `match`, not
/// a check over a bag of optional ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarEntry {
    Recurrence(RecurrenceEntry),
    Standalone(StandaloneEntry),
    Virtualized(VirtualizedEntry),
}

impl CalendarEntry {
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Recurrence(e) => &e.kind,
            Self::Standalone(e) => &e.kind,
            Self::Virtualized(e) => &e.kind,
        }
    }
}
