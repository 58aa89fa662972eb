use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored marker that cancels a virtualized occurrence at a specific
/// original instant. At read time an exception always wins over a
/// coexisting override for the same `(recurrence_id, original_time_utc)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceException {
    pub id: Uuid,
    pub organization: String,
    pub resource_path: String,
    pub recurrence_id: Uuid,
    pub original_time_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOccurrenceException {
    pub recurrence_id: Uuid,
    pub original_time_utc: DateTime<Utc>,
}
