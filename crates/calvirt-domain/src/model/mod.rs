pub mod entry;
pub mod exception;
pub mod occurrence;
pub mod overrides;
pub mod recurrence;
pub mod window;

pub use entry::{CalendarEntry, OriginalOccurrence, RecurrenceEntry, StandaloneEntry, VirtualizedEntry};
pub use exception::{NewOccurrenceException, OccurrenceException};
pub use occurrence::{NewOccurrence, Occurrence};
pub use overrides::{NewOccurrenceOverride, OccurrenceOverride};
pub use recurrence::{MonthDayBehavior, NewRecurrence, Recurrence};
pub use window::TimeWindow;

/// Extension bag attached to every entity: caller-defined key/value metadata.
///
/// Bounded per `spec.md` §4.5: keys 1-100 chars, values <=1024 chars, unique
/// keys (enforced by `BTreeMap` itself) -- validated in
/// `calvirt-engine::validate`, not here; this type only carries the data.
pub type Extensions = std::collections::BTreeMap<String, String>;
