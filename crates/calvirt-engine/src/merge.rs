//! Merge/Filter (C3): combines an expanded recurrence's raw instants with its
//! stored exceptions and overrides into `VirtualizedEntry` values, and
//! assembles the final `CalendarEntry` surface list returned by
//! `GetOccurrences`.
//!
//! Precedence per `spec.md` §4.3/§4.4: an exception at an instant always
//! wins over a coexisting override at that same instant -- the occurrence is
//! simply absent, the override is never consulted.

use std::collections::{HashMap, HashSet};

use calvirt_domain::model::{
    CalendarEntry, Occurrence, OccurrenceOverride, OriginalOccurrence, Recurrence, RecurrenceEntry,
    StandaloneEntry, TimeWindow, VirtualizedEntry,
};
use chrono::{DateTime, Utc};

use crate::time::to_local;

/// ## Summary
/// Merges one recurrence's expanded instants (already restricted to
/// `window`) against its exceptions and overrides, per `spec.md` §4.3.
///
/// `overrides_by_original` must contain every override for this recurrence
/// where either `original_time_utc` falls in `window` or the override's new
/// `[start_time, end_time]` overlaps `window` -- exactly what
/// `OverrideRepo::get_in_range` returns. This single pass over `instants`
/// handles in-window base/overridden emissions and moved-away suppression;
/// [`moved_in_overrides`] handles the complementary moved-in case.
#[must_use]
pub fn merge_recurrence_instants(
    recurrence: &Recurrence,
    window: TimeWindow,
    instants: &[DateTime<Utc>],
    exceptions: &HashSet<DateTime<Utc>>,
    overrides_by_original: &HashMap<DateTime<Utc>, OccurrenceOverride>,
) -> Vec<VirtualizedEntry> {
    instants
        .iter()
        .filter(|instant| !exceptions.contains(instant))
        .filter_map(|instant| match overrides_by_original.get(instant) {
            Some(ov) if moved_outside(ov, window) => None,
            Some(ov) => Some(overridden_entry(recurrence, *instant, ov)),
            None => Some(base_virtualized_entry(recurrence, *instant)),
        })
        .collect()
}

/// ## Summary
/// The "moved-in" second pass over the recurrence's overrides per
/// `spec.md` §4.3: overrides whose original instant the expander did not
/// consider (because it falls outside `window`) but whose new
/// `[start_time, end_time]` overlaps `window`, and which aren't cancelled by
/// a coexisting exception.
#[must_use]
pub fn moved_in_overrides(
    recurrence: &Recurrence,
    window: TimeWindow,
    instants: &[DateTime<Utc>],
    exceptions: &HashSet<DateTime<Utc>>,
    overrides_by_original: &HashMap<DateTime<Utc>, OccurrenceOverride>,
) -> Vec<VirtualizedEntry> {
    let expanded: HashSet<DateTime<Utc>> = instants.iter().copied().collect();
    overrides_by_original
        .iter()
        .filter(|(original, _)| !expanded.contains(original))
        .filter(|(original, _)| !exceptions.contains(original))
        .filter(|(_, ov)| window.overlaps(ov.start_time, ov.end_time()))
        .map(|(original, ov)| overridden_entry(recurrence, *original, ov))
        .collect()
}

pub(crate) fn moved_outside(ov: &OccurrenceOverride, window: TimeWindow) -> bool {
    !window.overlaps(ov.start_time, ov.end_time())
}

pub(crate) fn base_virtualized_entry(recurrence: &Recurrence, instant: DateTime<Utc>) -> VirtualizedEntry {
    let zone = recurrence.time_zone;
    let end = instant + recurrence.duration;
    VirtualizedEntry {
        recurrence_id: recurrence.id,
        organization: recurrence.organization.clone(),
        resource_path: recurrence.resource_path.clone(),
        kind: recurrence.kind.clone(),
        start_time: to_local(instant, zone),
        duration: recurrence.duration,
        end_time: to_local(end, zone),
        time_zone: zone,
        extensions: recurrence.extensions.clone(),
        override_id: None,
        original: None,
    }
}

pub(crate) fn overridden_entry(
    recurrence: &Recurrence,
    instant: DateTime<Utc>,
    ov: &OccurrenceOverride,
) -> VirtualizedEntry {
    let zone = recurrence.time_zone;
    VirtualizedEntry {
        recurrence_id: recurrence.id,
        organization: recurrence.organization.clone(),
        resource_path: recurrence.resource_path.clone(),
        kind: recurrence.kind.clone(),
        start_time: to_local(ov.start_time, zone),
        duration: ov.duration,
        end_time: to_local(ov.end_time(), zone),
        time_zone: zone,
        extensions: ov.extensions.clone(),
        override_id: Some(ov.id),
        original: Some(OriginalOccurrence {
            start_time: to_local(instant, zone),
            duration: ov.original_duration,
            extensions: ov.original_extensions.clone(),
        }),
    }
}

/// ## Summary
/// Projects a stored `Recurrence` onto its `RecurrenceEntry` surface shape
/// for `GetRecurrences`, which returns recurrence metadata rather than
/// virtualized occurrences.
#[must_use]
pub fn recurrence_to_entry(recurrence: &Recurrence) -> RecurrenceEntry {
    let zone = recurrence.time_zone;
    RecurrenceEntry {
        id: recurrence.id,
        organization: recurrence.organization.clone(),
        resource_path: recurrence.resource_path.clone(),
        kind: recurrence.kind.clone(),
        start_time: to_local(recurrence.start_time, zone),
        duration: recurrence.duration,
        recurrence_end_time: to_local(recurrence.recurrence_end_time, zone),
        rrule: recurrence.rrule.clone(),
        time_zone: zone,
        extensions: recurrence.extensions.clone(),
    }
}

/// ## Summary
/// Projects a stored standalone `Occurrence` onto its `StandaloneEntry`
/// surface shape.
#[must_use]
pub fn occurrence_to_entry(occurrence: &Occurrence) -> StandaloneEntry {
    let zone = occurrence.time_zone;
    StandaloneEntry {
        id: occurrence.id,
        organization: occurrence.organization.clone(),
        resource_path: occurrence.resource_path.clone(),
        kind: occurrence.kind.clone(),
        start_time: to_local(occurrence.start_time, zone),
        duration: occurrence.duration,
        end_time: to_local(occurrence.end_time(), zone),
        time_zone: zone,
        extensions: occurrence.extensions.clone(),
    }
}

/// ## Summary
/// Concatenates virtualized occurrences and standalone occurrences into the
/// final `CalendarEntry` list for `GetOccurrences`. Not deduplicated per
/// `spec.md` §4.3: a standalone occurrence coinciding in time with a
/// virtualized one surfaces as two entries.
///
/// Per `spec.md` §5, ordering is only guaranteed *within* a single
/// recurrence's emissions (non-decreasing, already satisfied by C2); across
/// recurrences and against standalone occurrences there is no ordering
/// guarantee, so this does not sort -- callers that need a total order sort
/// client-side.
#[must_use]
pub fn merge_occurrence_entries(
    virtualized: Vec<VirtualizedEntry>,
    standalone: Vec<StandaloneEntry>,
) -> Vec<CalendarEntry> {
    virtualized
        .into_iter()
        .map(CalendarEntry::Virtualized)
        .chain(standalone.into_iter().map(CalendarEntry::Standalone))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn recurrence() -> Recurrence {
        Recurrence {
            id: Uuid::nil(),
            organization: "org".to_string(),
            resource_path: "/cal".to_string(),
            kind: "meeting".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            duration: chrono::TimeDelta::hours(1),
            recurrence_end_time: Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
            rrule: "FREQ=DAILY;UNTIL=20240131T235959Z".to_string(),
            time_zone: chrono_tz::UTC,
            month_day_behavior: None,
            extensions: Default::default(),
        }
    }

    fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeWindow {
        TimeWindow::new(start, end)
    }

    fn base_override(rec: &Recurrence, original: DateTime<Utc>, start: DateTime<Utc>) -> OccurrenceOverride {
        OccurrenceOverride {
            id: Uuid::nil(),
            organization: rec.organization.clone(),
            resource_path: rec.resource_path.clone(),
            recurrence_id: rec.id,
            original_time_utc: original,
            start_time: start,
            duration: rec.duration,
            extensions: Default::default(),
            original_duration: rec.duration,
            original_extensions: Default::default(),
        }
    }

    #[test]
    fn exception_suppresses_instant_even_with_override_present() {
        let rec = recurrence();
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let win = window(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
        );
        let mut exceptions = HashSet::new();
        exceptions.insert(instant);

        let mut overrides = HashMap::new();
        overrides.insert(instant, base_override(&rec, instant, instant + chrono::TimeDelta::hours(2)));

        let merged = merge_recurrence_instants(&rec, win, &[instant], &exceptions, &overrides);
        assert!(merged.is_empty());
    }

    #[test]
    fn override_replaces_base_instant() {
        let rec = recurrence();
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let moved_start = instant + chrono::TimeDelta::hours(3);
        let win = window(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
        );

        let mut overrides = HashMap::new();
        overrides.insert(instant, base_override(&rec, instant, moved_start));

        let merged = merge_recurrence_instants(&rec, win, &[instant], &HashSet::new(), &overrides);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_overridden());
        assert_eq!(merged[0].start_time.with_timezone(&Utc), moved_start);
        assert_eq!(
            merged[0].original.as_ref().unwrap().start_time.with_timezone(&Utc),
            instant
        );
    }

    #[test]
    fn override_moved_entirely_outside_window_is_dropped() {
        let rec = recurrence();
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let win = window(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
        );
        let moved_start = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();

        let mut overrides = HashMap::new();
        overrides.insert(instant, base_override(&rec, instant, moved_start));

        let merged = merge_recurrence_instants(&rec, win, &[instant], &HashSet::new(), &overrides);
        assert!(merged.is_empty());
    }

    #[test]
    fn moved_in_override_appears_even_though_original_outside_window() {
        let rec = recurrence();
        let original = Utc.with_ymd_and_hms(2023, 12, 1, 9, 0, 0).unwrap();
        let moved_start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        let win = window(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
        );

        let mut overrides = HashMap::new();
        overrides.insert(original, base_override(&rec, original, moved_start));

        let moved_in = moved_in_overrides(&rec, win, &[], &HashSet::new(), &overrides);
        assert_eq!(moved_in.len(), 1);
        assert_eq!(moved_in[0].start_time.with_timezone(&Utc), moved_start);
    }
}
