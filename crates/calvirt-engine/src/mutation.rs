//! Mutation Planner (C4): classifies an inbound `CalendarEntry` and turns
//! Update/Delete/Restore requests into repository actions, enforcing each
//! entity's immutability envelope (`spec.md` §3 invariants 4/5, §4.4).
//!
//! These functions are pure decisions -- no repository I/O -- so they're
//! unit-testable on their own. `Engine` fetches whatever stored state a
//! branch needs and executes the returned `RepoAction`.

use calvirt_domain::model::{
    CalendarEntry, NewOccurrenceException, NewOccurrenceOverride, Occurrence, OccurrenceOverride,
    Recurrence, RecurrenceEntry, StandaloneEntry, VirtualizedEntry,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::validate::{validate_duration, validate_extensions, validate_kind};

/// The classification of an inbound `CalendarEntry`, per `spec.md` §4.4.
///
/// Unlike the source's "bag of optional ids" approach, `CalendarEntry`'s
/// three variants already carry this distinction, so classification is a
/// single match -- there is no `InvalidOperation` branch to reach here, only
/// in the per-variant planners below when an operation doesn't apply to the
/// classified variant.
#[derive(Debug)]
pub enum Classification<'a> {
    Standalone(&'a StandaloneEntry),
    Virtualized(&'a VirtualizedEntry),
    RecurrencePattern(&'a RecurrenceEntry),
}

#[must_use]
pub fn classify(entry: &CalendarEntry) -> Classification<'_> {
    match entry {
        CalendarEntry::Standalone(e) => Classification::Standalone(e),
        CalendarEntry::Virtualized(e) => Classification::Virtualized(e),
        CalendarEntry::Recurrence(e) => Classification::RecurrencePattern(e),
    }
}

/// What `Engine` should do to a repository to realize a planned mutation.
#[derive(Debug, Clone)]
pub enum RepoAction {
    UpdateRecurrence(Recurrence),
    UpdateOccurrence(Occurrence),
    CreateOverride(NewOccurrenceOverride),
    UpdateOverride(OccurrenceOverride),
    DeleteRecurrenceCascade(Uuid),
    DeleteOccurrence(Uuid),
    CreateException(NewOccurrenceException),
    DeleteOverrideThenCreateException {
        override_id: Uuid,
        new_exception: NewOccurrenceException,
    },
    DeleteOverride(Uuid),
}

/// ## Summary
/// Plans `Update` for a `RecurrencePattern` entry: only `Duration` and
/// `Extensions` may change.
///
/// ## Errors
/// `ImmutableFieldViolation` if `StartTime`, `Type`, `TimeZone`, `RRule`,
/// `Organization`, or `ResourcePath` differ from `stored`.
pub fn plan_update_recurrence(
    inbound: &RecurrenceEntry,
    stored: &Recurrence,
) -> EngineResult<RepoAction> {
    if inbound.start_time.with_timezone(&Utc) != stored.start_time {
        return Err(EngineError::ImmutableFieldViolation("start_time"));
    }
    if inbound.kind != stored.kind {
        return Err(EngineError::ImmutableFieldViolation("type"));
    }
    if inbound.time_zone != stored.time_zone {
        return Err(EngineError::ImmutableFieldViolation("time_zone"));
    }
    if inbound.rrule != stored.rrule {
        return Err(EngineError::ImmutableFieldViolation("rrule"));
    }
    if inbound.organization != stored.organization {
        return Err(EngineError::ImmutableFieldViolation("organization"));
    }
    if inbound.resource_path != stored.resource_path {
        return Err(EngineError::ImmutableFieldViolation("resource_path"));
    }
    validate_duration(inbound.duration)?;
    validate_extensions(&inbound.extensions)?;

    let mut updated = stored.clone();
    updated.duration = inbound.duration;
    updated.extensions = inbound.extensions.clone();
    Ok(RepoAction::UpdateRecurrence(updated))
}

/// ## Summary
/// Plans `Update` for a `Standalone` entry: `StartTime`, `Duration`,
/// `Extensions`, and `Type` may change (per `spec.md` §9's resolution of
/// the `Type`-mutability ambiguity); `Organization`, `ResourcePath`, and
/// `TimeZone` may not.
///
/// ## Errors
/// `ImmutableFieldViolation` if `Organization`, `ResourcePath`, or
/// `TimeZone` differ from `stored`.
pub fn plan_update_standalone(
    inbound: &StandaloneEntry,
    stored: &Occurrence,
) -> EngineResult<RepoAction> {
    if inbound.organization != stored.organization {
        return Err(EngineError::ImmutableFieldViolation("organization"));
    }
    if inbound.resource_path != stored.resource_path {
        return Err(EngineError::ImmutableFieldViolation("resource_path"));
    }
    if inbound.time_zone != stored.time_zone {
        return Err(EngineError::ImmutableFieldViolation("time_zone"));
    }
    validate_kind(&inbound.kind)?;
    validate_duration(inbound.duration)?;
    validate_extensions(&inbound.extensions)?;

    let mut updated = stored.clone();
    updated.kind = inbound.kind.clone();
    updated.start_time = inbound.start_time.with_timezone(&Utc);
    updated.duration = inbound.duration;
    updated.extensions = inbound.extensions.clone();
    Ok(RepoAction::UpdateOccurrence(updated))
}

/// ## Summary
/// Plans `Update` for a virtualized entry without an existing override:
/// creates a new `OccurrenceOverride` snapshotting the parent's current
/// `Duration`/`Extensions` as `Original*`.
///
/// ## Errors
/// `ImmutableFieldViolation` if `Type`, `Organization`, `ResourcePath`, or
/// `TimeZone` differ from the parent recurrence `stored_recurrence`.
pub fn plan_update_virtualized_without_override(
    inbound: &VirtualizedEntry,
    stored_recurrence: &Recurrence,
) -> EngineResult<RepoAction> {
    validate_virtualized_immutables(inbound, stored_recurrence)?;
    validate_duration(inbound.duration)?;
    validate_extensions(&inbound.extensions)?;

    let original = inbound
        .original
        .as_ref()
        .ok_or(EngineError::InvalidOperation(
            "virtualized entry missing Original",
        ))?;

    Ok(RepoAction::CreateOverride(NewOccurrenceOverride {
        recurrence_id: stored_recurrence.id,
        original_time_utc: original.start_time.with_timezone(&Utc),
        start_time: inbound.start_time.with_timezone(&Utc),
        duration: inbound.duration,
        extensions: inbound.extensions.clone(),
        original_duration: stored_recurrence.duration,
        original_extensions: stored_recurrence.extensions.clone(),
    }))
}

/// ## Summary
/// Plans `Update` for a virtualized entry with an existing override:
/// overwrites `StartTime`/`Duration`/`Extensions` in place, leaving
/// `Original*` untouched.
///
/// ## Errors
/// `ImmutableFieldViolation` as in
/// [`plan_update_virtualized_without_override`].
pub fn plan_update_virtualized_with_override(
    inbound: &VirtualizedEntry,
    stored_recurrence: &Recurrence,
    stored_override: &OccurrenceOverride,
) -> EngineResult<RepoAction> {
    validate_virtualized_immutables(inbound, stored_recurrence)?;
    validate_duration(inbound.duration)?;
    validate_extensions(&inbound.extensions)?;

    let mut updated = stored_override.clone();
    updated.start_time = inbound.start_time.with_timezone(&Utc);
    updated.duration = inbound.duration;
    updated.extensions = inbound.extensions.clone();
    Ok(RepoAction::UpdateOverride(updated))
}

fn validate_virtualized_immutables(
    inbound: &VirtualizedEntry,
    stored_recurrence: &Recurrence,
) -> EngineResult<()> {
    if inbound.kind != stored_recurrence.kind {
        return Err(EngineError::ImmutableFieldViolation("type"));
    }
    if inbound.organization != stored_recurrence.organization {
        return Err(EngineError::ImmutableFieldViolation("organization"));
    }
    if inbound.resource_path != stored_recurrence.resource_path {
        return Err(EngineError::ImmutableFieldViolation("resource_path"));
    }
    if inbound.time_zone != stored_recurrence.time_zone {
        return Err(EngineError::ImmutableFieldViolation("time_zone"));
    }
    Ok(())
}

/// ## Summary
/// Plans `Delete` for a `RecurrencePattern`: cascade delete, executed
/// transactionally by `Engine`.
#[must_use]
pub fn plan_delete_recurrence(recurrence_id: Uuid) -> RepoAction {
    RepoAction::DeleteRecurrenceCascade(recurrence_id)
}

/// ## Summary
/// Plans `Delete` for a `Standalone` entry.
#[must_use]
pub fn plan_delete_standalone(occurrence_id: Uuid) -> RepoAction {
    RepoAction::DeleteOccurrence(occurrence_id)
}

/// ## Summary
/// Plans `Delete` for a virtualized entry: without an override, creates an
/// exception at the original instant; with an override, deletes the
/// override and creates the exception at the **original** time (not the
/// moved time), atomically.
///
/// ## Errors
/// `InvalidOperation` if the entry is virtualized but carries no `Original`
/// (can't happen for a genuine virtualized emission, but the field is an
/// `Option` -- see the type's doc comment).
pub fn plan_delete_virtualized(
    inbound: &VirtualizedEntry,
) -> EngineResult<RepoAction> {
    let original = inbound
        .original
        .as_ref()
        .ok_or(EngineError::InvalidOperation(
            "virtualized entry missing Original",
        ))?;
    let new_exception = NewOccurrenceException {
        recurrence_id: inbound.recurrence_id,
        original_time_utc: original.start_time.with_timezone(&Utc),
    };

    Ok(match inbound.override_id {
        Some(override_id) => RepoAction::DeleteOverrideThenCreateException {
            override_id,
            new_exception,
        },
        None => RepoAction::CreateException(new_exception),
    })
}

/// ## Summary
/// Plans `Restore`: only valid for a virtualized entry carrying an override;
/// deletes the override so the next query re-emits the base virtualized
/// instant from the parent recurrence.
///
/// ## Errors
/// `InvalidOperation` for every other classification, including virtualized
/// entries without an override -- excepted instants cannot be restored via
/// this entry point (`spec.md` §4.4, a documented limitation).
pub fn plan_restore(entry: &CalendarEntry) -> EngineResult<RepoAction> {
    match classify(entry) {
        Classification::Virtualized(e) => match e.override_id {
            Some(override_id) => Ok(RepoAction::DeleteOverride(override_id)),
            None => Err(EngineError::InvalidOperation(
                "restore is only valid for a virtualized entry with an existing override",
            )),
        },
        Classification::Standalone(_) | Classification::RecurrencePattern(_) => {
            Err(EngineError::InvalidOperation(
                "restore is only valid for a virtualized entry with an existing override",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calvirt_domain::model::OriginalOccurrence;
    use chrono::TimeZone;

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

    #[test]
    fn recurrence_update_rejects_start_time_change() {
        let rec = recurrence();
        let mut inbound = crate::merge::recurrence_to_entry(&rec);
        inbound.start_time = Utc
            .with_ymd_and_hms(2024, 1, 2, 9, 0, 0)
            .unwrap()
            .with_timezone(&chrono_tz::UTC);

        let err = plan_update_recurrence(&inbound, &rec).unwrap_err();
        assert!(matches!(err, EngineError::ImmutableFieldViolation("start_time")));
    }

    #[test]
    fn recurrence_update_allows_duration_and_extensions() {
        let rec = recurrence();
        let mut inbound = crate::merge::recurrence_to_entry(&rec);
        inbound.duration = chrono::TimeDelta::hours(2);
        inbound.extensions.insert("room".to_string(), "42".to_string());

        let action = plan_update_recurrence(&inbound, &rec).unwrap();
        match action {
            RepoAction::UpdateRecurrence(updated) => {
                assert_eq!(updated.duration, chrono::TimeDelta::hours(2));
                assert_eq!(updated.extensions.get("room"), Some(&"42".to_string()));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    fn occurrence() -> Occurrence {
        Occurrence {
            id: Uuid::nil(),
            organization: "org".to_string(),
            resource_path: "/cal".to_string(),
            kind: "reminder".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            duration: chrono::TimeDelta::hours(1),
            time_zone: chrono_tz::UTC,
            extensions: Default::default(),
        }
    }

    #[test]
    fn standalone_update_rejects_resource_path_change() {
        let occ = occurrence();
        let mut inbound = crate::merge::occurrence_to_entry(&occ);
        inbound.resource_path = "/other".to_string();

        let err = plan_update_standalone(&inbound, &occ).unwrap_err();
        assert!(matches!(err, EngineError::ImmutableFieldViolation("resource_path")));
    }

    #[test]
    fn standalone_update_allows_type_change() {
        let occ = occurrence();
        let mut inbound = crate::merge::occurrence_to_entry(&occ);
        inbound.kind = "meeting".to_string();

        let action = plan_update_standalone(&inbound, &occ).unwrap();
        match action {
            RepoAction::UpdateOccurrence(updated) => {
                assert_eq!(updated.kind, "meeting");
                assert_eq!(updated.resource_path, occ.resource_path);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn restore_requires_override_present() {
        let rec = recurrence();
        let entry = CalendarEntry::Virtualized(VirtualizedEntry {
            recurrence_id: rec.id,
            organization: rec.organization.clone(),
            resource_path: rec.resource_path.clone(),
            kind: rec.kind.clone(),
            start_time: rec.start_time.with_timezone(&chrono_tz::UTC),
            duration: rec.duration,
            end_time: (rec.start_time + rec.duration).with_timezone(&chrono_tz::UTC),
            time_zone: rec.time_zone,
            extensions: Default::default(),
            override_id: None,
            original: Some(OriginalOccurrence {
                start_time: rec.start_time.with_timezone(&chrono_tz::UTC),
                duration: rec.duration,
                extensions: Default::default(),
            }),
        });

        let err = plan_restore(&entry).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));
    }
}
