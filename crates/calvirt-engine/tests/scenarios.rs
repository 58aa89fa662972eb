//! The six end-to-end scenarios from `spec.md` §8, run against
//! `calvirt-memory`'s in-memory repositories via the full `Engine` façade
//! (as opposed to `calvirt-engine`'s own unit tests, which exercise
//! `expand`/`merge`/`mutation` as pure functions).

use calvirt_domain::model::{CalendarEntry, MonthDayBehavior, TimeWindow};
use calvirt_domain::repo::{ExceptionRepo, OccurrenceRepo, OverrideRepo, RecurrenceRepo};
use chrono::{Datelike, TimeDelta, TimeZone, Utc};
use chrono_tz::America::New_York;
use tokio_util::sync::CancellationToken;

fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
}

#[test_log::test(tokio::test)]
async fn scenario_1_daily_five_day_window_one_exception() {
    let (engine, repos) = calvirt_test::test_engine();
    let tenant = calvirt_test::default_tenant();

    let new = calvirt_test::daily_recurrence(
        utc(2024, 1, 1, 9, 0, 0),
        utc(2024, 1, 5, 23, 59, 59),
    );
    let recurrence = engine.create_recurrence(&tenant, new, None).await.unwrap();

    repos
        .exceptions
        .create(
            &tenant,
            calvirt_domain::model::NewOccurrenceException {
                recurrence_id: recurrence.id,
                original_time_utc: utc(2024, 1, 3, 9, 0, 0),
            },
            None,
        )
        .await
        .unwrap();

    let window = TimeWindow::new(utc(2024, 1, 1, 0, 0, 0), utc(2024, 1, 5, 23, 59, 59));
    let entries = engine
        .get_occurrences(&tenant, window, None, None, &CancellationToken::new())
        .await
        .unwrap();

    let days: Vec<u32> = entries
        .iter()
        .map(|e| match e {
            CalendarEntry::Virtualized(v) => v.start_time.day(),
            other => panic!("unexpected entry: {other:?}"),
        })
        .collect();
    let mut sorted = days.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![1, 2, 4, 5]);
}

#[test_log::test(tokio::test)]
async fn scenario_2_moved_in_override() {
    let (engine, repos) = calvirt_test::test_engine();
    let tenant = calvirt_test::default_tenant();

    let new = calvirt_test::daily_recurrence(
        utc(2024, 1, 1, 9, 0, 0),
        utc(2024, 1, 20, 23, 59, 59),
    );
    let recurrence = engine.create_recurrence(&tenant, new, None).await.unwrap();

    repos
        .overrides
        .create(
            &tenant,
            calvirt_domain::model::NewOccurrenceOverride {
                recurrence_id: recurrence.id,
                original_time_utc: utc(2024, 1, 15, 9, 0, 0),
                start_time: utc(2024, 1, 3, 14, 0, 0),
                duration: TimeDelta::hours(1),
                extensions: Default::default(),
                original_duration: recurrence.duration,
                original_extensions: recurrence.extensions.clone(),
            },
            None,
        )
        .await
        .unwrap();

    let window = TimeWindow::new(utc(2024, 1, 1, 0, 0, 0), utc(2024, 1, 5, 23, 59, 59));
    let entries = engine
        .get_occurrences(&tenant, window, None, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entries.len(), 6);
    let moved_in = entries
        .iter()
        .filter_map(|e| match e {
            CalendarEntry::Virtualized(v) if v.is_overridden() => Some(v),
            _ => None,
        })
        .count();
    assert_eq!(moved_in, 1);

    let overridden = entries
        .iter()
        .find_map(|e| match e {
            CalendarEntry::Virtualized(v) if v.is_overridden() => Some(v),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        overridden.original.as_ref().unwrap().start_time.with_timezone(&Utc),
        utc(2024, 1, 15, 9, 0, 0)
    );
}

#[test_log::test(tokio::test)]
async fn scenario_3_monthly_31st_clamp_leap_year() {
    let (engine, _repos) = calvirt_test::test_engine();
    let tenant = calvirt_test::default_tenant();

    let new = calvirt_test::monthly_recurrence(
        utc(2024, 1, 31, 9, 0, 0),
        utc(2024, 6, 30, 23, 59, 59),
        31,
        MonthDayBehavior::Clamp,
    );
    engine.create_recurrence(&tenant, new, None).await.unwrap();

    let window = TimeWindow::new(utc(2024, 1, 1, 0, 0, 0), utc(2024, 6, 30, 23, 59, 59));
    let entries = engine
        .get_occurrences(&tenant, window, None, None, &CancellationToken::new())
        .await
        .unwrap();

    let mut days: Vec<u32> = entries
        .iter()
        .map(|e| match e {
            CalendarEntry::Virtualized(v) => v.start_time.day(),
            other => panic!("unexpected entry: {other:?}"),
        })
        .collect();
    days.sort_unstable();
    assert_eq!(days, vec![29, 30, 30, 31, 31, 31]);
}

#[test_log::test(tokio::test)]
async fn scenario_4_dst_spring_forward() {
    let (engine, _repos) = calvirt_test::test_engine();
    let tenant = calvirt_test::default_tenant();

    let local_anchor = New_York
        .with_ymd_and_hms(2024, 3, 10, 2, 30, 0)
        .earliest()
        .unwrap_or_else(|| New_York.with_ymd_and_hms(2024, 3, 10, 3, 30, 0).unwrap());
    let start_utc = local_anchor.with_timezone(&Utc);

    let new = calvirt_test::daily_recurrence_in_zone(
        start_utc,
        utc(2024, 3, 12, 23, 59, 59),
        New_York,
    );
    engine.create_recurrence(&tenant, new, None).await.unwrap();

    let window = TimeWindow::new(utc(2024, 3, 10, 0, 0, 0), utc(2024, 3, 10, 23, 59, 59));
    let entries = engine
        .get_occurrences(&tenant, window, None, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    match &entries[0] {
        CalendarEntry::Virtualized(v) => {
            assert_eq!(v.start_time.with_timezone(&Utc), utc(2024, 3, 10, 7, 30, 0));
        }
        other => panic!("unexpected entry: {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn scenario_5_exception_beats_override() {
    let (engine, repos) = calvirt_test::test_engine();
    let tenant = calvirt_test::default_tenant();

    let new = calvirt_test::daily_recurrence(
        utc(2024, 1, 1, 9, 0, 0),
        utc(2024, 1, 10, 23, 59, 59),
    );
    let recurrence = engine.create_recurrence(&tenant, new, None).await.unwrap();
    let t = utc(2024, 1, 3, 9, 0, 0);

    repos
        .exceptions
        .create(
            &tenant,
            calvirt_domain::model::NewOccurrenceException {
                recurrence_id: recurrence.id,
                original_time_utc: t,
            },
            None,
        )
        .await
        .unwrap();
    repos
        .overrides
        .create(
            &tenant,
            calvirt_domain::model::NewOccurrenceOverride {
                recurrence_id: recurrence.id,
                original_time_utc: t,
                start_time: t + TimeDelta::hours(2),
                duration: recurrence.duration,
                extensions: Default::default(),
                original_duration: recurrence.duration,
                original_extensions: Default::default(),
            },
            None,
        )
        .await
        .unwrap();

    let window = TimeWindow::new(utc(2024, 1, 3, 0, 0, 0), utc(2024, 1, 3, 23, 59, 59));
    let entries = engine
        .get_occurrences(&tenant, window, None, None, &CancellationToken::new())
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[test_log::test(tokio::test)]
async fn scenario_6_cascade_delete() {
    let (engine, repos) = calvirt_test::test_engine();
    let tenant = calvirt_test::default_tenant();

    let new = calvirt_test::daily_recurrence(
        utc(2024, 1, 1, 9, 0, 0),
        utc(2024, 3, 1, 23, 59, 59),
    );
    let recurrence = engine.create_recurrence(&tenant, new, None).await.unwrap();

    for day in 1..=3 {
        repos
            .exceptions
            .create(
                &tenant,
                calvirt_domain::model::NewOccurrenceException {
                    recurrence_id: recurrence.id,
                    original_time_utc: utc(2024, 1, day, 9, 0, 0),
                },
                None,
            )
            .await
            .unwrap();
    }
    for day in 10..=11 {
        repos
            .overrides
            .create(
                &tenant,
                calvirt_domain::model::NewOccurrenceOverride {
                    recurrence_id: recurrence.id,
                    original_time_utc: utc(2024, 1, day, 9, 0, 0),
                    start_time: utc(2024, 1, day, 15, 0, 0),
                    duration: recurrence.duration,
                    extensions: Default::default(),
                    original_duration: recurrence.duration,
                    original_extensions: Default::default(),
                },
                None,
            )
            .await
            .unwrap();
    }

    engine
        .delete_recurrence(&tenant, recurrence.id, None)
        .await
        .unwrap();

    assert!(
        repos
            .recurrences
            .get_by_id(&tenant, recurrence.id, None)
            .await
            .unwrap()
            .is_none()
    );
    let remaining_exceptions = repos
        .exceptions
        .get_by_recurrence_ids(&tenant, &[recurrence.id], None)
        .await
        .unwrap();
    assert!(remaining_exceptions.is_empty());
    let remaining_overrides = repos
        .overrides
        .get_in_range(
            &tenant,
            &[recurrence.id],
            TimeWindow::new(utc(2000, 1, 1, 0, 0, 0), utc(2100, 1, 1, 0, 0, 0)),
            None,
        )
        .await
        .unwrap();
    assert!(remaining_overrides.is_empty());
}
