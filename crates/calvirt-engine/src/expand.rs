//! Rule Expander (C2): given a `Recurrence` and a UTC query window, yields
//! every UTC instant the recurrence produces within
//! `[qStart, min(qEnd, RecurrenceEndTime)]`.

use calvirt_domain::model::{MonthDayBehavior, Recurrence, TimeWindow};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use rrule::{Frequency, RRule, RRuleSet, Unvalidated};

use crate::time::{self, WallTime};
use crate::validate::days_in_month;

/// Hard cap on instants drawn from a single recurrence per query, to bound
/// pathological RRULEs (e.g. `FREQ=SECONDLY`) against an unbounded window.
/// Not part of the spec's contract; exists only as a backstop. Hitting it is
/// logged, never silently truncated.
const MAX_INSTANTS_PER_RECURRENCE: u16 = 10_000;

/// ## Summary
/// Expands `recurrence` into the UTC instants it produces inside `window`,
/// in non-decreasing order.
///
/// Honors `spec.md` §4.2: zone resolution, lenient-DST per-instant
/// conversion, the `RecurrenceEndTime` bound, and the monthly out-of-bounds
/// policy (`Clamp` is computed directly since RFC 5545 has no native clamp
/// semantics; `Skip`/unset fall through to the underlying enumerator, which
/// already omits months lacking the anchor day).
#[tracing::instrument(skip(recurrence), fields(recurrence_id = %recurrence.id))]
pub fn expand_recurrence(recurrence: &Recurrence, window: TimeWindow) -> Vec<DateTime<Utc>> {
    let effective_end = window.end.min(recurrence.recurrence_end_time);
    if effective_end < window.start {
        return Vec::new();
    }
    let bounded_window = TimeWindow::new(window.start, effective_end);

    let Ok(parsed) = recurrence.rrule.parse::<RRule<Unvalidated>>() else {
        tracing::warn!(recurrence_id = %recurrence.id, "failed to parse stored RRULE at expansion time");
        return Vec::new();
    };

    let is_monthly_clamp = parsed.get_freq() == Frequency::Monthly
        && matches!(recurrence.month_day_behavior, Some(MonthDayBehavior::Clamp))
        && parsed.get_by_month_day().iter().any(|d| (29..=31).contains(&d.abs()));

    if is_monthly_clamp {
        expand_monthly_clamp(recurrence, &parsed, bounded_window)
    } else {
        expand_via_rrule_crate(recurrence, &parsed, bounded_window)
    }
}

fn expand_via_rrule_crate(
    recurrence: &Recurrence,
    parsed: &RRule<Unvalidated>,
    window: TimeWindow,
) -> Vec<DateTime<Utc>> {
    let zone = recurrence.time_zone;
    let Some(rrule_set) = build_rrule_set(recurrence, parsed) else {
        tracing::warn!(recurrence_id = %recurrence.id, "failed to build RRuleSet at expansion time");
        return Vec::new();
    };

    let tz = rrule::Tz::Tz(zone);
    let local_start = window.start.with_timezone(&tz);
    let local_end = window.end.with_timezone(&tz);

    let result = rrule_set
        .after(local_start)
        .before(local_end)
        .all(MAX_INSTANTS_PER_RECURRENCE);

    if result.limited {
        tracing::warn!(
            recurrence_id = %recurrence.id,
            cap = MAX_INSTANTS_PER_RECURRENCE,
            "recurrence expansion hit the per-query instant cap"
        );
    }

    let mut instants: Vec<DateTime<Utc>> = result
        .dates
        .into_iter()
        .map(|d| time::to_utc(WallTime::Local(d.naive_local()), zone))
        .filter(|u| window.contains(*u))
        .collect();
    instants.sort_unstable();
    instants
}

fn build_rrule_set(recurrence: &Recurrence, parsed: &RRule<Unvalidated>) -> Option<RRuleSet> {
    let tz = rrule::Tz::Tz(recurrence.time_zone);
    let dt_start = recurrence.start_time.with_timezone(&tz);
    parsed.clone().build(dt_start).ok()
}

/// Directly computes one instant per calendar month spanned by the
/// recurrence, clamping the day-of-month to the last valid day where the
/// anchor day doesn't exist (RFC 5545 has no native `BYMONTHDAY` clamp mode).
fn expand_monthly_clamp(
    recurrence: &Recurrence,
    parsed: &RRule<Unvalidated>,
    window: TimeWindow,
) -> Vec<DateTime<Utc>> {
    let zone = recurrence.time_zone;
    let Some(&target_day) = parsed.get_by_month_day().iter().find(|d| (29..=31).contains(&d.abs())) else {
        return Vec::new();
    };
    let Ok(target_day) = u32::try_from(target_day) else {
        return Vec::new();
    };

    let anchor_local = recurrence.start_time.with_timezone(&zone);
    let anchor_time = anchor_local.time();
    let interval = u32::from(parsed.get_interval());

    let mut instants = Vec::new();
    let mut year = anchor_local.year();
    let mut month = anchor_local.month();
    let last_year_month = end_year_month(recurrence.recurrence_end_time, zone);

    loop {
        let clamped_day = target_day.min(u32::from(days_in_month(year, month)));
        if let Some(naive) = NaiveDate::from_ymd_opt(year, month, clamped_day)
            .and_then(|d| build_naive_datetime(d, anchor_time))
        {
            let instant = time::to_utc(WallTime::Local(naive), zone);
            if instant > window.end {
                break;
            }
            if instant >= recurrence.start_time
                && instant <= recurrence.recurrence_end_time
                && window.contains(instant)
            {
                instants.push(instant);
            }
        }

        if (year, month) >= last_year_month {
            break;
        }
        let (next_year, next_month) = advance_months(year, month, interval);
        year = next_year;
        month = next_month;
    }

    instants
}

fn build_naive_datetime(date: NaiveDate, time: NaiveTime) -> Option<NaiveDateTime> {
    Some(NaiveDateTime::new(
        date,
        NaiveTime::from_hms_opt(time.hour(), time.minute(), time.second())?,
    ))
}

fn advance_months(year: i32, month: u32, interval: u32) -> (i32, u32) {
    let total = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(interval);
    let year = i32::try_from(total.div_euclid(12)).unwrap_or(year);
    let month = u32::try_from(total.rem_euclid(12)).unwrap_or(month - 1) + 1;
    (year, month)
}

fn end_year_month(end: DateTime<Utc>, zone: chrono_tz::Tz) -> (i32, u32) {
    let local = end.with_timezone(&zone);
    (local.year(), local.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calvirt_domain::model::Recurrence;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn daily_recurrence(until: DateTime<Utc>) -> Recurrence {
        Recurrence {
            id: Uuid::nil(),
            organization: String::new(),
            resource_path: String::new(),
            kind: "meeting".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            duration: chrono::TimeDelta::hours(1),
            recurrence_end_time: until,
            rrule: "FREQ=DAILY;UNTIL=20240105T235959Z".to_string(),
            time_zone: chrono_tz::UTC,
            month_day_behavior: None,
            extensions: Default::default(),
        }
    }

    #[test]
    fn expansion_stays_within_window() {
        let rec = daily_recurrence(Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap());
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap(),
        );
        let instants = expand_recurrence(&rec, window);
        assert_eq!(instants.len(), 5);
        assert!(instants.iter().all(|i| window.contains(*i)));
        assert!(instants.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn monthly_clamp_emits_one_per_month() {
        let mut rec = daily_recurrence(Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap());
        rec.start_time = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        rec.rrule = "FREQ=MONTHLY;BYMONTHDAY=31;UNTIL=20240630T235959Z".to_string();
        rec.month_day_behavior = Some(MonthDayBehavior::Clamp);

        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap(),
        );
        let instants = expand_recurrence(&rec, window);
        let days: Vec<u32> = instants.iter().map(|i| i.day()).collect();
        assert_eq!(days, vec![31, 29, 31, 30, 31, 30]);
    }
}
