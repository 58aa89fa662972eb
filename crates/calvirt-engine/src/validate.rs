//! Creation Validator (C5): field validation, RRULE parsing/extraction, and
//! the monthly out-of-bounds analysis shared by creation-time validation and
//! expansion-time behavior.

use calvirt_domain::model::{MonthDayBehavior, NewOccurrence, NewRecurrence};
use calvirt_domain::tenant::TenantScope;
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use rrule::{Frequency, RRule, Unvalidated};

use crate::error::{EngineError, EngineResult};

const MAX_TENANT_FIELD_LEN: usize = 100;
const MAX_TYPE_LEN: usize = 100;
const MAX_RRULE_LEN: usize = 2000;
const MAX_EXTENSION_KEY_LEN: usize = 100;
const MAX_EXTENSION_VALUE_LEN: usize = 1024;

/// ## Summary
/// Validates `organization`/`resource_path` length bounds shared by every
/// creation entry point. Both may be empty but must be non-null (the Rust
/// type already forbids null) and `<=100` chars.
#[tracing::instrument(skip(tenant))]
pub fn validate_tenant_scope(tenant: &TenantScope) -> EngineResult<()> {
    if tenant.organization.chars().count() > MAX_TENANT_FIELD_LEN {
        return Err(EngineError::InvalidArgument(
            "organization exceeds 100 characters".to_string(),
        ));
    }
    if tenant.resource_path.chars().count() > MAX_TENANT_FIELD_LEN {
        return Err(EngineError::InvalidArgument(
            "resource_path exceeds 100 characters".to_string(),
        ));
    }
    Ok(())
}

/// ## Summary
/// Validates a `kind` ("Type") field: 1-100 chars.
pub fn validate_kind(kind: &str) -> EngineResult<()> {
    let len = kind.chars().count();
    if len == 0 || len > MAX_TYPE_LEN {
        return Err(EngineError::InvalidArgument(
            "type must be 1-100 characters".to_string(),
        ));
    }
    Ok(())
}

/// ## Summary
/// Validates the extension bag: keys 1-100 chars, values `<=1024` chars.
/// Uniqueness of keys is enforced by `BTreeMap` at the type level.
pub fn validate_extensions(extensions: &calvirt_domain::model::Extensions) -> EngineResult<()> {
    for (key, value) in extensions {
        let key_len = key.chars().count();
        if key_len == 0 || key_len > MAX_EXTENSION_KEY_LEN {
            return Err(EngineError::InvalidArgument(format!(
                "extension key '{key}' must be 1-100 characters"
            )));
        }
        if value.chars().count() > MAX_EXTENSION_VALUE_LEN {
            return Err(EngineError::InvalidArgument(format!(
                "extension value for key '{key}' exceeds 1024 characters"
            )));
        }
    }
    Ok(())
}

pub fn validate_duration(duration: TimeDelta) -> EngineResult<()> {
    if duration <= TimeDelta::zero() {
        return Err(EngineError::InvalidArgument(
            "duration must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// ## Summary
/// Validates the optional `types` filter accepted by `GetOccurrences`/
/// `GetRecurrences`: `None` means "all kinds", `Some(&[])` is rejected.
pub fn validate_types_filter(types: Option<&[String]>) -> EngineResult<()> {
    if let Some(types) = types {
        if types.is_empty() {
            return Err(EngineError::InvalidArgument(
                "types filter must not be an empty list; omit it to match all kinds".to_string(),
            ));
        }
    }
    Ok(())
}

/// ## Summary
/// Parses a stored RRULE string into the `rrule` crate's own (unvalidated)
/// type, which every other check in this module then reads fields off of
/// directly rather than re-splitting the text.
///
/// ## Errors
/// `InvalidArgument` if the rule exceeds 2000 characters or does not parse.
pub fn parse_rrule(rrule: &str) -> EngineResult<RRule<Unvalidated>> {
    if rrule.chars().count() > MAX_RRULE_LEN {
        return Err(EngineError::InvalidArgument(
            "rrule exceeds 2000 characters".to_string(),
        ));
    }
    rrule
        .parse::<RRule<Unvalidated>>()
        .map_err(|e| EngineError::InvalidArgument(format!("invalid rrule: {e}")))
}

/// ## Summary
/// Parses and validates a stored RRULE string, returning the UTC
/// `recurrence_end_time` extracted from its `UNTIL` clause.
///
/// ## Errors
/// `InvalidArgument` if the rule exceeds 2000 characters, contains `COUNT`,
/// omits `UNTIL`, or `UNTIL` does not end in `Z` (i.e. is not UTC).
#[tracing::instrument]
pub fn validate_rrule(rrule: &str, start_time: DateTime<Utc>) -> EngineResult<DateTime<Utc>> {
    let parsed = parse_rrule(rrule)?;
    validate_until(&parsed, start_time)
}

/// ## Summary
/// Checks the `COUNT`/`UNTIL` shape of an already-parsed rule and returns the
/// UTC instant its `UNTIL` resolves to.
fn validate_until(
    parsed: &RRule<Unvalidated>,
    start_time: DateTime<Utc>,
) -> EngineResult<DateTime<Utc>> {
    if parsed.get_count().is_some() {
        return Err(EngineError::InvalidArgument(
            "rrule must not contain COUNT".to_string(),
        ));
    }

    let until = parsed
        .get_until()
        .ok_or_else(|| EngineError::InvalidArgument("rrule must contain UNTIL".to_string()))?;

    // `rrule` resolves a bare (no `Z`) UNTIL to the machine's local timezone;
    // a `Z`-suffixed UNTIL resolves to `Tz::UTC`, which is never `is_local`.
    if until.timezone().is_local() {
        return Err(EngineError::InvalidArgument(
            "rrule UNTIL must be UTC (end in Z)".to_string(),
        ));
    }
    let until = until.with_timezone(&Utc);

    if until < start_time {
        return Err(EngineError::InvalidArgument(
            "rrule UNTIL must not precede start_time".to_string(),
        ));
    }

    Ok(until)
}

/// ## Summary
/// Returns the sorted, deduplicated list of calendar month numbers (1-12)
/// that do not contain `day_of_month` somewhere in `[start, end]`, for a
/// monthly-frequency RRULE anchored on that day. Returns an empty vector if
/// the rule isn't a monthly pattern with a `BYMONTHDAY` in `{29, 30, 31}`, or
/// if every month in the span contains that day.
#[must_use]
pub fn monthly_out_of_bounds_months(
    parsed: &RRule<Unvalidated>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<(u8, Vec<u32>)> {
    if parsed.get_freq() != Frequency::Monthly {
        return None;
    }

    let day = *parsed
        .get_by_month_day()
        .iter()
        .find(|d| (29..=31).contains(&d.abs()))?;
    let day = u8::try_from(day).ok()?;

    let mut affected = Vec::new();
    let mut year = start.year();
    let mut month = start.month();
    loop {
        if days_in_month(year, month) < day {
            if !affected.contains(&month) {
                affected.push(month);
            }
        }
        if (year, month) >= (end.year(), end.month()) {
            break;
        }
        if month == 12 {
            month = 1;
            year += 1;
        } else {
            month += 1;
        }
    }

    affected.sort_unstable();
    if affected.is_empty() {
        None
    } else {
        Some((day, affected))
    }
}

#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u8 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let this_month_first = NaiveDate::from_ymd_opt(year, month, 1);
    match (this_month_first, next_month_first) {
        (Some(first), Some(next)) => u8::try_from((next - first).num_days()).unwrap_or(31),
        _ => 31,
    }
}

/// ## Summary
/// Full validation for `CreateRecurrence`: field bounds, RRULE shape, and
/// monthly out-of-bounds analysis. Returns `(recurrence_end_time,
/// resolved_month_day_behavior)` on success.
///
/// ## Errors
/// `InvalidArgument` for malformed fields/RRULE; `MonthDayOutOfBounds` if the
/// pattern needs a policy and `month_day_behavior` is `Throw` or unset.
#[tracing::instrument(skip(new))]
pub fn validate_recurrence_creation(
    tenant: &TenantScope,
    new: &NewRecurrence,
) -> EngineResult<(DateTime<Utc>, Option<MonthDayBehavior>)> {
    validate_tenant_scope(tenant)?;
    validate_kind(&new.kind)?;
    validate_duration(new.duration)?;
    validate_extensions(&new.extensions)?;

    let parsed_rrule = parse_rrule(&new.rrule)?;
    let recurrence_end_time = validate_until(&parsed_rrule, new.start_time)?;

    if let Some((day, affected_months)) =
        monthly_out_of_bounds_months(&parsed_rrule, new.start_time, recurrence_end_time)
    {
        match new.month_day_behavior {
            Some(MonthDayBehavior::Skip) | Some(MonthDayBehavior::Clamp) => {}
            Some(MonthDayBehavior::Throw) | None => {
                tracing::warn!(day, ?affected_months, "monthly pattern out of bounds");
                return Err(EngineError::MonthDayOutOfBounds {
                    day_of_month: day,
                    affected_months,
                });
            }
        }
    }

    Ok((recurrence_end_time, new.month_day_behavior))
}

/// ## Summary
/// Full validation for `CreateOccurrence`: field bounds only (no RRULE/policy
/// steps).
#[tracing::instrument(skip(new))]
pub fn validate_occurrence_creation(
    tenant: &TenantScope,
    new: &NewOccurrence,
) -> EngineResult<()> {
    validate_tenant_scope(tenant)?;
    validate_kind(&new.kind)?;
    validate_duration(new.duration)?;
    validate_extensions(&new.extensions)?;
    Ok(())
}
