//! Shared test fixtures and builders for the calendar virtualization
//! engine's own test suites.
//!
//! Mirrors `shuriken-test`'s role as cross-crate integration test support,
//! minus the database: instead of wiring a real `DbProvider`, [`test_engine`]
//! wires an `Engine` against `calvirt_memory::InMemoryRepositories`, and the
//! builder functions below construct well-formed `New*` values so scenario
//! tests aren't each re-deriving RRULE text and duration defaults by hand.

use std::sync::OnceLock;

use calvirt_core::config::EngineSettings;
use calvirt_core::logging::TracingHandle;
use calvirt_domain::model::{Extensions, MonthDayBehavior, NewOccurrence, NewRecurrence};
use calvirt_domain::tenant::TenantScope;
use calvirt_engine::Engine;
use calvirt_memory::InMemoryRepositories;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

static SETTINGS: OnceLock<EngineSettings> = OnceLock::new();
static TRACING: OnceLock<TracingHandle> = OnceLock::new();

/// ## Summary
/// Loads `EngineSettings` once per test binary, mirroring the teacher's
/// `CONFIG_INIT: OnceLock<Settings>` pattern in its integration test
/// helpers.
///
/// ## Panics
/// If configuration loading fails -- a misconfigured test environment
/// should fail loudly, not silently fall back.
fn test_settings() -> &'static EngineSettings {
    SETTINGS.get_or_init(|| calvirt_core::config::load_config().expect("failed to load config for tests"))
}

/// ## Summary
/// Builds a `TenantScope` for test fixtures.
#[must_use]
pub fn tenant(organization: &str, resource_path: &str) -> TenantScope {
    TenantScope::new(organization, resource_path)
}

/// ## Summary
/// A stable default tenant for tests that don't care about multi-tenancy.
#[must_use]
pub fn default_tenant() -> TenantScope {
    tenant("acme", "/calendars/primary")
}

/// ## Summary
/// Wires an `Engine` against a fresh set of in-memory repositories, with its
/// default `MonthDayBehavior` taken from `test_settings()` rather than a
/// hardcoded constant, and the process-wide tracing subscriber installed on
/// first use.
///
/// Returns both so tests can reach into the stores directly (e.g. to assert
/// a cascade delete left zero rows) without going back through the engine.
#[must_use]
pub fn test_engine() -> (Engine, InMemoryRepositories) {
    TRACING.get_or_init(calvirt_core::logging::init_tracing);

    let repos = InMemoryRepositories::new();
    let engine = Engine::from_settings(
        repos.as_recurrence_repo(),
        repos.as_occurrence_repo(),
        repos.as_exception_repo(),
        repos.as_override_repo(),
        test_settings(),
    );
    (engine, repos)
}

/// ## Summary
/// Builds a `NewRecurrence` for a daily pattern in `Etc/UTC`, 1 hour
/// duration, no extensions.
#[must_use]
pub fn daily_recurrence(start: DateTime<Utc>, until: DateTime<Utc>) -> NewRecurrence {
    NewRecurrence {
        kind: "meeting".to_string(),
        start_time: start,
        duration: TimeDelta::hours(1),
        recurrence_end_time: until,
        rrule: format!("FREQ=DAILY;UNTIL={}", until_tag(until)),
        time_zone: chrono_tz::UTC,
        month_day_behavior: None,
        extensions: Extensions::new(),
    }
}

/// ## Summary
/// Builds a `NewRecurrence` for a daily pattern in `zone` instead of UTC,
/// for DST-sensitive scenarios.
#[must_use]
pub fn daily_recurrence_in_zone(start: DateTime<Utc>, until: DateTime<Utc>, zone: Tz) -> NewRecurrence {
    NewRecurrence {
        time_zone: zone,
        ..daily_recurrence(start, until)
    }
}

/// ## Summary
/// Builds a `NewRecurrence` for a monthly pattern anchored on
/// `by_month_day`, with the given out-of-bounds `behavior`.
#[must_use]
pub fn monthly_recurrence(
    start: DateTime<Utc>,
    until: DateTime<Utc>,
    by_month_day: u32,
    behavior: MonthDayBehavior,
) -> NewRecurrence {
    NewRecurrence {
        kind: "meeting".to_string(),
        start_time: start,
        duration: TimeDelta::hours(1),
        recurrence_end_time: until,
        rrule: format!("FREQ=MONTHLY;BYMONTHDAY={by_month_day};UNTIL={}", until_tag(until)),
        time_zone: chrono_tz::UTC,
        month_day_behavior: Some(behavior),
        extensions: Extensions::new(),
    }
}

/// ## Summary
/// Builds a `NewOccurrence` for a standalone occurrence.
#[must_use]
pub fn standalone_occurrence(start: DateTime<Utc>, duration: TimeDelta, zone: Tz) -> NewOccurrence {
    NewOccurrence {
        kind: "reminder".to_string(),
        start_time: start,
        duration,
        time_zone: zone,
        extensions: Extensions::new(),
    }
}

fn until_tag(until: DateTime<Utc>) -> String {
    until.format("%Y%m%dT%H%M%SZ").to_string()
}
