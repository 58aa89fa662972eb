//! Time Model (C1): UTC<->local conversions under an IANA zone, lenient DST
//! resolution, and zone-id validation.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{EngineError, EngineResult};

/// A wall-clock time tagged with its interpretation: already-UTC, or local to
/// some zone and still needing resolution.
///
/// There is deliberately no "unspecified" variant: an `Unspecified`-kind
/// input (per `spec.md` §4.1) is simply a `WallTime` the caller never
/// constructed, which `InvalidArgument` covers by construction rather than by
/// a runtime tag check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallTime {
    Utc(DateTime<Utc>),
    Local(NaiveDateTime),
}

/// ## Summary
/// Parses and validates an IANA time zone id (e.g. `America/New_York`)
/// against the `chrono-tz` database.
///
/// ## Errors
/// Returns `InvalidArgument` for anything not in the tz database, including
/// Windows display names (`Eastern Standard Time`), which never parse as an
/// IANA id.
#[tracing::instrument]
pub fn parse_zone(id: &str) -> EngineResult<Tz> {
    id.parse::<Tz>()
        .map_err(|_| EngineError::InvalidArgument(format!("unknown IANA time zone: {id}")))
}

/// ## Summary
/// Converts a [`WallTime`] to UTC.
///
/// If already UTC, returned unchanged. If local, resolved against `zone`
/// using lenient DST resolution: ambiguous wall times (fall-back) pick the
/// earlier offset; skipped wall times (spring-forward) are shifted forward
/// to the first valid instant after the gap.
#[must_use]
#[tracing::instrument(skip(zone))]
pub fn to_utc(t: WallTime, zone: Tz) -> DateTime<Utc> {
    match t {
        WallTime::Utc(dt) => dt,
        WallTime::Local(naive) => resolve_lenient(naive, zone).with_timezone(&Utc),
    }
}

/// ## Summary
/// Resolves a naive local wall time against `zone` using the lenient DST
/// policy described in `spec.md` §4.1/§9 ("Lenient DST"): the mapping is
/// total, every naive wall time produces exactly one instant.
#[must_use]
fn resolve_lenient(naive: NaiveDateTime, zone: Tz) -> DateTime<Tz> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _later) => {
            tracing::trace!(%naive, %zone, "ambiguous local time, picking earlier offset");
            earlier
        }
        LocalResult::None => {
            tracing::trace!(%naive, %zone, "local time falls in a DST gap, shifting forward");
            shift_forward_past_gap(naive, zone)
        }
    }
}

/// Walks forward minute by minute until a wall time outside the gap is
/// found. DST gaps are at most a couple of hours in every zone in the tz
/// database, so this terminates quickly in practice; bounded defensively at
/// four hours so a corrupt zone table can't spin forever.
fn shift_forward_past_gap(naive: NaiveDateTime, zone: Tz) -> DateTime<Tz> {
    let mut candidate = naive;
    for _ in 0..(4 * 60) {
        candidate += chrono::TimeDelta::minutes(1);
        if let LocalResult::Single(dt) = zone.from_local_datetime(&candidate) {
            return dt;
        }
    }
    // Unreachable for any real IANA zone; fall back to a UTC-offset
    // interpretation rather than panicking.
    Utc.from_utc_datetime(&naive).with_timezone(&zone)
}

/// ## Summary
/// Converts a UTC instant to a naive local wall time + zone, for
/// reconstructing the final surface entries returned to callers.
///
/// This direction is deterministic: no DST ambiguity arises when converting
/// from a known instant to local time.
#[must_use]
#[tracing::instrument(skip(zone))]
pub fn to_local(instant: DateTime<Utc>, zone: Tz) -> DateTime<Tz> {
    instant.with_timezone(&zone)
}
