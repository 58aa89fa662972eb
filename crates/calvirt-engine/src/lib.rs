//! Calendar virtualization engine: expands recurrences into UTC instants
//! under a correct time-zone/DST model, merges in exceptions/overrides and
//! standalone occurrences, and translates mutations back into minimal delta
//! records.
//!
//! Module layout mirrors `spec.md` §2's component table: [`time`] (C1),
//! [`expand`] (C2), [`merge`] (C3), [`mutation`] (C4), [`validate`] (C5).
//! [`engine`] is the `Engine` façade (§6.1) that wires the four pure
//! components to the repository contracts in `calvirt_domain::repo` (C6).

pub mod engine;
pub mod error;
pub mod expand;
pub mod merge;
pub mod mutation;
pub mod time;
pub mod validate;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
