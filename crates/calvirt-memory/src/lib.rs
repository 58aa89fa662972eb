//! In-memory implementations of the four `calvirt_domain::repo` contracts.
//!
//! Not a production backend -- `spec.md` §1 treats persistence as an
//! external collaborator the engine only depends on through those four
//! trait contracts -- but the reference implementation `calvirt-engine`'s
//! own integration tests and any embedder's examples run against, playing
//! the role `shuriken-db`'s diesel layer plays for `DbProvider` in the
//! teacher, minus the SQL.
//!
//! `RecurrenceRepo::delete` here is a single-table delete: cascading to
//! `OccurrenceException`/`OccurrenceOverride` rows is performed by
//! `calvirt_engine::Engine::delete_recurrence` itself (it issues the two
//! `delete_by_recurrence` calls before deleting the recurrence), exactly the
//! "engine-driven transaction" alternative `spec.md` §3/§6.2 allows for a
//! backend with no native cascade.

mod exception;
mod occurrence;
mod overrides;
mod recurrence;

pub use exception::InMemoryExceptionRepo;
pub use occurrence::InMemoryOccurrenceRepo;
pub use overrides::InMemoryOverrideRepo;
pub use recurrence::InMemoryRecurrenceRepo;

use std::sync::Arc;

use calvirt_domain::repo::{ExceptionRepo, OccurrenceRepo, OverrideRepo, RecurrenceRepo};

/// Bundles one in-memory store per repository contract, for wiring up an
/// `Engine` in tests with a single constructor call.
#[derive(Clone)]
pub struct InMemoryRepositories {
    pub recurrences: Arc<InMemoryRecurrenceRepo>,
    pub occurrences: Arc<InMemoryOccurrenceRepo>,
    pub exceptions: Arc<InMemoryExceptionRepo>,
    pub overrides: Arc<InMemoryOverrideRepo>,
}

impl InMemoryRepositories {
    #[must_use]
    pub fn new() -> Self {
        Self {
            recurrences: Arc::new(InMemoryRecurrenceRepo::new()),
            occurrences: Arc::new(InMemoryOccurrenceRepo::new()),
            exceptions: Arc::new(InMemoryExceptionRepo::new()),
            overrides: Arc::new(InMemoryOverrideRepo::new()),
        }
    }

    #[must_use]
    pub fn as_recurrence_repo(&self) -> Arc<dyn RecurrenceRepo> {
        self.recurrences.clone()
    }

    #[must_use]
    pub fn as_occurrence_repo(&self) -> Arc<dyn OccurrenceRepo> {
        self.occurrences.clone()
    }

    #[must_use]
    pub fn as_exception_repo(&self) -> Arc<dyn ExceptionRepo> {
        self.exceptions.clone()
    }

    #[must_use]
    pub fn as_override_repo(&self) -> Arc<dyn OverrideRepo> {
        self.overrides.clone()
    }
}

impl Default for InMemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}
