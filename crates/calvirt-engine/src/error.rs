use thiserror::Error;

/// Engine-level errors, mapped from backend errors as appropriate.
///
/// One variant per error kind in `spec.md` §7. Validator errors
/// (`InvalidArgument`, `MonthDayOutOfBounds`, `ImmutableFieldViolation`,
/// `InvalidOperation`, `NotFound`) are surfaced directly; repository
/// transient faults are surfaced unchanged via `Backend`/`Cancelled` -- the
/// engine never retries, retry policy is a caller concern.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Creation-time signal: the chosen monthly pattern has no day
    /// `day_of_month` in every month the recurrence spans. Recoverable by
    /// re-issuing the creation request with `MonthDayBehavior::Skip` or
    /// `MonthDayBehavior::Clamp`.
    #[error("day {day_of_month} does not exist in months {affected_months:?} spanned by this recurrence")]
    MonthDayOutOfBounds {
        day_of_month: u8,
        affected_months: Vec<u32>,
    },

    #[error("immutable field violation: {0}")]
    ImmutableFieldViolation(&'static str),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Backend(#[from] calvirt_domain::error::RepoError),

    /// Wraps a [`calvirt_core::error::CoreError`] -- either configuration
    /// failure while building an `Engine` from `EngineSettings`, or an
    /// `InvariantViolation` raised in place of a panic for a planner
    /// outcome that contradicts the action the caller matched on.
    #[error(transparent)]
    Core(#[from] calvirt_core::error::CoreError),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// ## Summary
    /// Folds a [`calvirt_domain::error::RepoError`] into an [`EngineError`],
    /// distinguishing `Cancelled`/`NotFound` from an opaque `Backend` fault
    /// rather than always collapsing to `Backend`.
    #[must_use]
    pub fn from_repo(err: calvirt_domain::error::RepoError) -> Self {
        use calvirt_domain::error::RepoError;
        match err {
            RepoError::Cancelled => Self::Cancelled,
            RepoError::NotFound(what) => Self::NotFound(what),
            RepoError::Backend(msg) => Self::Backend(RepoError::Backend(msg)),
        }
    }
}
