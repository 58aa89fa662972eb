use thiserror::Error;

/// Errors a repository contract implementation may return.
///
/// Deliberately opaque: `calvirt-domain` knows nothing about any concrete
/// backend, so a backend-specific fault (a SQL error, a lock-contention
/// timeout, a Redis `MOVED`) is collapsed to `Backend(String)` at the
/// repository boundary. `calvirt-engine::error::EngineError` folds this in
/// unchanged via `#[from]`, the same layering `shuriken-db`'s `DbError` ->
/// `shuriken-service`'s `ServiceError` uses.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = std::result::Result<T, RepoError>;
