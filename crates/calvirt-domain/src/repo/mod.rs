pub mod exception_repo;
pub mod occurrence_repo;
pub mod override_repo;
pub mod recurrence_repo;
pub mod transaction;

pub use exception_repo::ExceptionRepo;
pub use occurrence_repo::OccurrenceRepo;
pub use override_repo::OverrideRepo;
pub use recurrence_repo::RecurrenceRepo;
pub use transaction::TransactionContext;
