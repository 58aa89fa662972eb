use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepoResult;
use crate::model::{NewRecurrence, Recurrence, TimeWindow};
use crate::tenant::TenantScope;

use super::TransactionContext;

/// Tenant-scoped persistence contract for `Recurrence`.
///
/// `delete` must cascade to every `OccurrenceException` and
/// `OccurrenceOverride` referencing the deleted recurrence -- either via a
/// backend-level cascade (e.g. a `ON DELETE CASCADE` foreign key) or by the
/// implementation issuing the extra deletes itself inside the supplied
/// transaction.
#[async_trait]
pub trait RecurrenceRepo: Send + Sync {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewRecurrence,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Recurrence>;

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<Recurrence>>;

    async fn update(
        &self,
        tenant: &TenantScope,
        updated: Recurrence,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Recurrence>;

    async fn delete(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<()>;

    /// Returns every `Recurrence` where
    /// `start_time <= window.end && recurrence_end_time >= window.start`,
    /// optionally filtered to `kind in types`.
    async fn get_in_range(
        &self,
        tenant: &TenantScope,
        window: TimeWindow,
        types: Option<&[String]>,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<Recurrence>>;
}
