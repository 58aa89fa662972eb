use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepoResult;
use crate::model::{NewOccurrenceOverride, OccurrenceOverride, TimeWindow};
use crate::tenant::TenantScope;

use super::TransactionContext;

/// Tenant-scoped persistence contract for `OccurrenceOverride`.
#[async_trait]
pub trait OverrideRepo: Send + Sync {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewOccurrenceOverride,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<OccurrenceOverride>;

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<OccurrenceOverride>>;

    async fn update(
        &self,
        tenant: &TenantScope,
        updated: OccurrenceOverride,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<OccurrenceOverride>;

    async fn delete(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<()>;

    async fn delete_by_recurrence(
        &self,
        tenant: &TenantScope,
        recurrence_id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<()>;

    /// Returns every `OccurrenceOverride` among `recurrence_ids` where either
    /// `original_time_utc` falls in `window` (the original instant is in the
    /// window) or `[start_time, end_time]` overlaps `window` (the moved-in
    /// case).
    async fn get_in_range(
        &self,
        tenant: &TenantScope,
        recurrence_ids: &[Uuid],
        window: TimeWindow,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<OccurrenceOverride>>;
}
