use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepoResult;
use crate::model::{NewOccurrence, Occurrence, TimeWindow};
use crate::tenant::TenantScope;

use super::TransactionContext;

/// Tenant-scoped persistence contract for standalone `Occurrence` records.
#[async_trait]
pub trait OccurrenceRepo: Send + Sync {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewOccurrence,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Occurrence>;

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<Occurrence>>;

    async fn update(
        &self,
        tenant: &TenantScope,
        updated: Occurrence,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Occurrence>;

    async fn delete(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<()>;

    /// Returns every `Occurrence` where
    /// `start_time <= window.end && end_time >= window.start`, optionally
    /// filtered to `kind in types`.
    async fn get_in_range(
        &self,
        tenant: &TenantScope,
        window: TimeWindow,
        types: Option<&[String]>,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<Occurrence>>;
}
