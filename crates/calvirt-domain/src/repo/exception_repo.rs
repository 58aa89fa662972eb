use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepoResult;
use crate::model::{NewOccurrenceException, OccurrenceException};
use crate::tenant::TenantScope;

use super::TransactionContext;

/// Tenant-scoped persistence contract for `OccurrenceException`.
#[async_trait]
pub trait ExceptionRepo: Send + Sync {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewOccurrenceException,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<OccurrenceException>;

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<OccurrenceException>>;

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

    async fn get_by_recurrence_ids(
        &self,
        tenant: &TenantScope,
        recurrence_ids: &[Uuid],
        tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<OccurrenceException>>;
}
