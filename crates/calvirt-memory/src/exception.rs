use std::collections::HashMap;

use async_trait::async_trait;
use calvirt_domain::error::{RepoError, RepoResult};
use calvirt_domain::model::{NewOccurrenceException, OccurrenceException};
use calvirt_domain::repo::{ExceptionRepo, TransactionContext};
use calvirt_domain::tenant::TenantScope;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory `ExceptionRepo`, keyed by id and filtered by tenant on every
/// read.
#[derive(Default)]
pub struct InMemoryExceptionRepo {
    rows: RwLock<HashMap<Uuid, OccurrenceException>>,
}

impl InMemoryExceptionRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExceptionRepo for InMemoryExceptionRepo {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewOccurrenceException,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<OccurrenceException> {
        let exception = OccurrenceException {
            id: Uuid::new_v4(),
            organization: tenant.organization.clone(),
            resource_path: tenant.resource_path.clone(),
            recurrence_id: new.recurrence_id,
            original_time_utc: new.original_time_utc,
        };
        self.rows.write().await.insert(exception.id, exception.clone());
        Ok(exception)
    }

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<OccurrenceException>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id)
            .filter(|x| belongs_to(x, tenant))
            .cloned())
    }

    async fn delete(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        match rows.get(&id).filter(|x| belongs_to(x, tenant)) {
            Some(_) => {
                rows.remove(&id);
                Ok(())
            }
            None => Err(RepoError::NotFound(format!("exception {id}"))),
        }
    }

    async fn delete_by_recurrence(
        &self,
        tenant: &TenantScope,
        recurrence_id: Uuid,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<()> {
        self.rows
            .write()
            .await
            .retain(|_, x| !(belongs_to(x, tenant) && x.recurrence_id == recurrence_id));
        Ok(())
    }

    async fn get_by_recurrence_ids(
        &self,
        tenant: &TenantScope,
        recurrence_ids: &[Uuid],
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<OccurrenceException>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|x| belongs_to(x, tenant))
            .filter(|x| recurrence_ids.contains(&x.recurrence_id))
            .cloned()
            .collect())
    }
}

fn belongs_to(exception: &OccurrenceException, tenant: &TenantScope) -> bool {
    exception.organization == tenant.organization && exception.resource_path == tenant.resource_path
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test_log::test(tokio::test)]
    async fn delete_by_recurrence_is_scoped_to_tenant() {
        let repo = InMemoryExceptionRepo::new();
        let owner = TenantScope::new("acme", "/cal");
        let other = TenantScope::new("umbrella", "/cal");
        let recurrence_id = Uuid::new_v4();
        let new = NewOccurrenceException {
            recurrence_id,
            original_time_utc: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        };
        let created = repo.create(&owner, new, None).await.unwrap();

        repo.delete_by_recurrence(&other, recurrence_id, None).await.unwrap();
        assert_eq!(repo.get_by_id(&owner, created.id, None).await.unwrap(), Some(created));

        repo.delete_by_recurrence(&owner, recurrence_id, None).await.unwrap();
        assert!(
            repo.get_by_recurrence_ids(&owner, &[recurrence_id], None)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
