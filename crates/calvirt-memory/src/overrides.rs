use std::collections::HashMap;

use async_trait::async_trait;
use calvirt_domain::error::{RepoError, RepoResult};
use calvirt_domain::model::{NewOccurrenceOverride, OccurrenceOverride, TimeWindow};
use calvirt_domain::repo::{OverrideRepo, TransactionContext};
use calvirt_domain::tenant::TenantScope;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory `OverrideRepo`, keyed by id and filtered by tenant on every
/// read.
#[derive(Default)]
pub struct InMemoryOverrideRepo {
    rows: RwLock<HashMap<Uuid, OccurrenceOverride>>,
}

impl InMemoryOverrideRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OverrideRepo for InMemoryOverrideRepo {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewOccurrenceOverride,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<OccurrenceOverride> {
        let ov = OccurrenceOverride {
            id: Uuid::new_v4(),
            organization: tenant.organization.clone(),
            resource_path: tenant.resource_path.clone(),
            recurrence_id: new.recurrence_id,
            original_time_utc: new.original_time_utc,
            start_time: new.start_time,
            duration: new.duration,
            extensions: new.extensions,
            original_duration: new.original_duration,
            original_extensions: new.original_extensions,
        };
        self.rows.write().await.insert(ov.id, ov.clone());
        Ok(ov)
    }

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<OccurrenceOverride>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id)
            .filter(|v| belongs_to(v, tenant))
            .cloned())
    }

    async fn update(
        &self,
        tenant: &TenantScope,
        updated: OccurrenceOverride,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<OccurrenceOverride> {
        let mut rows = self.rows.write().await;
        rows.get(&updated.id)
            .filter(|v| belongs_to(v, tenant))
            .ok_or_else(|| RepoError::NotFound(format!("override {}", updated.id)))?;
        rows.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        match rows.get(&id).filter(|v| belongs_to(v, tenant)) {
            Some(_) => {
                rows.remove(&id);
                Ok(())
            }
            None => Err(RepoError::NotFound(format!("override {id}"))),
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
            .retain(|_, v| !(belongs_to(v, tenant) && v.recurrence_id == recurrence_id));
        Ok(())
    }

    async fn get_in_range(
        &self,
        tenant: &TenantScope,
        recurrence_ids: &[Uuid],
        window: TimeWindow,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<OccurrenceOverride>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|v| belongs_to(v, tenant))
            .filter(|v| recurrence_ids.contains(&v.recurrence_id))
            .filter(|v| window.contains(v.original_time_utc) || window.overlaps(v.start_time, v.end_time()))
            .cloned()
            .collect())
    }
}

fn belongs_to(ov: &OccurrenceOverride, tenant: &TenantScope) -> bool {
    ov.organization == tenant.organization && ov.resource_path == tenant.resource_path
}

#[cfg(test)]
mod tests {
    use calvirt_domain::model::{Extensions, TimeWindow};
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;

    #[test_log::test(tokio::test)]
    async fn get_in_range_matches_moved_in_overrides_by_new_time() {
        let repo = InMemoryOverrideRepo::new();
        let tenant = TenantScope::new("acme", "/cal");
        let recurrence_id = Uuid::new_v4();
        let new = NewOccurrenceOverride {
            recurrence_id,
            original_time_utc: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 3, 14, 0, 0).unwrap(),
            duration: TimeDelta::hours(1),
            extensions: Extensions::new(),
            original_duration: TimeDelta::hours(1),
            original_extensions: Extensions::new(),
        };
        repo.create(&tenant, new, None).await.unwrap();

        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap(),
        );
        let found = repo.get_in_range(&tenant, &[recurrence_id], window, None).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn delete_by_recurrence_is_scoped_to_tenant() {
        let repo = InMemoryOverrideRepo::new();
        let owner = TenantScope::new("acme", "/cal");
        let other = TenantScope::new("umbrella", "/cal");
        let recurrence_id = Uuid::new_v4();
        let new = NewOccurrenceOverride {
            recurrence_id,
            original_time_utc: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            duration: TimeDelta::hours(1),
            extensions: Extensions::new(),
            original_duration: TimeDelta::hours(1),
            original_extensions: Extensions::new(),
        };
        let created = repo.create(&owner, new, None).await.unwrap();

        repo.delete_by_recurrence(&other, recurrence_id, None).await.unwrap();
        assert_eq!(repo.get_by_id(&owner, created.id, None).await.unwrap(), Some(created));
    }
}
