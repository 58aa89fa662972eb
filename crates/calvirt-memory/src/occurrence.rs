use std::collections::HashMap;

use async_trait::async_trait;
use calvirt_domain::error::{RepoError, RepoResult};
use calvirt_domain::model::{NewOccurrence, Occurrence, TimeWindow};
use calvirt_domain::repo::{OccurrenceRepo, TransactionContext};
use calvirt_domain::tenant::TenantScope;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::recurrence::matches_types;

/// In-memory `OccurrenceRepo`, keyed by id and filtered by tenant on every
/// read.
#[derive(Default)]
pub struct InMemoryOccurrenceRepo {
    rows: RwLock<HashMap<Uuid, Occurrence>>,
}

impl InMemoryOccurrenceRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OccurrenceRepo for InMemoryOccurrenceRepo {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewOccurrence,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Occurrence> {
        let occurrence = Occurrence {
            id: Uuid::new_v4(),
            organization: tenant.organization.clone(),
            resource_path: tenant.resource_path.clone(),
            kind: new.kind,
            start_time: new.start_time,
            duration: new.duration,
            time_zone: new.time_zone,
            extensions: new.extensions,
        };
        self.rows.write().await.insert(occurrence.id, occurrence.clone());
        Ok(occurrence)
    }

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<Occurrence>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id)
            .filter(|o| belongs_to(o, tenant))
            .cloned())
    }

    async fn update(
        &self,
        tenant: &TenantScope,
        updated: Occurrence,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Occurrence> {
        let mut rows = self.rows.write().await;
        let existing = rows
            .get(&updated.id)
            .filter(|o| belongs_to(o, tenant))
            .ok_or_else(|| RepoError::NotFound(format!("occurrence {}", updated.id)))?;
        if existing.organization != updated.organization {
            return Err(RepoError::Backend(
                "organization may not change on update".to_string(),
            ));
        }
        if existing.resource_path != updated.resource_path {
            return Err(RepoError::Backend(
                "resource_path may not change on update".to_string(),
            ));
        }
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
        match rows.get(&id).filter(|o| belongs_to(o, tenant)) {
            Some(_) => {
                rows.remove(&id);
                Ok(())
            }
            None => Err(RepoError::NotFound(format!("occurrence {id}"))),
        }
    }

    async fn get_in_range(
        &self,
        tenant: &TenantScope,
        window: TimeWindow,
        types: Option<&[String]>,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<Occurrence>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|o| belongs_to(o, tenant))
            .filter(|o| o.start_time <= window.end && o.end_time() >= window.start)
            .filter(|o| matches_types(&o.kind, types))
            .cloned()
            .collect())
    }
}

fn belongs_to(occurrence: &Occurrence, tenant: &TenantScope) -> bool {
    occurrence.organization == tenant.organization && occurrence.resource_path == tenant.resource_path
}

#[cfg(test)]
mod tests {
    use calvirt_domain::model::{Extensions, TimeWindow};
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;

    fn new_occurrence() -> NewOccurrence {
        NewOccurrence {
            kind: "reminder".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            duration: TimeDelta::minutes(30),
            time_zone: chrono_tz::UTC,
            extensions: Extensions::new(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn create_then_get_by_id_round_trips() {
        let repo = InMemoryOccurrenceRepo::new();
        let tenant = TenantScope::new("acme", "/cal");
        let created = repo.create(&tenant, new_occurrence(), None).await.unwrap();

        assert_eq!(repo.get_by_id(&tenant, created.id, None).await.unwrap(), Some(created));
    }

    #[test_log::test(tokio::test)]
    async fn get_in_range_is_scoped_to_tenant() {
        let repo = InMemoryOccurrenceRepo::new();
        let owner = TenantScope::new("acme", "/cal");
        let other = TenantScope::new("umbrella", "/cal");
        repo.create(&owner, new_occurrence(), None).await.unwrap();

        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        );
        assert!(repo.get_in_range(&other, window, None, None).await.unwrap().is_empty());
        assert_eq!(repo.get_in_range(&owner, window, None, None).await.unwrap().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn update_rejects_resource_path_change() {
        let repo = InMemoryOccurrenceRepo::new();
        let tenant = TenantScope::new("acme", "/cal");
        let created = repo.create(&tenant, new_occurrence(), None).await.unwrap();

        let mut moved = created.clone();
        moved.resource_path = "/other".to_string();

        let err = repo.update(&tenant, moved, None).await.unwrap_err();
        assert!(matches!(err, RepoError::Backend(_)));
    }
}
