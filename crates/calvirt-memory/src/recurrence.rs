use std::collections::HashMap;

use async_trait::async_trait;
use calvirt_domain::error::{RepoError, RepoResult};
use calvirt_domain::model::{NewRecurrence, Recurrence, TimeWindow};
use calvirt_domain::repo::{RecurrenceRepo, TransactionContext};
use calvirt_domain::tenant::TenantScope;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory `RecurrenceRepo`, keyed by id and filtered by tenant on every
/// read, mirroring the tenant-scoping every real backend must apply.
#[derive(Default)]
pub struct InMemoryRecurrenceRepo {
    rows: RwLock<HashMap<Uuid, Recurrence>>,
}

impl InMemoryRecurrenceRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecurrenceRepo for InMemoryRecurrenceRepo {
    async fn create(
        &self,
        tenant: &TenantScope,
        new: NewRecurrence,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Recurrence> {
        let recurrence = Recurrence {
            id: Uuid::new_v4(),
            organization: tenant.organization.clone(),
            resource_path: tenant.resource_path.clone(),
            kind: new.kind,
            start_time: new.start_time,
            duration: new.duration,
            recurrence_end_time: new.recurrence_end_time,
            rrule: new.rrule,
            time_zone: new.time_zone,
            month_day_behavior: new.month_day_behavior,
            extensions: new.extensions,
        };
        self.rows.write().await.insert(recurrence.id, recurrence.clone());
        Ok(recurrence)
    }

    async fn get_by_id(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Option<Recurrence>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id)
            .filter(|r| belongs_to(r, tenant))
            .cloned())
    }

    async fn update(
        &self,
        tenant: &TenantScope,
        updated: Recurrence,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Recurrence> {
        let mut rows = self.rows.write().await;
        let existing = rows
            .get(&updated.id)
            .filter(|r| belongs_to(r, tenant))
            .ok_or_else(|| RepoError::NotFound(format!("recurrence {}", updated.id)))?;
        if existing.organization != updated.organization || existing.resource_path != updated.resource_path {
            return Err(RepoError::Backend(
                "tenant scope may not change on update".to_string(),
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
        match rows.get(&id).filter(|r| belongs_to(r, tenant)) {
            Some(_) => {
                rows.remove(&id);
                Ok(())
            }
            None => Err(RepoError::NotFound(format!("recurrence {id}"))),
        }
    }

    async fn get_in_range(
        &self,
        tenant: &TenantScope,
        window: TimeWindow,
        types: Option<&[String]>,
        _tx: Option<&dyn TransactionContext>,
    ) -> RepoResult<Vec<Recurrence>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| belongs_to(r, tenant))
            .filter(|r| r.start_time <= window.end && r.recurrence_end_time >= window.start)
            .filter(|r| matches_types(&r.kind, types))
            .cloned()
            .collect())
    }
}

fn belongs_to(recurrence: &Recurrence, tenant: &TenantScope) -> bool {
    recurrence.organization == tenant.organization && recurrence.resource_path == tenant.resource_path
}

pub(crate) fn matches_types(kind: &str, types: Option<&[String]>) -> bool {
    match types {
        None => true,
        Some(types) => types.iter().any(|t| t == kind),
    }
}
