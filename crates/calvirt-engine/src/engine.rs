//! `Engine`: the façade that owns the four repository contracts and exposes
//! the operations of `spec.md` §6.1. Every method here is the only place
//! repository I/O happens; expansion (C2), merge (C3), the mutation planner
//! (C4), and the creation validator (C5) stay pure and are unit-tested on
//! their own in their respective modules.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use calvirt_domain::model::{
    CalendarEntry, MonthDayBehavior, NewOccurrence, NewRecurrence, Occurrence, OccurrenceOverride,
    Recurrence, RecurrenceEntry, TimeWindow,
};
use calvirt_domain::repo::{
    ExceptionRepo, OccurrenceRepo, OverrideRepo, RecurrenceRepo, TransactionContext,
};
use calvirt_domain::tenant::TenantScope;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::merge::{
    merge_occurrence_entries, merge_recurrence_instants, moved_in_overrides, occurrence_to_entry,
    overridden_entry, recurrence_to_entry,
};
use crate::mutation::{self, Classification, RepoAction};
use crate::validate;

/// Owns `Arc<dyn Trait>` handles to the four repository contracts and a
/// default `MonthDayBehavior` applied when a creation request omits one
/// (`calvirt_core::config::EngineSettings::recurrence`), mirroring how the
/// teacher's `shuriken-service` structs hold their `DbProvider` handle.
pub struct Engine {
    recurrences: Arc<dyn RecurrenceRepo>,
    occurrences: Arc<dyn OccurrenceRepo>,
    exceptions: Arc<dyn ExceptionRepo>,
    overrides: Arc<dyn OverrideRepo>,
    default_month_day_behavior: MonthDayBehavior,
}

impl Engine {
    #[must_use]
    pub fn new(
        recurrences: Arc<dyn RecurrenceRepo>,
        occurrences: Arc<dyn OccurrenceRepo>,
        exceptions: Arc<dyn ExceptionRepo>,
        overrides: Arc<dyn OverrideRepo>,
    ) -> Self {
        Self::with_default_month_day_behavior(
            recurrences,
            occurrences,
            exceptions,
            overrides,
            MonthDayBehavior::Throw,
        )
    }

    #[must_use]
    pub fn with_default_month_day_behavior(
        recurrences: Arc<dyn RecurrenceRepo>,
        occurrences: Arc<dyn OccurrenceRepo>,
        exceptions: Arc<dyn ExceptionRepo>,
        overrides: Arc<dyn OverrideRepo>,
        default_month_day_behavior: MonthDayBehavior,
    ) -> Self {
        Self {
            recurrences,
            occurrences,
            exceptions,
            overrides,
            default_month_day_behavior,
        }
    }

    /// ## Summary
    /// Builds an `Engine` whose default `MonthDayBehavior` comes from
    /// `settings.recurrence.default_month_day_behavior` rather than a
    /// caller-supplied constant, so a host process can drive it from
    /// `calvirt_core::config::EngineSettings::load()`.
    #[must_use]
    pub fn from_settings(
        recurrences: Arc<dyn RecurrenceRepo>,
        occurrences: Arc<dyn OccurrenceRepo>,
        exceptions: Arc<dyn ExceptionRepo>,
        overrides: Arc<dyn OverrideRepo>,
        settings: &calvirt_core::config::EngineSettings,
    ) -> Self {
        Self::with_default_month_day_behavior(
            recurrences,
            occurrences,
            exceptions,
            overrides,
            month_day_behavior_from_default(settings.recurrence.default_month_day_behavior),
        )
    }

    /// ## Summary
    /// `GetOccurrences`: every `Standalone` and `Virtualized` entry in
    /// `window`, per `spec.md` §6.1/§4.3.
    ///
    /// Repository calls run in two phases (`spec.md` §5): phase A fetches
    /// recurrences and standalone occurrences concurrently; phase B, only if
    /// phase A yielded any recurrences, fetches exceptions and overrides
    /// concurrently, keyed by the discovered recurrence ids. The
    /// cancellation token is checked before each phase and between each
    /// recurrence's expansion/merge.
    ///
    /// ## Errors
    /// `InvalidArgument` if `types` is `Some(&[])`; `Cancelled` if `cancel`
    /// fires before or during the query; `Backend`/`NotFound` folded from
    /// repository faults.
    #[tracing::instrument(skip(self, cancel, tx), fields(organization = %tenant.organization))]
    pub async fn get_occurrences(
        &self,
        tenant: &TenantScope,
        window: TimeWindow,
        types: Option<&[String]>,
        tx: Option<&dyn TransactionContext>,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<CalendarEntry>> {
        validate::validate_types_filter(types)?;
        check_cancelled(cancel)?;

        let (recurrences, occurrences) = tokio::try_join!(
            self.recurrences.get_in_range(tenant, window, types, tx),
            self.occurrences.get_in_range(tenant, window, types, tx),
        )
        .map_err(EngineError::from_repo)?;

        check_cancelled(cancel)?;

        let (exceptions_by_recurrence, overrides_by_recurrence) = if recurrences.is_empty() {
            (HashMap::new(), HashMap::new())
        } else {
            let recurrence_ids: Vec<Uuid> = recurrences.iter().map(|r| r.id).collect();
            let (exceptions, overrides) = tokio::try_join!(
                self.exceptions.get_by_recurrence_ids(tenant, &recurrence_ids, tx),
                self.overrides.get_in_range(tenant, &recurrence_ids, window, tx),
            )
            .map_err(EngineError::from_repo)?;

            (
                group_exceptions_by_recurrence(exceptions),
                group_overrides_by_recurrence(overrides),
            )
        };

        let mut virtualized = Vec::new();
        for recurrence in &recurrences {
            check_cancelled(cancel)?;

            let instants = crate::expand::expand_recurrence(recurrence, window);
            let empty_exceptions = HashSet::new();
            let empty_overrides = HashMap::new();
            let recurrence_exceptions =
                exceptions_by_recurrence.get(&recurrence.id).unwrap_or(&empty_exceptions);
            let recurrence_overrides =
                overrides_by_recurrence.get(&recurrence.id).unwrap_or(&empty_overrides);

            virtualized.extend(merge_recurrence_instants(
                recurrence,
                window,
                &instants,
                recurrence_exceptions,
                recurrence_overrides,
            ));
            virtualized.extend(moved_in_overrides(
                recurrence,
                window,
                &instants,
                recurrence_exceptions,
                recurrence_overrides,
            ));
        }

        let standalone = occurrences.iter().map(occurrence_to_entry).collect();

        Ok(merge_occurrence_entries(virtualized, standalone))
    }

    /// ## Summary
    /// `GetRecurrences`: every `Recurrence` entry in `window`, per
    /// `spec.md` §6.1.
    ///
    /// ## Errors
    /// `InvalidArgument` if `types` is `Some(&[])`.
    #[tracing::instrument(skip(self, tx), fields(organization = %tenant.organization))]
    pub async fn get_recurrences(
        &self,
        tenant: &TenantScope,
        window: TimeWindow,
        types: Option<&[String]>,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<Vec<CalendarEntry>> {
        validate::validate_types_filter(types)?;
        let recurrences = self
            .recurrences
            .get_in_range(tenant, window, types, tx)
            .await
            .map_err(EngineError::from_repo)?;
        Ok(recurrences
            .iter()
            .map(|r| CalendarEntry::Recurrence(recurrence_to_entry(r)))
            .collect())
    }

    /// ## Summary
    /// `CreateRecurrence` per `spec.md` §4.5/§6.1: validates fields and the
    /// RRULE, extracts `recurrence_end_time` from `UNTIL`, and applies the
    /// engine's configured default `MonthDayBehavior` when the request omits
    /// one and the pattern needs a policy.
    ///
    /// ## Errors
    /// `InvalidArgument` on malformed fields/RRULE; `MonthDayOutOfBounds`
    /// when the resolved policy is `Throw` and the pattern has an
    /// out-of-bounds month.
    #[tracing::instrument(skip(self, new, tx), fields(organization = %tenant.organization))]
    pub async fn create_recurrence(
        &self,
        tenant: &TenantScope,
        mut new: NewRecurrence,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<Recurrence> {
        if new.month_day_behavior.is_none() {
            new.month_day_behavior = Some(self.default_month_day_behavior);
        }

        let (recurrence_end_time, month_day_behavior) =
            validate::validate_recurrence_creation(tenant, &new)?;
        new.recurrence_end_time = recurrence_end_time;
        new.month_day_behavior = month_day_behavior;

        self.recurrences
            .create(tenant, new, tx)
            .await
            .map_err(EngineError::from_repo)
    }

    /// ## Summary
    /// `CreateOccurrence` per `spec.md` §4.5/§6.1.
    ///
    /// ## Errors
    /// `InvalidArgument` on malformed fields.
    #[tracing::instrument(skip(self, new, tx), fields(organization = %tenant.organization))]
    pub async fn create_occurrence(
        &self,
        tenant: &TenantScope,
        new: NewOccurrence,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<Occurrence> {
        validate::validate_occurrence_creation(tenant, &new)?;
        self.occurrences
            .create(tenant, new, tx)
            .await
            .map_err(EngineError::from_repo)
    }

    /// ## Summary
    /// Updates a `Recurrence` pattern's mutable fields (`Duration`,
    /// `Extensions`).
    ///
    /// This is a separate entry point from [`Engine::update_occurrence`]
    /// deliberately -- `spec.md` §6.1 states `UpdateOccurrence` rejects a
    /// `RecurrencePattern` entry with `InvalidOperation`, while §4.4's
    /// mutation table still specifies the planner behavior for that
    /// classification (only `Duration`/`Extensions` may change). Without a
    /// dedicated entry point, invariant 4's "`Duration` and `Extensions` are
    /// mutable on R" would have no way to actually reach a repository.
    ///
    /// ## Errors
    /// `NotFound` if the recurrence doesn't exist in `tenant`'s scope;
    /// `ImmutableFieldViolation` if any other field differs from storage.
    #[tracing::instrument(skip(self, inbound, tx), fields(organization = %tenant.organization))]
    pub async fn update_recurrence(
        &self,
        tenant: &TenantScope,
        inbound: &RecurrenceEntry,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<CalendarEntry> {
        let stored = self.require_recurrence(tenant, inbound.id, tx).await?;
        match mutation::plan_update_recurrence(inbound, &stored)? {
            RepoAction::UpdateRecurrence(updated) => {
                let saved = self
                    .recurrences
                    .update(tenant, updated, tx)
                    .await
                    .map_err(EngineError::from_repo)?;
                Ok(CalendarEntry::Recurrence(recurrence_to_entry(&saved)))
            }
            other => {
                tracing::error!(?other, "plan_update_recurrence returned an unexpected action");
                Err(calvirt_core::error::CoreError::InvariantViolation(
                    "plan_update_recurrence returned an action other than UpdateRecurrence",
                )
                .into())
            }
        }
    }

    /// ## Summary
    /// `UpdateOccurrence` per `spec.md` §6.1: classifies `entry` and applies
    /// the matching branch of `spec.md` §4.4's mutation table.
    ///
    /// ## Errors
    /// `InvalidOperation` if `entry` classifies as a `RecurrencePattern` (use
    /// [`Engine::update_recurrence`] instead); `NotFound` if a referenced
    /// parent/override doesn't exist; `ImmutableFieldViolation` per the
    /// per-variant immutability rules.
    #[tracing::instrument(skip(self, entry, tx), fields(organization = %tenant.organization))]
    pub async fn update_occurrence(
        &self,
        tenant: &TenantScope,
        entry: &CalendarEntry,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<CalendarEntry> {
        match mutation::classify(entry) {
            Classification::RecurrencePattern(_) => Err(EngineError::InvalidOperation(
                "use update_recurrence for a RecurrencePattern entry",
            )),
            Classification::Standalone(inbound) => {
                let stored = self.require_occurrence(tenant, inbound.id, tx).await?;
                match mutation::plan_update_standalone(inbound, &stored)? {
                    RepoAction::UpdateOccurrence(updated) => {
                        let saved = self
                            .occurrences
                            .update(tenant, updated, tx)
                            .await
                            .map_err(EngineError::from_repo)?;
                        Ok(CalendarEntry::Standalone(occurrence_to_entry(&saved)))
                    }
                    other => {
                        tracing::error!(?other, "plan_update_standalone returned an unexpected action");
                        Err(calvirt_core::error::CoreError::InvariantViolation(
                            "plan_update_standalone returned an action other than UpdateOccurrence",
                        )
                        .into())
                    }
                }
            }
            Classification::Virtualized(inbound) => match inbound.override_id {
                Some(override_id) => {
                    let stored_recurrence = self
                        .require_recurrence(tenant, inbound.recurrence_id, tx)
                        .await?;
                    let stored_override = self.require_override(tenant, override_id, tx).await?;
                    match mutation::plan_update_virtualized_with_override(
                        inbound,
                        &stored_recurrence,
                        &stored_override,
                    )? {
                        RepoAction::UpdateOverride(updated) => {
                            let original = updated.original_time_utc;
                            let saved = self
                                .overrides
                                .update(tenant, updated, tx)
                                .await
                                .map_err(EngineError::from_repo)?;
                            Ok(CalendarEntry::Virtualized(overridden_entry(
                                &stored_recurrence,
                                original,
                                &saved,
                            )))
                        }
                        other => {
                            tracing::error!(
                                ?other,
                                "plan_update_virtualized_with_override returned an unexpected action"
                            );
                            Err(calvirt_core::error::CoreError::InvariantViolation(
                                "plan_update_virtualized_with_override returned an action other than UpdateOverride",
                            )
                            .into())
                        }
                    }
                }
                None => {
                    let stored_recurrence = self
                        .require_recurrence(tenant, inbound.recurrence_id, tx)
                        .await?;
                    match mutation::plan_update_virtualized_without_override(
                        inbound,
                        &stored_recurrence,
                    )? {
                        RepoAction::CreateOverride(new_override) => {
                            let original = new_override.original_time_utc;
                            let saved = self
                                .overrides
                                .create(tenant, new_override, tx)
                                .await
                                .map_err(EngineError::from_repo)?;
                            Ok(CalendarEntry::Virtualized(overridden_entry(
                                &stored_recurrence,
                                original,
                                &saved,
                            )))
                        }
                        other => {
                            tracing::error!(
                                ?other,
                                "plan_update_virtualized_without_override returned an unexpected action"
                            );
                            Err(calvirt_core::error::CoreError::InvariantViolation(
                                "plan_update_virtualized_without_override returned an action other than CreateOverride",
                            )
                            .into())
                        }
                    }
                }
            },
        }
    }

    /// ## Summary
    /// `DeleteOccurrence` per `spec.md` §6.1/§4.4.
    ///
    /// ## Errors
    /// `InvalidOperation` if `entry` classifies as a `RecurrencePattern` --
    /// per `spec.md` §4.4, recurrence pattern deletion has a separate entry
    /// point, [`Engine::delete_recurrence`]. `NotFound` if the target
    /// doesn't exist.
    #[tracing::instrument(skip(self, entry, tx), fields(organization = %tenant.organization))]
    pub async fn delete_occurrence(
        &self,
        tenant: &TenantScope,
        entry: &CalendarEntry,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<()> {
        match mutation::classify(entry) {
            Classification::RecurrencePattern(_) => Err(EngineError::InvalidOperation(
                "recurrence pattern deletion uses delete_recurrence, not delete_occurrence",
            )),
            Classification::Standalone(inbound) => self
                .occurrences
                .delete(tenant, inbound.id, tx)
                .await
                .map_err(EngineError::from_repo),
            Classification::Virtualized(inbound) => {
                match mutation::plan_delete_virtualized(inbound)? {
                    RepoAction::CreateException(new_exception) => self
                        .exceptions
                        .create(tenant, new_exception, tx)
                        .await
                        .map(|_| ())
                        .map_err(EngineError::from_repo),
                    RepoAction::DeleteOverrideThenCreateException {
                        override_id,
                        new_exception,
                    } => {
                        self.overrides
                            .delete(tenant, override_id, tx)
                            .await
                            .map_err(EngineError::from_repo)?;
                        self.exceptions
                            .create(tenant, new_exception, tx)
                            .await
                            .map(|_| ())
                            .map_err(EngineError::from_repo)
                    }
                    other => {
                        tracing::error!(?other, "plan_delete_virtualized returned an unexpected action");
                        Err(calvirt_core::error::CoreError::InvariantViolation(
                            "plan_delete_virtualized returned an action other than CreateException or DeleteOverrideThenCreateException",
                        )
                        .into())
                    }
                }
            }
        }
    }

    /// ## Summary
    /// `DeleteRecurrence` per `spec.md` §6.1/§4.4: cascades to every
    /// `OccurrenceException` and `OccurrenceOverride` referencing
    /// `recurrence_id` before deleting the recurrence itself, so the delete
    /// is correct even against a backend whose `RecurrenceRepo::delete`
    /// relies on the engine rather than a database-level cascade.
    ///
    /// ## Errors
    /// `NotFound` if `recurrence_id` doesn't exist in `tenant`'s scope.
    #[tracing::instrument(skip(self, tx), fields(organization = %tenant.organization))]
    pub async fn delete_recurrence(
        &self,
        tenant: &TenantScope,
        recurrence_id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<()> {
        self.require_recurrence(tenant, recurrence_id, tx).await?;

        self.exceptions
            .delete_by_recurrence(tenant, recurrence_id, tx)
            .await
            .map_err(EngineError::from_repo)?;
        self.overrides
            .delete_by_recurrence(tenant, recurrence_id, tx)
            .await
            .map_err(EngineError::from_repo)?;
        self.recurrences
            .delete(tenant, recurrence_id, tx)
            .await
            .map_err(EngineError::from_repo)
    }

    /// ## Summary
    /// `RestoreOccurrence` per `spec.md` §6.1/§4.4: only valid for a
    /// virtualized entry carrying an existing override.
    ///
    /// ## Errors
    /// `InvalidOperation` for every other classification, including a
    /// virtualized entry without an override (excepted instants cannot be
    /// restored via this entry point; the caller removes the exception
    /// directly, a documented limitation).
    #[tracing::instrument(skip(self, entry, tx), fields(organization = %tenant.organization))]
    pub async fn restore_occurrence(
        &self,
        tenant: &TenantScope,
        entry: &CalendarEntry,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<()> {
        match mutation::plan_restore(entry)? {
            RepoAction::DeleteOverride(override_id) => self
                .overrides
                .delete(tenant, override_id, tx)
                .await
                .map_err(EngineError::from_repo),
            other => {
                tracing::error!(?other, "plan_restore returned an unexpected action");
                Err(calvirt_core::error::CoreError::InvariantViolation(
                    "plan_restore returned an action other than DeleteOverride",
                )
                .into())
            }
        }
    }

    async fn require_recurrence(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<Recurrence> {
        self.recurrences
            .get_by_id(tenant, id, tx)
            .await
            .map_err(EngineError::from_repo)?
            .ok_or_else(|| EngineError::NotFound(format!("recurrence {id}")))
    }

    async fn require_occurrence(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<Occurrence> {
        self.occurrences
            .get_by_id(tenant, id, tx)
            .await
            .map_err(EngineError::from_repo)?
            .ok_or_else(|| EngineError::NotFound(format!("occurrence {id}")))
    }

    async fn require_override(
        &self,
        tenant: &TenantScope,
        id: Uuid,
        tx: Option<&dyn TransactionContext>,
    ) -> EngineResult<OccurrenceOverride> {
        self.overrides
            .get_by_id(tenant, id, tx)
            .await
            .map_err(EngineError::from_repo)?
            .ok_or_else(|| EngineError::NotFound(format!("override {id}")))
    }
}

fn month_day_behavior_from_default(
    default: calvirt_core::config::MonthDayBehaviorDefault,
) -> MonthDayBehavior {
    use calvirt_core::config::MonthDayBehaviorDefault;
    match default {
        MonthDayBehaviorDefault::Throw => MonthDayBehavior::Throw,
        MonthDayBehaviorDefault::Skip => MonthDayBehavior::Skip,
        MonthDayBehaviorDefault::Clamp => MonthDayBehavior::Clamp,
    }
}

fn check_cancelled(cancel: &CancellationToken) -> EngineResult<()> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}

fn group_exceptions_by_recurrence(
    exceptions: Vec<calvirt_domain::model::OccurrenceException>,
) -> HashMap<Uuid, HashSet<DateTime<Utc>>> {
    let mut grouped: HashMap<Uuid, HashSet<DateTime<Utc>>> = HashMap::new();
    for exception in exceptions {
        grouped
            .entry(exception.recurrence_id)
            .or_default()
            .insert(exception.original_time_utc);
    }
    grouped
}

fn group_overrides_by_recurrence(
    overrides: Vec<OccurrenceOverride>,
) -> HashMap<Uuid, HashMap<DateTime<Utc>, OccurrenceOverride>> {
    let mut grouped: HashMap<Uuid, HashMap<DateTime<Utc>, OccurrenceOverride>> = HashMap::new();
    for ov in overrides {
        grouped
            .entry(ov.recurrence_id)
            .or_default()
            .insert(ov.original_time_utc, ov);
    }
    grouped
}
