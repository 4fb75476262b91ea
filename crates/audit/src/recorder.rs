//! The audit recorder: explicit lifecycle hooks called by repositories.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use atrium_core::{AuditRecordId, UserId};

use crate::diff::diff_snapshots;
use crate::record::{AuditAction, AuditRecord, Auditable, Snapshot};
use crate::store::{AuditStore, AuditStoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The primary mutation must still complete; this is operator-visible
    /// but non-fatal.
    #[error("failed to write audit record: {0}")]
    WriteFailed(#[from] AuditStoreError),
}

/// Appends one audit record per entity lifecycle event.
///
/// Write failures are logged at error level before being returned, so a
/// caller choosing to continue (the normal policy) never silently swallows
/// the gap.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Records an INSERT: one change tuple per field, `before = null`.
    pub fn on_created<E: Auditable>(
        &self,
        actor: Option<UserId>,
        entity: &E,
    ) -> Result<(), AuditError> {
        let after = entity.snapshot();
        self.append(actor, entity, AuditAction::Insert, &Snapshot::new(), &after)
    }

    /// Records an UPDATE against the snapshot taken immediately before the
    /// write being recorded. Unchanged fields are omitted.
    pub fn on_updated<E: Auditable>(
        &self,
        actor: Option<UserId>,
        previous: &Snapshot,
        entity: &E,
    ) -> Result<(), AuditError> {
        let after = entity.snapshot();
        self.append(actor, entity, AuditAction::Update, previous, &after)
    }

    /// Records a DELETE: one change tuple per field, `after = null`.
    pub fn on_deleted<E: Auditable>(
        &self,
        actor: Option<UserId>,
        entity: &E,
    ) -> Result<(), AuditError> {
        let before = entity.snapshot();
        self.append(actor, entity, AuditAction::Delete, &before, &Snapshot::new())
    }

    fn append<E: Auditable>(
        &self,
        actor: Option<UserId>,
        entity: &E,
        action: AuditAction,
        before: &Snapshot,
        after: &Snapshot,
    ) -> Result<(), AuditError> {
        let record = AuditRecord {
            id: AuditRecordId::new(),
            table_name: entity.table_name().to_string(),
            record_id: entity.record_id(),
            action,
            actor_id: actor,
            occurred_at: Utc::now(),
            changes: diff_snapshots(before, after),
        };

        self.store.append(record).map_err(|e| {
            tracing::error!(
                table = entity.table_name(),
                record_id = %entity.record_id(),
                action = action.as_str(),
                error = %e,
                "audit record write failed; primary mutation proceeds"
            );
            AuditError::WriteFailed(e)
        })
    }
}
