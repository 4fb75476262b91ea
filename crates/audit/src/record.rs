//! Audit record model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use atrium_core::{AuditRecordId, UserId};

/// Ordered field-name → value snapshot of an audited entity.
///
/// `BTreeMap` keeps field order stable so change lists render
/// deterministically.
pub type Snapshot = BTreeMap<String, Value>;

/// What happened to the audited row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

/// One field-level delta.
///
/// For INSERT every `before` is `None`; for DELETE every `after` is `None`;
/// for UPDATE only fields whose value actually changed appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// One immutable audit row. Never updated or deleted by application code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub table_name: String,
    pub record_id: String,
    pub action: AuditAction,
    /// `None` for system-initiated changes.
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
    pub changes: Vec<FieldChange>,
}

/// Implemented by every entity type that opts into auditing.
pub trait Auditable {
    /// Logical table/collection name the entity persists to.
    fn table_name(&self) -> &'static str;

    /// Stable identifier of the audited row.
    fn record_id(&self) -> String;

    /// Current persisted-field values.
    fn snapshot(&self) -> Snapshot;
}
