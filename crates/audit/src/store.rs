//! Append-only audit record storage.

use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::record::AuditRecord;

/// Filter for the read-only audit listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub table_name: Option<String>,
    pub record_id: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditStoreError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit storage. Normal application code never updates or
/// deletes rows.
pub trait AuditStore: Send + Sync {
    fn append(&self, record: AuditRecord) -> Result<(), AuditStoreError>;

    /// Matching records, newest first.
    fn query(&self, filter: &AuditFilter) -> Vec<AuditRecord>;
}

/// In-memory append-only audit store.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }

    fn query(&self, filter: &AuditFilter) -> Vec<AuditRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<AuditRecord> = records
            .iter()
            .filter(|r| {
                filter
                    .table_name
                    .as_ref()
                    .map_or(true, |t| &r.table_name == t)
                    && filter
                        .record_id
                        .as_ref()
                        .map_or(true, |id| &r.record_id == id)
            })
            .cloned()
            .collect();
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AuditAction, FieldChange};
    use atrium_core::AuditRecordId;
    use chrono::Utc;

    fn record(table: &str, record_id: &str) -> AuditRecord {
        AuditRecord {
            id: AuditRecordId::new(),
            table_name: table.to_string(),
            record_id: record_id.to_string(),
            action: AuditAction::Update,
            actor_id: None,
            occurred_at: Utc::now(),
            changes: vec![FieldChange {
                field: "name".to_string(),
                before: Some(serde_json::json!("a")),
                after: Some(serde_json::json!("b")),
            }],
        }
    }

    #[test]
    fn query_filters_by_table_and_record() {
        let store = InMemoryAuditStore::new();
        store.append(record("modules", "1")).unwrap();
        store.append(record("modules", "2")).unwrap();
        store.append(record("roles", "1")).unwrap();

        let filter = AuditFilter {
            table_name: Some("modules".to_string()),
            record_id: Some("2".to_string()),
        };
        let hits = store.query(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_id, "2");

        let all_modules = store.query(&AuditFilter {
            table_name: Some("modules".to_string()),
            record_id: None,
        });
        assert_eq!(all_modules.len(), 2);
    }

    #[test]
    fn query_returns_newest_first() {
        let store = InMemoryAuditStore::new();
        store.append(record("modules", "first")).unwrap();
        store.append(record("modules", "second")).unwrap();

        let hits = store.query(&AuditFilter::default());
        assert_eq!(hits[0].record_id, "second");
        assert_eq!(hits[1].record_id, "first");
    }
}
