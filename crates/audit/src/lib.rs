//! `atrium-audit` — tamper-evident record of every portal mutation.
//!
//! Entities opt in by implementing [`Auditable`]; repositories call the
//! recorder explicitly on create/update/delete (no implicit lifecycle hooks,
//! which are too easy to bypass accidentally). Records are append-only.

pub mod diff;
pub mod record;
pub mod recorder;
pub mod store;

pub use diff::diff_snapshots;
pub use record::{AuditAction, AuditRecord, Auditable, FieldChange, Snapshot};
pub use recorder::{AuditError, AuditRecorder};
pub use store::{AuditFilter, AuditStore, AuditStoreError, InMemoryAuditStore};
