//! User accounts and the lockout invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atrium_core::{RoleId, UserId};

use crate::store::IdentityError;

/// Failed attempts at which the account locks.
pub const MAX_FAILED_ATTEMPTS: u32 = 3;

/// A portal account. The document number is the external identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub document_number: String,
    pub password_hash: String,
    /// Exactly one role per user.
    pub role_id: RoleId,
    pub failed_attempts: u32,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(document_number: impl Into<String>, password_hash: String, role_id: RoleId) -> Self {
        Self {
            id: UserId::new(),
            document_number: normalize_document(&document_number.into()),
            password_hash,
            role_id,
            failed_attempts: 0,
            locked_at: None,
            created_at: Utc::now(),
        }
    }

    /// Both lockout signals are authoritative: either the timestamp or the
    /// counter alone is enough to block, even if the other is inconsistent.
    pub fn is_blocked(&self) -> bool {
        self.locked_at.is_some() || self.failed_attempts >= MAX_FAILED_ATTEMPTS
    }
}

/// Canonical form of a document number: trimmed, inner whitespace stripped.
/// Used as the store key and the rate-limiter identity.
pub fn normalize_document(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Hashes a plaintext password for storage.
pub fn hash_password(plain: &str) -> Result<String, IdentityError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
        .map_err(|e| IdentityError::Storage(format!("password hashing failed: {e}")))
}
