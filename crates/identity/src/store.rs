//! User account storage with serialized lockout accounting.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::account::{normalize_document, UserAccount, MAX_FAILED_ATTEMPTS};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity storage unavailable: {0}")]
    Storage(String),

    #[error("an account already exists for document {0}")]
    DuplicateDocument(String),

    #[error("account not found")]
    NotFound,
}

/// Result of an atomic failed-attempt increment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LockoutStatus {
    pub failed_attempts: u32,
    /// True once the account is blocked (this increment may have engaged it).
    pub locked: bool,
}

/// Account storage port.
///
/// `record_failed_attempt` must be serialized per account: two concurrent
/// wrong-password submissions must not both observe the same counter and
/// miss the lock threshold.
pub trait UserStore: Send + Sync {
    fn find_by_document(&self, document: &str) -> Result<Option<UserAccount>, IdentityError>;

    fn create(&self, account: UserAccount) -> Result<(), IdentityError>;

    /// Atomically increments the counter; the increment that reaches the
    /// threshold also sets the lock timestamp.
    fn record_failed_attempt(
        &self,
        document: &str,
        now: DateTime<Utc>,
    ) -> Result<LockoutStatus, IdentityError>;

    /// Resets the counter to zero and clears the lock timestamp.
    fn clear_lockout(&self, document: &str) -> Result<(), IdentityError>;
}

/// In-memory account store. A single mutex serializes every increment,
/// which satisfies the per-account atomicity contract.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    accounts: Mutex<HashMap<String, UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_document(&self, document: &str) -> Result<Option<UserAccount>, IdentityError> {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.get(&normalize_document(document)).cloned())
    }

    fn create(&self, account: UserAccount) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let key = account.document_number.clone();
        if accounts.contains_key(&key) {
            return Err(IdentityError::DuplicateDocument(key));
        }
        accounts.insert(key, account);
        Ok(())
    }

    fn record_failed_attempt(
        &self,
        document: &str,
        now: DateTime<Utc>,
    ) -> Result<LockoutStatus, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let account = accounts
            .get_mut(&normalize_document(document))
            .ok_or(IdentityError::NotFound)?;

        account.failed_attempts = account.failed_attempts.saturating_add(1);
        if account.failed_attempts >= MAX_FAILED_ATTEMPTS && account.locked_at.is_none() {
            account.locked_at = Some(now);
        }

        Ok(LockoutStatus {
            failed_attempts: account.failed_attempts,
            locked: account.is_blocked(),
        })
    }

    fn clear_lockout(&self, document: &str) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let account = accounts
            .get_mut(&normalize_document(document))
            .ok_or(IdentityError::NotFound)?;
        account.failed_attempts = 0;
        account.locked_at = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::RoleId;

    fn account(document: &str) -> UserAccount {
        UserAccount::new(document, "hash".to_string(), RoleId::new())
    }

    #[test]
    fn third_increment_engages_the_lock() {
        let store = InMemoryUserStore::new();
        store.create(account("100")).unwrap();

        let now = Utc::now();
        assert!(!store.record_failed_attempt("100", now).unwrap().locked);
        assert!(!store.record_failed_attempt("100", now).unwrap().locked);
        let third = store.record_failed_attempt("100", now).unwrap();
        assert!(third.locked);
        assert_eq!(third.failed_attempts, 3);

        let stored = store.find_by_document("100").unwrap().unwrap();
        assert_eq!(stored.locked_at, Some(now));
    }

    #[test]
    fn clear_lockout_resets_both_signals() {
        let store = InMemoryUserStore::new();
        store.create(account("100")).unwrap();
        let now = Utc::now();
        for _ in 0..3 {
            store.record_failed_attempt("100", now).unwrap();
        }

        store.clear_lockout("100").unwrap();
        let stored = store.find_by_document("100").unwrap().unwrap();
        assert_eq!(stored.failed_attempts, 0);
        assert!(stored.locked_at.is_none());
        assert!(!stored.is_blocked());
    }

    #[test]
    fn concurrent_increments_are_serialized_per_account() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryUserStore::new());
        store.create(account("100")).unwrap();
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.record_failed_attempt("100", now).unwrap())
            })
            .collect();
        let statuses: Vec<LockoutStatus> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Every increment observed a distinct counter value: no two
        // submissions saw the same count.
        let mut counters: Vec<u32> = statuses.iter().map(|s| s.failed_attempts).collect();
        counters.sort_unstable();
        assert_eq!(counters, (1..=8).collect::<Vec<u32>>());

        // Exactly one increment crossed the threshold.
        let crossings = statuses
            .iter()
            .filter(|s| s.failed_attempts == MAX_FAILED_ATTEMPTS)
            .count();
        assert_eq!(crossings, 1);

        let stored = store.find_by_document("100").unwrap().unwrap();
        assert_eq!(stored.failed_attempts, 8);
        assert_eq!(stored.locked_at, Some(now));
    }

    #[test]
    fn duplicate_document_rejected() {
        let store = InMemoryUserStore::new();
        store.create(account("100")).unwrap();
        assert!(matches!(
            store.create(account("100")),
            Err(IdentityError::DuplicateDocument(_))
        ));
    }

    #[test]
    fn lookup_normalizes_the_document() {
        let store = InMemoryUserStore::new();
        store.create(account("10 0")).unwrap();
        assert!(store.find_by_document(" 100 ").unwrap().is_some());
    }
}
