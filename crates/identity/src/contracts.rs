//! Port to the external contract registry.
//!
//! The only external IO in this core. Callers bound the lookup with a
//! timeout; on timeout the login resolves to a rejection, never a hang.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::normalize_document;

/// An active contract row as the registry reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub document_number: String,
    pub holder_name: String,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractLookupError {
    #[error("contract registry unavailable: {0}")]
    Unavailable(String),
}

/// External contract registry lookup.
#[async_trait]
pub trait ContractRegistry: Send + Sync {
    /// Returns the active contract for a document, if any.
    async fn active_contract(
        &self,
        document: &str,
    ) -> Result<Option<Contract>, ContractLookupError>;
}

/// Registry backed by a fixed table. Used in tests and local development.
#[derive(Debug, Default)]
pub struct FixedContractRegistry {
    contracts: HashMap<String, Contract>,
}

impl FixedContractRegistry {
    pub fn new(contracts: impl IntoIterator<Item = Contract>) -> Self {
        Self {
            contracts: contracts
                .into_iter()
                .map(|c| (normalize_document(&c.document_number), c))
                .collect(),
        }
    }
}

#[async_trait]
impl ContractRegistry for FixedContractRegistry {
    async fn active_contract(
        &self,
        document: &str,
    ) -> Result<Option<Contract>, ContractLookupError> {
        Ok(self.contracts.get(&normalize_document(document)).cloned())
    }
}
