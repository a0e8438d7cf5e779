use serde::{Deserialize, Serialize};

use super::domain::{Receipt, ReceiptId};
use super::points::RuleSet;

/// Stored result of processing one receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: ReceiptId,
    pub receipt: Receipt,
    pub points: i64,
}

/// Storage abstraction for processed receipts.
pub trait ReceiptRepository: Send + Sync {
    fn insert(&self, record: ReceiptRecord) -> Result<ReceiptRecord, RepositoryError>;
    fn fetch(&self, id: &ReceiptId) -> Result<Option<ReceiptRecord>, RepositoryError>;
}

/// Source of the active rule configuration.
pub trait RuleStore: Send + Sync {
    /// Returns the active rules, or an empty set when none were ever stored.
    fn load(&self) -> Result<RuleSet, RepositoryError>;
    fn replace(&self, rules: RuleSet) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
