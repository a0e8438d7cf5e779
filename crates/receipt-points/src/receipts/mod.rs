//! Receipt intake, rule-driven points scoring, and rule configuration.

pub mod domain;
pub mod points;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{Item, Receipt, ReceiptId};
pub use points::{
    ErrorCategory, EvaluationStatus, PointsEngine, PointsOutcome, RuleDefinition, RuleEntry,
    RuleEvaluation, RuleIssue, RuleSet, RuleSetError,
};
pub use repository::{ReceiptRecord, ReceiptRepository, RepositoryError, RuleStore};
pub use router::receipt_router;
pub use service::{log_outcome, ReceiptService, ReceiptServiceError};
pub use validation::{validate_receipt, ReceiptValidationError, ReceiptViolation};
