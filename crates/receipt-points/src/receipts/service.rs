use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{Receipt, ReceiptId};
use super::points::{EvaluationStatus, PointsEngine, PointsOutcome, RuleSet, RuleSetError};
use super::repository::{ReceiptRecord, ReceiptRepository, RepositoryError, RuleStore};
use super::validation::{validate_receipt, ReceiptValidationError};

/// Service composing receipt validation, the points engine, and storage.
pub struct ReceiptService<R, S> {
    receipts: Arc<R>,
    rules: Arc<S>,
}

fn next_receipt_id() -> ReceiptId {
    ReceiptId(Uuid::new_v4().to_string())
}

impl<R, S> ReceiptService<R, S>
where
    R: ReceiptRepository + 'static,
    S: RuleStore + 'static,
{
    pub fn new(receipts: Arc<R>, rules: Arc<S>) -> Self {
        Self { receipts, rules }
    }

    /// Validate, score and store a receipt, returning the stored record.
    pub fn process(&self, receipt: Receipt) -> Result<ReceiptRecord, ReceiptServiceError> {
        validate_receipt(&receipt)?;

        let outcome = self.score(&receipt)?;
        let record = ReceiptRecord {
            id: next_receipt_id(),
            receipt,
            points: outcome.total_points,
        };

        let stored = self.receipts.insert(record)?;
        info!(receipt_id = %stored.id, points = stored.points, "receipt processed");
        Ok(stored)
    }

    /// Score against the active rules without validating or storing.
    pub fn score(&self, receipt: &Receipt) -> Result<PointsOutcome, ReceiptServiceError> {
        let rule_set = self.rules.load()?;
        let engine = PointsEngine::new(&rule_set);

        info!(
            retailer = %receipt.retailer,
            date = %receipt.purchase_date,
            time = %receipt.purchase_time,
            total = %receipt.total,
            items_count = receipt.items.len(),
            rules = engine.rule_count(),
            "starting points calculation"
        );

        let outcome = engine.score(receipt);
        log_outcome(&outcome);
        Ok(outcome)
    }

    pub fn points(&self, id: &ReceiptId) -> Result<i64, ReceiptServiceError> {
        let record = self
            .receipts
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record.points)
    }

    pub fn rules(&self) -> Result<RuleSet, ReceiptServiceError> {
        Ok(self.rules.load()?)
    }

    /// Strictly validate and activate a new rule configuration.
    pub fn replace_rules(&self, rules: RuleSet) -> Result<RuleSet, ReceiptServiceError> {
        rules.validate()?;
        self.rules.replace(rules.clone())?;
        info!(rules = rules.len(), "rules configuration replaced");
        Ok(rules)
    }
}

/// Emits the audit trail as structured log events.
pub fn log_outcome(outcome: &PointsOutcome) {
    for evaluation in &outcome.evaluations {
        match &evaluation.status {
            EvaluationStatus::Applied => info!(
                rule_name = %evaluation.rule_name,
                rule_type = evaluation.rule_type.as_deref().unwrap_or("-"),
                points = evaluation.points,
                running_total = evaluation.running_total,
                "rule points calculated"
            ),
            EvaluationStatus::Skipped { category, reason } => warn!(
                rule_name = %evaluation.rule_name,
                rule_type = evaluation.rule_type.as_deref().unwrap_or("-"),
                ?category,
                %reason,
                "rule skipped"
            ),
        }
    }

    info!(total_points = outcome.total_points, "points calculation completed");
}

/// Error raised by the receipt service.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptServiceError {
    #[error(transparent)]
    Validation(#[from] ReceiptValidationError),
    #[error(transparent)]
    Rules(#[from] RuleSetError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
