mod config;
mod dispatch;
mod error;
mod evaluators;
mod rule;

pub use config::{
    ConfigNumber, InputCheck, PointsCalculation, RoundingDefinition, RuleDefinition, RuleEntry,
    RuleIssue, RuleSet, RuleSetError, TimeRangeDefinition, UNNAMED_RULE,
};
pub use error::{ConfigurationError, DataError, ErrorCategory, RuleError, ShapeMismatch};
pub use rule::{
    Condition, Parity, Rounding, RoundingMethod, Rule, RuleKind, RuleType, Target, TimeRange,
    TotalCheck,
};

use super::domain::Receipt;
use serde::Serialize;

/// Stateless evaluator that scores receipts against a compiled rule list.
///
/// Rules are compiled once on construction; a rule that fails to compile is
/// kept so it still appears, inert, in every audit trail.
#[derive(Debug, Clone)]
pub struct PointsEngine {
    rules: Vec<PreparedRule>,
}

#[derive(Debug, Clone)]
struct PreparedRule {
    name: String,
    rule_type: Option<String>,
    compiled: Result<Rule, ConfigurationError>,
}

impl PointsEngine {
    pub fn new(rule_set: &RuleSet) -> Self {
        let rules = rule_set
            .rules
            .iter()
            .map(|entry| PreparedRule {
                name: entry.name().to_string(),
                rule_type: entry.rule_type().map(str::to_string),
                compiled: entry.compile(),
            })
            .collect();

        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn score(&self, receipt: &Receipt) -> PointsOutcome {
        let mut total_points: i64 = 0;
        let mut evaluations = Vec::with_capacity(self.rules.len());

        for prepared in &self.rules {
            let result = prepared
                .compiled
                .as_ref()
                .map_err(|err| RuleError::from(err.clone()))
                .and_then(|rule| dispatch::apply(rule, receipt))
                .and_then(|contribution| {
                    // A rule that would push the total past i64 is skipped.
                    match total_points.checked_add(contribution.points) {
                        Some(_) => Ok(contribution),
                        None => Err(RuleError::from(DataError::PointsOverflow)),
                    }
                });

            let (points, status, notes) = match result {
                Ok(contribution) => (
                    contribution.points,
                    EvaluationStatus::Applied,
                    contribution.notes,
                ),
                Err(err) => (
                    0,
                    EvaluationStatus::Skipped {
                        category: err.category(),
                        reason: err.to_string(),
                    },
                    Vec::new(),
                ),
            };

            total_points += points;
            evaluations.push(RuleEvaluation {
                rule_name: prepared.name.clone(),
                rule_type: prepared.rule_type.clone(),
                points,
                running_total: total_points,
                status,
                notes,
            });
        }

        PointsOutcome {
            total_points,
            evaluations,
        }
    }
}

/// Score plus the per-rule audit trail, in rule order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsOutcome {
    pub total_points: i64,
    pub evaluations: Vec<RuleEvaluation>,
}

impl PointsOutcome {
    pub fn skipped(&self) -> impl Iterator<Item = &RuleEvaluation> {
        self.evaluations
            .iter()
            .filter(|evaluation| !evaluation.is_applied())
    }
}

/// Audit entry for a single rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleEvaluation {
    pub rule_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    pub points: i64,
    pub running_total: i64,
    #[serde(flatten)]
    pub status: EvaluationStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl RuleEvaluation {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, EvaluationStatus::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationStatus {
    Applied,
    Skipped {
        category: ErrorCategory,
        reason: String,
    },
}
