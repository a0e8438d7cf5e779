use serde::Serialize;

/// Reason a single rule contributed nothing. Never escapes [`super::PointsEngine::score`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(#[from] ShapeMismatch),
}

impl RuleError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RuleError::Configuration(_) => ErrorCategory::Configuration,
            RuleError::Data(_) => ErrorCategory::Data,
            RuleError::ShapeMismatch(_) => ErrorCategory::ShapeMismatch,
        }
    }
}

/// Coarse classification recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Data,
    ShapeMismatch,
}

/// Rule definition is incomplete, unknown, or numerically out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("malformed rule definition: {0}")]
    Malformed(String),
    #[error("missing configuration: rule type is not set")]
    MissingType,
    #[error("missing configuration: target field is not set")]
    MissingTarget,
    #[error("unknown rule type '{0}'")]
    UnknownType(String),
    #[error("unknown target field '{0}'")]
    UnknownTarget(String),
    #[error("missing condition")]
    MissingCondition,
    #[error("unknown condition '{0}'")]
    UnknownCondition(String),
    #[error("condition '{condition}' is not supported by rule type '{rule_type}'")]
    UnsupportedCondition {
        rule_type: &'static str,
        condition: &'static str,
    },
    #[error("field '{field}' is not a number: {value}")]
    NotANumber { field: &'static str, value: String },
    #[error("field '{field}' must be a non-negative whole number, found {value}")]
    InvalidPoints { field: &'static str, value: f64 },
    #[error("field '{field}' must be greater than zero, found {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("field '{field}' must not be negative, found {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("missing parity")]
    MissingParity,
    #[error("unknown parity '{0}'")]
    UnknownParity(String),
    #[error("invalid time bound '{0}'")]
    InvalidTimeBound(String),
    #[error("unknown rounding method '{0}'")]
    UnknownRoundingMethod(String),
}

/// Receipt text that the rule needed to parse was malformed, or the points it
/// produced do not fit the running total.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    #[error("invalid time '{0}'")]
    InvalidTime(String),
    #[error("points exceed the supported range")]
    PointsOverflow,
}

/// Rule was aimed at a part of the receipt it cannot evaluate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeMismatch {
    #[error("receipt has no items")]
    NoItems,
    #[error("rule type '{rule_type}' expects a text field, target '{target}' is a list")]
    ExpectedText {
        rule_type: &'static str,
        target: &'static str,
    },
}
