use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::ConfigurationError;
use super::rule::Rule;

pub const UNNAMED_RULE: &str = "unnamed_rule";

/// Ordered list of configured rules, as stored and uploaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

impl RuleSet {
    pub fn new(rules: Vec<RuleEntry>) -> Self {
        Self { rules }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, RuleSetError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RuleSetError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads a rule file, choosing the decoder from the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&raw),
            Some("json") => Self::from_json_str(&raw),
            _ => Err(RuleSetError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String, RuleSetError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Strict check applied to uploads: every rule must be named and compile.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        let issues: Vec<RuleIssue> = self
            .rules
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let reason = match entry {
                    RuleEntry::Malformed { error, .. } => {
                        Some(ConfigurationError::Malformed(error.clone()).to_string())
                    }
                    RuleEntry::Defined(definition) if definition.name.trim().is_empty() => {
                        Some("rule name must not be empty".to_string())
                    }
                    RuleEntry::Defined(definition) => {
                        Rule::compile(definition).err().map(|err| err.to_string())
                    }
                };
                reason.map(|reason| RuleIssue {
                    index,
                    name: entry.name().to_string(),
                    reason,
                })
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(RuleSetError::Invalid(issues))
        }
    }
}

/// One element of the `rules` list. Entries that are not rule-shaped are kept
/// verbatim so they can be reported and echoed back, and evaluate as inert.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleEntry {
    Defined(RuleDefinition),
    Malformed {
        raw: serde_json::Value,
        error: String,
    },
}

impl RuleEntry {
    pub fn name(&self) -> &str {
        match self {
            RuleEntry::Defined(definition) => &definition.name,
            RuleEntry::Malformed { raw, .. } => raw
                .get("name")
                .and_then(|name| name.as_str())
                .unwrap_or(UNNAMED_RULE),
        }
    }

    pub fn rule_type(&self) -> Option<&str> {
        match self {
            RuleEntry::Defined(definition) => definition.input_check.rule_type.as_deref(),
            RuleEntry::Malformed { raw, .. } => raw
                .get("input_check")
                .and_then(|check| check.get("type"))
                .and_then(|rule_type| rule_type.as_str()),
        }
    }

    pub fn compile(&self) -> Result<Rule, ConfigurationError> {
        match self {
            RuleEntry::Defined(definition) => Rule::compile(definition),
            RuleEntry::Malformed { error, .. } => Err(ConfigurationError::Malformed(error.clone())),
        }
    }
}

impl From<RuleDefinition> for RuleEntry {
    fn from(definition: RuleDefinition) -> Self {
        RuleEntry::Defined(definition)
    }
}

impl<'de> Deserialize<'de> for RuleEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match serde_json::from_value::<RuleDefinition>(raw.clone()) {
            Ok(definition) => RuleEntry::Defined(definition),
            Err(err) => RuleEntry::Malformed {
                raw,
                error: err.to_string(),
            },
        })
    }
}

impl Serialize for RuleEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RuleEntry::Defined(definition) => definition.serialize(serializer),
            RuleEntry::Malformed { raw, .. } => raw.serialize(serializer),
        }
    }
}

/// Declarative rule as written in configuration. Every field is optional so a
/// partially specified rule still decodes and is disabled at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default = "default_rule_name")]
    pub name: String,
    #[serde(default)]
    pub input_check: InputCheck,
    #[serde(default)]
    pub points_calculation: PointsCalculation,
}

fn default_rule_name() -> String {
    UNNAMED_RULE.to_string()
}

impl Default for RuleDefinition {
    fn default() -> Self {
        Self {
            name: default_rule_name(),
            input_check: InputCheck::default(),
            points_calculation: PointsCalculation::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputCheck {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_value: Option<ConfigNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_range: Option<TimeRangeDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRangeDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsCalculation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_per_char: Option<ConfigNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_points: Option<ConfigNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_per_group: Option<ConfigNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_multiplier: Option<ConfigNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounding: Option<RoundingDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundingDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<ConfigNumber>,
}

/// Numeric configuration value that tolerates quoting and keeps garbage for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigNumber {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl ConfigNumber {
    pub fn resolve(&self, field: &'static str) -> Result<f64, ConfigurationError> {
        let value = match self {
            ConfigNumber::Integer(value) => Some(*value as f64),
            ConfigNumber::Float(value) => Some(*value),
            ConfigNumber::Text(text) => text.trim().parse::<f64>().ok(),
            ConfigNumber::Other(_) => None,
        };

        value
            .filter(|value| value.is_finite())
            .ok_or_else(|| ConfigurationError::NotANumber {
                field,
                value: self.to_string(),
            })
    }
}

impl fmt::Display for ConfigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigNumber::Integer(value) => write!(f, "{value}"),
            ConfigNumber::Float(value) => write!(f, "{value}"),
            ConfigNumber::Text(text) => write!(f, "{text:?}"),
            ConfigNumber::Other(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for ConfigNumber {
    fn from(value: i64) -> Self {
        ConfigNumber::Integer(value)
    }
}

impl From<f64> for ConfigNumber {
    fn from(value: f64) -> Self {
        ConfigNumber::Float(value)
    }
}

/// A rule that failed strict validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleIssue {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule #{} '{}': {}", self.index, self.name, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("failed to read rules from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid YAML rules document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON rules document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported rules file format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("invalid rules: {}", join_issues(.0))]
    Invalid(Vec<RuleIssue>),
}

fn join_issues(issues: &[RuleIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
