use chrono::NaiveTime;

use super::config::{ConfigNumber, RoundingDefinition, RuleDefinition, TimeRangeDefinition};
use super::error::ConfigurationError;

const DEFAULT_GROUP_SIZE: f64 = 2.0;
const DEFAULT_DESCRIPTION_DIVISOR: f64 = 3.0;
const DEFAULT_RANGE_START: &str = "00:00";
const DEFAULT_RANGE_END: &str = "23:59";
/// 2^63, the first `f64` above `i64::MAX`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Part of the receipt a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Retailer,
    PurchaseDate,
    PurchaseTime,
    Total,
    Items,
}

impl Target {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "retailer" => Some(Self::Retailer),
            "purchaseDate" => Some(Self::PurchaseDate),
            "purchaseTime" => Some(Self::PurchaseTime),
            "total" => Some(Self::Total),
            "items" => Some(Self::Items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Retailer => "retailer",
            Target::PurchaseDate => "purchaseDate",
            Target::PurchaseTime => "purchaseTime",
            Target::Total => "total",
            Target::Items => "items",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    CharacterCount,
    CentsCheck,
    TotalCheck,
    ItemsCount,
    ItemDescription,
    DateCheck,
    TimeCheck,
}

impl RuleType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "character_count" => Some(Self::CharacterCount),
            "cents_check" => Some(Self::CentsCheck),
            "total_check" => Some(Self::TotalCheck),
            "items_count" => Some(Self::ItemsCount),
            "item_description" => Some(Self::ItemDescription),
            "date_check" => Some(Self::DateCheck),
            "time_check" => Some(Self::TimeCheck),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::CharacterCount => "character_count",
            RuleType::CentsCheck => "cents_check",
            RuleType::TotalCheck => "total_check",
            RuleType::ItemsCount => "items_count",
            RuleType::ItemDescription => "item_description",
            RuleType::DateCheck => "date_check",
            RuleType::TimeCheck => "time_check",
        }
    }

    /// Item-based rules read the item list regardless of the declared target.
    pub fn is_item_based(&self) -> bool {
        matches!(self, RuleType::ItemsCount | RuleType::ItemDescription)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Alphanumeric,
    Divisible,
    Matches,
    Between,
    Parity,
    GroupSize,
}

impl Condition {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "alphanumeric" => Some(Self::Alphanumeric),
            "divisible" => Some(Self::Divisible),
            "matches" => Some(Self::Matches),
            "between" => Some(Self::Between),
            "parity" => Some(Self::Parity),
            "group_size" => Some(Self::GroupSize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Alphanumeric => "alphanumeric",
            Condition::Divisible => "divisible",
            Condition::Matches => "matches",
            Condition::Between => "between",
            Condition::Parity => "parity",
            Condition::GroupSize => "group_size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "odd" => Some(Self::Odd),
            "even" => Some(Self::Even),
            _ => None,
        }
    }

    pub fn matches(&self, day: i64) -> bool {
        let odd = day.rem_euclid(2) == 1;
        match self {
            Parity::Odd => odd,
            Parity::Even => !odd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMethod {
    /// `trunc(value + 0.99)`, the formula existing point totals were computed with.
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rounding {
    pub method: RoundingMethod,
    pub precision: f64,
}

impl Rounding {
    /// Rounded whole points, or `None` when the result does not fit in an `i64`.
    pub fn apply(&self, value: f64) -> Option<i64> {
        let rounded = match self.method {
            RoundingMethod::Up => (value + 0.99).trunc(),
            RoundingMethod::Down => value.trunc(),
        };
        (rounded.is_finite() && rounded.abs() < I64_LIMIT).then_some(rounded as i64)
    }
}

/// Inclusive time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalCheck {
    Divisible { divisor: f64 },
    Matches { expected: f64 },
}

/// Strongly typed predicate and formula, one variant per rule type.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    CharacterCount {
        field: Target,
        points_per_char: i64,
    },
    CentsCheck {
        field: Target,
        expected: f64,
        extra_points: i64,
    },
    TotalCheck {
        field: Target,
        check: TotalCheck,
        extra_points: i64,
    },
    ItemsCount {
        group_size: f64,
        points_per_group: i64,
    },
    ItemDescription {
        divisor: f64,
        price_multiplier: f64,
        rounding: Rounding,
    },
    DateCheck {
        field: Target,
        parity: Parity,
        extra_points: i64,
    },
    TimeCheck {
        field: Target,
        range: TimeRange,
        extra_points: i64,
    },
}

impl RuleKind {
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleKind::CharacterCount { .. } => RuleType::CharacterCount,
            RuleKind::CentsCheck { .. } => RuleType::CentsCheck,
            RuleKind::TotalCheck { .. } => RuleType::TotalCheck,
            RuleKind::ItemsCount { .. } => RuleType::ItemsCount,
            RuleKind::ItemDescription { .. } => RuleType::ItemDescription,
            RuleKind::DateCheck { .. } => RuleType::DateCheck,
            RuleKind::TimeCheck { .. } => RuleType::TimeCheck,
        }
    }
}

/// Compiled form of a [`RuleDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
}

impl Rule {
    pub fn compile(definition: &RuleDefinition) -> Result<Self, ConfigurationError> {
        let check = &definition.input_check;
        let calc = &definition.points_calculation;

        let rule_type = present(check.rule_type.as_deref()).ok_or(ConfigurationError::MissingType)?;
        let target =
            present(check.target_field.as_deref()).ok_or(ConfigurationError::MissingTarget)?;
        let rule_type = RuleType::parse(rule_type)
            .ok_or_else(|| ConfigurationError::UnknownType(rule_type.to_string()))?;
        let condition =
            present(check.condition.as_deref()).ok_or(ConfigurationError::MissingCondition)?;
        let condition = Condition::parse(condition)
            .ok_or_else(|| ConfigurationError::UnknownCondition(condition.to_string()))?;

        let field = || -> Result<Target, ConfigurationError> {
            Target::parse(target)
                .ok_or_else(|| ConfigurationError::UnknownTarget(target.to_string()))
        };
        let input_value = check.input_value.as_ref();

        let kind = match (rule_type, condition) {
            (RuleType::CharacterCount, Condition::Alphanumeric) => RuleKind::CharacterCount {
                field: field()?,
                points_per_char: points(calc.points_per_char.as_ref(), "points_per_char")?,
            },
            (RuleType::CentsCheck, Condition::Matches) => RuleKind::CentsCheck {
                field: field()?,
                expected: number(input_value, "input_value", 0.0)?,
                extra_points: points(calc.extra_points.as_ref(), "extra_points")?,
            },
            (RuleType::TotalCheck, Condition::Divisible) => RuleKind::TotalCheck {
                field: field()?,
                check: TotalCheck::Divisible {
                    divisor: positive(input_value, "input_value", 0.0)?,
                },
                extra_points: points(calc.extra_points.as_ref(), "extra_points")?,
            },
            (RuleType::TotalCheck, Condition::Matches) => RuleKind::TotalCheck {
                field: field()?,
                check: TotalCheck::Matches {
                    expected: number(input_value, "input_value", 0.0)?,
                },
                extra_points: points(calc.extra_points.as_ref(), "extra_points")?,
            },
            (RuleType::ItemsCount, Condition::GroupSize) => RuleKind::ItemsCount {
                group_size: positive(input_value, "input_value", DEFAULT_GROUP_SIZE)?,
                points_per_group: points(calc.points_per_group.as_ref(), "points_per_group")?,
            },
            (RuleType::ItemDescription, Condition::Divisible) => RuleKind::ItemDescription {
                divisor: positive(input_value, "input_value", DEFAULT_DESCRIPTION_DIVISOR)?,
                price_multiplier: non_negative(
                    calc.price_multiplier.as_ref(),
                    "price_multiplier",
                )?,
                rounding: rounding(calc.rounding.as_ref())?,
            },
            (RuleType::DateCheck, Condition::Parity) => {
                let raw = present(check.parity.as_deref())
                    .ok_or(ConfigurationError::MissingParity)?;
                RuleKind::DateCheck {
                    field: field()?,
                    parity: Parity::parse(raw)
                        .ok_or_else(|| ConfigurationError::UnknownParity(raw.to_string()))?,
                    extra_points: points(calc.extra_points.as_ref(), "extra_points")?,
                }
            }
            (RuleType::TimeCheck, Condition::Between) => RuleKind::TimeCheck {
                field: field()?,
                range: time_range(check.input_range.as_ref())?,
                extra_points: points(calc.extra_points.as_ref(), "extra_points")?,
            },
            (rule_type, condition) => {
                return Err(ConfigurationError::UnsupportedCondition {
                    rule_type: rule_type.as_str(),
                    condition: condition.as_str(),
                })
            }
        };

        Ok(Self {
            name: definition.name.clone(),
            kind,
        })
    }

    pub fn rule_type(&self) -> RuleType {
        self.kind.rule_type()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn number(
    value: Option<&ConfigNumber>,
    field: &'static str,
    default: f64,
) -> Result<f64, ConfigurationError> {
    value.map_or(Ok(default), |value| value.resolve(field))
}

fn positive(
    value: Option<&ConfigNumber>,
    field: &'static str,
    default: f64,
) -> Result<f64, ConfigurationError> {
    let value = number(value, field, default)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::NonPositive { field, value })
    }
}

fn non_negative(
    value: Option<&ConfigNumber>,
    field: &'static str,
) -> Result<f64, ConfigurationError> {
    let value = number(value, field, 0.0)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::Negative { field, value })
    }
}

fn points(value: Option<&ConfigNumber>, field: &'static str) -> Result<i64, ConfigurationError> {
    let value = number(value, field, 0.0)?;
    if value >= 0.0 && value.fract() == 0.0 && value < I64_LIMIT {
        Ok(value as i64)
    } else {
        Err(ConfigurationError::InvalidPoints { field, value })
    }
}

fn rounding(definition: Option<&RoundingDefinition>) -> Result<Rounding, ConfigurationError> {
    let Some(definition) = definition else {
        return Ok(Rounding::default());
    };

    let method = match present(definition.method.as_deref()) {
        None | Some("up") => RoundingMethod::Up,
        Some("down") => RoundingMethod::Down,
        Some(other) => return Err(ConfigurationError::UnknownRoundingMethod(other.to_string())),
    };
    let precision = non_negative(definition.precision.as_ref(), "precision")?;

    Ok(Rounding { method, precision })
}

fn time_range(definition: Option<&TimeRangeDefinition>) -> Result<TimeRange, ConfigurationError> {
    let start = definition.and_then(|range| present(range.start.as_deref()));
    let end = definition.and_then(|range| present(range.end.as_deref()));

    Ok(TimeRange {
        start: time_bound(start.unwrap_or(DEFAULT_RANGE_START))?,
        end: time_bound(end.unwrap_or(DEFAULT_RANGE_END))?,
    })
}

fn time_bound(raw: &str) -> Result<NaiveTime, ConfigurationError> {
    parse_time_of_day(raw).ok_or_else(|| ConfigurationError::InvalidTimeBound(raw.to_string()))
}

/// Accepts `HH:MM`, `HH:MM:SS` and `HH:MM:SS.fff`.
pub(crate) fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}
