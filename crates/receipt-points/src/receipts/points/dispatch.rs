use super::super::domain::{Item, Receipt};
use super::error::{RuleError, ShapeMismatch};
use super::evaluators;
use super::rule::{Rule, RuleKind, RuleType, Target};

/// Points earned by one rule plus any per-item remarks worth auditing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Contribution {
    pub(crate) points: i64,
    pub(crate) notes: Vec<String>,
}

impl Contribution {
    fn points(points: i64) -> Self {
        Self {
            points,
            notes: Vec::new(),
        }
    }
}

/// Typed view of the receipt part a [`Target`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiptField<'a> {
    Text(&'a str),
    Items(&'a [Item]),
}

pub(crate) fn resolve(receipt: &Receipt, target: Target) -> ReceiptField<'_> {
    match target {
        Target::Retailer => ReceiptField::Text(&receipt.retailer),
        Target::PurchaseDate => ReceiptField::Text(&receipt.purchase_date),
        Target::PurchaseTime => ReceiptField::Text(&receipt.purchase_time),
        Target::Total => ReceiptField::Text(&receipt.total),
        Target::Items => ReceiptField::Items(&receipt.items),
    }
}

fn text(receipt: &Receipt, target: Target, rule_type: RuleType) -> Result<&str, ShapeMismatch> {
    match resolve(receipt, target) {
        ReceiptField::Text(value) => Ok(value),
        ReceiptField::Items(_) => Err(ShapeMismatch::ExpectedText {
            rule_type: rule_type.as_str(),
            target: target.as_str(),
        }),
    }
}

/// Evaluates one compiled rule against a receipt.
pub(crate) fn apply(rule: &Rule, receipt: &Receipt) -> Result<Contribution, RuleError> {
    let rule_type = rule.rule_type();
    if rule_type.is_item_based() && receipt.items.is_empty() {
        return Err(ShapeMismatch::NoItems.into());
    }

    let contribution = match &rule.kind {
        RuleKind::CharacterCount {
            field,
            points_per_char,
        } => {
            let value = text(receipt, *field, rule_type)?;
            Contribution::points(evaluators::character_count(value, *points_per_char)?)
        }
        RuleKind::CentsCheck {
            field,
            expected,
            extra_points,
        } => {
            let value = text(receipt, *field, rule_type)?;
            Contribution::points(evaluators::cents_check(value, *expected, *extra_points)?)
        }
        RuleKind::TotalCheck {
            field,
            check,
            extra_points,
        } => {
            let value = text(receipt, *field, rule_type)?;
            Contribution::points(evaluators::total_check(value, *check, *extra_points)?)
        }
        RuleKind::ItemsCount {
            group_size,
            points_per_group,
        } => Contribution::points(evaluators::items_count(
            &receipt.items,
            *group_size,
            *points_per_group,
        )?),
        RuleKind::ItemDescription {
            divisor,
            price_multiplier,
            rounding,
        } => {
            let outcome = evaluators::item_description(
                &receipt.items,
                *divisor,
                *price_multiplier,
                *rounding,
            )?;
            let mut notes = vec![format!("{} qualifying item(s)", outcome.qualifying)];
            notes.extend(
                outcome
                    .skipped
                    .iter()
                    .map(|skipped| format!("item #{} skipped: {}", skipped.index, skipped.error)),
            );
            Contribution {
                points: outcome.points,
                notes,
            }
        }
        RuleKind::DateCheck {
            field,
            parity,
            extra_points,
        } => {
            let value = text(receipt, *field, rule_type)?;
            Contribution::points(evaluators::date_check(value, *parity, *extra_points)?)
        }
        RuleKind::TimeCheck {
            field,
            range,
            extra_points,
        } => {
            let value = text(receipt, *field, rule_type)?;
            Contribution::points(evaluators::time_check(value, *range, *extra_points)?)
        }
    };

    Ok(contribution)
}
