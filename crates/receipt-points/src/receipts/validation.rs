use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use super::domain::Receipt;

const TOTAL_TOLERANCE: f64 = 0.01;

/// Single reason a receipt was rejected before scoring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiptViolation {
    #[error("retailer can only contain alphanumeric characters, spaces, hyphens, and &")]
    Retailer,
    #[error("purchaseDate must be a calendar date in YYYY-MM-DD format")]
    PurchaseDate,
    #[error("purchaseTime must be in HH:MM format (24-hour)")]
    PurchaseTime,
    #[error("total must be in format '0.00'")]
    Total,
    #[error("receipt must contain at least one item")]
    NoItems,
    #[error("item #{index} description can only contain alphanumeric characters, spaces, and hyphens")]
    ItemDescription { index: usize },
    #[error("item #{index} price must be in format '0.00'")]
    ItemPrice { index: usize },
    #[error("total does not match sum of items ({total} != {items_total})")]
    TotalMismatch { total: String, items_total: String },
}

/// Every violation found on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("The receipt is invalid.")]
pub struct ReceiptValidationError {
    pub violations: Vec<ReceiptViolation>,
}

impl ReceiptValidationError {
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

fn retailer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w\s\-&]+$").expect("retailer pattern compiles"))
}

fn description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w\s\-]+$").expect("description pattern compiles"))
}

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d{2}$").expect("amount pattern compiles"))
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])$")
            .expect("date pattern compiles")
    })
}

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d$").expect("time pattern compiles")
    })
}

/// Schema checks applied before a receipt reaches the points engine.
pub fn validate_receipt(receipt: &Receipt) -> Result<(), ReceiptValidationError> {
    let mut violations = Vec::new();

    if !retailer_pattern().is_match(&receipt.retailer) {
        violations.push(ReceiptViolation::Retailer);
    }

    let date_ok = date_pattern().is_match(&receipt.purchase_date)
        && NaiveDate::parse_from_str(&receipt.purchase_date, "%Y-%m-%d").is_ok();
    if !date_ok {
        violations.push(ReceiptViolation::PurchaseDate);
    }

    let time_ok = time_pattern().is_match(&receipt.purchase_time)
        && NaiveTime::parse_from_str(&receipt.purchase_time, "%H:%M").is_ok();
    if !time_ok {
        violations.push(ReceiptViolation::PurchaseTime);
    }

    if receipt.items.is_empty() {
        violations.push(ReceiptViolation::NoItems);
    }

    let mut prices_ok = true;
    for (index, item) in receipt.items.iter().enumerate() {
        if !description_pattern().is_match(&item.short_description) {
            violations.push(ReceiptViolation::ItemDescription { index });
        }
        if !amount_pattern().is_match(&item.price) {
            violations.push(ReceiptViolation::ItemPrice { index });
            prices_ok = false;
        }
    }

    if !amount_pattern().is_match(&receipt.total) {
        violations.push(ReceiptViolation::Total);
    } else if prices_ok && !receipt.items.is_empty() {
        let items_total: f64 = receipt
            .items
            .iter()
            .filter_map(|item| item.price.parse::<f64>().ok())
            .sum();
        let total = receipt.total.parse::<f64>().unwrap_or_default();
        if (items_total - total).abs() > TOTAL_TOLERANCE {
            violations.push(ReceiptViolation::TotalMismatch {
                total: receipt.total.clone(),
                items_total: format!("{items_total:.2}"),
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ReceiptValidationError { violations })
    }
}
