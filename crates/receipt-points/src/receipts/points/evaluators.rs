//! One pure function per rule type. Each takes the receipt text (or item list)
//! the rule targets plus its compiled parameters and returns the points earned.

use chrono::NaiveTime;

use super::super::domain::Item;
use super::error::DataError;
use super::rule::{parse_time_of_day, Parity, Rounding, TimeRange, TotalCheck};

/// `[A-Za-z0-9]` characters times `points_per_char`.
pub(crate) fn character_count(value: &str, points_per_char: i64) -> Result<i64, DataError> {
    let count = value.chars().filter(char::is_ascii_alphanumeric).count() as i64;
    count
        .checked_mul(points_per_char)
        .ok_or(DataError::PointsOverflow)
}

pub(crate) fn cents_check(value: &str, expected: f64, extra_points: i64) -> Result<i64, DataError> {
    let amount = parse_amount(value)?;
    Ok(award(cents(amount) == cents(expected), extra_points))
}

pub(crate) fn total_check(
    value: &str,
    check: TotalCheck,
    extra_points: i64,
) -> Result<i64, DataError> {
    let amount = parse_amount(value)?;
    let satisfied = match check {
        TotalCheck::Divisible { divisor } => amount.rem_euclid(divisor) == 0.0,
        TotalCheck::Matches { expected } => cents(amount) == cents(expected),
    };
    Ok(award(satisfied, extra_points))
}

/// `floor(item_count / group_size)` groups, each worth `points_per_group`.
pub(crate) fn items_count(
    items: &[Item],
    group_size: f64,
    points_per_group: i64,
) -> Result<i64, DataError> {
    let groups = (items.len() as f64 / group_size).floor() as i64;
    groups
        .checked_mul(points_per_group)
        .ok_or(DataError::PointsOverflow)
}

/// Item that was passed over because its price could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SkippedItem {
    pub(crate) index: usize,
    pub(crate) error: DataError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DescriptionPoints {
    pub(crate) points: i64,
    pub(crate) qualifying: usize,
    pub(crate) skipped: Vec<SkippedItem>,
}

/// Sums rounded `price * multiplier` over items whose trimmed description length
/// is a multiple of `divisor`. A bad price skips only that item; a sum that
/// leaves the `i64` range fails the whole rule.
pub(crate) fn item_description(
    items: &[Item],
    divisor: f64,
    price_multiplier: f64,
    rounding: Rounding,
) -> Result<DescriptionPoints, DataError> {
    let mut result = DescriptionPoints::default();

    for (index, item) in items.iter().enumerate() {
        let length = item.short_description.trim().chars().count() as f64;
        if length.rem_euclid(divisor) != 0.0 {
            continue;
        }

        match parse_amount(&item.price) {
            Ok(price) => {
                result.points = rounding
                    .apply(price * price_multiplier)
                    .and_then(|points| result.points.checked_add(points))
                    .ok_or(DataError::PointsOverflow)?;
                result.qualifying += 1;
            }
            Err(error) => result.skipped.push(SkippedItem { index, error }),
        }
    }

    Ok(result)
}

/// Awards `extra_points` when the day of month in a `YYYY-MM-DD` string has the given parity.
pub(crate) fn date_check(value: &str, parity: Parity, extra_points: i64) -> Result<i64, DataError> {
    let day = value
        .split('-')
        .nth(2)
        .and_then(|day| day.trim().parse::<i64>().ok())
        .ok_or_else(|| DataError::InvalidDate(value.to_string()))?;
    Ok(award(parity.matches(day), extra_points))
}

pub(crate) fn time_check(
    value: &str,
    range: TimeRange,
    extra_points: i64,
) -> Result<i64, DataError> {
    let time: NaiveTime =
        parse_time_of_day(value).ok_or_else(|| DataError::InvalidTime(value.to_string()))?;
    Ok(award(range.contains(time), extra_points))
}

fn award(satisfied: bool, extra_points: i64) -> i64 {
    if satisfied {
        extra_points
    } else {
        0
    }
}

/// Fractional part of an amount in whole cents, ties rounded to even.
pub(crate) fn cents(amount: f64) -> i64 {
    (amount.rem_euclid(1.0) * 100.0).round_ties_even() as i64
}

pub(crate) fn parse_amount(value: &str) -> Result<f64, DataError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .ok_or_else(|| DataError::InvalidAmount(value.to_string()))
}
