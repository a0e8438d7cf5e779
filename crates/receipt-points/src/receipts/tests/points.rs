use std::thread;

use super::common::*;
use crate::receipts::domain::{Item, Receipt};
use crate::receipts::points::{
    ErrorCategory, EvaluationStatus, PointsEngine, RuleEntry, RuleSet, UNNAMED_RULE,
};

fn single_rule_points(yaml: &str, receipt: &Receipt) -> i64 {
    engine(yaml).score(receipt).total_points
}

fn skipped_category(yaml: &str, receipt: &Receipt) -> ErrorCategory {
    let outcome = engine(yaml).score(receipt);
    match &outcome.evaluations[0].status {
        EvaluationStatus::Skipped { category, .. } => *category,
        EvaluationStatus::Applied => panic!("expected rule to be skipped"),
    }
}

const RETAILER_RULE: &str = r#"
rules:
  - name: retailer
    input_check: { type: character_count, target_field: retailer, condition: alphanumeric }
    points_calculation: { points_per_char: 1 }
"#;

#[test]
fn retailer_alphanumeric_characters_score_one_point_each() {
    let receipt = corner_market_receipt();
    assert_eq!(receipt.retailer, "M&M Corner Market");
    assert_eq!(single_rule_points(RETAILER_RULE, &receipt), 14);
}

#[test]
fn quarter_multiple_total_awards_extra_points() {
    let yaml = r#"
rules:
  - name: quarter
    input_check: { type: total_check, target_field: total, condition: divisible, input_value: 0.25 }
    points_calculation: { extra_points: 25 }
"#;
    let mut receipt = corner_market_receipt();
    receipt.total = "6.50".to_string();
    assert_eq!(single_rule_points(yaml, &receipt), 25);

    receipt.total = "6.51".to_string();
    assert_eq!(single_rule_points(yaml, &receipt), 0);
}

#[test]
fn item_pairs_award_points_per_whole_group() {
    let yaml = r#"
rules:
  - name: pairs
    input_check: { type: items_count, target_field: items, condition: group_size, input_value: 2 }
    points_calculation: { points_per_group: 5 }
"#;
    let receipt = target_receipt();
    assert_eq!(receipt.items.len(), 5);
    assert_eq!(single_rule_points(yaml, &receipt), 10);
}

#[test]
fn trimmed_description_multiple_of_three_earns_price_share() {
    let yaml = r#"
rules:
  - name: description
    input_check: { type: item_description, target_field: items, condition: divisible, input_value: 3 }
    points_calculation: { price_multiplier: 0.2 }
"#;
    let mut receipt = target_receipt();
    receipt.items = vec![Item::new("Emils Cheese Pizza", "12.25")];
    assert_eq!(single_rule_points(yaml, &receipt), 3);
}

#[test]
fn afternoon_window_is_checked_against_purchase_time() {
    let yaml = r#"
rules:
  - name: afternoon
    input_check:
      type: time_check
      target_field: purchaseTime
      condition: between
      input_range: { start: "14:00", end: "16:00" }
    points_calculation: { extra_points: 10 }
"#;
    let mut receipt = corner_market_receipt();
    receipt.purchase_time = "14:33".to_string();
    assert_eq!(single_rule_points(yaml, &receipt), 10);

    receipt.purchase_time = "13:01".to_string();
    assert_eq!(single_rule_points(yaml, &receipt), 0);
}

#[test]
fn standard_rules_score_known_receipts() {
    let engine = PointsEngine::new(&standard_rules());

    let target = engine.score(&target_receipt());
    assert_eq!(target.total_points, 28);
    assert_eq!(target.skipped().count(), 0);

    let corner_market = engine.score(&corner_market_receipt());
    assert_eq!(corner_market.total_points, 109);
}

#[test]
fn audit_trail_follows_rule_order_with_running_totals() {
    let engine = PointsEngine::new(&standard_rules());
    let outcome = engine.score(&target_receipt());

    let names: Vec<&str> = outcome
        .evaluations
        .iter()
        .map(|evaluation| evaluation.rule_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "retailer_name_points",
            "round_dollar_total",
            "quarter_multiple_total",
            "item_pairs",
            "item_description_length",
            "odd_purchase_day",
            "afternoon_purchase",
        ]
    );

    let points: Vec<i64> = outcome.evaluations.iter().map(|e| e.points).collect();
    assert_eq!(points, vec![6, 0, 0, 10, 6, 6, 0]);

    let running: Vec<i64> = outcome
        .evaluations
        .iter()
        .map(|e| e.running_total)
        .collect();
    assert_eq!(running, vec![6, 6, 6, 16, 22, 28, 28]);

    let description = &outcome.evaluations[4];
    assert_eq!(description.rule_type.as_deref(), Some("item_description"));
    assert_eq!(description.notes, vec!["2 qualifying item(s)".to_string()]);
}

#[test]
fn scoring_is_deterministic() {
    let engine = PointsEngine::new(&standard_rules());
    let receipt = target_receipt();
    assert_eq!(engine.score(&receipt), engine.score(&receipt));
}

#[test]
fn total_is_sum_of_independent_rule_contributions() {
    let rules = standard_rules();
    let receipt = corner_market_receipt();
    let combined = PointsEngine::new(&rules).score(&receipt).total_points;

    let separately: i64 = rules
        .rules
        .iter()
        .map(|entry| {
            PointsEngine::new(&RuleSet::new(vec![entry.clone()]))
                .score(&receipt)
                .total_points
        })
        .sum();
    assert_eq!(combined, separately);

    let mut reversed = rules.rules.clone();
    reversed.reverse();
    let reversed_total = PointsEngine::new(&RuleSet::new(reversed))
        .score(&receipt)
        .total_points;
    assert_eq!(combined, reversed_total);
}

#[test]
fn empty_rule_list_scores_zero() {
    let outcome = PointsEngine::new(&RuleSet::default()).score(&target_receipt());
    assert_eq!(outcome.total_points, 0);
    assert!(outcome.evaluations.is_empty());
}

#[test]
fn broken_rules_are_skipped_without_affecting_others() {
    let yaml = r#"
rules:
  - name: mystery
    input_check: { type: lottery_check, target_field: total, condition: matches }
    points_calculation: { extra_points: 1000 }
  - name: no_target
    input_check: { type: cents_check, condition: matches, input_value: 0 }
    points_calculation: { extra_points: 50 }
  - 42
  - name: retailer
    input_check: { type: character_count, target_field: retailer, condition: alphanumeric }
    points_calculation: { points_per_char: 1 }
"#;
    let outcome = engine(yaml).score(&target_receipt());

    assert_eq!(outcome.total_points, 6);
    assert_eq!(outcome.evaluations.len(), 4);
    assert_eq!(outcome.skipped().count(), 3);
    assert_eq!(outcome.evaluations[2].rule_name, UNNAMED_RULE);
    for evaluation in outcome.skipped() {
        assert_eq!(evaluation.points, 0);
        assert!(matches!(
            evaluation.status,
            EvaluationStatus::Skipped {
                category: ErrorCategory::Configuration,
                ..
            }
        ));
    }
    assert!(outcome.evaluations[3].is_applied());
}

#[test]
fn entry_without_fields_defaults_its_name_and_is_inert() {
    let rules = rules("rules:\n  - {}\n");
    assert!(matches!(rules.rules[0], RuleEntry::Defined(_)));

    let outcome = PointsEngine::new(&rules).score(&target_receipt());
    assert_eq!(outcome.total_points, 0);
    assert_eq!(outcome.evaluations[0].rule_name, UNNAMED_RULE);
    assert!(!outcome.evaluations[0].is_applied());
}

#[test]
fn unparseable_receipt_text_is_a_data_error_for_that_rule_only() {
    let yaml = r#"
rules:
  - name: round_dollar
    input_check: { type: cents_check, target_field: total, condition: matches, input_value: 0 }
    points_calculation: { extra_points: 50 }
  - name: retailer
    input_check: { type: character_count, target_field: retailer, condition: alphanumeric }
    points_calculation: { points_per_char: 1 }
"#;
    let mut receipt = target_receipt();
    receipt.total = "abc".to_string();

    assert_eq!(skipped_category(yaml, &receipt), ErrorCategory::Data);
    assert_eq!(engine(yaml).score(&receipt).total_points, 6);
}

#[test]
fn item_rules_on_empty_item_list_are_shape_mismatches() {
    let yaml = r#"
rules:
  - name: pairs
    input_check: { type: items_count, target_field: items, condition: group_size, input_value: 2 }
    points_calculation: { points_per_group: 5 }
"#;
    let mut receipt = target_receipt();
    receipt.items.clear();
    assert_eq!(skipped_category(yaml, &receipt), ErrorCategory::ShapeMismatch);
}

#[test]
fn scalar_rule_aimed_at_items_is_a_shape_mismatch() {
    let yaml = r#"
rules:
  - name: counting_items
    input_check: { type: character_count, target_field: items, condition: alphanumeric }
    points_calculation: { points_per_char: 1 }
"#;
    assert_eq!(
        skipped_category(yaml, &target_receipt()),
        ErrorCategory::ShapeMismatch
    );
}

#[test]
fn character_count_works_on_any_text_field() {
    let yaml = r#"
rules:
  - name: date_digits
    input_check: { type: character_count, target_field: purchaseDate, condition: alphanumeric }
    points_calculation: { points_per_char: 2 }
"#;
    assert_eq!(single_rule_points(yaml, &target_receipt()), 16);
}

#[test]
fn odd_day_rule_reads_the_day_of_month() {
    let yaml = r#"
rules:
  - name: odd_day
    input_check: { type: date_check, target_field: purchaseDate, condition: parity, parity: odd }
    points_calculation: { extra_points: 6 }
"#;
    assert_eq!(single_rule_points(yaml, &target_receipt()), 6);
    assert_eq!(single_rule_points(yaml, &corner_market_receipt()), 0);
}

#[test]
fn bad_item_price_skips_only_that_item() {
    let yaml = r#"
rules:
  - name: description
    input_check: { type: item_description, target_field: items, condition: divisible, input_value: 3 }
    points_calculation: { price_multiplier: 0.2 }
"#;
    let mut receipt = target_receipt();
    receipt.items[1].price = "twelve".to_string();

    let outcome = engine(yaml).score(&receipt);
    let evaluation = &outcome.evaluations[0];
    assert!(evaluation.is_applied());
    assert_eq!(evaluation.points, 3);
    assert!(evaluation
        .notes
        .iter()
        .any(|note| note.starts_with("item #1 skipped")));
}

#[test]
fn engine_can_be_shared_across_threads() {
    let engine = &PointsEngine::new(&standard_rules());
    let receipts = [target_receipt(), corner_market_receipt()];

    let totals: Vec<i64> = thread::scope(|scope| {
        let handles: Vec<_> = receipts
            .iter()
            .map(|receipt| scope.spawn(move || engine.score(receipt).total_points))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("scoring thread panicked"))
            .collect()
    });

    assert_eq!(totals, vec![28, 109]);
}

#[test]
fn outcome_serializes_status_inline() {
    let outcome = engine(RETAILER_RULE).score(&target_receipt());
    let json = serde_json::to_value(&outcome).expect("outcome serializes");

    assert_eq!(json["total_points"], 6);
    assert_eq!(json["evaluations"][0]["status"], "applied");
    assert_eq!(json["evaluations"][0]["rule_type"], "character_count");
    assert!(json["evaluations"][0].get("notes").is_none());
}

/// Largest whole `f64` below 2^63, the biggest weight rule compilation accepts.
const LARGEST_WEIGHT: i64 = 9_223_372_036_854_774_784;

fn assert_overflow_skipped(outcome: &crate::receipts::PointsOutcome, index: usize) {
    let evaluation = &outcome.evaluations[index];
    assert_eq!(evaluation.points, 0);
    match &evaluation.status {
        EvaluationStatus::Skipped { category, reason } => {
            assert_eq!(*category, ErrorCategory::Data);
            assert!(reason.contains("points exceed the supported range"));
        }
        EvaluationStatus::Applied => panic!("rule #{index} should have been skipped"),
    }
}

#[test]
fn largest_points_per_char_is_accepted_but_skipped_on_overflow() {
    let yaml = format!(
        r#"
rules:
  - name: huge_retailer
    input_check: {{ type: character_count, target_field: retailer, condition: alphanumeric }}
    points_calculation: {{ points_per_char: {LARGEST_WEIGHT} }}
  - name: retailer
    input_check: {{ type: character_count, target_field: retailer, condition: alphanumeric }}
    points_calculation: {{ points_per_char: 1 }}
"#
    );
    let rules = rules(&yaml);
    rules.validate().expect("weight is within the accepted range");

    let outcome = PointsEngine::new(&rules).score(&corner_market_receipt());
    assert_overflow_skipped(&outcome, 0);
    assert_eq!(outcome.total_points, 14);
}

#[test]
fn weights_past_i64_are_configuration_errors() {
    let yaml = r#"
rules:
  - name: too_big
    input_check: { type: character_count, target_field: retailer, condition: alphanumeric }
    points_calculation: { points_per_char: 9223372036854775807 }
"#;
    assert!(rules(yaml).validate().is_err());
    assert_eq!(
        skipped_category(yaml, &corner_market_receipt()),
        ErrorCategory::Configuration
    );
}

#[test]
fn largest_points_per_group_is_skipped_on_overflow() {
    let yaml = format!(
        r#"
rules:
  - name: huge_pairs
    input_check: {{ type: items_count, target_field: items, condition: group_size, input_value: 2 }}
    points_calculation: {{ points_per_group: {LARGEST_WEIGHT} }}
  - name: pairs
    input_check: {{ type: items_count, target_field: items, condition: group_size, input_value: 2 }}
    points_calculation: {{ points_per_group: 5 }}
"#
    );
    let outcome = engine(&yaml).score(&corner_market_receipt());
    assert_overflow_skipped(&outcome, 0);
    assert_eq!(outcome.total_points, 10);
}

#[test]
fn largest_price_multiplier_sum_is_skipped_on_overflow() {
    let yaml = r#"
rules:
  - name: huge_description
    input_check: { type: item_description, target_field: items, condition: divisible, input_value: 3 }
    points_calculation: { price_multiplier: 1.0e18 }
  - name: retailer
    input_check: { type: character_count, target_field: retailer, condition: alphanumeric }
    points_calculation: { points_per_char: 1 }
"#;
    // Pizza and Klarbrunn qualify: 12.25e18 alone is already past i64.
    let outcome = engine(yaml).score(&target_receipt());
    assert_overflow_skipped(&outcome, 0);
    assert_eq!(outcome.total_points, 6);
}

#[test]
fn running_total_overflow_skips_only_the_rule_that_overflows() {
    let yaml = format!(
        r#"
rules:
  - name: retailer
    input_check: {{ type: character_count, target_field: retailer, condition: alphanumeric }}
    points_calculation: {{ points_per_char: 1 }}
  - name: first_odd_day
    input_check: {{ type: date_check, target_field: purchaseDate, condition: parity, parity: odd }}
    points_calculation: {{ extra_points: {LARGEST_WEIGHT} }}
  - name: second_odd_day
    input_check: {{ type: date_check, target_field: purchaseDate, condition: parity, parity: odd }}
    points_calculation: {{ extra_points: 5000000000000000000 }}
  - name: pairs
    input_check: {{ type: items_count, target_field: items, condition: group_size, input_value: 2 }}
    points_calculation: {{ points_per_group: 5 }}
"#
    );
    let rules = rules(&yaml);
    rules.validate().expect("each rule is valid on its own");

    let outcome = PointsEngine::new(&rules).score(&target_receipt());
    assert!(outcome.evaluations[1].is_applied());
    assert_overflow_skipped(&outcome, 2);
    assert!(outcome.evaluations[3].is_applied());
    assert_eq!(outcome.total_points, LARGEST_WEIGHT + 6 + 10);
    assert_eq!(outcome.evaluations[3].running_total, outcome.total_points);
}
