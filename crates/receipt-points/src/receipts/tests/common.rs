use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::receipts::domain::{Item, Receipt, ReceiptId};
use crate::receipts::points::{PointsEngine, RuleSet};
use crate::receipts::repository::{ReceiptRecord, ReceiptRepository, RepositoryError, RuleStore};
use crate::receipts::{receipt_router, ReceiptService};

pub(super) const STANDARD_RULES: &str = r#"
rules:
  - name: retailer_name_points
    input_check:
      type: character_count
      target_field: retailer
      condition: alphanumeric
    points_calculation:
      points_per_char: 1
  - name: round_dollar_total
    input_check:
      type: cents_check
      target_field: total
      condition: matches
      input_value: 0.00
    points_calculation:
      extra_points: 50
  - name: quarter_multiple_total
    input_check:
      type: total_check
      target_field: total
      condition: divisible
      input_value: 0.25
    points_calculation:
      extra_points: 25
  - name: item_pairs
    input_check:
      type: items_count
      target_field: items
      condition: group_size
      input_value: 2
    points_calculation:
      points_per_group: 5
  - name: item_description_length
    input_check:
      type: item_description
      target_field: items
      condition: divisible
      input_value: 3
    points_calculation:
      price_multiplier: 0.2
      rounding:
        method: up
        precision: 0
  - name: odd_purchase_day
    input_check:
      type: date_check
      target_field: purchaseDate
      condition: parity
      parity: odd
    points_calculation:
      extra_points: 6
  - name: afternoon_purchase
    input_check:
      type: time_check
      target_field: purchaseTime
      condition: between
      input_range:
        start: "14:00"
        end: "16:00"
    points_calculation:
      extra_points: 10
"#;

pub(super) fn standard_rules() -> RuleSet {
    RuleSet::from_yaml_str(STANDARD_RULES).expect("standard rules decode")
}

pub(super) fn rules(yaml: &str) -> RuleSet {
    RuleSet::from_yaml_str(yaml).expect("rules decode")
}

pub(super) fn engine(yaml: &str) -> PointsEngine {
    PointsEngine::new(&rules(yaml))
}

pub(super) fn target_receipt() -> Receipt {
    Receipt {
        retailer: "Target".to_string(),
        purchase_date: "2022-01-01".to_string(),
        purchase_time: "13:01".to_string(),
        items: vec![
            Item::new("Mountain Dew 12PK", "6.49"),
            Item::new("Emils Cheese Pizza", "12.25"),
            Item::new("Knorr Creamy Chicken", "1.26"),
            Item::new("Doritos Nacho Cheese", "3.35"),
            Item::new("   Klarbrunn 12-PK 12 FL OZ  ", "12.00"),
        ],
        total: "35.35".to_string(),
    }
}

pub(super) fn corner_market_receipt() -> Receipt {
    Receipt {
        retailer: "M&M Corner Market".to_string(),
        purchase_date: "2022-03-20".to_string(),
        purchase_time: "14:33".to_string(),
        items: vec![Item::new("Gatorade", "2.25"); 4],
        total: "9.00".to_string(),
    }
}

pub(super) fn receipt_json(receipt: &Receipt) -> Vec<u8> {
    serde_json::to_vec(receipt).expect("receipt serializes")
}

#[derive(Default, Clone)]
pub(super) struct MemoryReceipts {
    pub(super) records: Arc<Mutex<HashMap<ReceiptId, ReceiptRecord>>>,
}

impl ReceiptRepository for MemoryReceipts {
    fn insert(&self, record: ReceiptRecord) -> Result<ReceiptRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ReceiptId) -> Result<Option<ReceiptRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRules {
    pub(super) rules: Arc<Mutex<RuleSet>>,
}

impl MemoryRules {
    pub(super) fn with(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(Mutex::new(rules)),
        }
    }
}

impl RuleStore for MemoryRules {
    fn load(&self) -> Result<RuleSet, RepositoryError> {
        Ok(self.rules.lock().expect("rules mutex poisoned").clone())
    }

    fn replace(&self, rules: RuleSet) -> Result<(), RepositoryError> {
        *self.rules.lock().expect("rules mutex poisoned") = rules;
        Ok(())
    }
}

pub(super) struct UnavailableReceipts;

impl ReceiptRepository for UnavailableReceipts {
    fn insert(&self, _record: ReceiptRecord) -> Result<ReceiptRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ReceiptId) -> Result<Option<ReceiptRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    ReceiptService<MemoryReceipts, MemoryRules>,
    Arc<MemoryReceipts>,
    Arc<MemoryRules>,
) {
    let receipts = Arc::new(MemoryReceipts::default());
    let rules = Arc::new(MemoryRules::with(standard_rules()));
    let service = ReceiptService::new(receipts.clone(), rules.clone());
    (service, receipts, rules)
}

pub(super) fn router_with_service(
    service: ReceiptService<MemoryReceipts, MemoryRules>,
) -> axum::Router {
    receipt_router(Arc::new(service))
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = read_body(response).await;
    serde_json::from_slice(&body).expect("json payload")
}
