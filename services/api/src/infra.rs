use metrics_exporter_prometheus::PrometheusHandle;
use receipt_points::receipts::{
    ReceiptId, ReceiptRecord, ReceiptRepository, RepositoryError, RuleSet, RuleStore,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReceiptRepository {
    records: Arc<Mutex<HashMap<ReceiptId, ReceiptRecord>>>,
}

impl ReceiptRepository for InMemoryReceiptRepository {
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

/// Active rules held in process memory; replaced wholesale on upload.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRuleStore {
    rules: Arc<Mutex<RuleSet>>,
}

impl InMemoryRuleStore {
    pub(crate) fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(Mutex::new(rules)),
        }
    }
}

impl RuleStore for InMemoryRuleStore {
    fn load(&self) -> Result<RuleSet, RepositoryError> {
        Ok(self.rules.lock().expect("rule store mutex poisoned").clone())
    }

    fn replace(&self, rules: RuleSet) -> Result<(), RepositoryError> {
        *self.rules.lock().expect("rule store mutex poisoned") = rules;
        Ok(())
    }
}
