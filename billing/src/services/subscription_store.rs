use panelhub_models::billing::SubscriptionRecord;
use panelhub_observability::log_store;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::ServiceError;

const COLLECTION: &str = "subscriptions";

/// Storage boundary for subscription records.
pub trait SubscriptionRepository: Send + Sync {
    fn insert(&self, record: SubscriptionRecord) -> Result<SubscriptionRecord, ServiceError>;

    fn get(&self, id: Uuid) -> Result<SubscriptionRecord, ServiceError>;

    /// Newest first.
    fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<SubscriptionRecord>, ServiceError>;

    /// Replaces the stored record with the same id.
    fn update(&self, record: SubscriptionRecord) -> Result<SubscriptionRecord, ServiceError>;

    fn delete(&self, id: Uuid) -> Result<SubscriptionRecord, ServiceError>;
}

#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    records: RwLock<HashMap<Uuid, SubscriptionRecord>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("subscription {} not found", id))
}

impl SubscriptionRepository for InMemorySubscriptionRepository {
    fn insert(&self, record: SubscriptionRecord) -> Result<SubscriptionRecord, ServiceError> {
        log_store!("insert", COLLECTION, record.id);
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(ServiceError::Conflict(format!("subscription {} already exists", record.id)));
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    fn get(&self, id: Uuid) -> Result<SubscriptionRecord, ServiceError> {
        log_store!("get", COLLECTION, id);
        self.records.read().get(&id).cloned().ok_or_else(|| not_found(id))
    }

    fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<SubscriptionRecord>, ServiceError> {
        log_store!("list", COLLECTION);
        let mut records: Vec<SubscriptionRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    fn update(&self, record: SubscriptionRecord) -> Result<SubscriptionRecord, ServiceError> {
        log_store!("update", COLLECTION, record.id);
        let mut records = self.records.write();
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(not_found(record.id)),
        }
    }

    fn delete(&self, id: Uuid) -> Result<SubscriptionRecord, ServiceError> {
        log_store!("delete", COLLECTION, id);
        self.records.write().remove(&id).ok_or_else(|| not_found(id))
    }
}
