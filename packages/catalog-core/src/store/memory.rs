use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ensure_unique_id, unique_name, SpecStore, StoreError};
use crate::record::ServiceSpecification;
use crate::timestamp;

/// Process-local store. Records live in insertion order and are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ServiceSpecification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpecStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<ServiceSpecification>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }

    async fn insert(&self, mut spec: ServiceSpecification) -> Result<ServiceSpecification, StoreError> {
        let mut records = self.records.write().await;
        let now = Utc::now();

        let id_taken = records.iter().any(|r| r.id == spec.id);
        if ensure_unique_id(&mut spec, id_taken) {
            debug!(id = %spec.id, "Requested id already stored, assigned a new one");
        }

        let taken: HashSet<String> = records.iter().map(|r| r.name.to_lowercase()).collect();
        spec.name = unique_name(&spec.name, &taken, now);
        // Offset by collection size so back-to-back creates never share a stamp.
        spec.last_update = timestamp::offset_by_secs(now, records.len());

        debug!(id = %spec.id, name = %spec.name, "Inserting record");
        records.push(spec.clone());
        Ok(spec)
    }

    async fn seed(&self, spec: ServiceSpecification) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == spec.id) {
            return Ok(false);
        }
        records.push(spec);
        Ok(true)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ServiceSpecification>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn replace(&self, id: &str, spec: ServiceSpecification) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(slot) => {
                *slot = spec;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.iter().position(|r| r.id == id) {
            Some(index) => {
                records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
