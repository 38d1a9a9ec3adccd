//! Persistence boundary for catalog records.
//!
//! Both stores share one insert contract: names are unique case-insensitively at
//! creation time and the record is stamped on the way in. Updates go through
//! [`SpecStore::replace`] and are not checked for name collisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::record::ServiceSpecification;

pub mod memory;
pub mod surreal;

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Backend(#[from] surrealdb::Error),

    #[error("stored record could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

#[async_trait]
pub trait SpecStore: Send + Sync {
    /// Short label for logs and health output.
    fn backend(&self) -> &'static str;

    /// All records in store order.
    async fn list(&self) -> Result<Vec<ServiceSpecification>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Admit a new record: swap a client id that is already stored for a fresh one,
    /// disambiguate its name, stamp `lastUpdate`, store it and
    /// return what was stored.
    async fn insert(&self, spec: ServiceSpecification) -> Result<ServiceSpecification, StoreError>;

    /// Store `spec` as-is unless a record with its id already exists.
    /// Returns whether it was written.
    async fn seed(&self, spec: ServiceSpecification) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ServiceSpecification>, StoreError>;

    /// Overwrite the record stored under `id`. Returns `false` if there is none.
    async fn replace(&self, id: &str, spec: ServiceSpecification) -> Result<bool, StoreError>;

    /// Returns `false` if there was nothing to remove.
    async fn remove(&self, id: &str) -> Result<bool, StoreError>;
}

/// Give `spec` a fresh UUID v4 (and matching `href`) when its id is already stored.
/// Returns whether the id changed.
pub fn ensure_unique_id(spec: &mut ServiceSpecification, id_taken: bool) -> bool {
    if !id_taken {
        return false;
    }
    spec.reassign_id(Uuid::new_v4().to_string());
    true
}

/// Pick a name for a new record given the lowercased names already taken.
///
/// A taken name gets a `-<epoch millis>` suffix; the millis are bumped until the
/// result is free as well.
pub fn unique_name(name: &str, taken: &HashSet<String>, now: DateTime<Utc>) -> String {
    if !taken.contains(&name.to_lowercase()) {
        return name.to_owned();
    }

    let mut millis = now.timestamp_millis();
    loop {
        let candidate = format!("{}-{}", name, millis);
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        millis += 1;
    }
}
