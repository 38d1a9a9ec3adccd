use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use surrealdb::{Connection, Surreal};
use tracing::{debug, info, instrument};

use super::{ensure_unique_id, unique_name, SpecStore, StoreError};
use crate::record::ServiceSpecification;
use crate::timestamp;

/// Table holding one row per record.
pub const TABLE: &str = "service_specification";

/// SurrealDB-backed store.
///
/// Rows look like `{ app_id, body }`: `body` is the record as served and `app_id`
/// repeats its `id`, since SurrealDB reserves `id` for its own record ids. All
/// lookups go through `app_id`.
pub struct SurrealStore<C: Connection> {
    db: Arc<Surreal<C>>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Arc<Surreal<C>>) -> Self {
        Self { db }
    }

    /// Define the table and a unique index on `app_id`. Safe to run repeatedly.
    pub async fn prepare(&self) -> Result<(), StoreError> {
        self.db
            .query(format!(
                "DEFINE TABLE IF NOT EXISTS {0} SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS {0}_app_id ON TABLE {0} FIELDS app_id UNIQUE;",
                TABLE
            ))
            .await?;
        info!(table = TABLE, "Catalog table ready");
        Ok(())
    }

    async fn taken_names(&self, name: &str) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<Value> = self
            .db
            .query(format!(
                "SELECT VALUE string::lowercase(body.name) FROM {} \
                 WHERE string::starts_with(string::lowercase(body.name), $prefix)",
                TABLE
            ))
            .bind(("prefix", name.to_lowercase()))
            .await?
            .take(0)?;

        Ok(rows
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect())
    }

    async fn create_row(&self, spec: &ServiceSpecification) -> Result<(), StoreError> {
        let body = serde_json::to_value(spec)?;
        let _: Vec<Value> = self
            .db
            .query(format!("CREATE {} CONTENT $row", TABLE))
            .bind(("row", json!({ "app_id": spec.id, "body": body })))
            .await?
            .take(0)?;
        Ok(())
    }
}

fn decode(rows: Vec<Value>) -> Result<Vec<ServiceSpecification>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl<C: Connection> SpecStore for SurrealStore<C> {
    fn backend(&self) -> &'static str {
        "surreal"
    }

    async fn list(&self) -> Result<Vec<ServiceSpecification>, StoreError> {
        let rows: Vec<Value> = self
            .db
            .query(format!("SELECT VALUE body FROM {}", TABLE))
            .await?
            .take(0)?;
        decode(rows)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let rows: Vec<Value> = self
            .db
            .query(format!("SELECT count() AS total FROM {} GROUP ALL", TABLE))
            .await?
            .take(0)?;

        let total = rows
            .first()
            .and_then(|row| row["total"].as_u64())
            .unwrap_or(0);
        Ok(usize::try_from(total).unwrap_or(usize::MAX))
    }

    #[instrument(skip(self, spec), fields(id = %spec.id))]
    async fn insert(&self, mut spec: ServiceSpecification) -> Result<ServiceSpecification, StoreError> {
        let id_taken = self.find_by_id(&spec.id).await?.is_some();
        if ensure_unique_id(&mut spec, id_taken) {
            debug!(id = %spec.id, "Requested id already stored, assigned a new one");
        }

        let taken = self.taken_names(&spec.name).await?;
        let now = Utc::now();
        spec.name = unique_name(&spec.name, &taken, now);
        spec.last_update = timestamp::format(now);

        debug!(name = %spec.name, "Creating row");
        self.create_row(&spec).await?;
        Ok(spec)
    }

    async fn seed(&self, spec: ServiceSpecification) -> Result<bool, StoreError> {
        if self.find_by_id(&spec.id).await?.is_some() {
            return Ok(false);
        }
        self.create_row(&spec).await?;
        Ok(true)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ServiceSpecification>, StoreError> {
        let rows: Vec<Value> = self
            .db
            .query(format!(
                "SELECT VALUE body FROM {} WHERE app_id = $app_id LIMIT 1",
                TABLE
            ))
            .bind(("app_id", id.to_owned()))
            .await?
            .take(0)?;
        Ok(decode(rows)?.into_iter().next())
    }

    #[instrument(skip(self, spec))]
    async fn replace(&self, id: &str, spec: ServiceSpecification) -> Result<bool, StoreError> {
        let body = serde_json::to_value(&spec)?;
        let rows: Vec<Value> = self
            .db
            .query(format!(
                "UPDATE {} SET body = $body WHERE app_id = $app_id RETURN VALUE app_id",
                TABLE
            ))
            .bind(("body", body))
            .bind(("app_id", id.to_owned()))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let rows: Vec<Value> = self
            .db
            .query(format!(
                "DELETE {} WHERE app_id = $app_id RETURN BEFORE",
                TABLE
            ))
            .bind(("app_id", id.to_owned()))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }
}
