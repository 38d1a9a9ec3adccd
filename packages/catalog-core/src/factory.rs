//! Builds complete records out of whatever a client sent.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::record::{
    flag_field, href_for, text_field, ServiceSpecification, DEFAULT_LIFECYCLE_STATUS,
    DEFAULT_TYPE, DEFAULT_VERSION, KNOWN_FIELDS,
};
use crate::timestamp;

/// Id of the fixed record conformance suites look up.
pub const FIXTURE_ID: &str = "5ae4dc5f-8031-40f6-ab85-ca6912d8635c";
pub const FIXTURE_NAME: &str = "TestServiceName";
pub const FIXTURE_LAST_UPDATE: &str = "2025-07-01T00:00:00Z";

/// Build a record from partial `input`, stamped with the current time when the input
/// carries no `lastUpdate`.
pub fn build(input: &Map<String, Value>, base_url: &str) -> ServiceSpecification {
    build_at(input, base_url, Utc::now())
}

pub fn build_at(input: &Map<String, Value>, base_url: &str, now: DateTime<Utc>) -> ServiceSpecification {
    let id = text_field(input, "id").unwrap_or_else(|| Uuid::new_v4().to_string());

    let extra = input
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ServiceSpecification {
        kind: text_field(input, "@type").unwrap_or_else(|| DEFAULT_TYPE.into()),
        href: href_for(base_url, &id),
        name: text_field(input, "name").unwrap_or_else(|| format!("Default Service {}", id)),
        version: text_field(input, "version").unwrap_or_else(|| DEFAULT_VERSION.into()),
        lifecycle_status: text_field(input, "lifecycleStatus")
            .unwrap_or_else(|| DEFAULT_LIFECYCLE_STATUS.into()),
        is_bundle: flag_field(input, "isBundle").unwrap_or(false),
        last_update: text_field(input, "lastUpdate").unwrap_or_else(|| timestamp::format(now)),
        extra,
        id,
    }
}

/// The fixed record seeded at startup so conformance tooling finds a known entry.
pub fn fixture(base_url: &str) -> ServiceSpecification {
    let mut input = Map::new();
    input.insert("id".into(), Value::String(FIXTURE_ID.into()));
    input.insert("name".into(), Value::String(FIXTURE_NAME.into()));
    input.insert("lifecycleStatus".into(), Value::String("active".into()));
    input.insert("isBundle".into(), Value::Bool(true));
    input.insert("lastUpdate".into(), Value::String(FIXTURE_LAST_UPDATE.into()));
    build(&input, base_url)
}
