use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::timestamp;

/// Mount point of the catalog API.
pub const BASE_PATH: &str = "/tmf-api/serviceCatalogManagement/v4";
/// Collection path below [`BASE_PATH`].
pub const RESOURCE_PATH: &str = "/serviceSpecification";

pub const DEFAULT_TYPE: &str = "ServiceSpecification";
pub const DEFAULT_VERSION: &str = "1.0";
pub const DEFAULT_LIFECYCLE_STATUS: &str = "active";

/// JSON names of the fields every record carries, in output order.
pub const KNOWN_FIELDS: [&str; 8] = [
    "@type",
    "id",
    "href",
    "name",
    "version",
    "lifecycleStatus",
    "isBundle",
    "lastUpdate",
];

/// A catalog entry. Fields the catalog does not know about are kept in `extra`
/// and rendered after the known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpecification {
    #[serde(rename = "@type")]
    pub kind: String,
    pub id: String,
    pub href: String,
    pub name: String,
    pub version: String,
    pub lifecycle_status: String,
    pub is_bundle: bool,
    pub last_update: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Self link of the record with the given id, served from `base_url`.
pub fn href_for(base_url: &str, id: &str) -> String {
    format!(
        "{}{}{}/{}",
        base_url.trim_end_matches('/'),
        BASE_PATH,
        RESOURCE_PATH,
        id
    )
}

/// Non-empty string value of `key`. Empty strings, `null` and other types count as absent.
pub(crate) fn text_field(input: &Map<String, Value>, key: &str) -> Option<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

pub(crate) fn flag_field(input: &Map<String, Value>, key: &str) -> Option<bool> {
    input.get(key).and_then(Value::as_bool)
}

impl ServiceSpecification {
    /// Move the record to `new_id`, keeping the base URL its `href` was built with.
    pub fn reassign_id(&mut self, new_id: String) {
        let suffix = format!("{}{}/{}", BASE_PATH, RESOURCE_PATH, self.id);
        let base_url = self
            .href
            .strip_suffix(&suffix)
            .unwrap_or_default()
            .to_owned();
        self.href = href_for(&base_url, &new_id);
        self.id = new_id;
    }

    /// JSON object view with known fields first, in declaration order.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::with_capacity(KNOWN_FIELDS.len() + self.extra.len());
        map.insert("@type".into(), Value::String(self.kind.clone()));
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert("href".into(), Value::String(self.href.clone()));
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("version".into(), Value::String(self.version.clone()));
        map.insert(
            "lifecycleStatus".into(),
            Value::String(self.lifecycle_status.clone()),
        );
        map.insert("isBundle".into(), Value::Bool(self.is_bundle));
        map.insert("lastUpdate".into(), Value::String(self.last_update.clone()));
        for (key, value) in &self.extra {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }

    /// Shallow-merge `patch` over this record.
    ///
    /// `id`, `href` and `lastUpdate` are never taken from the patch. Clearing `@type`,
    /// `lifecycleStatus` or `isBundle` restores the default; `name` and `version` only
    /// change when given a string. Afterwards `lastUpdate` is restamped and `href`
    /// rebuilt from `base_url`.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>, base_url: &str, now: DateTime<Utc>) {
        for (key, value) in patch {
            match key.as_str() {
                "id" | "href" | "lastUpdate" => {}
                "@type" => {
                    self.kind = text_field(patch, key).unwrap_or_else(|| DEFAULT_TYPE.into());
                }
                "lifecycleStatus" => {
                    self.lifecycle_status = text_field(patch, key)
                        .unwrap_or_else(|| DEFAULT_LIFECYCLE_STATUS.into());
                }
                "isBundle" => self.is_bundle = value.as_bool().unwrap_or(false),
                "name" => {
                    if let Some(name) = value.as_str() {
                        self.name = name.to_owned();
                    }
                }
                "version" => {
                    if let Some(version) = value.as_str() {
                        self.version = version.to_owned();
                    }
                }
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }

        self.last_update = timestamp::next_after(&self.last_update, now);
        self.href = href_for(base_url, &self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> ServiceSpecification {
        ServiceSpecification {
            kind: DEFAULT_TYPE.into(),
            id: "abc".into(),
            href: href_for("http://localhost:3000", "abc"),
            name: "Alpha".into(),
            version: "1.0".into(),
            lifecycle_status: "active".into(),
            is_bundle: true,
            last_update: "2025-07-01T00:00:00.000Z".into(),
            extra: Map::new(),
        }
    }

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reassign_id_rebuilds_href() {
        let mut spec = sample();
        spec.reassign_id("xyz".into());
        assert_eq!(spec.id, "xyz");
        assert_eq!(spec.href, href_for("http://localhost:3000", "xyz"));
    }

    #[test]
    fn test_href_for_trims_trailing_slash() {
        assert_eq!(
            href_for("http://example.com/", "42"),
            "http://example.com/tmf-api/serviceCatalogManagement/v4/serviceSpecification/42"
        );
    }

    #[test]
    fn test_serialized_field_order() {
        let mut spec = sample();
        spec.extra.insert("description".into(), json!("first"));
        let rendered = serde_json::to_value(&spec).unwrap();
        let keys: Vec<&str> = rendered.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "@type",
                "id",
                "href",
                "name",
                "version",
                "lifecycleStatus",
                "isBundle",
                "lastUpdate",
                "description"
            ]
        );
        assert_eq!(Value::Object(spec.to_map()), rendered);
    }

    #[test]
    fn test_deserialize_collects_extra_fields() {
        let spec: ServiceSpecification = serde_json::from_value(json!({
            "@type": "ServiceSpecification",
            "id": "abc",
            "href": "http://x/abc",
            "name": "Alpha",
            "version": "1.0",
            "lifecycleStatus": "active",
            "isBundle": false,
            "lastUpdate": "2025-07-01T00:00:00.000Z",
            "category": "network"
        }))
        .unwrap();
        assert_eq!(spec.extra.get("category"), Some(&json!("network")));
    }

    #[test]
    fn test_patch_changes_only_given_fields() {
        let mut spec = sample();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        spec.apply_patch(&patch(json!({"name": "Beta"})), "http://localhost:3000", now);

        assert_eq!(spec.name, "Beta");
        assert!(spec.is_bundle);
        assert_eq!(spec.version, "1.0");
        assert_eq!(spec.last_update, "2025-08-01T00:00:00.000Z");
    }

    #[test]
    fn test_patch_ignores_id_and_href() {
        let mut spec = sample();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        spec.apply_patch(
            &patch(json!({"id": "other", "href": "http://evil/other", "lastUpdate": "1999-01-01T00:00:00Z"})),
            "http://catalog.test",
            now,
        );

        assert_eq!(spec.id, "abc");
        assert_eq!(spec.href, href_for("http://catalog.test", "abc"));
        assert_eq!(spec.last_update, "2025-08-01T00:00:00.000Z");
    }

    #[test]
    fn test_patch_reasserts_cleared_defaults() {
        let mut spec = sample();
        spec.kind = "CustomSpec".into();
        spec.lifecycle_status = "retired".into();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        spec.apply_patch(
            &patch(json!({"@type": null, "lifecycleStatus": "", "isBundle": null, "name": null})),
            "http://localhost:3000",
            now,
        );

        assert_eq!(spec.kind, DEFAULT_TYPE);
        assert_eq!(spec.lifecycle_status, DEFAULT_LIFECYCLE_STATUS);
        assert!(!spec.is_bundle);
        assert_eq!(spec.name, "Alpha");
    }

    #[test]
    fn test_patch_overwrites_extra_fields_verbatim() {
        let mut spec = sample();
        spec.extra.insert("description".into(), json!("old"));
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        spec.apply_patch(
            &patch(json!({"description": null, "category": {"tier": 1}})),
            "http://localhost:3000",
            now,
        );

        assert_eq!(spec.extra.get("description"), Some(&Value::Null));
        assert_eq!(spec.extra.get("category"), Some(&json!({"tier": 1})));
    }

    #[test]
    fn test_patch_stamp_strictly_increases() {
        let mut spec = sample();
        spec.last_update = "2030-01-01T00:00:00.000Z".into();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        spec.apply_patch(&Map::new(), "http://localhost:3000", now);
        assert_eq!(spec.last_update, "2030-01-01T00:00:00.001Z");
    }
}
