//! Equality filtering and field projection for list queries.

use serde_json::{Map, Value};

use crate::record::ServiceSpecification;

/// Query parameter carrying the projection list.
pub const FIELDS_PARAM: &str = "fields";

/// How a filter value is compared against a stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Matches when the stored boolean equals `value == "true"`.
    Flag,
    /// Case-insensitive string equality.
    Text,
    /// Exact equality against the compact JSON rendering of the stored value.
    Json,
}

impl FieldKind {
    /// Kind of a field the record declares, `None` for fields it only carries.
    pub fn declared(field: &str) -> Option<Self> {
        match field {
            "isBundle" => Some(Self::Flag),
            "@type" | "id" | "href" | "name" | "version" | "lifecycleStatus" | "lastUpdate" => {
                Some(Self::Text)
            }
            _ => None,
        }
    }

    /// Fallback for undeclared fields: take the kind from the stored value.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Flag,
            Value::String(_) => Self::Text,
            _ => Self::Json,
        }
    }

    pub fn matches(self, stored: &Value, wanted: &str) -> bool {
        match self {
            Self::Flag => stored.as_bool() == Some(wanted == "true"),
            Self::Text => stored
                .as_str()
                .is_some_and(|s| s.to_lowercase() == wanted.to_lowercase()),
            Self::Json => match stored {
                Value::Null => false,
                other => other.to_string() == wanted,
            },
        }
    }
}

/// Filters and projection parsed from a list request's query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    filters: Vec<(String, String)>,
    fields: Option<Vec<String>>,
}

impl QueryFilter {
    /// Split query parameters into equality filters and the `fields` projection.
    /// A repeated `fields` parameter keeps the last occurrence.
    pub fn from_params<I>(params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut filter = Self::default();
        for (key, value) in params {
            if key == FIELDS_PARAM {
                filter.fields = Some(parse_field_list(&value));
            } else {
                filter.filters.push((key, value));
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.fields.is_none()
    }

    /// Whether `record` satisfies every equality filter.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        self.filters.iter().all(|(key, wanted)| match record.get(key) {
            Some(stored) => FieldKind::declared(key)
                .unwrap_or_else(|| FieldKind::of_value(stored))
                .matches(stored, wanted),
            None => false,
        })
    }

    /// Reduce `record` to the selected fields, in selection order.
    pub fn project(&self, record: Map<String, Value>) -> Map<String, Value> {
        let Some(fields) = &self.fields else {
            return record;
        };

        let mut selected = Map::with_capacity(fields.len());
        for field in fields {
            if let Some(value) = record.get(field) {
                selected.insert(field.clone(), value.clone());
            }
        }
        selected
    }

    /// Filter then project, keeping the input order.
    pub fn apply(&self, records: &[ServiceSpecification]) -> Vec<Value> {
        records
            .iter()
            .map(ServiceSpecification::to_map)
            .filter(|record| self.matches(record))
            .map(|record| Value::Object(self.project(record)))
            .collect()
    }
}

fn parse_field_list(raw: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_owned());
        }
    }
    fields
}
