use serde_json::Value;
use std::cmp::Ordering;

use crate::repository::FieldFilter;

/// Field map of one document.
pub type Fields = serde_json::Map<String, Value>;

/// Build a field map from literal pairs.
#[must_use]
pub fn fields(pairs: &[(&str, Value)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// One document as returned by the store: its id within the parent
/// collection plus a JSON field map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    id: String,
    fields: Fields,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn u32_field(&self, name: &str) -> Option<u32> {
        self.fields
            .get(name)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// String items of an array field; missing or non-array fields read as
    /// empty, non-string items are skipped.
    #[must_use]
    pub fn str_list_field(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True when every filter field equals the filtered value.
    #[must_use]
    pub fn matches(&self, filters: &[FieldFilter]) -> bool {
        filters
            .iter()
            .all(|f| self.fields.get(f.field.as_str()) == Some(&f.value))
    }
}

/// Merge `patch` into `base`, overwriting only the keys the patch names.
pub fn merge_fields(base: &mut Fields, patch: &Fields) {
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
}

/// Sort documents by an optional ordering field.
///
/// Documents missing the field sort last; ties keep the incoming (id) order.
/// With no field the incoming order stands, mirroring the backend's
/// unordered fallback.
pub fn sort_documents(docs: &mut [Document], order_by: Option<&str>) {
    let Some(field) = order_by else { return };
    docs.sort_by(|a, b| compare_values(a.fields.get(field), b.fields.get(field)));
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}
