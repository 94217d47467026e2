//! Deserialized shape of a search response.
//!
//! Only the pieces materialization reads are modelled; everything else
//! in the response (shard bookkeeping and the like) is ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: HitCollection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HitCollection {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Hit {
    /// Read one field from the hit: selected fields first, then the
    /// dotted path into `_source`. Selected field values arrive as
    /// single-element arrays and unwrap to the scalar inside.
    pub fn field(&self, name: &str) -> Option<serde_json::Value> {
        if let Some(value) = self.fields.get(name) {
            return Some(unwrap_field_value(value));
        }
        let mut current = self.source.as_ref()?;
        for segment in name.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }
}

fn unwrap_field_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(items) if items.len() == 1 => items[0].clone(),
        other => other.clone(),
    }
}
