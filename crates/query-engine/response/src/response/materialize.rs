//! Turning a raw search response into the caller's result shape.
//!
//! Translation compiles a query into a [`Materializer`] alongside the
//! request. Once the response arrives, [`materialize`] replays it: rows
//! come either from hits or from facets, each row is projected, and a
//! final transform reduces the row list to the returned value.

use serde_json::json;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;

use crate::response::model::{Hit, SearchResponse};

/// Extracts one value of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Projector {
    /// The whole source document.
    Source,
    /// One stored field, by mapped name.
    Field(SmolStr),
    /// The hit's relevance score.
    Score,
    /// The hit's document id.
    Id,
    /// A constant folded out of the query at translation time.
    Literal(serde_json::Value),
    /// The grouping term the row was built from.
    GroupKey,
    /// A statistic read from a named facet.
    Aggregate { facet: SmolStr, stat: StatKey },
    /// An object built from named sub-projections.
    Record(Vec<(SmolStr, Projector)>),
}

/// Statistic keys as facet bodies spell them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKey {
    Min,
    Max,
    Total,
    Mean,
    Count,
}

impl StatKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StatKey::Min => "min",
            StatKey::Max => "max",
            StatKey::Total => "total",
            StatKey::Mean => "mean",
            StatKey::Count => "count",
        }
    }
}

/// Reduces the projected row list to the final returned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalTransform {
    #[default]
    Identity,
    First {
        or_default: bool,
    },
    Single {
        or_default: bool,
    },
}

/// Where result rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One row synthesized from termless facet bodies.
    Single,
    /// One row per distinct term across the terms facets, in order of
    /// first appearance.
    ByTerms,
}

/// The compiled read-back plan for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Materializer {
    /// The query only wants the match count.
    Count,
    /// Rows come from hits.
    Hits {
        projector: Projector,
        transform: FinalTransform,
    },
    /// Rows come from facets.
    Facets {
        grouping: Grouping,
        projector: Projector,
        transform: FinalTransform,
    },
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("query produced no results")]
    EmptyResult,
    #[error("query produced more than one result")]
    MultipleResults,
    #[error("response has no facet named {name:?}")]
    MissingFacet { name: String },
}

pub fn materialize(
    materializer: &Materializer,
    response: &SearchResponse,
) -> Result<serde_json::Value, MaterializeError> {
    debug!(
        total = response.hits.total,
        "materializing search response"
    );
    match materializer {
        Materializer::Count => Ok(json!(response.hits.total)),
        Materializer::Hits {
            projector,
            transform,
        } => {
            let rows = response
                .hits
                .hits
                .iter()
                .map(|hit| project_hit(projector, hit))
                .collect();
            apply_transform(*transform, rows)
        }
        Materializer::Facets {
            grouping,
            projector,
            transform,
        } => {
            let empty = serde_json::Map::new();
            let facets = response.facets.as_ref().unwrap_or(&empty);
            let rows = match grouping {
                Grouping::Single => vec![project_group(projector, &serde_json::Value::Null, facets)?],
                Grouping::ByTerms => distinct_terms(facets)
                    .iter()
                    .map(|key| project_group(projector, key, facets))
                    .collect::<Result<_, _>>()?,
            };
            apply_transform(*transform, rows)
        }
    }
}

fn apply_transform(
    transform: FinalTransform,
    rows: Vec<serde_json::Value>,
) -> Result<serde_json::Value, MaterializeError> {
    match transform {
        FinalTransform::Identity => Ok(serde_json::Value::Array(rows)),
        FinalTransform::First { or_default } => take_first(rows, or_default),
        FinalTransform::Single { or_default } => {
            if rows.len() > 1 {
                return Err(MaterializeError::MultipleResults);
            }
            take_first(rows, or_default)
        }
    }
}

fn take_first(
    rows: Vec<serde_json::Value>,
    or_default: bool,
) -> Result<serde_json::Value, MaterializeError> {
    match rows.into_iter().next() {
        Some(row) => Ok(row),
        None if or_default => Ok(serde_json::Value::Null),
        None => Err(MaterializeError::EmptyResult),
    }
}

/// Project one hit row. Absent values come back as null rather than
/// failing, matching default-value semantics on the query side.
fn project_hit(projector: &Projector, hit: &Hit) -> serde_json::Value {
    match projector {
        Projector::Source => hit.source.clone().unwrap_or(serde_json::Value::Null),
        Projector::Field(name) => hit.field(name).unwrap_or(serde_json::Value::Null),
        Projector::Score => hit.score.map_or(serde_json::Value::Null, |score| json!(score)),
        Projector::Id => json!(hit.id),
        Projector::Literal(value) => value.clone(),
        Projector::GroupKey | Projector::Aggregate { .. } => serde_json::Value::Null,
        Projector::Record(members) => {
            let mut object = serde_json::Map::new();
            for (name, member) in members {
                object.insert(name.to_string(), project_hit(member, hit));
            }
            serde_json::Value::Object(object)
        }
    }
}

/// Project one facet row. `key` is the grouping term, or null for the
/// termless single-row case.
fn project_group(
    projector: &Projector,
    key: &serde_json::Value,
    facets: &serde_json::Map<String, serde_json::Value>,
) -> Result<serde_json::Value, MaterializeError> {
    match projector {
        Projector::Literal(value) => Ok(value.clone()),
        Projector::GroupKey => Ok(key.clone()),
        Projector::Aggregate { facet, stat } => read_aggregate(facets, facet, *stat, key),
        Projector::Record(members) => {
            let mut object = serde_json::Map::new();
            for (name, member) in members {
                object.insert(name.to_string(), project_group(member, key, facets)?);
            }
            Ok(serde_json::Value::Object(object))
        }
        Projector::Source | Projector::Field(_) | Projector::Score | Projector::Id => {
            Ok(serde_json::Value::Null)
        }
    }
}

fn read_aggregate(
    facets: &serde_json::Map<String, serde_json::Value>,
    name: &str,
    stat: StatKey,
    key: &serde_json::Value,
) -> Result<serde_json::Value, MaterializeError> {
    let body = facets.get(name).ok_or_else(|| MaterializeError::MissingFacet {
        name: name.to_string(),
    })?;
    if key.is_null() {
        return Ok(body.get(stat.as_str()).cloned().unwrap_or(serde_json::Value::Null));
    }
    let bucket = body
        .get("terms")
        .and_then(serde_json::Value::as_array)
        .and_then(|buckets| buckets.iter().find(|bucket| bucket.get("term") == Some(key)));
    Ok(bucket
        .and_then(|bucket| bucket.get(stat.as_str()))
        .cloned()
        .unwrap_or(serde_json::Value::Null))
}

/// Distinct grouping terms, in order of first appearance across every
/// facet that carries term buckets.
fn distinct_terms(facets: &serde_json::Map<String, serde_json::Value>) -> Vec<serde_json::Value> {
    let mut terms = Vec::new();
    for body in facets.values() {
        if let Some(buckets) = body.get("terms").and_then(serde_json::Value::as_array) {
            for bucket in buckets {
                if let Some(term) = bucket.get("term") {
                    if !terms.contains(term) {
                        terms.push(term.clone());
                    }
                }
            }
        }
    }
    terms
}
