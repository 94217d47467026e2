//! Type definitions for the search request abstract syntax tree.
//!
//! A [`SearchRequest`] is a mutable accumulator while translation runs
//! and an immutable value afterwards. Everything here is backend shaped:
//! field names are the store's names, criteria are the store's filter
//! algebra, facets are the store's aggregation requests.

use std::fmt;
use std::time::Duration;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use query_engine_expr::expr::value::Value;

/// The name of a field as the store knows it, after mapping.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct FieldName(pub SmolStr);

impl FieldName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        FieldName(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        FieldName(name.into())
    }
}

/// The name of a document type as the store knows it, after mapping.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TypeName(pub SmolStr);

impl TypeName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        TypeName(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName(name.into())
    }
}

/// Execution hint on a terms filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsExecutionMode {
    Plain,
    Bool,
    And,
    Or,
}

impl TermsExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TermsExecutionMode::Plain => "plain",
            TermsExecutionMode::Bool => "bool",
            TermsExecutionMode::And => "and",
            TermsExecutionMode::Or => "or",
        }
    }
}

/// One bound of a range criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeComparison {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl RangeComparison {
    /// The wire-level key inside a range body.
    pub fn as_str(self) -> &'static str {
        match self {
            RangeComparison::GreaterThan => "gt",
            RangeComparison::GreaterThanOrEqual => "gte",
            RangeComparison::LessThan => "lt",
            RangeComparison::LessThanOrEqual => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeConstraint {
    pub comparison: RangeComparison,
    pub value: Value,
}

/// The boolean filter algebra of the store.
///
/// Values are immutable and structurally comparable. Conjunctions and
/// disjunctions never hold zero children; building them through
/// [`crate::search::helpers`] maintains that along with flattening,
/// singleton collapse and range merging.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Term {
        field: FieldName,
        value: Value,
    },
    Terms {
        field: FieldName,
        values: Vec<Value>,
        execution: Option<TermsExecutionMode>,
    },
    Range {
        field: FieldName,
        constraints: Vec<RangeConstraint>,
    },
    Regexp {
        field: FieldName,
        pattern: SmolStr,
    },
    Prefix {
        field: FieldName,
        prefix: SmolStr,
    },
    Exists {
        field: FieldName,
    },
    Missing {
        field: FieldName,
    },
    And {
        criteria: Vec<Criteria>,
    },
    Or {
        criteria: Vec<Criteria>,
    },
    Not {
        criteria: Box<Criteria>,
    },
    MatchAll,
    /// Query-context composite; produced by rewriting `And`/`Or`/`Not`
    /// when criteria land in the scored slot of a request.
    Bool {
        must: Vec<Criteria>,
        should: Vec<Criteria>,
        must_not: Vec<Criteria>,
    },
    /// Full-text query string search.
    QueryString {
        query: SmolStr,
        fields: Vec<FieldName>,
    },
}

impl Criteria {
    /// The wire-level key this criteria renders under.
    pub fn name(&self) -> &'static str {
        match self {
            Criteria::Term { .. } => "term",
            Criteria::Terms { .. } => "terms",
            Criteria::Range { .. } => "range",
            Criteria::Regexp { .. } => "regexp",
            Criteria::Prefix { .. } => "prefix",
            Criteria::Exists { .. } => "exists",
            Criteria::Missing { .. } => "missing",
            Criteria::And { .. } => "and",
            Criteria::Or { .. } => "or",
            Criteria::Not { .. } => "not",
            Criteria::MatchAll => "match_all",
            Criteria::Bool { .. } => "bool",
            Criteria::QueryString { .. } => "query_string",
        }
    }
}

/// An aggregation request, keyed by name in the request and the response.
///
/// The optional `filter` on the value-bearing kinds renders as
/// `facet_filter`, scoping the facet to the request's filter criteria.
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    /// Numeric statistics over one field, across all matching documents.
    Statistical {
        name: SmolStr,
        field: FieldName,
        filter: Option<Criteria>,
    },
    /// A bare document count under a criteria.
    Filter { name: SmolStr, filter: Criteria },
    /// Distinct terms of a field with per-term counts.
    Terms {
        name: SmolStr,
        field: FieldName,
        size: Option<u64>,
        filter: Option<Criteria>,
    },
    /// Numeric statistics over a value field, bucketed by a key field.
    TermsStats {
        name: SmolStr,
        key_field: FieldName,
        value_field: FieldName,
        size: Option<u64>,
        filter: Option<Criteria>,
    },
}

impl Facet {
    pub fn name(&self) -> &SmolStr {
        match self {
            Facet::Statistical { name, .. }
            | Facet::Filter { name, .. }
            | Facet::Terms { name, .. }
            | Facet::TermsStats { name, .. } => name,
        }
    }
}

/// One sort entry, in order of application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOption {
    pub field: FieldName,
    pub ascending: bool,
    /// Sort documents missing the field instead of failing; set for
    /// optional fields.
    pub ignore_unmapped: bool,
}

impl SortOption {
    pub fn ascending(field: impl Into<FieldName>) -> Self {
        SortOption {
            field: field.into(),
            ascending: true,
            ignore_unmapped: false,
        }
    }

    pub fn descending(field: impl Into<FieldName>) -> Self {
        SortOption {
            field: field.into(),
            ascending: false,
            ignore_unmapped: false,
        }
    }
}

/// Server-side execution mode, carried in the URI rather than the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Hit content is not needed; only counts and facets come back.
    Count,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Count => "count",
        }
    }
}

/// A complete search request against one document type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchRequest {
    pub doc_type: TypeName,
    /// Criteria that contribute to relevance scoring.
    pub query: Option<Criteria>,
    /// Criteria that restrict results without scoring.
    pub filter: Option<Criteria>,
    pub sort: Vec<SortOption>,
    /// Fields to fetch instead of the whole source document. Empty means
    /// the whole document.
    pub fields: IndexSet<FieldName>,
    pub facets: Vec<Facet>,
    pub from: Option<u64>,
    pub size: Option<u64>,
    pub search_type: Option<SearchType>,
    pub timeout: Option<Duration>,
}
