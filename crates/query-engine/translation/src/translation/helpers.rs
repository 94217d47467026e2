//! Shared state threaded through translation.

use smol_str::SmolStr;

use query_engine_mapping::mapping::Mapping;
use query_engine_response::response::materialize::{FinalTransform, Projector};
use query_engine_search::search::ast::{Criteria, FieldName, SearchRequest, TypeName};

/// Static information for one translation: the mapping collaborator
/// and the logical document type the query chain terminates in.
pub struct Env<'request> {
    pub(crate) mapping: &'request dyn Mapping,
    pub(crate) doc_type: SmolStr,
}

impl<'request> Env<'request> {
    pub fn new(mapping: &'request dyn Mapping, doc_type: SmolStr) -> Self {
        Env { mapping, doc_type }
    }

    /// Resolve a member path to its stored field name.
    pub fn field(&self, path: &str) -> FieldName {
        self.mapping.field_name(&self.doc_type, path)
    }

    pub fn type_name(&self) -> TypeName {
        self.mapping.type_name(&self.doc_type)
    }

    pub fn default_criteria(&self) -> Option<Criteria> {
        self.mapping.default_criteria(&self.doc_type)
    }
}

/// Mutable accumulator changed throughout the translation process.
/// One per translation, never shared or reused.
#[derive(Debug, Default)]
pub struct State {
    /// The search request being accumulated.
    pub(crate) request: SearchRequest,
    /// How each result row is shaped, once a projection is seen.
    pub(crate) projector: Option<Projector>,
    /// Reduction applied to the final row list.
    pub(crate) transform: FinalTransform,
    /// Where result rows come from.
    pub(crate) rows: RowSource,
    filter_facets: FilterFacetIndex,
}

/// Where the materializer will read result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowSource {
    /// Ordinary hits.
    #[default]
    Hits,
    /// Only the hit total is wanted.
    Total,
    /// Facet bodies, one row per group when grouped.
    Facets { grouped: bool },
}

/// Used for generating positional names for predicate-count facets.
#[derive(Debug, Default)]
struct FilterFacetIndex(u64);

impl State {
    pub fn new() -> State {
        State::default()
    }

    /// Accumulate a skip. Successive skips add up, saturating at
    /// `u64::MAX` rather than overflowing.
    pub fn add_from(&mut self, count: u64) {
        self.request.from = Some(self.request.from.unwrap_or(0).saturating_add(count));
    }

    /// Accumulate a take. Successive takes keep the smallest.
    pub fn cap_size(&mut self, limit: u64) {
        self.request.size = Some(self.request.size.map_or(limit, |size| size.min(limit)));
    }

    /// Name a predicate-count facet. Names are positional so several
    /// predicate counts within one grouping stay distinguishable.
    pub fn make_filter_facet_name(&mut self) -> SmolStr {
        self.filter_facets.0 += 1;
        SmolStr::new(format!("GroupKey.{}", self.filter_facets.0))
    }
}
