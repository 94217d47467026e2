//! Helpers for building criteria in certain shapes and patterns.
//!
//! All composite criteria go through these constructors so the structural
//! laws hold everywhere: conjunctions and disjunctions are flat, never
//! empty, never singletons, and a double negation is no negation at all.

use smol_str::SmolStr;

use query_engine_expr::expr::value::Value;

use crate::search::ast::{
    Criteria, Facet, FieldName, RangeComparison, RangeConstraint, TermsExecutionMode,
};

/// An exact term match.
pub fn term(field: impl Into<FieldName>, value: impl Into<Value>) -> Criteria {
    Criteria::Term {
        field: field.into(),
        value: value.into(),
    }
}

/// A match against any of several values.
pub fn terms(field: impl Into<FieldName>, values: Vec<Value>) -> Criteria {
    Criteria::Terms {
        field: field.into(),
        values,
        execution: None,
    }
}

/// A match against several values with an explicit execution mode.
pub fn terms_with_execution(
    field: impl Into<FieldName>,
    values: Vec<Value>,
    execution: TermsExecutionMode,
) -> Criteria {
    Criteria::Terms {
        field: field.into(),
        values,
        execution: Some(execution),
    }
}

/// A single-bound range.
pub fn range(
    field: impl Into<FieldName>,
    comparison: RangeComparison,
    value: impl Into<Value>,
) -> Criteria {
    Criteria::Range {
        field: field.into(),
        constraints: vec![RangeConstraint {
            comparison,
            value: value.into(),
        }],
    }
}

pub fn exists(field: impl Into<FieldName>) -> Criteria {
    Criteria::Exists {
        field: field.into(),
    }
}

pub fn missing(field: impl Into<FieldName>) -> Criteria {
    Criteria::Missing {
        field: field.into(),
    }
}

pub fn regexp(field: impl Into<FieldName>, pattern: impl Into<SmolStr>) -> Criteria {
    Criteria::Regexp {
        field: field.into(),
        pattern: pattern.into(),
    }
}

pub fn prefix(field: impl Into<FieldName>, text: impl Into<SmolStr>) -> Criteria {
    Criteria::Prefix {
        field: field.into(),
        prefix: text.into(),
    }
}

/// Conjunction. Flattens nested conjunctions, drops match-all children,
/// merges range criteria constraining the same field as long as no
/// comparison kind repeats, and collapses a single survivor to itself.
/// An empty conjunction matches everything.
pub fn and(criteria: Vec<Criteria>) -> Criteria {
    let mut merged: Vec<Criteria> = Vec::new();
    for criterion in flatten_and(criteria) {
        match criterion {
            Criteria::MatchAll => {}
            Criteria::Range { field, constraints } => {
                let existing = merged.iter_mut().find_map(|candidate| match candidate {
                    Criteria::Range {
                        field: candidate_field,
                        constraints: candidate_constraints,
                    } if *candidate_field == field
                        && kinds_disjoint(candidate_constraints, &constraints) =>
                    {
                        Some(candidate_constraints)
                    }
                    _ => None,
                });
                match existing {
                    Some(existing) => existing.extend(constraints),
                    None => merged.push(Criteria::Range { field, constraints }),
                }
            }
            other => merged.push(other),
        }
    }
    combine(merged, |criteria| Criteria::And { criteria })
}

/// Disjunction. Flattens nested disjunctions and collapses a single
/// child to itself. A match-all child absorbs the whole disjunction.
pub fn or(criteria: Vec<Criteria>) -> Criteria {
    let flat = flatten_or(criteria);
    if flat.iter().any(|c| matches!(c, Criteria::MatchAll)) {
        return Criteria::MatchAll;
    }
    combine(flat, |criteria| Criteria::Or { criteria })
}

/// Negation with double negation collapsed.
pub fn not(criteria: Criteria) -> Criteria {
    match criteria {
        Criteria::Not { criteria } => *criteria,
        other => Criteria::Not {
            criteria: Box::new(other),
        },
    }
}

/// Conjoin an optional slot with another criteria, in slot order.
pub fn and_into(slot: Option<Criteria>, criteria: Criteria) -> Criteria {
    match slot {
        Some(existing) => and(vec![existing, criteria]),
        None => criteria,
    }
}

/// Rewrite filter-style composites into the query DSL's bool form:
/// conjunctions become `must`, disjunctions `should`, negations
/// `must_not`. Leaf criteria are valid queries as they stand.
pub fn query_context(criteria: Criteria) -> Criteria {
    match criteria {
        Criteria::And { criteria } => Criteria::Bool {
            must: criteria.into_iter().map(query_context).collect(),
            should: vec![],
            must_not: vec![],
        },
        Criteria::Or { criteria } => Criteria::Bool {
            must: vec![],
            should: criteria.into_iter().map(query_context).collect(),
            must_not: vec![],
        },
        Criteria::Not { criteria } => Criteria::Bool {
            must: vec![],
            should: vec![],
            must_not: vec![query_context(*criteria)],
        },
        other => other,
    }
}

/// Scope a facet to the given filter criteria, so facet results honor
/// the request's filter. Value-bearing facets pick it up as a facet
/// filter; a filter facet conjoins it into its own criteria.
pub fn scope_facet(facet: Facet, criteria: &Criteria) -> Facet {
    match facet {
        Facet::Statistical {
            name,
            field,
            filter,
        } => Facet::Statistical {
            name,
            field,
            filter: Some(and_into(filter, criteria.clone())),
        },
        Facet::Filter { name, filter } => Facet::Filter {
            name,
            filter: and(vec![filter, criteria.clone()]),
        },
        Facet::Terms {
            name,
            field,
            size,
            filter,
        } => Facet::Terms {
            name,
            field,
            size,
            filter: Some(and_into(filter, criteria.clone())),
        },
        Facet::TermsStats {
            name,
            key_field,
            value_field,
            size,
            filter,
        } => Facet::TermsStats {
            name,
            key_field,
            value_field,
            size,
            filter: Some(and_into(filter, criteria.clone())),
        },
    }
}

/// A range carries at most one bound per comparison kind; the wire
/// keys bounds by kind, so a repeated kind would drop a bound.
fn kinds_disjoint(existing: &[RangeConstraint], incoming: &[RangeConstraint]) -> bool {
    existing.iter().all(|held| {
        incoming
            .iter()
            .all(|candidate| candidate.comparison != held.comparison)
    })
}

fn flatten_and(criteria: Vec<Criteria>) -> Vec<Criteria> {
    let mut flat = Vec::with_capacity(criteria.len());
    for criterion in criteria {
        match criterion {
            Criteria::And { criteria } => flat.extend(flatten_and(criteria)),
            other => flat.push(other),
        }
    }
    flat
}

fn flatten_or(criteria: Vec<Criteria>) -> Vec<Criteria> {
    let mut flat = Vec::with_capacity(criteria.len());
    for criterion in criteria {
        match criterion {
            Criteria::Or { criteria } => flat.extend(flatten_or(criteria)),
            other => flat.push(other),
        }
    }
    flat
}

fn combine(mut criteria: Vec<Criteria>, build: impl FnOnce(Vec<Criteria>) -> Criteria) -> Criteria {
    if criteria.is_empty() {
        return Criteria::MatchAll;
    }
    if criteria.len() == 1 {
        return criteria.swap_remove(0);
    }
    build(criteria)
}
