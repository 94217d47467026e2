//! Translate a query expression.

pub mod aggregates;
pub mod filtering;
pub mod projection;
pub mod root;
pub mod sorting;
pub mod values;

use tracing::debug;

use query_engine_expr::expr::ast::Expr;
use query_engine_expr::expr::rewrites::partial_eval::partial_evaluate;
use query_engine_mapping::mapping::Mapping;
use query_engine_response::response::materialize::{Grouping, Materializer, Projector};
use query_engine_search::search::ast::{SearchRequest, SearchType};
use query_engine_search::search::helpers::{query_context, scope_facet};

use crate::translation::error::Error;
use crate::translation::helpers::{Env, RowSource, State};

/// The compiled output: what to send, and how to read the response.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateResult {
    pub request: SearchRequest,
    pub materializer: Materializer,
}

/// Translate a query expression to a search request and the
/// materializer that reads its response.
pub fn translate(mapping: &dyn Mapping, expr: &Expr) -> Result<TranslateResult, Error> {
    let evaluated = partial_evaluate(expr)?;
    let doc_type = root::source_type(&evaluated)?;

    let env = Env::new(mapping, doc_type);
    let mut state = State::new();
    root::translate_expr(&env, &mut state, &evaluated)?;

    let result = assemble(state);
    debug!(
        request = ?result.request,
        materializer = ?result.materializer,
        "translated query"
    );
    Ok(result)
}

/// Final pass over the accumulator: scope facets with the filter,
/// normalize the query slot for query context, and pick the
/// materializer.
fn assemble(state: State) -> TranslateResult {
    let mut request = state.request;

    if let Some(filter) = &request.filter {
        let facets = std::mem::take(&mut request.facets);
        request.facets = facets
            .into_iter()
            .map(|facet| scope_facet(facet, filter))
            .collect();
    }

    if let Some(query) = request.query.take() {
        request.query = Some(query_context(query));
    }

    let projector = state.projector.unwrap_or(Projector::Source);
    let materializer = match state.rows {
        RowSource::Hits => Materializer::Hits {
            projector,
            transform: state.transform,
        },
        RowSource::Total => {
            request.search_type = Some(SearchType::Count);
            Materializer::Count
        }
        RowSource::Facets { grouped } => {
            request.search_type = Some(SearchType::Count);
            Materializer::Facets {
                grouping: if grouped {
                    Grouping::ByTerms
                } else {
                    Grouping::Single
                },
                projector,
                transform: state.transform,
            }
        }
    };

    TranslateResult {
        request,
        materializer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_expr::expr::builder::{field, group, lit, record, Query};
    use query_engine_mapping::mapping::{DefaultMapping, DiscriminatorMapping};
    use query_engine_response::response::materialize::{FinalTransform, StatKey};
    use query_engine_expr::expr::value::Value;
    use query_engine_search::search::ast::{Criteria, Facet, RangeComparison, SortOption};
    use query_engine_search::search::helpers::{and, missing, or, range, term, terms};

    fn translated(query: Query) -> TranslateResult {
        translate(&DefaultMapping, query.expr()).unwrap()
    }

    #[test]
    fn a_bare_source_searches_the_mapped_type() {
        let result = translated(Query::source("Employee"));
        assert_eq!(result.request.doc_type.as_str(), "employee");
        assert_eq!(result.request.filter, None);
        assert_eq!(result.request.query, None);
        assert_eq!(
            result.materializer,
            Materializer::Hits {
                projector: Projector::Source,
                transform: FinalTransform::Identity,
            }
        );
    }

    #[test]
    fn skips_become_from_and_accumulate() {
        let result = translated(Query::source("Employee").skip(300).skip(25));
        assert_eq!(result.request.from, Some(325));
    }

    #[test]
    fn takes_become_size_and_keep_the_minimum() {
        let result = translated(Query::source("Employee").take(100).take(73));
        assert_eq!(result.request.size, Some(73));
    }

    #[test]
    fn ordering_reads_left_to_right() {
        let result = translated(
            Query::source("Employee")
                .order_by(field("Id"))
                .then_by_descending(field("Name")),
        );
        assert_eq!(
            result.request.sort,
            vec![SortOption::ascending("id"), SortOption::descending("name")]
        );
    }

    #[test]
    fn filters_restrict_without_scoring() {
        let result = translated(
            Query::source("Employee")
                .filter(field("Active").eq(lit(true)))
                .filter(field("Salary").gte(lit(50_000))),
        );
        assert_eq!(
            result.request.filter,
            Some(and(vec![
                range("salary", RangeComparison::GreaterThanOrEqual, 50_000),
                term("active", true),
            ]))
        );
        assert_eq!(result.request.query, None);
    }

    #[test]
    fn queries_are_normalized_for_query_context() {
        let result = translated(
            Query::source("Employee")
                .query(field("Name").eq(lit("bob")).and(field("Active").eq(lit(true)))),
        );
        assert_eq!(
            result.request.query,
            Some(Criteria::Bool {
                must: vec![term("name", "bob"), term("active", true)],
                should: vec![],
                must_not: vec![],
            })
        );
    }

    #[test]
    fn query_strings_land_in_the_query_slot() {
        let result = translated(Query::source("Employee").query_string("bob +sales"));
        assert_eq!(
            result.request.query,
            Some(Criteria::QueryString {
                query: "bob +sales".into(),
                fields: vec![],
            })
        );
    }

    #[test]
    fn projections_restrict_fields_and_shape_rows() {
        let result = translated(Query::source("Employee").select(record([
            ("id", field("Id")),
            ("wage", field("HourlyWage")),
        ])));
        let fields: Vec<&str> = result.request.fields.iter().map(|f| f.as_str()).collect();
        assert_eq!(fields, vec!["id", "hourlyWage"]);
        assert_eq!(
            result.materializer,
            Materializer::Hits {
                projector: Projector::Record(vec![
                    ("id".into(), Projector::Field("id".into())),
                    ("wage".into(), Projector::Field("hourlyWage".into())),
                ]),
                transform: FinalTransform::Identity,
            }
        );
    }

    #[test]
    fn grouped_averages_become_terms_stats_facets() {
        let result = translated(
            Query::source("Employee")
                .group_by(field("Dept"))
                .select(record([
                    ("dept", group::key()),
                    ("average", group::average(field("Salary"))),
                ])),
        );
        assert_eq!(
            result.request.facets,
            vec![Facet::TermsStats {
                name: "salary".into(),
                key_field: "dept".into(),
                value_field: "salary".into(),
                size: None,
                filter: None,
            }]
        );
        assert_eq!(result.request.search_type, Some(SearchType::Count));
        assert_eq!(
            result.materializer,
            Materializer::Facets {
                grouping: Grouping::ByTerms,
                projector: Projector::Record(vec![
                    ("dept".into(), Projector::GroupKey),
                    (
                        "average".into(),
                        Projector::Aggregate {
                            facet: "salary".into(),
                            stat: StatKey::Mean,
                        }
                    ),
                ]),
                transform: FinalTransform::Identity,
            }
        );
    }

    #[test]
    fn filters_scope_facets_through_facet_filters() {
        let result = translated(
            Query::source("Employee")
                .filter(field("Active").eq(lit(true)))
                .group_by(field("Dept"))
                .select(record([("count", group::count())])),
        );
        assert_eq!(
            result.request.facets,
            vec![Facet::Terms {
                name: "GroupKey".into(),
                field: "dept".into(),
                size: None,
                filter: Some(term("active", true)),
            }]
        );
        assert_eq!(result.request.filter, Some(term("active", true)));
    }

    #[test]
    fn first_caps_size_and_sets_the_transform() {
        let result = translated(Query::source("Employee").take(50).first());
        assert_eq!(result.request.size, Some(1));
        assert_eq!(
            result.materializer,
            Materializer::Hits {
                projector: Projector::Source,
                transform: FinalTransform::First { or_default: false },
            }
        );
    }

    #[test]
    fn single_or_default_fetches_two_rows() {
        let result = translated(Query::source("Employee").single_or_default());
        assert_eq!(result.request.size, Some(2));
        assert_eq!(
            result.materializer,
            Materializer::Hits {
                projector: Projector::Source,
                transform: FinalTransform::Single { or_default: true },
            }
        );
    }

    #[test]
    fn count_reads_the_hit_total_only() {
        let result = translated(
            Query::source("Employee")
                .filter(field("Active").eq(lit(true)))
                .count(),
        );
        assert_eq!(result.materializer, Materializer::Count);
        assert_eq!(result.request.search_type, Some(SearchType::Count));
        assert_eq!(result.request.filter, Some(term("active", true)));
    }

    #[test]
    fn unscoped_queries_gain_the_mapping_default_criteria() {
        let mapping = DiscriminatorMapping::new(DefaultMapping, "type");
        let result = translate(&mapping, Query::source("Employee").expr()).unwrap();
        assert_eq!(result.request.filter, Some(term("type", "employee")));
    }

    #[test]
    fn scoped_queries_skip_the_default_criteria() {
        let mapping = DiscriminatorMapping::new(DefaultMapping, "type");
        let query = Query::source("Employee").filter(field("Active").eq(lit(true)));
        let result = translate(&mapping, query.expr()).unwrap();
        assert_eq!(result.request.filter, Some(term("active", true)));
    }

    #[test]
    fn constant_subtrees_fold_before_translation() {
        let result = translated(
            Query::source("Employee").filter(field("Salary").gt(lit(40_000) + lit(10_000))),
        );
        assert_eq!(
            result.request.filter,
            Some(range("salary", RangeComparison::GreaterThan, 50_000))
        );
    }

    #[test]
    fn null_aware_containment_splits_into_or() {
        let values = lit(vec![Value::Int(1), Value::Int(2), Value::Null]);
        let result = translated(Query::source("Employee").filter(values.contains(field("Dept"))));
        assert_eq!(
            result.request.filter,
            Some(or(vec![
                terms("dept", vec![1.into(), 2.into()]),
                missing("dept"),
            ]))
        );
    }

    #[test]
    fn criteria_after_a_projection_are_rejected() {
        let query = Query::source("Employee")
            .select(field("Id"))
            .filter(field("Active").eq(lit(true)));
        let error = translate(&DefaultMapping, query.expr()).unwrap_err();
        assert!(matches!(error, Error::UnsupportedShape { operator: "select", .. }));
    }

    #[test]
    fn grouping_without_a_projection_is_rejected() {
        let query = Query::source("Employee").group_by(field("Dept"));
        let error = translate(&DefaultMapping, query.expr()).unwrap_err();
        assert!(matches!(error, Error::UnsupportedShape { operator: "group_by", .. }));
    }
}
