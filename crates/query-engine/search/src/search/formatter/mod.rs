//! Wire-level rendering of search requests.
//!
//! Two renderings of the same request exist: a GET with the whole
//! document percent-encoded into the `source` query parameter, and a
//! POST carrying the document as its body. They differ in where filter
//! criteria sit (inside a `filtered` query versus a top-level key); the
//! JSON for criteria, facets, sorts, paging and timeouts is shared.

use std::fmt;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use url::Url;

use query_engine_expr::expr::value::Value;

use crate::search::ast::{Criteria, Facet, FieldName, SearchRequest, SortOption};

pub mod get_query;
pub mod post_body;

/// Which rendering to use for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchFormat {
    /// GET with the document in the `source` query parameter.
    GetQuery,
    /// POST with the document as the request body.
    #[default]
    PostBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        })
    }
}

/// Everything a transport needs to issue the search.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("endpoint url is not a valid base url")]
    EndpointNotBase,
}

/// Render a search request with the chosen formatter.
pub fn format(
    search_format: SearchFormat,
    request: &SearchRequest,
    endpoint: &Url,
    index: Option<&str>,
) -> Result<HttpRequest, FormatError> {
    match search_format {
        SearchFormat::GetQuery => get_query::format(request, endpoint, index),
        SearchFormat::PostBody => post_body::format(request, endpoint, index),
    }
}

/// Render a timeout the way the wire expects: values with sub-second
/// precision as a bare millisecond count, whole seconds as `Ns`, whole
/// minutes as `Nm`. A zero timeout is omitted entirely.
pub fn format_duration(timeout: Duration) -> Option<String> {
    let millis = timeout.as_millis();
    if millis == 0 {
        return None;
    }
    if millis % 1_000 != 0 {
        return Some(millis.to_string());
    }
    let seconds = millis / 1_000;
    if seconds % 60 != 0 {
        return Some(format!("{seconds}s"));
    }
    Some(format!("{}m", seconds / 60))
}

/// The `{endpoint}/{index}/{type}/_search` URI, with the search type as
/// a query parameter when set. A missing index searches everything; an
/// empty document type contributes no segment.
fn search_url(
    request: &SearchRequest,
    endpoint: &Url,
    index: Option<&str>,
) -> Result<Url, FormatError> {
    let mut url = endpoint.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| FormatError::EndpointNotBase)?;
        segments.pop_if_empty();
        segments.push(index.unwrap_or("_all"));
        if !request.doc_type.is_empty() {
            segments.push(request.doc_type.as_str());
        }
        segments.push("_search");
    }
    if let Some(search_type) = request.search_type {
        url.query_pairs_mut()
            .append_pair("search_type", search_type.as_str());
    }
    Ok(url)
}

/// The body keys shared by both formatters; query and filter placement
/// is up to the caller.
fn common_body(request: &SearchRequest) -> serde_json::Map<String, serde_json::Value> {
    let mut body = serde_json::Map::new();
    if !request.fields.is_empty() {
        let fields: Vec<_> = request.fields.iter().map(FieldName::as_str).collect();
        body.insert("fields".to_string(), json!(fields));
    }
    if !request.sort.is_empty() {
        body.insert("sort".to_string(), render_sort(&request.sort));
    }
    if !request.facets.is_empty() {
        body.insert("facets".to_string(), render_facets(&request.facets));
    }
    if let Some(from) = request.from {
        body.insert("from".to_string(), json!(from));
    }
    if let Some(size) = request.size {
        body.insert("size".to_string(), json!(size));
    }
    if let Some(timeout) = request.timeout.and_then(format_duration) {
        body.insert("timeout".to_string(), json!(timeout));
    }
    body
}

fn render_sort(sort: &[SortOption]) -> serde_json::Value {
    let entries = sort
        .iter()
        .map(|option| {
            let field = option.field.as_str();
            if option.ascending && !option.ignore_unmapped {
                json!(field)
            } else {
                let mut body = serde_json::Map::new();
                if !option.ascending {
                    body.insert("order".to_string(), json!("desc"));
                }
                if option.ignore_unmapped {
                    body.insert("ignore_unmapped".to_string(), json!(true));
                }
                json!({ field: body })
            }
        })
        .collect();
    serde_json::Value::Array(entries)
}

fn render_facets(facets: &[Facet]) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for facet in facets {
        object.insert(facet.name().to_string(), render_facet_body(facet));
    }
    serde_json::Value::Object(object)
}

fn render_facet_body(facet: &Facet) -> serde_json::Value {
    match facet {
        Facet::Statistical { field, filter, .. } => {
            let field = field.as_str();
            with_facet_filter(json!({ "statistical": { "field": field } }), filter.as_ref())
        }
        Facet::Filter { filter, .. } => json!({ "filter": render_criteria(filter) }),
        Facet::Terms {
            field,
            size,
            filter,
            ..
        } => {
            let mut terms = json!({ "field": field.as_str() });
            if let Some(size) = size {
                terms["size"] = json!(size);
            }
            with_facet_filter(json!({ "terms": terms }), filter.as_ref())
        }
        Facet::TermsStats {
            key_field,
            value_field,
            size,
            filter,
            ..
        } => {
            let mut terms_stats = json!({
                "key_field": key_field.as_str(),
                "value_field": value_field.as_str(),
            });
            if let Some(size) = size {
                terms_stats["size"] = json!(size);
            }
            with_facet_filter(json!({ "terms_stats": terms_stats }), filter.as_ref())
        }
    }
}

fn with_facet_filter(
    mut body: serde_json::Value,
    filter: Option<&Criteria>,
) -> serde_json::Value {
    if let Some(filter) = filter {
        body["facet_filter"] = render_criteria(filter);
    }
    body
}

fn render_criteria(criteria: &Criteria) -> serde_json::Value {
    match criteria {
        Criteria::Term { field, value } => {
            let field = field.as_str();
            json!({ "term": { field: value.to_json() } })
        }
        Criteria::Terms {
            field,
            values,
            execution,
        } => {
            let rendered: Vec<_> = values.iter().map(Value::to_json).collect();
            let field = field.as_str();
            let mut body = json!({ field: rendered });
            if let Some(execution) = execution {
                body["execution"] = json!(execution.as_str());
            }
            json!({ "terms": body })
        }
        Criteria::Range { field, constraints } => {
            let mut bounds = serde_json::Map::new();
            for constraint in constraints {
                bounds.insert(
                    constraint.comparison.as_str().to_string(),
                    constraint.value.to_json(),
                );
            }
            let field = field.as_str();
            json!({ "range": { field: bounds } })
        }
        Criteria::Regexp { field, pattern } => {
            let field = field.as_str();
            json!({ "regexp": { field: pattern.as_str() } })
        }
        Criteria::Prefix { field, prefix } => {
            let field = field.as_str();
            json!({ "prefix": { field: prefix.as_str() } })
        }
        Criteria::Exists { field } => json!({ "exists": { "field": field.as_str() } }),
        Criteria::Missing { field } => json!({ "missing": { "field": field.as_str() } }),
        Criteria::And { criteria } => json!({ "and": render_list(criteria) }),
        Criteria::Or { criteria } => json!({ "or": render_list(criteria) }),
        Criteria::Not { criteria } => json!({ "not": render_criteria(criteria) }),
        Criteria::MatchAll => json!({ "match_all": {} }),
        Criteria::Bool {
            must,
            should,
            must_not,
        } => {
            let mut body = serde_json::Map::new();
            if !must.is_empty() {
                body.insert("must".to_string(), json!(render_list(must)));
            }
            if !should.is_empty() {
                body.insert("should".to_string(), json!(render_list(should)));
            }
            if !must_not.is_empty() {
                body.insert("must_not".to_string(), json!(render_list(must_not)));
            }
            json!({ "bool": body })
        }
        Criteria::QueryString { query, fields } => {
            let mut body = json!({ "query": query.as_str() });
            if !fields.is_empty() {
                let fields: Vec<_> = fields.iter().map(FieldName::as_str).collect();
                body["fields"] = json!(fields);
            }
            json!({ "query_string": body })
        }
    }
}

fn render_list(criteria: &[Criteria]) -> Vec<serde_json::Value> {
    criteria.iter().map(render_criteria).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ast::{RangeComparison, SearchType, TypeName};
    use crate::search::helpers::{and, missing, or, range, term, terms};
    use test_case::test_case;

    #[test_case(0, None; "zero is omitted")]
    #[test_case(1_500, Some("1500"); "sub second precision renders as milliseconds")]
    #[test_case(500, Some("500"); "under a second renders as milliseconds")]
    #[test_case(3_000, Some("3s"); "whole seconds render with the seconds suffix")]
    #[test_case(90_000, Some("90s"); "partial minutes stay in seconds")]
    #[test_case(240_000, Some("4m"); "whole minutes render with the minutes suffix")]
    fn durations_render_for_the_wire(millis: u64, expected: Option<&str>) {
        assert_eq!(
            format_duration(Duration::from_millis(millis)),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn term_renders_keyed_by_field() {
        assert_eq!(
            render_criteria(&term("dept", "engineering")),
            json!({ "term": { "dept": "engineering" } })
        );
    }

    #[test]
    fn merged_range_renders_every_bound() {
        let criteria = and(vec![
            range("x", RangeComparison::LessThan, 100),
            range("x", RangeComparison::GreaterThan, 200),
        ]);
        assert_eq!(
            render_criteria(&criteria),
            json!({ "range": { "x": { "lt": 100, "gt": 200 } } })
        );
    }

    #[test]
    fn repeated_bound_kinds_render_as_separate_ranges() {
        let criteria = and(vec![
            range("salary", RangeComparison::GreaterThan, 10),
            range("salary", RangeComparison::GreaterThan, 5),
        ]);
        assert_eq!(
            render_criteria(&criteria),
            json!({ "and": [
                { "range": { "salary": { "gt": 10 } } },
                { "range": { "salary": { "gt": 5 } } },
            ] })
        );
    }

    #[test]
    fn null_aware_containment_renders_as_or() {
        let criteria = or(vec![
            terms("dept", vec![1.into(), 2.into()]),
            missing("dept"),
        ]);
        assert_eq!(
            render_criteria(&criteria),
            json!({ "or": [
                { "terms": { "dept": [1, 2] } },
                { "missing": { "field": "dept" } },
            ] })
        );
    }

    #[test]
    fn bool_skips_empty_clauses() {
        let criteria = Criteria::Bool {
            must: vec![term("a", 1)],
            should: vec![],
            must_not: vec![term("b", 2)],
        };
        assert_eq!(
            render_criteria(&criteria),
            json!({ "bool": {
                "must": [{ "term": { "a": 1 } }],
                "must_not": [{ "term": { "b": 2 } }],
            } })
        );
    }

    #[test]
    fn query_string_lists_fields_only_when_present() {
        let bare = Criteria::QueryString {
            query: "hello".into(),
            fields: vec![],
        };
        assert_eq!(
            render_criteria(&bare),
            json!({ "query_string": { "query": "hello" } })
        );

        let scoped = Criteria::QueryString {
            query: "hello".into(),
            fields: vec!["title".into()],
        };
        assert_eq!(
            render_criteria(&scoped),
            json!({ "query_string": { "query": "hello", "fields": ["title"] } })
        );
    }

    #[test]
    fn sort_rendering_depends_on_direction_and_mapping() {
        let sort = vec![
            SortOption::ascending("id"),
            SortOption::descending("name"),
            SortOption {
                field: "middleName".into(),
                ascending: false,
                ignore_unmapped: true,
            },
            SortOption {
                field: "nickName".into(),
                ascending: true,
                ignore_unmapped: true,
            },
        ];
        assert_eq!(
            render_sort(&sort),
            json!([
                "id",
                { "name": { "order": "desc" } },
                { "middleName": { "order": "desc", "ignore_unmapped": true } },
                { "nickName": { "ignore_unmapped": true } },
            ])
        );
    }

    #[test]
    fn facets_render_keyed_by_name() {
        let facets = vec![
            Facet::TermsStats {
                name: "salary".into(),
                key_field: "dept".into(),
                value_field: "salary".into(),
                size: Some(10),
                filter: None,
            },
            Facet::Filter {
                name: "GroupKey.1".into(),
                filter: term("active", true),
            },
        ];
        assert_eq!(
            render_facets(&facets),
            json!({
                "salary": { "terms_stats": {
                    "key_field": "dept",
                    "value_field": "salary",
                    "size": 10,
                } },
                "GroupKey.1": { "filter": { "term": { "active": true } } },
            })
        );
    }

    #[test]
    fn statistical_facet_carries_its_facet_filter() {
        let facet = Facet::Statistical {
            name: "salary".into(),
            field: "salary".into(),
            filter: Some(term("active", true)),
        };
        assert_eq!(
            render_facet_body(&facet),
            json!({
                "statistical": { "field": "salary" },
                "facet_filter": { "term": { "active": true } },
            })
        );
    }

    #[test]
    fn search_url_includes_index_type_and_search_type() {
        let request = SearchRequest {
            doc_type: TypeName::new("employee"),
            search_type: Some(SearchType::Count),
            ..SearchRequest::default()
        };
        let endpoint = Url::parse("http://localhost:9200").unwrap();
        let url = search_url(&request, &endpoint, Some("people")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9200/people/employee/_search?search_type=count"
        );
    }

    #[test]
    fn search_url_defaults_the_index_and_skips_an_empty_type() {
        let request = SearchRequest::default();
        let endpoint = Url::parse("http://localhost:9200").unwrap();
        let url = search_url(&request, &endpoint, None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/_all/_search");
    }

    #[test]
    fn search_url_keeps_an_endpoint_path_prefix() {
        let request = SearchRequest {
            doc_type: TypeName::new("employee"),
            ..SearchRequest::default()
        };
        let endpoint = Url::parse("http://search.internal:9200/cluster-a").unwrap();
        let url = search_url(&request, &endpoint, None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://search.internal:9200/cluster-a/_all/employee/_search"
        );
    }
}
