//! Compilation end to end: a built query in, an http request out.

use std::time::Duration;

use serde_json::json;
use url::Url;

use elastic_query::builder::{field, group, lit, record};
use elastic_query::{
    compile, compile_with_format, Connection, DefaultMapping, DiscriminatorMapping, HttpMethod,
    Materializer, Query, SearchFormat,
};

fn connection() -> Connection {
    Connection::new(Url::parse("http://elastic.example.com:9200/").unwrap())
        .with_index("employees")
}

#[test]
fn a_filtered_query_posts_a_top_level_filter() {
    let query = Query::source("Employee").filter(field("Salary").gt(lit(50_000)));
    let compiled = compile(&connection(), &DefaultMapping, &query).unwrap();

    assert_eq!(compiled.http.method, HttpMethod::Post);
    assert_eq!(
        compiled.http.url.as_str(),
        "http://elastic.example.com:9200/employees/employee/_search"
    );
    assert_eq!(
        compiled.http.body,
        Some(json!({
            "filter": { "range": { "salary": { "gt": 50000 } } }
        }))
    );
}

#[test]
fn the_get_format_carries_the_document_in_the_source_parameter() {
    let query = Query::source("Employee").filter(field("Active").eq(lit(true)));
    let compiled = compile_with_format(
        &connection(),
        &DefaultMapping,
        &query,
        SearchFormat::GetQuery,
    )
    .unwrap();

    assert_eq!(compiled.http.method, HttpMethod::Get);
    assert_eq!(compiled.http.body, None);
    let source = compiled
        .http
        .url
        .query_pairs()
        .find(|(key, _)| key == "source")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    let document: serde_json::Value = serde_json::from_str(&source).unwrap();
    assert_eq!(
        document,
        json!({
            "query": { "filtered": { "filter": { "term": { "active": true } } } }
        })
    );
}

#[test]
fn paging_ordering_and_projection_shape_the_body() {
    let query = Query::source("Employee")
        .filter(field("Dept").eq(lit("engineering")))
        .order_by(field("HireDate"))
        .then_by_descending(field("Salary"))
        .select(record([
            ("id", field("Id")),
            ("wage", field("HourlyWage")),
        ]))
        .skip(100)
        .take(25);
    let compiled = compile(&connection(), &DefaultMapping, &query).unwrap();

    assert_eq!(
        compiled.http.body,
        Some(json!({
            "fields": ["id", "hourlyWage"],
            "filter": { "term": { "dept": "engineering" } },
            "from": 100,
            "size": 25,
            "sort": ["hireDate", { "salary": { "order": "desc" } }],
        }))
    );
}

#[test]
fn grouped_aggregation_compiles_to_a_count_search_with_facets() {
    let query = Query::source("Employee")
        .filter(field("Active").eq(lit(true)))
        .group_by(field("Dept"))
        .select(record([
            ("dept", group::key()),
            ("average", group::average(field("Salary"))),
        ]));
    let compiled = compile(&connection(), &DefaultMapping, &query).unwrap();

    assert_eq!(
        compiled.http.url.as_str(),
        "http://elastic.example.com:9200/employees/employee/_search?search_type=count"
    );
    assert_eq!(
        compiled.http.body,
        Some(json!({
            "facets": {
                "salary": {
                    "terms_stats": { "key_field": "dept", "value_field": "salary" },
                    "facet_filter": { "term": { "active": true } },
                }
            },
            "filter": { "term": { "active": true } },
        }))
    );
}

#[test]
fn count_queries_ask_for_totals_only() {
    let query = Query::source("Employee").count_where(field("Active").eq(lit(true)));
    let compiled = compile(&connection(), &DefaultMapping, &query).unwrap();

    assert!(matches!(compiled.materializer, Materializer::Count));
    assert_eq!(
        compiled.http.url.as_str(),
        "http://elastic.example.com:9200/employees/employee/_search?search_type=count"
    );
    assert_eq!(
        compiled.http.body,
        Some(json!({
            "filter": { "term": { "active": true } }
        }))
    );
}

#[test]
fn the_connection_timeout_is_stamped_onto_the_body() {
    let connection = connection().with_timeout(Duration::from_secs(3));
    let query = Query::source("Employee").take(10);
    let compiled = compile(&connection, &DefaultMapping, &query).unwrap();

    assert_eq!(compiled.request.timeout, Some(Duration::from_secs(3)));
    assert_eq!(
        compiled.http.body,
        Some(json!({ "size": 10, "timeout": "3s" }))
    );
}

#[test]
fn first_caps_the_request_to_one_hit() {
    let query = Query::source("Employee").first();
    let compiled = compile(&connection(), &DefaultMapping, &query).unwrap();

    assert_eq!(compiled.http.body, Some(json!({ "size": 1 })));
}

#[test]
fn discriminated_indexes_scope_unfiltered_queries() {
    let mapping = DiscriminatorMapping::new(DefaultMapping, "type");
    let query = Query::source("Employee");
    let compiled = compile(&connection(), &mapping, &query).unwrap();

    assert_eq!(
        compiled.http.body,
        Some(json!({
            "filter": { "term": { "type": "employee" } }
        }))
    );
}

#[test]
fn a_connection_without_an_index_searches_everything() {
    let connection = Connection::new(Url::parse("http://elastic.example.com:9200/").unwrap());
    let query = Query::source("Employee");
    let compiled = compile(&connection, &DefaultMapping, &query).unwrap();

    assert_eq!(
        compiled.http.url.as_str(),
        "http://elastic.example.com:9200/_all/employee/_search"
    );
    assert_eq!(compiled.http.body, Some(json!({})));
}
