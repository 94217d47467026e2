//! GET formatter: the search document rides in the `source` query
//! parameter, so filter criteria have to live inside the query itself
//! via a `filtered` wrapper.

use serde_json::json;
use url::Url;

use crate::search::ast::SearchRequest;
use crate::search::formatter::{
    common_body, render_criteria, search_url, FormatError, HttpMethod, HttpRequest,
};

pub fn format(
    request: &SearchRequest,
    endpoint: &Url,
    index: Option<&str>,
) -> Result<HttpRequest, FormatError> {
    let mut url = search_url(request, endpoint, index)?;
    let document = body_document(request);
    if !document.is_empty() {
        url.query_pairs_mut()
            .append_pair("source", &serde_json::Value::Object(document).to_string());
    }
    Ok(HttpRequest {
        method: HttpMethod::Get,
        url,
        body: None,
    })
}

fn body_document(request: &SearchRequest) -> serde_json::Map<String, serde_json::Value> {
    let mut body = common_body(request);
    let query = request.query.as_ref().map(render_criteria);
    let filter = request.filter.as_ref().map(render_criteria);
    match (query, filter) {
        (Some(query), Some(filter)) => {
            body.insert(
                "query".to_string(),
                json!({ "filtered": { "query": query, "filter": filter } }),
            );
        }
        (None, Some(filter)) => {
            body.insert(
                "query".to_string(),
                json!({ "filtered": { "filter": filter } }),
            );
        }
        (Some(query), None) => {
            body.insert("query".to_string(), query);
        }
        (None, None) => {}
    }
    body
}
