//! POST formatter: the search document is the request body, where
//! filter criteria are legal as a top-level key alongside the query.

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
    let url = search_url(request, endpoint, index)?;
    let mut body = common_body(request);
    if let Some(query) = &request.query {
        body.insert("query".to_string(), render_criteria(query));
    }
    if let Some(filter) = &request.filter {
        body.insert("filter".to_string(), render_criteria(filter));
    }
    Ok(HttpRequest {
        method: HttpMethod::Post,
        url,
        body: Some(serde_json::Value::Object(body)),
    })
}
