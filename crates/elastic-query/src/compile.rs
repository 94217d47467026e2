//! Compile a query against a connection.

use thiserror::Error;
use tracing::debug;

use query_engine_expr::expr::builder::Query;
use query_engine_mapping::mapping::Mapping;
use query_engine_response::response::materialize::Materializer;
use query_engine_search::search::ast::SearchRequest;
use query_engine_search::search::formatter::{self, FormatError, HttpRequest, SearchFormat};
use query_engine_translation::translation::error::Error as TranslateError;
use query_engine_translation::translation::query::translate;

use crate::connection::Connection;

/// A query compiled against a connection: the request to send and the
/// materializer to run over its response.
#[derive(Debug, Clone)]
pub struct CompiledSearch {
    pub http: HttpRequest,
    pub request: SearchRequest,
    pub materializer: Materializer,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Compile a query with the default body format.
pub fn compile(
    connection: &Connection,
    mapping: &dyn Mapping,
    query: &Query,
) -> Result<CompiledSearch, CompileError> {
    compile_with_format(connection, mapping, query, SearchFormat::default())
}

/// Compile a query, choosing how the request goes over the wire.
pub fn compile_with_format(
    connection: &Connection,
    mapping: &dyn Mapping,
    query: &Query,
    format: SearchFormat,
) -> Result<CompiledSearch, CompileError> {
    let translated = translate(mapping, query.expr())?;

    let mut request = translated.request;
    request.timeout = connection.timeout;

    let http = formatter::format(
        format,
        &request,
        &connection.endpoint,
        connection.index.as_deref(),
    )?;
    debug!(method = %http.method, url = %http.url, "compiled search");

    Ok(CompiledSearch {
        http,
        request,
        materializer: translated.materializer,
    })
}
