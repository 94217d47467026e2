//! Compile typed query expressions into Elasticsearch 1.x searches.
//!
//! A query built with [`Query`] translates into a [`SearchRequest`],
//! renders as an [`HttpRequest`] against a [`Connection`], and comes
//! with the [`Materializer`] that turns the response back into rows.

pub mod compile;
pub mod connection;

pub use compile::{compile, compile_with_format, CompileError, CompiledSearch};
pub use connection::Connection;

pub use query_engine_expr::expr::builder;
pub use query_engine_expr::expr::builder::Query;
pub use query_engine_mapping::mapping::{DefaultMapping, DiscriminatorMapping, Mapping};
pub use query_engine_response::response::materialize::{
    materialize, FinalTransform, Grouping, MaterializeError, Materializer, Projector, StatKey,
};
pub use query_engine_response::response::model::SearchResponse;
pub use query_engine_search::search::ast::{Criteria, SearchRequest};
pub use query_engine_search::search::formatter::{HttpMethod, HttpRequest, SearchFormat};
