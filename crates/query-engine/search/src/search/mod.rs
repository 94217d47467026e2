//! The search request abstract syntax tree and its wire renderings.

pub mod ast;
pub mod formatter;
pub mod helpers;
