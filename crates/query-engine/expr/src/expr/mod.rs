//! The query expression language: an immutable tree of declarative
//! operators over a typed document source, the combinators that build it,
//! and the rewrites that run before translation.

pub mod ast;
pub mod builder;
pub mod rewrites;
pub mod value;
