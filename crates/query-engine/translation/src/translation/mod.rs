//! Compile query expressions into search requests.

pub mod error;
pub mod helpers;
pub mod query;
