//! The search response wire model and the materializers that turn raw
//! responses back into caller-shaped results.

pub mod materialize;
pub mod model;
