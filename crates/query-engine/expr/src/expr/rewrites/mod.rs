//! Rewrites that run over a query tree before translation.

pub mod partial_eval;
