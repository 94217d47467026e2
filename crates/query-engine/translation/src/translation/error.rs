//! Translation failures.
//!
//! All of these mean "this query cannot be expressed against the
//! backend". Translation is all or nothing; nothing here is caught or
//! retried further down the pipeline.

use thiserror::Error;

use query_engine_expr::expr::rewrites::partial_eval::EvalError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no translation rule for operator {0}")]
    UnsupportedOperator(&'static str),

    #[error("cannot translate {operator}: {reason}")]
    UnsupportedShape {
        operator: &'static str,
        reason: String,
    },

    #[error("invalid grouping: {0}")]
    InvalidGrouping(String),

    #[error("{operator} is missing a required argument")]
    MissingArgument { operator: &'static str },

    #[error("constant evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}
