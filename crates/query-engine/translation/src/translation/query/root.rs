//! The outside-in walk over a query chain.
//!
//! The outermost operator is the last one applied, so each recognized
//! operator mutates its part of the accumulator first and then recurses
//! into its source argument; the walk terminates at the typed source.

use smol_str::SmolStr;

use query_engine_expr::expr::ast::{Expr, Function};
use query_engine_response::response::materialize::FinalTransform;
use query_engine_search::search::ast::Criteria;
use query_engine_search::search::helpers::and_into;

use super::aggregates;
use super::filtering;
use super::projection;
use super::sorting;
use super::values;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, RowSource, State};

/// The logical document type a chain terminates in, found before the
/// walk so mapping lookups can happen on the way down.
pub fn source_type(expr: &Expr) -> Result<SmolStr, Error> {
    match expr {
        Expr::Source { doc_type } => Ok(doc_type.clone()),
        Expr::Call {
            target: None, args, ..
        } => match args.first() {
            Some(source) => source_type(source),
            None => Err(Error::MissingArgument { operator: "query" }),
        },
        other => Err(Error::UnsupportedShape {
            operator: "query",
            reason: format!(
                "query chains are operator calls ending in a source, found a {}",
                other.kind_name()
            ),
        }),
    }
}

pub fn translate_expr(env: &Env, state: &mut State, expr: &Expr) -> Result<(), Error> {
    match expr {
        Expr::Source { .. } => {
            state.request.doc_type = env.type_name();
            if state.request.query.is_none() && state.request.filter.is_none() {
                state.request.filter = env.default_criteria();
            }
            Ok(())
        }
        Expr::Call {
            target: None,
            function,
            args,
        } => translate_operator(env, state, *function, args),
        other => Err(Error::UnsupportedShape {
            operator: "query",
            reason: format!(
                "query chains are operator calls ending in a source, found a {}",
                other.kind_name()
            ),
        }),
    }
}

fn translate_operator(
    env: &Env,
    state: &mut State,
    function: Function,
    args: &[Expr],
) -> Result<(), Error> {
    let source = args.first().ok_or(Error::MissingArgument {
        operator: function.name(),
    })?;

    match function {
        Function::Where => {
            let criteria = filtering::translate_predicate(env, operand(args, function)?)?;
            add_filter(state, criteria);
        }
        Function::Query => {
            let criteria = filtering::translate_predicate(env, operand(args, function)?)?;
            add_query(state, criteria);
        }
        Function::QueryString => {
            let text = values::constant_str(operand(args, function)?, "query_string")?;
            add_query(
                state,
                Criteria::QueryString {
                    query: text,
                    fields: vec![],
                },
            );
        }
        Function::Select => {
            let lambda = operand(args, function)?;
            if state.projector.is_some() {
                return Err(Error::UnsupportedShape {
                    operator: "select",
                    reason: "only one projection per query".to_string(),
                });
            }
            if state.request.filter.is_some() || state.request.query.is_some() {
                return Err(Error::UnsupportedShape {
                    operator: "select",
                    reason: "criteria applied after a projection cannot be translated"
                        .to_string(),
                });
            }
            if let Expr::Call {
                target: None,
                function: Function::GroupBy,
                args: group_args,
            } = source
            {
                let group_source = group_args.first().ok_or(Error::MissingArgument {
                    operator: "group_by",
                })?;
                let key = group_args.get(1).ok_or(Error::MissingArgument {
                    operator: "group_by",
                })?;
                aggregates::translate_grouped_select(env, state, key, lambda)?;
                return translate_expr(env, state, group_source);
            }
            projection::translate_select(env, state, lambda)?;
        }
        Function::OrderBy => sorting::translate_order_by(env, state, operand(args, function)?, true)?,
        Function::OrderByDescending => {
            sorting::translate_order_by(env, state, operand(args, function)?, false)?;
        }
        Function::ThenBy => sorting::translate_order_by(env, state, operand(args, function)?, true)?,
        Function::ThenByDescending => {
            sorting::translate_order_by(env, state, operand(args, function)?, false)?;
        }
        Function::Skip => {
            let count = values::constant_u64(operand(args, function)?, "skip")?;
            state.add_from(count);
        }
        Function::Take => {
            let limit = values::constant_u64(operand(args, function)?, "take")?;
            state.cap_size(limit);
        }
        Function::First | Function::FirstOrDefault => {
            state.cap_size(1);
            state.transform = FinalTransform::First {
                or_default: matches!(function, Function::FirstOrDefault),
            };
            optional_predicate(env, state, args)?;
        }
        Function::Single | Function::SingleOrDefault => {
            // two rows are enough to prove the result is not single
            state.cap_size(2);
            state.transform = FinalTransform::Single {
                or_default: matches!(function, Function::SingleOrDefault),
            };
            optional_predicate(env, state, args)?;
        }
        Function::Count => {
            state.rows = RowSource::Total;
            optional_predicate(env, state, args)?;
        }
        Function::GroupBy => {
            return Err(Error::UnsupportedShape {
                operator: "group_by",
                reason: "grouping must be consumed by a projection".to_string(),
            });
        }
        other => return Err(Error::UnsupportedOperator(other.name())),
    }

    translate_expr(env, state, source)
}

fn operand<'a>(args: &'a [Expr], function: Function) -> Result<&'a Expr, Error> {
    args.get(1).ok_or(Error::MissingArgument {
        operator: function.name(),
    })
}

fn add_filter(state: &mut State, criteria: Criteria) {
    state.request.filter = Some(and_into(state.request.filter.take(), criteria));
}

fn add_query(state: &mut State, criteria: Criteria) {
    state.request.query = Some(and_into(state.request.query.take(), criteria));
}

/// `first`, `single` and `count` accept an inline predicate that means
/// the same as a preceding `where`.
fn optional_predicate(env: &Env, state: &mut State, args: &[Expr]) -> Result<(), Error> {
    if let Some(lambda) = args.get(1) {
        let criteria = filtering::translate_predicate(env, lambda)?;
        add_filter(state, criteria);
    }
    Ok(())
}
