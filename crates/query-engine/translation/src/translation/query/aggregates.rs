//! Rewrite grouped projections into facets.
//!
//! A `select` over a grouped source never fetches hits: every aggregate
//! call in its body becomes a facet on the request, and the projector
//! reads the facet statistics back instead of hit fields. Grouping by a
//! field enumerates groups through terms buckets; grouping by a
//! constant collapses everything into a single termless row.

use smol_str::SmolStr;

use query_engine_expr::expr::ast::{Expr, Function, GROUP_PARAM};
use query_engine_expr::expr::value::Value;
use query_engine_response::response::materialize::{Projector, StatKey};
use query_engine_search::search::ast::{Criteria, Facet, FieldName};

use super::filtering;
use super::values;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, RowSource, State};

/// The synthetic facet name used by count aggregates, which have no
/// value field of their own to borrow a name from.
const GROUP_KEY_FACET: &str = "GroupKey";

enum GroupKey<'a> {
    /// One all-encompassing group.
    Constant(&'a Value),
    /// One group per distinct value of the key field.
    Field { key_field: FieldName },
}

pub fn translate_grouped_select(
    env: &Env,
    state: &mut State,
    key_lambda: &Expr,
    select_lambda: &Expr,
) -> Result<(), Error> {
    if state.rows == RowSource::Total {
        return Err(Error::UnsupportedShape {
            operator: "count",
            reason: "counting grouped results is not supported".to_string(),
        });
    }

    let key_body = values::lambda_body(key_lambda, "group_by")?;
    let key = match key_body {
        Expr::Constant(value) => GroupKey::Constant(value),
        Expr::Field { .. } => {
            let (path, _ty) = values::field_path(key_body).ok_or_else(|| {
                Error::InvalidGrouping("grouping keys must be fields of the document".to_string())
            })?;
            GroupKey::Field {
                key_field: env.field(&path),
            }
        }
        other => {
            return Err(Error::InvalidGrouping(format!(
                "cannot group by a {}",
                other.kind_name()
            )))
        }
    };

    let body = values::lambda_body(select_lambda, "select")?;
    let projector = rebind(env, state, &key, body)?;

    state.projector = Some(projector);
    state.rows = RowSource::Facets {
        grouped: matches!(key, GroupKey::Field { .. }),
    };
    Ok(())
}

/// Rebind a grouped projection body onto facet read-backs.
fn rebind(env: &Env, state: &mut State, key: &GroupKey, expr: &Expr) -> Result<Projector, Error> {
    match expr {
        Expr::Call {
            target: Some(target),
            function,
            args,
        } if target.is_param(GROUP_PARAM) => aggregate_call(env, state, key, *function, args),
        Expr::New { members } => {
            let mut projected = Vec::with_capacity(members.len());
            for (name, member) in members {
                projected.push((name.clone(), rebind(env, state, key, member)?));
            }
            Ok(Projector::Record(projected))
        }
        Expr::Constant(value) => Ok(Projector::Literal(value.to_json())),
        other => Err(Error::UnsupportedShape {
            operator: "select",
            reason: format!(
                "a grouped projection is built from aggregates, found a {}",
                other.kind_name()
            ),
        }),
    }
}

fn aggregate_call(
    env: &Env,
    state: &mut State,
    key: &GroupKey,
    function: Function,
    args: &[Expr],
) -> Result<Projector, Error> {
    match function {
        Function::Key => Ok(match key {
            // grouping by a constant makes the key a known value
            GroupKey::Constant(value) => Projector::Literal(value.to_json()),
            GroupKey::Field { .. } => Projector::GroupKey,
        }),
        Function::Min => member_aggregate(env, state, key, function, args, StatKey::Min),
        Function::Max => member_aggregate(env, state, key, function, args, StatKey::Max),
        Function::Sum => member_aggregate(env, state, key, function, args, StatKey::Total),
        Function::Average => member_aggregate(env, state, key, function, args, StatKey::Mean),
        Function::Count => translate_count(env, state, key, args),
        other => Err(Error::UnsupportedOperator(other.name())),
    }
}

/// Member aggregates read one statistic of one field: a statistical
/// facet per field when termless, a terms-stats facet per field when
/// grouped. The facet borrows the mapped value field's name.
fn member_aggregate(
    env: &Env,
    state: &mut State,
    key: &GroupKey,
    function: Function,
    args: &[Expr],
    stat: StatKey,
) -> Result<Projector, Error> {
    let operator = function.name();
    let value_lambda = args.first().ok_or(Error::MissingArgument { operator })?;
    let value_body = values::lambda_body(value_lambda, operator)?;
    let (path, _ty) = values::field_path(value_body).ok_or_else(|| Error::UnsupportedShape {
        operator,
        reason: "aggregates apply to a single field".to_string(),
    })?;
    let value_field = env.field(&path);
    let name = value_field.0.clone();

    let facet = match key {
        GroupKey::Field { key_field } => Facet::TermsStats {
            name: name.clone(),
            key_field: key_field.clone(),
            value_field,
            size: state.request.size,
            filter: None,
        },
        GroupKey::Constant(_) => Facet::Statistical {
            name: name.clone(),
            field: value_field,
            filter: None,
        },
    };
    push_facet(state, facet);
    Ok(Projector::Aggregate { facet: name, stat })
}

/// Plain counts share one synthetic facet; predicate counts each get a
/// positional one so several in one projection stay distinguishable.
fn translate_count(
    env: &Env,
    state: &mut State,
    key: &GroupKey,
    args: &[Expr],
) -> Result<Projector, Error> {
    let (name, filter) = match args.first() {
        None => (SmolStr::new(GROUP_KEY_FACET), None),
        Some(predicate) => {
            let criteria = filtering::translate_predicate(env, predicate)?;
            (state.make_filter_facet_name(), Some(criteria))
        }
    };

    let facet = match key {
        GroupKey::Field { key_field } => Facet::Terms {
            name: name.clone(),
            field: key_field.clone(),
            size: state.request.size,
            filter,
        },
        GroupKey::Constant(_) => Facet::Filter {
            name: name.clone(),
            filter: filter.unwrap_or(Criteria::MatchAll),
        },
    };
    push_facet(state, facet);
    Ok(Projector::Aggregate {
        facet: name,
        stat: StatKey::Count,
    })
}

/// Facets deduplicate by whole-value equality: asking for the same
/// statistic twice reads the same facet.
fn push_facet(state: &mut State, facet: Facet) {
    if !state.request.facets.contains(&facet) {
        state.request.facets.push(facet);
    }
}
