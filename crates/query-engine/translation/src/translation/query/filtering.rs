//! Translate boolean predicate fragments into criteria.

use query_engine_expr::expr::ast::{BinaryOp, Expr, Function};
use query_engine_expr::expr::value::Value;
use query_engine_search::search::ast::{Criteria, FieldName, RangeComparison, TermsExecutionMode};
use query_engine_search::search::helpers::{
    and, exists, missing, not, or, prefix, range, regexp, term, terms, terms_with_execution,
};

use super::values;
use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// Translate a predicate lambda into criteria.
pub fn translate_predicate(env: &Env, lambda: &Expr) -> Result<Criteria, Error> {
    translate_criteria(env, values::lambda_body(lambda, "where")?)
}

fn translate_criteria(env: &Env, expr: &Expr) -> Result<Criteria, Error> {
    match expr {
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => Ok(and(vec![
            translate_criteria(env, left)?,
            translate_criteria(env, right)?,
        ])),
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => Ok(or(vec![
            translate_criteria(env, left)?,
            translate_criteria(env, right)?,
        ])),
        Expr::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } => translate_equality(env, left, right, false),
        Expr::Binary {
            op: BinaryOp::Ne,
            left,
            right,
        } => translate_equality(env, left, right, true),
        Expr::Binary { op, left, right } if op.is_relational() => {
            translate_range(env, *op, left, right)
        }
        Expr::Binary { op, .. } => Err(Error::UnsupportedOperator(op.symbol())),
        Expr::Not(inner) => translate_negation(env, inner),
        Expr::Call {
            target,
            function,
            args,
        } => translate_call(env, target.as_deref(), *function, args),
        // a bare boolean field reads as a test against true
        Expr::Field { .. } => boolean_field(env, expr, true),
        Expr::Constant(Value::Bool(true)) => Ok(Criteria::MatchAll),
        Expr::Constant(Value::Bool(false)) => Ok(not(Criteria::MatchAll)),
        other => Err(Error::UnsupportedShape {
            operator: "where",
            reason: format!("cannot build criteria from a {}", other.kind_name()),
        }),
    }
}

fn translate_equality(
    env: &Env,
    left: &Expr,
    right: &Expr,
    negated: bool,
) -> Result<Criteria, Error> {
    if let Some(criteria) = presence_comparison(env, left, right, negated)? {
        return Ok(criteria);
    }
    let comparison = values::constant_and_field(left, right).ok_or_else(|| {
        Error::UnsupportedShape {
            operator: if negated { "!=" } else { "==" },
            reason: "equality needs a field on one side and a constant on the other".to_string(),
        }
    })?;
    let field = env.field(&comparison.path);
    if comparison.value.is_null() {
        return Ok(if negated { exists(field) } else { missing(field) });
    }
    let criteria = term(field, comparison.value.clone());
    Ok(if negated { not(criteria) } else { criteria })
}

/// `has_value` compared against a boolean constant, in either operand
/// order, is a presence test.
fn presence_comparison(
    env: &Env,
    left: &Expr,
    right: &Expr,
    negated: bool,
) -> Result<Option<Criteria>, Error> {
    let (call, level) = match (left, right) {
        (
            call @ Expr::Call {
                function: Function::HasValue,
                ..
            },
            Expr::Constant(Value::Bool(level)),
        ) => (call, *level),
        (
            Expr::Constant(Value::Bool(level)),
            call @ Expr::Call {
                function: Function::HasValue,
                ..
            },
        ) => (call, *level),
        _ => return Ok(None),
    };
    let target = match call {
        Expr::Call { target, .. } => target.as_deref(),
        _ => None,
    };
    presence_criteria(env, target, level != negated).map(Some)
}

fn presence_criteria(env: &Env, target: Option<&Expr>, present: bool) -> Result<Criteria, Error> {
    let target = target.ok_or(Error::MissingArgument {
        operator: "has_value",
    })?;
    let (path, _ty) = values::field_path(target).ok_or_else(|| Error::UnsupportedShape {
        operator: "has_value",
        reason: "presence tests apply to a field".to_string(),
    })?;
    let field = env.field(&path);
    Ok(if present { exists(field) } else { missing(field) })
}

fn translate_range(env: &Env, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Criteria, Error> {
    let comparison = values::constant_and_field(left, right).ok_or_else(|| {
        Error::UnsupportedShape {
            operator: op.symbol(),
            reason: "comparisons need a field on one side and a constant on the other".to_string(),
        }
    })?;
    Ok(range(
        env.field(&comparison.path),
        range_comparison(op, comparison.swapped),
        comparison.value.clone(),
    ))
}

/// The wire comparison for a relational operator, inverted when the
/// constant was written on the left (`5 > x` means `x < 5`).
fn range_comparison(op: BinaryOp, swapped: bool) -> RangeComparison {
    match (op, swapped) {
        (BinaryOp::Lt, false) | (BinaryOp::Gt, true) => RangeComparison::LessThan,
        (BinaryOp::Le, false) | (BinaryOp::Ge, true) => RangeComparison::LessThanOrEqual,
        (BinaryOp::Gt, false) | (BinaryOp::Lt, true) => RangeComparison::GreaterThan,
        (_, _) => RangeComparison::GreaterThanOrEqual,
    }
}

fn translate_negation(env: &Env, inner: &Expr) -> Result<Criteria, Error> {
    match inner {
        // a negated bare boolean field reads as a test against false
        Expr::Field { .. } => boolean_field(env, inner, false),
        Expr::Call {
            target,
            function: Function::HasValue,
            ..
        } => presence_criteria(env, target.as_deref(), false),
        other => Ok(not(translate_criteria(env, other)?)),
    }
}

fn boolean_field(env: &Env, expr: &Expr, level: bool) -> Result<Criteria, Error> {
    let (path, _ty) = values::field_path(expr).ok_or_else(|| Error::UnsupportedShape {
        operator: "where",
        reason: "a bare predicate must be a boolean field".to_string(),
    })?;
    Ok(term(env.field(&path), level))
}

fn translate_call(
    env: &Env,
    target: Option<&Expr>,
    function: Function,
    args: &[Expr],
) -> Result<Criteria, Error> {
    match function {
        Function::Contains => translate_contains(env, target, args),
        Function::ContainsAny => {
            extension_terms(env, target, args, TermsExecutionMode::Bool, "contains_any")
        }
        Function::ContainsAll => {
            extension_terms(env, target, args, TermsExecutionMode::And, "contains_all")
        }
        Function::Regexp => {
            let field = call_field(env, target, "regexp")?;
            let pattern = values::constant_str(first_arg(args, "regexp")?, "regexp")?;
            Ok(regexp(field, pattern))
        }
        Function::Prefix => {
            let field = call_field(env, target, "prefix")?;
            let text = values::constant_str(first_arg(args, "prefix")?, "prefix")?;
            Ok(prefix(field, text))
        }
        Function::HasValue => presence_criteria(env, target, true),
        other => Err(Error::UnsupportedOperator(other.name())),
    }
}

/// Membership reads either way round: a constant list containing a
/// field, or a list-valued field containing a constant.
fn translate_contains(env: &Env, target: Option<&Expr>, args: &[Expr]) -> Result<Criteria, Error> {
    let receiver = target.ok_or(Error::MissingArgument {
        operator: "contains",
    })?;
    let item = first_arg(args, "contains")?;

    if let Some(Value::List(constants)) = receiver.as_constant() {
        let (path, _ty) = values::field_path(item).ok_or_else(|| Error::UnsupportedShape {
            operator: "contains",
            reason: "a constant list can only contain a field".to_string(),
        })?;
        let field = env.field(&path);
        let non_null: Vec<Value> = constants
            .iter()
            .filter(|value| !value.is_null())
            .cloned()
            .collect();
        let has_null = non_null.len() != constants.len();
        // a terms criteria cannot express "absent", so a null in the
        // list splits into a disjunction with missing
        return Ok(if non_null.is_empty() && has_null {
            missing(field)
        } else if has_null {
            or(vec![terms(field.clone(), non_null), missing(field)])
        } else {
            terms(field, non_null)
        });
    }

    if let (Some((path, _ty)), Some(value)) = (values::field_path(receiver), item.as_constant()) {
        return Ok(terms(env.field(&path), vec![value.clone()]));
    }

    Err(Error::UnsupportedShape {
        operator: "contains",
        reason: "membership needs a constant list and a field".to_string(),
    })
}

fn extension_terms(
    env: &Env,
    target: Option<&Expr>,
    args: &[Expr],
    execution: TermsExecutionMode,
    operator: &'static str,
) -> Result<Criteria, Error> {
    let field = call_field(env, target, operator)?;
    let constants = match first_arg(args, operator)?.as_constant() {
        Some(Value::List(constants)) => constants.clone(),
        Some(value) => vec![value.clone()],
        None => {
            return Err(Error::UnsupportedShape {
                operator,
                reason: "expected constant values".to_string(),
            })
        }
    };
    Ok(terms_with_execution(field, constants, execution))
}

fn call_field(
    env: &Env,
    target: Option<&Expr>,
    operator: &'static str,
) -> Result<FieldName, Error> {
    let target = target.ok_or(Error::MissingArgument { operator })?;
    let (path, _ty) = values::field_path(target).ok_or_else(|| Error::UnsupportedShape {
        operator,
        reason: "this operation applies to a field".to_string(),
    })?;
    Ok(env.field(&path))
}

fn first_arg<'a>(args: &'a [Expr], operator: &'static str) -> Result<&'a Expr, Error> {
    args.first().ok_or(Error::MissingArgument { operator })
}
