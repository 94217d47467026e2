//! Partial evaluation of query trees.
//!
//! Subtrees that cannot reference the data source are interpreted ahead
//! of translation and replaced by a single constant node, so the rest of
//! the engine only ever sees literal constants opposite fields. A node is
//! eligible when it is a constant, a binary operator, a negation, or a
//! membership test, and every node below it is eligible too; parameters,
//! fields, lambdas, pseudo-fields and backend operator calls are not, and
//! veto every ancestor. Each maximal eligible subtree is evaluated
//! exactly once.

use thiserror::Error;

use crate::expr::ast::{BinaryOp, Expr, Function};
use crate::expr::value::Value;

/// A constant subtree failed to evaluate. Surfaced as a translation
/// failure; the tree is not partially rewritten.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("cannot apply {op} to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("division by zero in a constant expression")]
    DivisionByZero,
    #[error("constant arithmetic overflowed")]
    Overflow,
    #[error("{kind} is not a constant expression")]
    NotConstant { kind: &'static str },
}

/// Replace every maximal constant subtree with its evaluated value.
pub fn partial_evaluate(expr: &Expr) -> Result<Expr, EvalError> {
    seal(fold(expr)?)
}

/// A rebuilt subtree, tagged with whether the whole subtree is still
/// eligible for evaluation by an enclosing node.
enum Folded {
    Closed(Expr),
    Open(Expr),
}

fn fold(expr: &Expr) -> Result<Folded, EvalError> {
    match expr {
        Expr::Constant(_) => Ok(Folded::Closed(expr.clone())),

        Expr::Binary { op, left, right } => {
            let left = fold(left)?;
            let right = fold(right)?;
            match (left, right) {
                (Folded::Closed(left), Folded::Closed(right)) => {
                    Ok(Folded::Closed(Expr::binary(*op, left, right)))
                }
                (left, right) => Ok(Folded::Open(Expr::binary(*op, seal(left)?, seal(right)?))),
            }
        }

        Expr::Not(inner) => match fold(inner)? {
            Folded::Closed(inner) => Ok(Folded::Closed(Expr::Not(Box::new(inner)))),
            open => Ok(Folded::Open(Expr::Not(Box::new(seal(open)?)))),
        },

        Expr::Call {
            target,
            function,
            args,
        } => {
            let folded_target = target.as_deref().map(fold).transpose()?;
            let folded_args = args.iter().map(fold).collect::<Result<Vec<_>, _>>()?;

            // Membership tests over constants are the one call the
            // interpreter understands; everything else stays symbolic.
            if *function == Function::Contains {
                let all_closed = folded_target
                    .iter()
                    .chain(folded_args.iter())
                    .all(|folded| matches!(folded, Folded::Closed(_)));
                if all_closed {
                    return Ok(Folded::Closed(rebuild_call(
                        folded_target,
                        *function,
                        folded_args,
                    )?));
                }
            }

            let target = folded_target.map(seal).transpose()?;
            let args = folded_args.into_iter().map(seal).collect::<Result<_, _>>()?;
            Ok(Folded::Open(Expr::Call {
                target: target.map(Box::new),
                function: *function,
                args,
            }))
        }

        Expr::Lambda { param, body } => Ok(Folded::Open(Expr::Lambda {
            param: param.clone(),
            body: Box::new(seal(fold(body)?)?),
        })),

        Expr::New { members } => {
            let members = members
                .iter()
                .map(|(name, member)| Ok((name.clone(), seal(fold(member)?)?)))
                .collect::<Result<Vec<_>, EvalError>>()?;
            Ok(Folded::Open(Expr::New { members }))
        }

        Expr::Source { .. }
        | Expr::Param(_)
        | Expr::Field { .. }
        | Expr::Meta(_) => Ok(Folded::Open(expr.clone())),
    }
}

/// Evaluate a still-closed subtree; pass an open one through untouched.
fn seal(folded: Folded) -> Result<Expr, EvalError> {
    match folded {
        Folded::Closed(expr) => Ok(Expr::Constant(eval(&expr)?)),
        Folded::Open(expr) => Ok(expr),
    }
}

fn rebuild_call(
    target: Option<Folded>,
    function: Function,
    args: Vec<Folded>,
) -> Result<Expr, EvalError> {
    let unwrap = |folded: Folded| match folded {
        Folded::Closed(expr) | Folded::Open(expr) => expr,
    };
    Ok(Expr::Call {
        target: target.map(unwrap).map(Box::new),
        function,
        args: args.into_iter().map(unwrap).collect(),
    })
}

/// Interpret a closed expression down to a value.
fn eval(expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),

        Expr::Not(inner) => match eval(inner)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvalError::TypeMismatch {
                op: "!",
                left: other.kind_name(),
                right: "nothing",
            }),
        },

        Expr::Binary { op, left, right } => apply_binary(*op, &eval(left)?, &eval(right)?),

        Expr::Call {
            target: Some(target),
            function: Function::Contains,
            args,
        } if args.len() == 1 => {
            let list = eval(target)?;
            let item = eval(&args[0])?;
            match list {
                Value::List(items) => Ok(Value::Bool(items.contains(&item))),
                other => Err(EvalError::TypeMismatch {
                    op: "contains",
                    left: other.kind_name(),
                    right: item.kind_name(),
                }),
            }
        }

        other => Err(EvalError::NotConstant {
            kind: other.kind_name(),
        }),
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(if op == BinaryOp::And {
                *l && *r
            } else {
                *l || *r
            })),
            _ => Err(mismatch(op, left, right)),
        },

        BinaryOp::Eq | BinaryOp::Ne => {
            // Numeric operands equate under the same Int/Float promotion
            // the relational operators use.
            let equal = match (left, right) {
                (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                    compare(left, right) == Some(std::cmp::Ordering::Equal)
                }
                _ => left == right,
            };
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right).ok_or_else(|| mismatch(op, left, right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, left, right)
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        (Value::Float(l), Value::Float(r)) => l.partial_cmp(r),
        (Value::Int(l), Value::Float(r)) => (*l as f64).partial_cmp(r),
        (Value::Float(l), Value::Int(r)) => l.partial_cmp(&(*r as f64)),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    // Nulls propagate through arithmetic rather than failing.
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => match op {
            BinaryOp::Add => l.checked_add(*r).map(Value::Int).ok_or(EvalError::Overflow),
            BinaryOp::Sub => l.checked_sub(*r).map(Value::Int).ok_or(EvalError::Overflow),
            BinaryOp::Mul => l.checked_mul(*r).map(Value::Int).ok_or(EvalError::Overflow),
            _ => {
                if *r == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Value::Int(l / r))
                }
            }
        },
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let l = as_f64(left);
            let r = as_f64(right);
            Ok(Value::Float(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                _ => l / r,
            }))
        }
        (Value::Str(l), Value::Str(r)) if op == BinaryOp::Add => {
            Ok(Value::Str(format!("{l}{r}").into()))
        }
        _ => Err(mismatch(op, left, right)),
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.symbol(),
        left: left.kind_name(),
        right: right.kind_name(),
    }
}
