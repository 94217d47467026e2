//! Operand extraction shared by the translation rules.

use smol_str::SmolStr;

use query_engine_expr::expr::ast::{Expr, Ty};
use query_engine_expr::expr::value::Value;

use crate::translation::error::Error;

/// A comparison's operands, normalized so the field is on the left.
#[derive(Debug)]
pub struct ConstantAndField<'a> {
    pub value: &'a Value,
    /// Dotted member path of the field operand.
    pub path: String,
    pub ty: Ty,
    /// True when the constant was written on the left, in which case
    /// relational comparisons must invert.
    pub swapped: bool,
}

/// The single normalization step every comparison rule goes through:
/// one operand must be a constant and the other a field, in either
/// order.
pub fn constant_and_field<'a>(left: &'a Expr, right: &'a Expr) -> Option<ConstantAndField<'a>> {
    match (left.as_constant(), right.as_constant()) {
        (None, Some(value)) => {
            let (path, ty) = field_path(left)?;
            Some(ConstantAndField {
                value,
                path,
                ty,
                swapped: false,
            })
        }
        (Some(value), None) => {
            let (path, ty) = field_path(right)?;
            Some(ConstantAndField {
                value,
                path,
                ty,
                swapped: true,
            })
        }
        _ => None,
    }
}

/// The dotted member path of a field access rooted in a parameter,
/// with the leaf field's type.
pub fn field_path(expr: &Expr) -> Option<(String, Ty)> {
    match expr {
        Expr::Field { owner, name, ty } => match owner.as_ref() {
            Expr::Param(_) => Some((name.to_string(), ty.clone())),
            nested @ Expr::Field { .. } => {
                let (prefix, _) = field_path(nested)?;
                Some((format!("{prefix}.{name}"), ty.clone()))
            }
            _ => None,
        },
        _ => None,
    }
}

/// The body of a lambda operand.
pub fn lambda_body<'a>(expr: &'a Expr, operator: &'static str) -> Result<&'a Expr, Error> {
    match expr {
        Expr::Lambda { body, .. } => Ok(body),
        other => Err(Error::UnsupportedShape {
            operator,
            reason: format!("expected a lambda, found a {}", other.kind_name()),
        }),
    }
}

/// A non-negative integer constant operand, as paging operators take.
pub fn constant_u64(expr: &Expr, operator: &'static str) -> Result<u64, Error> {
    match expr.as_constant() {
        Some(Value::Int(count)) => u64::try_from(*count).map_err(|_| Error::UnsupportedShape {
            operator,
            reason: "expected a non-negative count".to_string(),
        }),
        _ => Err(Error::UnsupportedShape {
            operator,
            reason: "expected an integer constant".to_string(),
        }),
    }
}

/// A string constant operand.
pub fn constant_str(expr: &Expr, operator: &'static str) -> Result<SmolStr, Error> {
    match expr.as_constant() {
        Some(Value::Str(text)) => Ok(text.clone()),
        _ => Err(Error::UnsupportedShape {
            operator,
            reason: "expected a string constant".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_expr::expr::builder::{field, lit};

    #[test]
    fn fields_normalize_to_the_left() {
        let left = field("Salary");
        let right = lit(50_000);
        let comparison = constant_and_field(&left, &right).unwrap();
        assert_eq!(comparison.path, "Salary");
        assert_eq!(comparison.value, &Value::Int(50_000));
        assert!(!comparison.swapped);

        let comparison = constant_and_field(&right, &left).unwrap();
        assert_eq!(comparison.path, "Salary");
        assert!(comparison.swapped);
    }

    #[test]
    fn two_constants_or_two_fields_do_not_normalize() {
        assert!(constant_and_field(&lit(1), &lit(2)).is_none());
        assert!(constant_and_field(&field("A"), &field("B")).is_none());
    }

    #[test]
    fn nested_field_accesses_join_with_dots() {
        let nested = match field("Address") {
            Expr::Field { owner, name, ty } => Expr::Field {
                owner: Box::new(Expr::Field { owner, name, ty }),
                name: "ZipCode".into(),
                ty: Ty::default(),
            },
            other => other,
        };
        let (path, _) = field_path(&nested).unwrap();
        assert_eq!(path, "Address.ZipCode");
    }

    #[test]
    fn paging_counts_must_be_non_negative_integers() {
        assert_eq!(constant_u64(&lit(73), "take").unwrap(), 73);
        assert!(constant_u64(&lit(-1), "take").is_err());
        assert!(constant_u64(&lit("many"), "take").is_err());
    }
}
