//! Translate ordering operators.

use query_engine_expr::expr::ast::{Expr, MetaField};
use query_engine_search::search::ast::{FieldName, SortOption};

use super::values;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, State};

/// Convert one ordering key selector into a sort entry on the request.
///
/// Ordering operators are walked outermost first, so each entry goes to
/// the front of the list: `order_by(a).then_by(b)` is seen as `then_by`
/// around `order_by` and must still sort by `a` before `b`.
pub fn translate_order_by(
    env: &Env,
    state: &mut State,
    lambda: &Expr,
    ascending: bool,
) -> Result<(), Error> {
    let body = values::lambda_body(lambda, "order_by")?;
    let option = match body {
        Expr::Meta(MetaField::Score) => SortOption {
            field: FieldName::new(MetaField::Score.field_name()),
            ascending,
            ignore_unmapped: false,
        },
        Expr::Meta(MetaField::Id) => {
            return Err(Error::UnsupportedShape {
                operator: "order_by",
                reason: "ordering by the document id is not supported".to_string(),
            })
        }
        Expr::Field { .. } => {
            let (path, ty) = values::field_path(body).ok_or_else(|| Error::UnsupportedShape {
                operator: "order_by",
                reason: "ordering keys must be fields of the document".to_string(),
            })?;
            SortOption {
                field: env.field(&path),
                // documents can legitimately lack an optional field
                ignore_unmapped: ty.optional,
                ascending,
            }
        }
        other => {
            return Err(Error::UnsupportedShape {
                operator: "order_by",
                reason: format!("cannot order by a {}", other.kind_name()),
            })
        }
    };
    state.request.sort.insert(0, option);
    Ok(())
}
