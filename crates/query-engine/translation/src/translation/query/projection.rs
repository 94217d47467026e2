//! Rewrite result-shaping projections.
//!
//! A projection decides two things at once: which stored fields the
//! request needs to fetch, and the projector that rebuilds the caller's
//! shape from a response hit.

use query_engine_expr::expr::ast::{Expr, MetaField};
use query_engine_response::response::materialize::Projector;

use super::values;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, State};

pub fn translate_select(env: &Env, state: &mut State, lambda: &Expr) -> Result<(), Error> {
    let (param, body) = match lambda {
        Expr::Lambda { param, body } => (param, body.as_ref()),
        other => {
            return Err(Error::UnsupportedShape {
                operator: "select",
                reason: format!("expected a lambda, found a {}", other.kind_name()),
            })
        }
    };

    let projector = match body {
        // identity projection: the whole document, no field restriction
        body if body.is_param(&param.name) => Projector::Source,
        Expr::Field { .. } => Projector::Field(select_field(env, state, body)?),
        Expr::Meta(meta) => meta_projector(*meta),
        Expr::Constant(value) => Projector::Literal(value.to_json()),
        Expr::New { members } => {
            let mut projected = Vec::with_capacity(members.len());
            let mut whole_document = false;
            for (name, member) in members {
                let member_projector = match member {
                    member if member.is_param(&param.name) => {
                        whole_document = true;
                        Projector::Source
                    }
                    Expr::Field { .. } => Projector::Field(select_field(env, state, member)?),
                    Expr::Meta(meta) => meta_projector(*meta),
                    Expr::Constant(value) => Projector::Literal(value.to_json()),
                    other => {
                        return Err(Error::UnsupportedShape {
                            operator: "select",
                            reason: format!("cannot project a {}", other.kind_name()),
                        })
                    }
                };
                projected.push((name.clone(), member_projector));
            }
            // mixing the whole document in means the source payload is
            // needed; field members then read from it instead of the
            // restricted field list
            if whole_document {
                state.request.fields.clear();
            }
            Projector::Record(projected)
        }
        other => {
            return Err(Error::UnsupportedShape {
                operator: "select",
                reason: format!("cannot project a {}", other.kind_name()),
            })
        }
    };

    state.projector = Some(projector);
    Ok(())
}

/// Resolve a projected field, recording it in the request's fetch set.
fn select_field(
    env: &Env,
    state: &mut State,
    member: &Expr,
) -> Result<smol_str::SmolStr, Error> {
    let (path, _ty) = values::field_path(member).ok_or_else(|| Error::UnsupportedShape {
        operator: "select",
        reason: "projected members must be fields of the document".to_string(),
    })?;
    let field = env.field(&path);
    state.request.fields.insert(field.clone());
    Ok(field.0)
}

fn meta_projector(meta: MetaField) -> Projector {
    match meta {
        MetaField::Score => Projector::Score,
        MetaField::Id => Projector::Id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_expr::expr::ast::Param;
    use query_engine_expr::expr::builder::{doc, doc_id, field, lit, record, score};
    use query_engine_mapping::mapping::DefaultMapping;

    fn select(projection: Expr) -> Result<State, Error> {
        let env = Env::new(&DefaultMapping, "Employee".into());
        let mut state = State::new();
        let lambda = Expr::lambda(Param::element(), projection);
        translate_select(&env, &mut state, &lambda)?;
        Ok(state)
    }

    fn fetched(state: &State) -> Vec<&str> {
        state.request.fields.iter().map(|f| f.as_str()).collect()
    }

    #[test]
    fn a_single_field_restricts_the_fetch_set_to_itself() {
        let state = select(field("HourlyWage")).unwrap();
        assert_eq!(fetched(&state), vec!["hourlyWage"]);
        assert_eq!(
            state.projector,
            Some(Projector::Field("hourlyWage".into()))
        );
    }

    #[test]
    fn a_record_collects_every_member_field() {
        let state = select(record([
            ("id", field("Id")),
            ("wage", field("HourlyWage")),
        ]))
        .unwrap();
        assert_eq!(fetched(&state), vec!["id", "hourlyWage"]);
        assert_eq!(
            state.projector,
            Some(Projector::Record(vec![
                ("id".into(), Projector::Field("id".into())),
                ("wage".into(), Projector::Field("hourlyWage".into())),
            ]))
        );
    }

    #[test]
    fn the_identity_projection_fetches_everything() {
        let state = select(doc()).unwrap();
        assert!(fetched(&state).is_empty());
        assert_eq!(state.projector, Some(Projector::Source));
    }

    #[test]
    fn pseudo_fields_read_from_hit_metadata() {
        let state = select(record([("id", doc_id()), ("rank", score())])).unwrap();
        assert!(fetched(&state).is_empty());
        assert_eq!(
            state.projector,
            Some(Projector::Record(vec![
                ("id".into(), Projector::Id),
                ("rank".into(), Projector::Score),
            ]))
        );
    }

    #[test]
    fn mixing_the_whole_document_lifts_the_field_restriction() {
        let state = select(record([
            ("employee", doc()),
            ("rank", score()),
            ("wage", field("HourlyWage")),
        ]))
        .unwrap();
        assert!(fetched(&state).is_empty());
        assert_eq!(
            state.projector,
            Some(Projector::Record(vec![
                ("employee".into(), Projector::Source),
                ("rank".into(), Projector::Score),
                ("wage".into(), Projector::Field("hourlyWage".into())),
            ]))
        );
    }

    #[test]
    fn constant_members_become_literals() {
        let state = select(record([("kind", lit("employee")), ("id", field("Id"))])).unwrap();
        assert_eq!(
            state.projector,
            Some(Projector::Record(vec![
                ("kind".into(), Projector::Literal(serde_json::json!("employee"))),
                ("id".into(), Projector::Field("id".into())),
            ]))
        );
    }

    #[test]
    fn computed_members_are_rejected() {
        let error = select(record([("double", field("Wage") + field("Wage"))])).unwrap_err();
        assert!(matches!(
            error,
            Error::UnsupportedShape {
                operator: "select",
                ..
            }
        ));
    }
}
