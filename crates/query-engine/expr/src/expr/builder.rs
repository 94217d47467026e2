//! Combinators for building query trees.
//!
//! The builder is deliberately unintelligent: every function here only
//! assembles [`Expr`] nodes. Normalization (operand order, boolean field
//! shortcuts, double negation) is translation's job, so hand-assembled
//! trees and builder-assembled trees go through identical rules.

use smol_str::SmolStr;

use crate::expr::ast::{BinaryOp, Expr, Function, MetaField, Param, Ty};
use crate::expr::value::Value;

/// A captured constant.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

/// The null constant.
pub fn null() -> Expr {
    Expr::Constant(Value::Null)
}

/// A field of the document element, by store path. Dotted names address
/// nested documents (`"address.zip_code"`).
pub fn field(name: impl Into<SmolStr>) -> Expr {
    Expr::Field {
        owner: Box::new(Expr::Param(Param::element())),
        name: name.into(),
        ty: Ty::default(),
    }
}

/// The whole document element, for identity and decorated projections.
pub fn doc() -> Expr {
    Expr::Param(Param::element())
}

/// The relevance score pseudo-field.
pub fn score() -> Expr {
    Expr::Meta(MetaField::Score)
}

/// The document id pseudo-field.
pub fn doc_id() -> Expr {
    Expr::Meta(MetaField::Id)
}

/// An anonymous record with named members, for projections.
pub fn record<N: Into<SmolStr>>(members: impl IntoIterator<Item = (N, Expr)>) -> Expr {
    Expr::New {
        members: members
            .into_iter()
            .map(|(name, expr)| (name.into(), expr))
            .collect(),
    }
}

impl Expr {
    #[must_use]
    pub fn eq(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Eq, self, other)
    }

    #[must_use]
    pub fn ne(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Ne, self, other)
    }

    #[must_use]
    pub fn lt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Lt, self, other)
    }

    #[must_use]
    pub fn lte(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Le, self, other)
    }

    #[must_use]
    pub fn gt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Gt, self, other)
    }

    #[must_use]
    pub fn gte(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Ge, self, other)
    }

    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::And, self, other)
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Or, self, other)
    }

    /// Membership test. Reads either way round: a constant list containing
    /// a field, or a list-valued field containing a constant.
    #[must_use]
    pub fn contains(self, item: Expr) -> Expr {
        self.call(Function::Contains, vec![item])
    }

    /// True when the field holds any of the given values.
    #[must_use]
    pub fn contains_any<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        self.call(Function::ContainsAny, vec![Expr::Constant(list)])
    }

    /// True when the field holds all of the given values.
    #[must_use]
    pub fn contains_all<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        self.call(Function::ContainsAll, vec![Expr::Constant(list)])
    }

    /// Regular expression match on a field.
    #[must_use]
    pub fn regexp(self, pattern: impl Into<SmolStr>) -> Expr {
        self.call(
            Function::Regexp,
            vec![Expr::Constant(Value::Str(pattern.into()))],
        )
    }

    /// Prefix match on a field.
    #[must_use]
    pub fn prefix(self, text: impl Into<SmolStr>) -> Expr {
        self.call(
            Function::Prefix,
            vec![Expr::Constant(Value::Str(text.into()))],
        )
    }

    /// Presence test on an optional field.
    #[must_use]
    pub fn has_value(self) -> Expr {
        self.call(Function::HasValue, vec![])
    }

    /// Mark a field as optional in the store. Affects only field nodes.
    #[must_use]
    pub fn optional(self) -> Expr {
        match self {
            Expr::Field {
                owner,
                name,
                mut ty,
            } => {
                ty.optional = true;
                Expr::Field { owner, name, ty }
            }
            other => other,
        }
    }

    fn call(self, function: Function, args: Vec<Expr>) -> Expr {
        Expr::Call {
            target: Some(Box::new(self)),
            function,
            args,
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl std::ops::BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, other: Expr) -> Expr {
        self.and(other)
    }
}

impl std::ops::BitOr for Expr {
    type Output = Expr;

    fn bitor(self, other: Expr) -> Expr {
        self.or(other)
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, other)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, other)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, other)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;

    fn div(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, self, other)
    }
}

/// Aggregate combinators usable inside a projection over a grouped source.
pub mod group {
    use super::{Expr, Function, Param};

    /// The group key.
    pub fn key() -> Expr {
        call(Function::Key, vec![])
    }

    /// Smallest value of the selected field within the group.
    pub fn min(value: Expr) -> Expr {
        aggregate(Function::Min, value)
    }

    /// Largest value of the selected field within the group.
    pub fn max(value: Expr) -> Expr {
        aggregate(Function::Max, value)
    }

    /// Sum of the selected field within the group.
    pub fn sum(value: Expr) -> Expr {
        aggregate(Function::Sum, value)
    }

    /// Mean of the selected field within the group.
    pub fn average(value: Expr) -> Expr {
        aggregate(Function::Average, value)
    }

    /// Number of documents in the group.
    pub fn count() -> Expr {
        call(Function::Count, vec![])
    }

    /// Number of documents in the group matching a predicate.
    pub fn count_where(predicate: Expr) -> Expr {
        call(
            Function::Count,
            vec![Expr::lambda(Param::element(), predicate)],
        )
    }

    fn aggregate(function: Function, value: Expr) -> Expr {
        call(function, vec![Expr::lambda(Param::element(), value)])
    }

    fn call(function: Function, args: Vec<Expr>) -> Expr {
        Expr::Call {
            target: Some(Box::new(Expr::Param(Param::group()))),
            function,
            args,
        }
    }
}

/// Chain builder over a typed document source.
///
/// Operators apply left to right; internally each one wraps the tree so
/// far in a [`Expr::Call`] node, the same shape translation walks back
/// from the outside in.
#[derive(Debug, Clone)]
pub struct Query {
    expr: Expr,
    doc_type: SmolStr,
}

impl Query {
    /// Start a query over the named logical document type.
    pub fn source(doc_type: impl Into<SmolStr>) -> Self {
        let doc_type = doc_type.into();
        Query {
            expr: Expr::Source {
                doc_type: doc_type.clone(),
            },
            doc_type,
        }
    }

    /// Restrict results without affecting relevance scoring.
    #[must_use]
    pub fn filter(self, predicate: Expr) -> Self {
        self.chain_lambda(Function::Where, predicate)
    }

    /// Restrict results with relevance scoring.
    #[must_use]
    pub fn query(self, predicate: Expr) -> Self {
        self.chain_lambda(Function::Query, predicate)
    }

    /// Full-text query string search.
    #[must_use]
    pub fn query_string(self, text: impl Into<SmolStr>) -> Self {
        let text = Expr::Constant(Value::Str(text.into()));
        self.chain(Function::QueryString, vec![text])
    }

    /// Shape each result. Over a grouped source the projection body uses
    /// the [`group`] combinators.
    #[must_use]
    pub fn select(self, projection: Expr) -> Self {
        let param = if matches!(
            self.expr,
            Expr::Call {
                function: Function::GroupBy,
                ..
            }
        ) {
            Param::group_of(self.doc_type.clone())
        } else {
            Param::element_of(self.doc_type.clone())
        };
        let lambda = Expr::lambda(param, projection);
        self.chain(Function::Select, vec![lambda])
    }

    /// Group by a key selector: a field, or a constant for a single
    /// all-encompassing group.
    #[must_use]
    pub fn group_by(self, key: Expr) -> Self {
        self.chain_lambda(Function::GroupBy, key)
    }

    #[must_use]
    pub fn order_by(self, key: Expr) -> Self {
        self.chain_lambda(Function::OrderBy, key)
    }

    #[must_use]
    pub fn order_by_descending(self, key: Expr) -> Self {
        self.chain_lambda(Function::OrderByDescending, key)
    }

    #[must_use]
    pub fn then_by(self, key: Expr) -> Self {
        self.chain_lambda(Function::ThenBy, key)
    }

    #[must_use]
    pub fn then_by_descending(self, key: Expr) -> Self {
        self.chain_lambda(Function::ThenByDescending, key)
    }

    /// Order by relevance score.
    #[must_use]
    pub fn order_by_score(self) -> Self {
        self.chain_lambda(Function::OrderBy, score())
    }

    #[must_use]
    pub fn order_by_score_descending(self) -> Self {
        self.chain_lambda(Function::OrderByDescending, score())
    }

    #[must_use]
    pub fn skip(self, count: u64) -> Self {
        let count = Expr::Constant(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)));
        self.chain(Function::Skip, vec![count])
    }

    #[must_use]
    pub fn take(self, count: u64) -> Self {
        let count = Expr::Constant(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)));
        self.chain(Function::Take, vec![count])
    }

    /// The first result; failing when there are none.
    #[must_use]
    pub fn first(self) -> Self {
        self.chain(Function::First, vec![])
    }

    /// The first result, or null when there are none.
    #[must_use]
    pub fn first_or_default(self) -> Self {
        self.chain(Function::FirstOrDefault, vec![])
    }

    /// The only result; failing when there are none or several.
    #[must_use]
    pub fn single(self) -> Self {
        self.chain(Function::Single, vec![])
    }

    /// The only result, or null when there are none; failing when there
    /// are several.
    #[must_use]
    pub fn single_or_default(self) -> Self {
        self.chain(Function::SingleOrDefault, vec![])
    }

    /// The number of matching documents.
    #[must_use]
    pub fn count(self) -> Self {
        self.chain(Function::Count, vec![])
    }

    /// The number of documents matching a predicate.
    #[must_use]
    pub fn count_where(self, predicate: Expr) -> Self {
        self.chain_lambda(Function::Count, predicate)
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    fn chain_lambda(self, function: Function, body: Expr) -> Self {
        let lambda = Expr::lambda(Param::element_of(self.doc_type.clone()), body);
        self.chain(function, vec![lambda])
    }

    fn chain(mut self, function: Function, args: Vec<Expr>) -> Self {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(self.expr);
        all.extend(args);
        self.expr = Expr::Call {
            target: None,
            function,
            args: all,
        };
        self
    }
}
