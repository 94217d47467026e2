//! Type definitions for the query expression tree.

use smol_str::SmolStr;

use crate::expr::value::Value;

/// Canonical name for the document element parameter introduced by the
/// builder's lambdas.
pub const ELEMENT_PARAM: &str = "doc";

/// Canonical name for the group parameter introduced by a projection over
/// a grouped source.
pub const GROUP_PARAM: &str = "g";

/// The kind half of a [`Ty`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TyKind {
    #[default]
    Unknown,
    Bool,
    Int,
    Float,
    Str,
    /// A document of the named logical type.
    Document(SmolStr),
}

/// A lightweight type tag.
///
/// The tree is deliberately loosely typed; the tag exists for the two
/// things translation cannot infer from shape alone: the logical document
/// type of a lambda parameter, and whether a field is optional in the
/// store (which drives unmapped-field handling in sorts and presence
/// tests).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ty {
    pub kind: TyKind,
    pub optional: bool,
}

impl Ty {
    pub fn document(name: impl Into<SmolStr>) -> Self {
        Ty {
            kind: TyKind::Document(name.into()),
            optional: false,
        }
    }
}

/// A lambda parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: SmolStr,
    pub ty: Ty,
}

impl Param {
    /// The canonical element parameter, untyped.
    pub fn element() -> Self {
        Param {
            name: ELEMENT_PARAM.into(),
            ty: Ty::default(),
        }
    }

    /// The canonical element parameter over the given document type.
    pub fn element_of(doc_type: impl Into<SmolStr>) -> Self {
        Param {
            name: ELEMENT_PARAM.into(),
            ty: Ty::document(doc_type),
        }
    }

    /// The canonical group parameter, untyped.
    pub fn group() -> Self {
        Param {
            name: GROUP_PARAM.into(),
            ty: Ty::default(),
        }
    }

    /// The canonical group parameter over the given document type.
    pub fn group_of(doc_type: impl Into<SmolStr>) -> Self {
        Param {
            name: GROUP_PARAM.into(),
            ty: Ty::document(doc_type),
        }
    }
}

/// Binary operators usable inside predicates and constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Operator spelling used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Every named operation the tree can carry: chain operators applied to a
/// query source, predicate-level calls, and aggregate calls applied to a
/// group parameter.
///
/// Translation matches exhaustively over this enum; adding a variant
/// forces every match site to decide how to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    // chain operators; the first argument is always the source
    Where,
    Query,
    QueryString,
    Select,
    GroupBy,
    OrderBy,
    OrderByDescending,
    ThenBy,
    ThenByDescending,
    Skip,
    Take,
    First,
    FirstOrDefault,
    Single,
    SingleOrDefault,
    Count,
    // predicate-level calls
    Contains,
    ContainsAny,
    ContainsAll,
    Regexp,
    Prefix,
    HasValue,
    // aggregate calls on a group parameter; `Count` doubles as one
    Key,
    Min,
    Max,
    Sum,
    Average,
}

impl Function {
    /// The operator name as callers know it, for error messages.
    pub fn name(self) -> &'static str {
        match self {
            Function::Where => "where",
            Function::Query => "query",
            Function::QueryString => "query_string",
            Function::Select => "select",
            Function::GroupBy => "group_by",
            Function::OrderBy => "order_by",
            Function::OrderByDescending => "order_by_descending",
            Function::ThenBy => "then_by",
            Function::ThenByDescending => "then_by_descending",
            Function::Skip => "skip",
            Function::Take => "take",
            Function::First => "first",
            Function::FirstOrDefault => "first_or_default",
            Function::Single => "single",
            Function::SingleOrDefault => "single_or_default",
            Function::Count => "count",
            Function::Contains => "contains",
            Function::ContainsAny => "contains_any",
            Function::ContainsAll => "contains_all",
            Function::Regexp => "regexp",
            Function::Prefix => "prefix",
            Function::HasValue => "has_value",
            Function::Key => "key",
            Function::Min => "min",
            Function::Max => "max",
            Function::Sum => "sum",
            Function::Average => "average",
        }
    }
}

/// Reserved pseudo-fields resolved from response metadata rather than the
/// document payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    /// Relevance score of a hit.
    Score,
    /// Backend document id.
    Id,
}

impl MetaField {
    /// The reserved wire-level field name.
    pub fn field_name(self) -> &'static str {
        match self {
            MetaField::Score => "_score",
            MetaField::Id => "_id",
        }
    }
}

/// A node in the query expression tree.
///
/// Trees are immutable once built; rewrites produce new trees. A complete
/// query is a stack of chain-operator [`Expr::Call`] nodes terminating in
/// an [`Expr::Source`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The typed data source a query chain terminates in.
    Source { doc_type: SmolStr },
    /// A captured constant.
    Constant(Value),
    /// A reference to an enclosing lambda's parameter.
    Param(Param),
    /// A field access on a parameter or on another field (nested paths).
    Field {
        owner: Box<Expr>,
        name: SmolStr,
        ty: Ty,
    },
    /// A backend pseudo-field.
    Meta(MetaField),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    /// A named operation: chain operators (`target` absent, source first
    /// in `args`), predicate calls (`target` is the receiver), and group
    /// aggregate calls (`target` is the group parameter).
    Call {
        target: Option<Box<Expr>>,
        function: Function,
        args: Vec<Expr>,
    },
    Lambda { param: Param, body: Box<Expr> },
    /// Anonymous record construction with named members.
    New { members: Vec<(SmolStr, Expr)> },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn lambda(param: Param, body: Expr) -> Expr {
        Expr::Lambda {
            param,
            body: Box::new(body),
        }
    }

    /// Short name of the node kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Source { .. } => "source",
            Expr::Constant(_) => "constant",
            Expr::Param(_) => "parameter",
            Expr::Field { .. } => "field",
            Expr::Meta(_) => "pseudo-field",
            Expr::Binary { .. } => "binary operator",
            Expr::Not(_) => "negation",
            Expr::Call { .. } => "call",
            Expr::Lambda { .. } => "lambda",
            Expr::New { .. } => "record construction",
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Expr::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// True when this node is a reference to the named parameter.
    pub fn is_param(&self, name: &str) -> bool {
        matches!(self, Expr::Param(param) if param.name == name)
    }
}
