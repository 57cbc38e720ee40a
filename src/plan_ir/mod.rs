//! Plan IR - the structured-query representation produced by the traversal compiler.
//!
//! The compiler only *builds* these values. Rendering them into literal query text
//! for the document store happens downstream.
//!
//! # Shape
//!
//! ```text
//! QueryBlock
//!   select: [SelectElement]      N_0.id, N_0.name AS N_0_name
//!   from:   [TableRef]           Node N_0, AdjacencyList(N_0._edge, 'label') E_1
//!   where:  BooleanExpr          E_1.label = 'knows' AND ...
//!   range:  Option<(low, high)>
//! ```
//!
//! Table references come in four flavours (see [`TableRef`]); only
//! [`TableRef::Named`] denotes the whole vertex collection, which is what the
//! table classification pass keys on.

pub mod visitors;

use serde::{Deserialize, Serialize};

/// A literal value, as supplied by the parser or emitted by the compiler.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

/// `alias.column`. A column with no table alias is only legal transiently;
/// accessed-column inference rejects it.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table_alias: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnRef {
            table_alias: Some(table_alias.into()),
            column: column.into(),
        }
    }

    /// A column reference that is not bound to any table alias.
    pub fn unbound(column: impl Into<String>) -> Self {
        ColumnRef {
            table_alias: None,
            column: column.into(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum ScalarExpr {
    Literal(Literal),
    Column(ColumnRef),
    FunctionCall { name: String, args: Vec<ScalarExpr> },
    /// A nested query block used as a scalar/table argument.
    Subquery(Box<QueryBlock>),
}

impl ScalarExpr {
    pub fn column(table_alias: &str, column: &str) -> Self {
        ScalarExpr::Column(ColumnRef::new(table_alias, column))
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        ScalarExpr::Literal(value.into())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum BooleanExpr {
    /// The empty conjunction.
    True,
    Compare {
        op: CompareOp,
        left: ScalarExpr,
        right: ScalarExpr,
    },
    IsNull(ScalarExpr),
    IsNotNull(ScalarExpr),
    In {
        expr: ScalarExpr,
        list: Vec<ScalarExpr>,
        negated: bool,
    },
    Between {
        expr: ScalarExpr,
        low: ScalarExpr,
        high: ScalarExpr,
    },
    And(Vec<BooleanExpr>),
    Or(Vec<BooleanExpr>),
    Not(Box<BooleanExpr>),
    Exists(Box<QueryBlock>),
    NotExists(Box<QueryBlock>),
}

impl BooleanExpr {
    pub fn compare(op: CompareOp, left: ScalarExpr, right: ScalarExpr) -> Self {
        BooleanExpr::Compare { op, left, right }
    }

    pub fn eq(left: ScalarExpr, right: ScalarExpr) -> Self {
        BooleanExpr::compare(CompareOp::Eq, left, right)
    }

    /// Conjoin a list of predicates. Empty input yields [`BooleanExpr::True`],
    /// a single predicate is returned as-is.
    pub fn conjunction(mut predicates: Vec<BooleanExpr>) -> Self {
        predicates.retain(|p| *p != BooleanExpr::True);
        match predicates.len() {
            0 => BooleanExpr::True,
            1 => predicates.remove(0),
            _ => BooleanExpr::And(predicates),
        }
    }

    pub fn disjunction(mut predicates: Vec<BooleanExpr>) -> Self {
        if predicates.iter().any(|p| *p == BooleanExpr::True) {
            return BooleanExpr::True;
        }
        match predicates.len() {
            0 => BooleanExpr::True,
            1 => predicates.remove(0),
            _ => BooleanExpr::Or(predicates),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, BooleanExpr::True)
    }
}

/// One entry of a FROM clause.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum TableRef {
    /// The entire vertex collection of the graph.
    Named { collection: String, alias: String },
    /// A derived table over a nested query block.
    Derived { query: Box<QueryBlock>, alias: String },
    /// A variable bound outside of this query block (side-effect channels).
    Variable { name: String, alias: String },
    /// A table-valued function.
    Function {
        name: String,
        args: Vec<ScalarExpr>,
        alias: String,
    },
}

impl TableRef {
    pub fn alias(&self) -> &str {
        match self {
            TableRef::Named { alias, .. }
            | TableRef::Derived { alias, .. }
            | TableRef::Variable { alias, .. }
            | TableRef::Function { alias, .. } => alias,
        }
    }

    pub fn is_vertex_collection(&self) -> bool {
        matches!(self, TableRef::Named { .. })
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectElement {
    pub expr: ScalarExpr,
    pub alias: Option<String>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct QueryBlock {
    pub select: Vec<SelectElement>,
    pub from: Vec<TableRef>,
    pub where_clause: Option<BooleanExpr>,
    /// Inclusive-low, exclusive-high window over the block's output.
    pub range: Option<(i64, i64)>,
}

impl QueryBlock {
    pub fn table_aliases(&self) -> Vec<String> {
        self.from.iter().map(|t| t.alias().to_string()).collect()
    }
}
