//! Plan IR Visitor Pattern
//!
//! Separates traversal of a plan fragment from the work done at each node, so the
//! analysis passes only implement the `visit_*` hooks they care about.
//!
//! # Example
//!
//! ```
//! use docgraph::plan_ir::{ColumnRef, ScalarExpr};
//! use docgraph::plan_ir::visitors::{FragmentVisitor, PlanFragment};
//!
//! struct ColumnCounter(usize);
//!
//! impl FragmentVisitor for ColumnCounter {
//!     type Error = std::convert::Infallible;
//!
//!     fn visit_column(&mut self, _col: &ColumnRef) -> Result<(), Self::Error> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! let expr = ScalarExpr::FunctionCall {
//!     name: "concat".to_string(),
//!     args: vec![ScalarExpr::column("N_0", "first"), ScalarExpr::column("N_0", "last")],
//! };
//! let mut counter = ColumnCounter(0);
//! expr.accept(&mut counter).unwrap();
//! assert_eq!(counter.0, 2);
//! ```

use super::{BooleanExpr, ColumnRef, QueryBlock, ScalarExpr, TableRef};

/// Hooks called while walking a plan fragment. Defaults do nothing.
pub trait FragmentVisitor {
    type Error;

    fn visit_column(&mut self, _col: &ColumnRef) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_table_ref(&mut self, _table: &TableRef) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Anything that can be walked by a [`FragmentVisitor`].
pub trait PlanFragment {
    fn accept<V: FragmentVisitor>(&self, visitor: &mut V) -> Result<(), V::Error>;
}

impl PlanFragment for ScalarExpr {
    fn accept<V: FragmentVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        walk_scalar(self, visitor)
    }
}

impl PlanFragment for BooleanExpr {
    fn accept<V: FragmentVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        walk_boolean(self, visitor)
    }
}

impl PlanFragment for TableRef {
    fn accept<V: FragmentVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        walk_table_ref(self, visitor)
    }
}

impl PlanFragment for QueryBlock {
    fn accept<V: FragmentVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        walk_query(self, visitor)
    }
}

pub fn walk_scalar<V: FragmentVisitor>(expr: &ScalarExpr, visitor: &mut V) -> Result<(), V::Error> {
    match expr {
        ScalarExpr::Literal(_) => Ok(()),
        ScalarExpr::Column(col) => visitor.visit_column(col),
        ScalarExpr::FunctionCall { args, .. } => {
            for arg in args {
                walk_scalar(arg, visitor)?;
            }
            Ok(())
        }
        ScalarExpr::Subquery(query) => walk_query(query, visitor),
    }
}

pub fn walk_boolean<V: FragmentVisitor>(
    expr: &BooleanExpr,
    visitor: &mut V,
) -> Result<(), V::Error> {
    match expr {
        BooleanExpr::True => Ok(()),
        BooleanExpr::Compare { left, right, .. } => {
            walk_scalar(left, visitor)?;
            walk_scalar(right, visitor)
        }
        BooleanExpr::IsNull(e) | BooleanExpr::IsNotNull(e) => walk_scalar(e, visitor),
        BooleanExpr::In { expr, list, .. } => {
            walk_scalar(expr, visitor)?;
            for item in list {
                walk_scalar(item, visitor)?;
            }
            Ok(())
        }
        BooleanExpr::Between { expr, low, high } => {
            walk_scalar(expr, visitor)?;
            walk_scalar(low, visitor)?;
            walk_scalar(high, visitor)
        }
        BooleanExpr::And(items) | BooleanExpr::Or(items) => {
            for item in items {
                walk_boolean(item, visitor)?;
            }
            Ok(())
        }
        BooleanExpr::Not(inner) => walk_boolean(inner, visitor),
        BooleanExpr::Exists(query) | BooleanExpr::NotExists(query) => walk_query(query, visitor),
    }
}

pub fn walk_table_ref<V: FragmentVisitor>(
    table: &TableRef,
    visitor: &mut V,
) -> Result<(), V::Error> {
    visitor.visit_table_ref(table)?;
    match table {
        TableRef::Named { .. } | TableRef::Variable { .. } => Ok(()),
        TableRef::Derived { query, .. } => walk_query(query, visitor),
        TableRef::Function { args, .. } => {
            for arg in args {
                walk_scalar(arg, visitor)?;
            }
            Ok(())
        }
    }
}

pub fn walk_query<V: FragmentVisitor>(query: &QueryBlock, visitor: &mut V) -> Result<(), V::Error> {
    for element in &query.select {
        walk_scalar(&element.expr, visitor)?;
    }
    for table in &query.from {
        walk_table_ref(table, visitor)?;
    }
    if let Some(predicate) = &query.where_clause {
        walk_boolean(predicate, visitor)?;
    }
    Ok(())
}
