//! Accessed-Column Inference
//!
//! Records, per table alias, which properties a lowered fragment actually reads, so
//! the backing store only fetches those. Used when lowering to trim document
//! projections.
//!
//! # Example
//!
//! ```rust
//! use docgraph::plan_ir::{BooleanExpr, ScalarExpr};
//! use docgraph::query_planner::analyzer::accessed_columns::infer_accessed_columns;
//!
//! let filter = BooleanExpr::And(vec![
//!     BooleanExpr::eq(ScalarExpr::column("a", "name"), ScalarExpr::literal("marko")),
//!     BooleanExpr::IsNotNull(ScalarExpr::column("a", "age")),
//!     BooleanExpr::IsNotNull(ScalarExpr::column("a", "name")),
//! ]);
//!
//! let columns = infer_accessed_columns(&filter, &["a".to_string()]).unwrap();
//! let a = columns.get("a").unwrap();
//! assert_eq!(a.len(), 2);
//! assert!(a.contains("name") && a.contains("age"));
//! ```
//!
//! # Rules
//!
//! - a column without a table alias is a compilation error
//! - aliases outside the tracked set belong to an enclosing fragment and are ignored
//! - the column `*` marks a wildcard: every property of that alias is needed

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    plan_ir::{
        visitors::{FragmentVisitor, PlanFragment},
        ColumnRef,
    },
    query_planner::errors::CompilationError,
};

/// Column name that stands for "all properties".
pub const WILDCARD: &str = "*";

/// Map: alias -> set of accessed property names
///
/// Every tracked alias has an entry, possibly empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessedColumns {
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl AccessedColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `alias` with no accessed properties.
    pub fn track(&mut self, alias: &str) {
        self.columns.entry(alias.to_string()).or_default();
    }

    pub fn is_tracked(&self, alias: &str) -> bool {
        self.columns.contains_key(alias)
    }

    /// Record an access. Untracked aliases are ignored; returns whether it was recorded.
    pub fn record(&mut self, alias: &str, property: &str) -> bool {
        match self.columns.get_mut(alias) {
            Some(props) => {
                props.insert(property.to_string());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, alias: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(alias)
    }

    /// True when the fragment reads the whole document of `alias`.
    pub fn requires_all(&self, alias: &str) -> bool {
        self.columns
            .get(alias)
            .is_some_and(|props| props.contains(WILDCARD))
    }

    /// Union the accesses of another fragment into this one.
    pub fn merge(&mut self, other: &AccessedColumns) {
        for (alias, props) in &other.columns {
            self.columns
                .entry(alias.clone())
                .or_default()
                .extend(props.iter().cloned());
        }
    }

    pub fn aliases(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.columns.iter()
    }

    pub fn into_map(self) -> BTreeMap<String, BTreeSet<String>> {
        self.columns
    }
}

struct AccessedColumnVisitor {
    columns: AccessedColumns,
}

impl FragmentVisitor for AccessedColumnVisitor {
    type Error = CompilationError;

    fn visit_column(&mut self, col: &ColumnRef) -> Result<(), Self::Error> {
        let alias = col
            .table_alias
            .as_deref()
            .ok_or_else(|| CompilationError::UnboundColumn {
                column: col.column.clone(),
            })?;
        if !self.columns.record(alias, &col.column) {
            log::trace!(
                "accessed columns: skipping {}.{} (outer alias)",
                alias,
                col.column
            );
        }
        Ok(())
    }
}

/// Walk `fragment` and collect the properties read from each alias in `aliases`.
pub fn infer_accessed_columns<F: PlanFragment + ?Sized>(
    fragment: &F,
    aliases: &[String],
) -> Result<AccessedColumns, CompilationError> {
    let mut visitor = AccessedColumnVisitor {
        columns: AccessedColumns::new(),
    };
    for alias in aliases {
        visitor.columns.track(alias);
    }
    fragment.accept(&mut visitor)?;
    log::debug!(
        "accessed columns: {} aliases tracked",
        visitor.columns.columns.len()
    );
    Ok(visitor.columns)
}
