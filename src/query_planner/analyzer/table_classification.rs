//! Table Classification
//!
//! Splits a FROM list into references to the whole vertex collection and
//! everything else (adjacency functions, derived sub-plans, side-effect
//! channels). The lowering layer scans vertex-collection references differently
//! from the others.

use crate::plan_ir::TableRef;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTables<'a> {
    pub vertex_tables: Vec<&'a TableRef>,
    pub other_tables: Vec<&'a TableRef>,
}

impl ClassifiedTables<'_> {
    pub fn vertex_aliases(&self) -> Vec<&str> {
        self.vertex_tables.iter().map(|t| t.alias()).collect()
    }

    pub fn other_aliases(&self) -> Vec<&str> {
        self.other_tables.iter().map(|t| t.alias()).collect()
    }
}

/// Single pass, order-preserving within each side.
pub fn classify_tables(tables: &[TableRef]) -> ClassifiedTables<'_> {
    let (vertex_tables, other_tables): (Vec<&TableRef>, Vec<&TableRef>) =
        tables.iter().partition(|t| t.is_vertex_collection());
    log::trace!(
        "table classification: {} vertex, {} other",
        vertex_tables.len(),
        other_tables.len()
    );
    ClassifiedTables {
        vertex_tables,
        other_tables,
    }
}
