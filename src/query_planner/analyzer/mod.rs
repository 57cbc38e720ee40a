//! # Static Analyses
//!
//! Read-only passes over lowered plan fragments. Neither pass mutates the plan.
//!
//! ```text
//! 1. TableClassification   - vertex-collection scans vs. every other FROM item
//! 2. AccessedColumns       - per alias, the properties the fragment reads
//! ```
//!
//! Both feed the downstream renderer: classification decides how a FROM item is
//! scanned, accessed columns decide which document fields are fetched.

pub mod accessed_columns;
pub mod table_classification;

pub use accessed_columns::{infer_accessed_columns, AccessedColumns};
pub use table_classification::{classify_tables, ClassifiedTables};
