//! Unit tests for the static analyses over hand-built plan fragments

use docgraph::{
    plan_ir::{BooleanExpr, ColumnRef, QueryBlock, ScalarExpr, SelectElement, TableRef},
    query_planner::{
        analyzer::{classify_tables, infer_accessed_columns},
        errors::CompilationError,
    },
};

fn named(alias: &str) -> TableRef {
    TableRef::Named {
        collection: "Node".to_string(),
        alias: alias.to_string(),
    }
}

fn function(name: &str, alias: &str, args: Vec<ScalarExpr>) -> TableRef {
    TableRef::Function {
        name: name.to_string(),
        args,
        alias: alias.to_string(),
    }
}

/// A single alias read twice through two properties yields exactly those two.
#[test]
fn test_accessed_columns_are_a_set_per_alias() {
    let block = QueryBlock {
        select: vec![SelectElement {
            expr: ScalarExpr::column("a", "name"),
            alias: None,
        }],
        from: vec![named("a")],
        where_clause: Some(BooleanExpr::And(vec![
            BooleanExpr::eq(ScalarExpr::column("a", "age"), ScalarExpr::literal(29i64)),
            BooleanExpr::IsNotNull(ScalarExpr::column("a", "name")),
        ])),
        range: None,
    };
    let columns = infer_accessed_columns(&block, &block.table_aliases()).unwrap();
    let a: Vec<&String> = columns.get("a").unwrap().iter().collect();
    assert_eq!(a, vec!["age", "name"]);
    assert_eq!(columns.aliases().count(), 1);
}

#[test]
fn test_tracked_alias_without_reads_is_empty() {
    let block = QueryBlock {
        select: vec![SelectElement {
            expr: ScalarExpr::column("b", "id"),
            alias: None,
        }],
        from: vec![named("a"), named("b")],
        ..Default::default()
    };
    let columns = infer_accessed_columns(&block, &block.table_aliases()).unwrap();
    assert!(columns.get("a").unwrap().is_empty());
    assert_eq!(columns.get("b").unwrap().len(), 1);
}

#[test]
fn test_outer_alias_is_ignored_inside_subquery() {
    let inner = QueryBlock {
        select: vec![SelectElement {
            expr: ScalarExpr::column("outer", "weight"),
            alias: None,
        }],
        from: vec![named("inner")],
        where_clause: Some(BooleanExpr::eq(
            ScalarExpr::column("inner", "id"),
            ScalarExpr::column("outer", "id"),
        )),
        range: None,
    };
    let columns = infer_accessed_columns(&inner, &inner.table_aliases()).unwrap();
    assert!(columns.get("outer").is_none());
    assert_eq!(columns.get("inner").unwrap().len(), 1);
}

#[test]
fn test_wildcard_marks_whole_document() {
    let from = vec![
        named("N_0"),
        function("Properties", "P_1", vec![ScalarExpr::column("N_0", "*")]),
    ];
    let block = QueryBlock {
        from,
        ..Default::default()
    };
    let columns = infer_accessed_columns(&block, &block.table_aliases()).unwrap();
    assert!(columns.requires_all("N_0"));
    assert!(!columns.requires_all("P_1"));
}

#[test]
fn test_unbound_column_is_rejected() {
    let expr = BooleanExpr::IsNull(ScalarExpr::Column(ColumnRef::unbound("name")));
    let err = infer_accessed_columns(&expr, &["a".to_string()]).unwrap_err();
    assert_eq!(
        err,
        CompilationError::UnboundColumn {
            column: "name".to_string()
        }
    );
}

#[test]
fn test_classification_preserves_order_within_partition() {
    let from = vec![
        named("N_0"),
        function("AdjacencyList", "E_1", vec![]),
        named("N_2"),
        TableRef::Variable {
            name: "@x".to_string(),
            alias: "R_3".to_string(),
        },
        named("N_4"),
    ];
    let classified = classify_tables(&from);
    assert_eq!(classified.vertex_aliases(), vec!["N_0", "N_2", "N_4"]);
    assert_eq!(classified.other_aliases(), vec!["E_1", "R_3"]);
    assert_eq!(
        classified.vertex_tables.len() + classified.other_tables.len(),
        from.len()
    );
}

#[test]
fn test_classification_of_empty_list() {
    let classified = classify_tables(&[]);
    assert!(classified.vertex_tables.is_empty());
    assert!(classified.other_tables.is_empty());
}
