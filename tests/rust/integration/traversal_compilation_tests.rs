// End-to-end compilation of step sequences into query blocks
use docgraph::{
    config::CompilerConfig,
    plan_ir::{BooleanExpr, Literal, ScalarExpr, TableRef},
    query_planner::{
        analyzer::classify_tables,
        compile_traversal,
        errors::{CompilationError, CompileError, ErrorKind},
        step::{Predicate, Step, Traversal},
        typed_variable::{VariableKind, VariableType},
    },
};

fn config() -> CompilerConfig {
    CompilerConfig {
        vertex_collection: "Graph".to_string(),
        ..Default::default()
    }
}

fn person_knows_count() -> Traversal {
    serde_json::from_str(
        r#"[
            {"step": "V"},
            {"step": "hasLabel", "values": ["person"]},
            {"step": "out", "labels": ["knows"]},
            {"step": "count"}
        ]"#,
    )
    .unwrap()
}

#[test]
fn test_count_wraps_everything_before_it() {
    let mut compiled = compile_traversal(&person_knows_count(), &config()).unwrap();
    let root = compiled.root();

    let count = compiled.ctx().pivot(root).unwrap();
    assert_eq!(compiled.ctx().variable(count).name(), "R_3");
    assert_eq!(
        compiled.ctx().variable(count).variable_type(),
        VariableType::Scalar
    );
    let VariableKind::Count { sub } = compiled.ctx().variable(count).kind().clone() else {
        panic!("expected a count variable");
    };

    let inner = compiled.lower_scope(sub).unwrap();
    assert_eq!(inner.query.table_aliases(), vec!["N_0", "E_1", "N_2"]);
    assert_eq!(
        inner.query.from[0],
        TableRef::Named {
            collection: "Graph".to_string(),
            alias: "N_0".to_string(),
        }
    );
    assert_eq!(
        inner.query.from[1],
        TableRef::Function {
            name: "AdjacencyList".to_string(),
            args: vec![
                ScalarExpr::column("N_0", "_edge"),
                ScalarExpr::literal("label"),
                ScalarExpr::literal("_other"),
            ],
            alias: "E_1".to_string(),
        }
    );
    assert_eq!(
        inner.query.where_clause,
        Some(BooleanExpr::And(vec![
            BooleanExpr::eq(
                ScalarExpr::column("N_0", "label"),
                ScalarExpr::literal("person")
            ),
            BooleanExpr::eq(
                ScalarExpr::column("E_1", "label"),
                ScalarExpr::literal("knows")
            ),
            BooleanExpr::eq(
                ScalarExpr::column("N_2", "id"),
                ScalarExpr::column("E_1", "_other")
            ),
        ]))
    );

    let columns = inner.accessed_columns.into_map();
    assert_eq!(
        columns["N_0"].iter().collect::<Vec<_>>(),
        vec!["_edge", "label"]
    );
    assert_eq!(
        columns["E_1"].iter().collect::<Vec<_>>(),
        vec!["_other", "label"]
    );
    assert_eq!(columns["N_2"].iter().collect::<Vec<_>>(), vec!["id"]);

    let outer = compiled.lower().unwrap();
    assert_eq!(outer.query.table_aliases(), vec!["R_3"]);
    assert!(outer.query.where_clause.is_none());
    let columns = outer.accessed_columns.into_map();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns["R_3"].iter().collect::<Vec<_>>(), vec!["_value"]);
}

#[test]
fn test_classification_partitions_from_clause() {
    let compiled = compile_traversal(&person_knows_count(), &config()).unwrap();
    let count = compiled.ctx().pivot(compiled.root()).unwrap();
    let VariableKind::Count { sub } = compiled.ctx().variable(count).kind().clone() else {
        panic!("expected a count variable");
    };
    let inner = compiled.lower_scope(sub).unwrap();

    let classified = classify_tables(&inner.query.from);
    assert_eq!(classified.vertex_aliases(), vec!["N_0", "N_2"]);
    assert_eq!(classified.other_aliases(), vec!["E_1"]);
}

#[test]
fn test_accessed_columns_of_filter_and_projection() {
    let steps = vec![
        Step::V { ids: vec![] },
        Step::Has {
            key: "name".to_string(),
            label: None,
            predicate: Some(Predicate::eq("marko")),
        },
        Step::Values {
            keys: vec!["age".to_string()],
        },
    ];
    let mut compiled = compile_traversal(&steps, &config()).unwrap();
    let lowered = compiled.lower().unwrap();

    let columns = lowered.accessed_columns.into_map();
    assert_eq!(
        columns["N_0"].iter().collect::<Vec<_>>(),
        vec!["age", "name"]
    );
    assert_eq!(columns["R_1"].iter().collect::<Vec<_>>(), vec!["_value"]);
}

#[test]
fn test_range_lands_on_query_block() {
    let steps = vec![Step::V { ids: vec![] }, Step::Limit { limit: 5 }];
    let mut compiled = compile_traversal(&steps, &config()).unwrap();
    let lowered = compiled.lower().unwrap();
    assert_eq!(lowered.query.range, Some((0, 5)));
}

#[test]
fn test_property_updates_collapse_into_one_table_ref() {
    let steps: Traversal = serde_json::from_str(
        r#"[
            {"step": "addV", "label": "person"},
            {"step": "property", "key": "name", "value": "marko"},
            {"step": "property", "key": "age", "value": 29}
        ]"#,
    )
    .unwrap();
    let mut compiled = compile_traversal(&steps, &config()).unwrap();
    let lowered = compiled.lower().unwrap();

    assert_eq!(lowered.query.from.len(), 2);
    assert_eq!(
        lowered.query.from[1],
        TableRef::Function {
            name: "UpdateProperties".to_string(),
            args: vec![
                ScalarExpr::column("N_0", "id"),
                ScalarExpr::literal("name"),
                ScalarExpr::literal("marko"),
                ScalarExpr::literal("age"),
                ScalarExpr::Literal(Literal::Integer(29)),
            ],
            alias: "R_1".to_string(),
        }
    );
}

#[test]
fn test_error_kinds_are_distinguishable() {
    let not_applicable = compile_traversal(
        &[Step::V { ids: vec![] }, Step::Count, Step::Out { labels: vec![] }],
        &config(),
    )
    .unwrap_err();
    assert_eq!(not_applicable.kind(), ErrorKind::Compilation);
    assert!(matches!(
        not_applicable,
        CompileError::Compilation(CompilationError::StepNotApplicable {
            step: "out",
            actual: VariableType::Scalar,
            ..
        })
    ));

    let no_input = compile_traversal(&[Step::Out { labels: vec![] }], &config()).unwrap_err();
    assert!(matches!(
        no_input,
        CompileError::Compilation(CompilationError::NoInput { step: "out" })
    ));

    let unsupported = compile_traversal(&[Step::V { ids: vec![] }, Step::Order], &config())
        .unwrap_err();
    assert_eq!(unsupported.kind(), ErrorKind::NotImplemented);
    assert_eq!(
        unsupported.to_string(),
        "Not implemented: order is not supported yet"
    );
}

#[test]
fn test_lowered_plan_serializes() {
    let mut compiled = compile_traversal(&person_knows_count(), &config()).unwrap();
    let lowered = compiled.lower().unwrap();
    let json = serde_json::to_value(&lowered).unwrap();
    assert_eq!(json["accessed_columns"]["R_3"], serde_json::json!(["_value"]));
    assert!(json["query"]["from"].is_array());
}

#[test]
fn test_limit_before_expansion_stays_in_the_plan() {
    // V().limit(2).out()
    let steps = vec![
        Step::V { ids: vec![] },
        Step::Limit { limit: 2 },
        Step::Out { labels: vec![] },
    ];
    let mut compiled = compile_traversal(&steps, &config()).unwrap();
    let lowered = compiled.lower().unwrap();
    assert_eq!(lowered.query.range, None);
    assert_eq!(lowered.query.table_aliases(), vec!["N_1", "E_2", "N_3"]);

    let TableRef::Function { name, args, .. } = &lowered.query.from[0] else {
        panic!("expected a window table function");
    };
    assert_eq!(name, "Window");
    let [ScalarExpr::Subquery(window)] = args.as_slice() else {
        panic!("expected one subquery argument, got {:?}", args);
    };
    assert_eq!(window.range, Some((0, 2)));
    assert_eq!(window.table_aliases(), vec!["N_0"]);
    assert_eq!(
        window.select[1].alias.as_deref(),
        Some("N_1__edge"),
        "the window exports the adjacency list the expansion reads"
    );

    let TableRef::Function { args, .. } = &lowered.query.from[1] else {
        panic!("expected an adjacency table function");
    };
    assert_eq!(args[0], ScalarExpr::column("N_1", "N_1__edge"));
}

#[test]
fn test_filter_after_range_sees_only_the_window() {
    let steps: Traversal = serde_json::from_str(
        r#"[
            {"step": "V"},
            {"step": "as", "labels": ["a"]},
            {"step": "range", "low": 1, "high": 3},
            {"step": "hasLabel", "values": ["person"]},
            {"step": "select", "label": "a"}
        ]"#,
    )
    .unwrap();
    let mut compiled = compile_traversal(&steps, &config()).unwrap();
    let window = compiled.ctx().pivot(compiled.root()).unwrap();
    assert_eq!(
        compiled.ctx().variable(window).kind().function_name(),
        "Window"
    );
    let lowered = compiled.lower().unwrap();
    assert_eq!(lowered.query.range, None);
    assert_eq!(
        lowered.query.where_clause,
        Some(BooleanExpr::eq(
            ScalarExpr::column("N_1", "N_1_label"),
            ScalarExpr::literal("person")
        ))
    );
}

#[test]
fn test_consecutive_ranges_compose() {
    // V().range(2, 10).range(1, 3)
    let steps = vec![
        Step::V { ids: vec![] },
        Step::Range { low: 2, high: 10 },
        Step::Range { low: 1, high: 3 },
    ];
    let mut compiled = compile_traversal(&steps, &config()).unwrap();
    let lowered = compiled.lower().unwrap();
    assert_eq!(lowered.query.range, Some((3, 5)));
}

#[test]
fn test_range_inside_sub_plan_leaves_outer_rows_alone() {
    // V().local(limit(1))
    let steps = vec![
        Step::V { ids: vec![] },
        Step::Local {
            traversal: vec![Step::Limit { limit: 1 }],
        },
    ];
    let mut compiled = compile_traversal(&steps, &config()).unwrap();
    let root = compiled.root();
    let vertex = compiled.ctx().scope(root).variables()[0];
    assert!(!compiled.ctx().variable(vertex).is_range_narrowed());

    let local = compiled.ctx().pivot(root).unwrap();
    let VariableKind::Local { sub } = compiled.ctx().variable(local).kind().clone() else {
        panic!("expected a local variable");
    };
    assert_eq!(compiled.lower_scope(sub).unwrap().query.range, Some((0, 1)));
    assert_eq!(compiled.lower().unwrap().query.range, None);
}

#[test]
fn test_property_through_repeat_accumulator_is_not_implemented() {
    // V().repeat(identity()).times(2).values('name')
    let steps: Traversal = serde_json::from_str(
        r#"[
            {"step": "V"},
            {"step": "repeat", "traversal": [], "condition": {"times": 2}},
            {"step": "values", "keys": ["name"]}
        ]"#,
    )
    .unwrap();
    let err = compile_traversal(&steps, &config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}
