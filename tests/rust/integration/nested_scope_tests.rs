// Nested sub-plans: property propagation and tag resolution across scopes
use std::collections::BTreeSet;

use docgraph::{
    config::CompilerConfig,
    plan_ir::{QueryBlock, ScalarExpr, SelectElement},
    query_planner::{
        compile_traversal,
        errors::{CompilationError, CompileError, ErrorKind},
        plan_ctx::{ProjectedColumn, ScopeId, ScopeState},
        step::{Pop, Step, Traversal},
        typed_variable::VariableKind,
    },
};

fn local(traversal: Vec<Step>) -> Step {
    Step::Local { traversal }
}

fn out() -> Step {
    Step::Out { labels: vec![] }
}

fn sub_of(kind: &VariableKind) -> ScopeId {
    match kind {
        VariableKind::Local { sub } => *sub,
        other => panic!("expected a local variable, got {:?}", other),
    }
}

#[test]
fn test_property_propagates_one_column_per_level() {
    // V().local(local(out())).values('name')
    let steps = vec![
        Step::V { ids: vec![] },
        local(vec![local(vec![out()])]),
        Step::Values {
            keys: vec!["name".to_string()],
        },
    ];
    let compiled = compile_traversal(&steps, &CompilerConfig::default()).unwrap();
    let ctx = compiled.ctx();
    let root = compiled.root();

    let outer = ctx.scope(root).variables()[1];
    assert_eq!(ctx.variable(outer).name(), "N_4");
    let outer_sub = sub_of(ctx.variable(outer).kind());
    let inner = ctx.pivot(outer_sub).unwrap();
    assert_eq!(ctx.variable(inner).name(), "N_3");
    let inner_sub = sub_of(ctx.variable(inner).kind());
    let leaf = ctx.pivot(inner_sub).unwrap();
    assert_eq!(ctx.variable(leaf).name(), "N_2");

    assert_eq!(
        ctx.scope(outer_sub).projected_columns(),
        &[ProjectedColumn {
            owner: inner,
            property: "N_3_name".to_string(),
            column_name: "N_4_name".to_string(),
        }]
    );
    assert_eq!(
        ctx.scope(inner_sub).projected_columns(),
        &[ProjectedColumn {
            owner: leaf,
            property: "name".to_string(),
            column_name: "N_3_name".to_string(),
        }]
    );
    assert!(ctx.variable(leaf).contains_property("name"));
    assert!(ctx.variable(inner).contains_property("N_3_name"));
    assert!(ctx.variable(outer).contains_property("N_4_name"));

    for scope in [outer_sub, inner_sub] {
        assert_eq!(ctx.scope(scope).state(), ScopeState::Closed);
    }

    let block = ctx.query_block(inner_sub);
    assert_eq!(
        block.select[1],
        SelectElement {
            expr: ScalarExpr::column("N_2", "name"),
            alias: Some("N_3_name".to_string()),
        }
    );
}

/// Column names a query block makes visible to the block around it.
fn output_names(block: &QueryBlock) -> BTreeSet<String> {
    block
        .select
        .iter()
        .map(|element| match (&element.alias, &element.expr) {
            (Some(alias), _) => alias.clone(),
            (None, ScalarExpr::Column(column)) => column.column.clone(),
            (None, other) => panic!("unnamed select element {:?}", other),
        })
        .collect()
}

#[test]
fn test_outer_reads_match_sub_plan_outputs() {
    // V().local(out()).values('name')
    // V().local(local(out())).values('name')
    for nesting in [1, 2] {
        let mut body = vec![out()];
        for _ in 0..nesting {
            body = vec![local(body)];
        }
        let mut steps = vec![Step::V { ids: vec![] }];
        steps.extend(body);
        steps.push(Step::Values {
            keys: vec!["name".to_string()],
        });

        let mut compiled = compile_traversal(&steps, &CompilerConfig::default()).unwrap();
        let mut composite = compiled.ctx().scope(compiled.root()).variables()[1];
        let lowered = compiled.lower().unwrap();
        let mut reads: Vec<String> = lowered
            .accessed_columns
            .get(compiled.ctx().variable(composite).name())
            .unwrap()
            .iter()
            .cloned()
            .collect();

        for _ in 0..nesting {
            let ctx = compiled.ctx();
            let sub = sub_of(ctx.variable(composite).kind());
            let block = compiled.lower_scope(sub).unwrap().query;
            let outputs = output_names(&block);
            for column in &reads {
                assert!(
                    outputs.contains(column),
                    "{} reads `{}` but its sub-plan outputs {:?}",
                    ctx.variable(composite).name(),
                    column,
                    outputs
                );
            }
            let Some(inner) = ctx.pivot(sub) else { break };
            reads = ctx
                .scope(sub)
                .projected_columns()
                .iter()
                .filter(|c| c.owner == inner)
                .map(|c| c.property.clone())
                .collect();
            composite = inner;
        }
        assert_eq!(reads, vec!["name".to_string()]);
    }
}

#[test]
fn test_propagation_is_idempotent() {
    let steps = vec![
        Step::V { ids: vec![] },
        local(vec![out()]),
        Step::Has {
            key: "name".to_string(),
            label: None,
            predicate: None,
        },
        Step::Values {
            keys: vec!["name".to_string()],
        },
    ];
    let compiled = compile_traversal(&steps, &CompilerConfig::default()).unwrap();
    let ctx = compiled.ctx();
    let local_var = ctx.scope(compiled.root()).variables()[1];
    let sub = sub_of(ctx.variable(local_var).kind());
    assert_eq!(ctx.scope(sub).projected_columns().len(), 1);
}

fn steps(json: &str) -> Traversal {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_select_returns_tagged_variable() {
    let compiled = compile_traversal(
        &steps(
            r#"[
                {"step": "V"},
                {"step": "as", "labels": ["a"]},
                {"step": "out"},
                {"step": "as", "labels": ["b"]},
                {"step": "select", "label": "a"}
            ]"#,
        ),
        &CompilerConfig::default(),
    )
    .unwrap();
    let ctx = compiled.ctx();
    let root = compiled.root();
    let pivot = ctx.pivot(root).unwrap();
    assert_eq!(ctx.variable(pivot).name(), "N_0");
    assert_eq!(ctx.select(root, "a"), vec![pivot]);
    assert_eq!(ctx.select(root, "b").len(), 1);
    assert!(ctx.select(root, "c").is_empty());
}

#[test]
fn test_select_pop_inside_sub_plan() {
    let compiled = compile_traversal(
        &[
            Step::V { ids: vec![] },
            Step::As {
                labels: vec!["a".to_string()],
            },
            local(vec![
                out(),
                Step::As {
                    labels: vec!["a".to_string()],
                },
                Step::Select {
                    label: "a".to_string(),
                    pop: Some(Pop::First),
                },
            ]),
        ],
        &CompilerConfig::default(),
    )
    .unwrap();
    let ctx = compiled.ctx();
    let local_var = ctx.pivot(compiled.root()).unwrap();
    let sub = sub_of(ctx.variable(local_var).kind());
    let selected = ctx.pivot(sub).unwrap();
    assert_eq!(ctx.variable(selected).name(), "N_0");
    assert_eq!(ctx.variable(selected).selection().unwrap().pop, Some(Pop::First));
}

#[test]
fn test_select_unknown_tag_fails() {
    let err = compile_traversal(
        &steps(r#"[{"step": "V"}, {"step": "select", "label": "missing"}]"#),
        &CompilerConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::Compilation(CompilationError::TagNotDefined {
            label: "missing".to_string()
        })
    );
}

#[test]
fn test_plural_select_is_not_implemented() {
    let err = compile_traversal(
        &steps(
            r#"[
                {"step": "V"},
                {"step": "as", "labels": ["a"]},
                {"step": "selectKeys", "labels": ["a", "a"]}
            ]"#,
        ),
        &CompilerConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}
