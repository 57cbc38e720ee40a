//! Unit tests for the step catalogue: wire names and applicability

use docgraph::query_planner::{
    dispatch::{applicability, Applicability},
    errors::Requirement,
    step::{Step, Traversal},
};

fn parse(json: &str) -> Traversal {
    serde_json::from_str(json).unwrap()
}

/// Every catalogued-but-unsupported step reports itself instead of compiling to something.
#[test]
fn test_catalogued_steps_report_not_implemented() {
    let steps = parse(
        r#"[
            {"step": "match", "traversals": []},
            {"step": "coin", "probability": 0.5},
            {"step": "sample", "amount": 3},
            {"step": "order"},
            {"step": "max"},
            {"step": "min"},
            {"step": "mean"},
            {"step": "sum"},
            {"step": "iterate"},
            {"step": "timeLimit", "millis": 10},
            {"step": "valueMap"},
            {"step": "propertyMap"},
            {"step": "aggregate", "key": "x"},
            {"step": "from", "label": "a"},
            {"step": "to", "label": "b"},
            {"step": "option", "pick": 1, "traversal": []},
            {"step": "tail"},
            {"step": "barrier"},
            {"step": "times", "loops": 2},
            {"step": "until", "traversal": []},
            {"step": "emit"},
            {"step": "whereStartKey", "startKey": "a", "predicate": {"op": "eq", "value": 1}},
            {"step": "selectKeys", "labels": ["a", "b"]},
            {"step": "choosePredicate", "predicate": {"op": "gt", "value": 1},
             "trueBranch": [], "falseBranch": []}
        ]"#,
    );
    for step in &steps {
        assert!(
            matches!(applicability(step), Applicability::NotImplemented(_)),
            "{} should not be implemented",
            step.name()
        );
    }
}

#[test]
fn test_sources_need_no_pivot() {
    let steps = parse(
        r#"[
            {"step": "V", "ids": [1, 2]},
            {"step": "E"},
            {"step": "addV", "label": "person"},
            {"step": "inject", "values": [1, "a"]},
            {"step": "constant", "value": null},
            {"step": "cap", "key": "x"},
            {"step": "select", "label": "a"}
        ]"#,
    );
    for step in &steps {
        assert_eq!(applicability(step), Applicability::Source, "{}", step.name());
    }
}

#[test]
fn test_requirements_by_family() {
    let cases = [
        (r#"{"step": "bothE"}"#, Requirement::Vertex),
        (r#"{"step": "addE", "label": "knows"}"#, Requirement::Vertex),
        (r#"{"step": "otherV"}"#, Requirement::Edge),
        (r#"{"step": "hasNot", "key": "age"}"#, Requirement::VertexOrEdge),
        (r#"{"step": "property", "key": "age", "value": 3}"#, Requirement::VertexOrEdge),
        (r#"{"step": "hasValue", "values": ["x"]}"#, Requirement::Property),
        (r#"{"step": "drop"}"#, Requirement::VertexEdgeOrProperty),
        (r#"{"step": "project", "keys": ["a"]}"#, Requirement::AnyValue),
        (r#"{"step": "sideEffect", "traversal": []}"#, Requirement::AnyValue),
    ];
    for (json, expected) in cases {
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(
            applicability(&step),
            Applicability::Requires(expected),
            "{}",
            json
        );
    }
}

#[test]
fn test_unknown_step_name_is_a_parse_error() {
    let result: Result<Step, _> = serde_json::from_str(r#"{"step": "teleport"}"#);
    assert!(result.is_err());
}
