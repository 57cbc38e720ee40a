//! Traversal steps as handed over by the parser.
//!
//! A traversal is an ordered `Vec<Step>`; nested sub-plans (union branches, `by`
//! modulators, repeat bodies, ...) are themselves `Vec<Step>`. Steps deserialize from
//! JSON with an internal `"step"` tag:
//!
//! ```json
//! [{"step": "V"}, {"step": "has", "key": "name", "predicate": {"op": "eq", "value": "marko"}},
//!  {"step": "out", "labels": ["knows"]}, {"step": "count"}]
//! ```

use serde::{Deserialize, Serialize};

use crate::plan_ir::Literal;

pub type Traversal = Vec<Step>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredicateOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Within,
    Without,
    Between,
    Inside,
    Outside,
}

impl PredicateOp {
    pub fn name(self) -> &'static str {
        match self {
            PredicateOp::Eq => "eq",
            PredicateOp::Neq => "neq",
            PredicateOp::Lt => "lt",
            PredicateOp::Lte => "lte",
            PredicateOp::Gt => "gt",
            PredicateOp::Gte => "gte",
            PredicateOp::Within => "within",
            PredicateOp::Without => "without",
            PredicateOp::Between => "between",
            PredicateOp::Inside => "inside",
            PredicateOp::Outside => "outside",
        }
    }

    /// Binary comparison against a single operand.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            PredicateOp::Eq
                | PredicateOp::Neq
                | PredicateOp::Lt
                | PredicateOp::Lte
                | PredicateOp::Gt
                | PredicateOp::Gte
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredicateOperand {
    Value(Literal),
    Values(Vec<Literal>),
    /// Back-reference to the variable labelled with this tag.
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub op: PredicateOp,
    #[serde(flatten)]
    pub operand: PredicateOperand,
}

impl Predicate {
    pub fn eq(value: impl Into<Literal>) -> Self {
        Predicate {
            op: PredicateOp::Eq,
            operand: PredicateOperand::Value(value.into()),
        }
    }

    pub fn compare(op: PredicateOp, value: impl Into<Literal>) -> Self {
        Predicate {
            op,
            operand: PredicateOperand::Value(value.into()),
        }
    }

    pub fn values(op: PredicateOp, values: Vec<Literal>) -> Self {
        Predicate {
            op,
            operand: PredicateOperand::Values(values),
        }
    }

    pub fn tag(op: PredicateOp, label: impl Into<String>) -> Self {
        Predicate {
            op,
            operand: PredicateOperand::Tag(label.into()),
        }
    }

    pub fn tag_label(&self) -> Option<&str> {
        match &self.operand {
            PredicateOperand::Tag(label) => Some(label),
            _ => None,
        }
    }
}

/// Disambiguation policy for `select` when a tag has several bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Pop {
    First,
    Last,
    All,
    Mixed,
}

/// Loop control for `repeat`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepeatCondition {
    pub times: Option<u32>,
    pub until: Option<Traversal>,
    pub emit: Option<Traversal>,
    /// `emit()` without a condition.
    pub emit_all: bool,
    /// `until`/`emit` placed before `repeat` (checked ahead of the first iteration).
    pub check_first: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    // Sources
    #[serde(rename = "V")]
    V {
        #[serde(default)]
        ids: Vec<Literal>,
    },
    #[serde(rename = "E")]
    E {
        #[serde(default)]
        ids: Vec<Literal>,
    },
    AddV {
        #[serde(default)]
        label: Option<String>,
    },
    AddE {
        label: String,
    },
    Inject {
        values: Vec<Literal>,
    },
    Constant {
        value: Literal,
    },

    // Filters
    /// `has(key)`, `has(key, predicate)` and `has(label, key, predicate)`.
    Has {
        key: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        predicate: Option<Predicate>,
    },
    HasNot {
        key: String,
    },
    HasId {
        values: Vec<Literal>,
    },
    HasLabel {
        values: Vec<Literal>,
    },
    HasKey {
        keys: Vec<String>,
    },
    HasValue {
        values: Vec<Literal>,
    },
    Is {
        predicate: Predicate,
    },
    Where {
        predicate: Predicate,
    },
    WhereTraversal {
        traversal: Traversal,
    },
    WhereStartKey {
        start_key: String,
        predicate: Predicate,
    },
    And {
        traversals: Vec<Traversal>,
    },
    Or {
        traversals: Vec<Traversal>,
    },
    Not {
        traversal: Traversal,
    },
    Range {
        low: i64,
        high: i64,
    },
    Limit {
        limit: i64,
    },
    Tail {
        #[serde(default)]
        limit: Option<i64>,
    },
    Coin {
        probability: f64,
    },
    Sample {
        amount: i64,
    },
    Dedup {
        #[serde(default)]
        labels: Vec<String>,
    },

    // Expansion
    Out {
        #[serde(default)]
        labels: Vec<String>,
    },
    In {
        #[serde(default)]
        labels: Vec<String>,
    },
    Both {
        #[serde(default)]
        labels: Vec<String>,
    },
    OutE {
        #[serde(default)]
        labels: Vec<String>,
    },
    InE {
        #[serde(default)]
        labels: Vec<String>,
    },
    BothE {
        #[serde(default)]
        labels: Vec<String>,
    },
    OutV,
    InV,
    BothV,
    OtherV,

    // Projection
    Properties {
        #[serde(default)]
        keys: Vec<String>,
    },
    Values {
        #[serde(default)]
        keys: Vec<String>,
    },
    Key,
    Value,
    Id,
    Label,
    ValueMap {
        #[serde(default)]
        keys: Vec<String>,
    },
    PropertyMap {
        #[serde(default)]
        keys: Vec<String>,
    },

    // Aggregation
    Count,
    Fold,
    Tree,
    Path,
    Unfold,
    Group {
        #[serde(default)]
        side_effect_key: Option<String>,
        #[serde(default)]
        key_by: Option<Traversal>,
        #[serde(default)]
        value_by: Option<Traversal>,
    },
    Max,
    Min,
    Mean,
    Sum,
    Order,

    // Branches
    Union {
        traversals: Vec<Traversal>,
    },
    Optional {
        traversal: Traversal,
    },
    Local {
        traversal: Traversal,
    },
    Map {
        traversal: Traversal,
    },
    FlatMap {
        traversal: Traversal,
    },
    Coalesce {
        traversals: Vec<Traversal>,
    },
    Project {
        keys: Vec<String>,
        #[serde(default)]
        by: Vec<Traversal>,
    },
    Repeat {
        traversal: Traversal,
        #[serde(default)]
        condition: RepeatCondition,
    },
    Choose {
        condition: Traversal,
        true_branch: Traversal,
        false_branch: Traversal,
    },
    ChoosePredicate {
        predicate: Predicate,
        true_branch: Traversal,
        false_branch: Traversal,
    },
    #[serde(rename = "option")]
    ChooseOption {
        pick: Literal,
        traversal: Traversal,
    },
    Match {
        traversals: Vec<Traversal>,
    },
    Times {
        loops: u32,
    },
    Until {
        traversal: Traversal,
    },
    Emit {
        #[serde(default)]
        traversal: Option<Traversal>,
    },

    // Side effects
    Store {
        key: String,
    },
    Aggregate {
        key: String,
    },
    SideEffect {
        traversal: Traversal,
    },
    Cap {
        key: String,
    },
    Barrier,
    Iterate,
    TimeLimit {
        millis: i64,
    },

    // Labels
    As {
        labels: Vec<String>,
    },
    Select {
        label: String,
        #[serde(default)]
        pop: Option<Pop>,
    },
    SelectKeys {
        labels: Vec<String>,
        #[serde(default)]
        pop: Option<Pop>,
    },

    // Mutation
    Property {
        key: String,
        value: Literal,
    },
    Drop,
    From {
        label: String,
    },
    To {
        label: String,
    },
}

impl Step {
    /// The Gremlin-style step name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Step::V { .. } => "V",
            Step::E { .. } => "E",
            Step::AddV { .. } => "addV",
            Step::AddE { .. } => "addE",
            Step::Inject { .. } => "inject",
            Step::Constant { .. } => "constant",
            Step::Has { .. } => "has",
            Step::HasNot { .. } => "hasNot",
            Step::HasId { .. } => "hasId",
            Step::HasLabel { .. } => "hasLabel",
            Step::HasKey { .. } => "hasKey",
            Step::HasValue { .. } => "hasValue",
            Step::Is { .. } => "is",
            Step::Where { .. } | Step::WhereTraversal { .. } | Step::WhereStartKey { .. } => {
                "where"
            }
            Step::And { .. } => "and",
            Step::Or { .. } => "or",
            Step::Not { .. } => "not",
            Step::Range { .. } => "range",
            Step::Limit { .. } => "limit",
            Step::Tail { .. } => "tail",
            Step::Coin { .. } => "coin",
            Step::Sample { .. } => "sample",
            Step::Dedup { .. } => "dedup",
            Step::Out { .. } => "out",
            Step::In { .. } => "in",
            Step::Both { .. } => "both",
            Step::OutE { .. } => "outE",
            Step::InE { .. } => "inE",
            Step::BothE { .. } => "bothE",
            Step::OutV => "outV",
            Step::InV => "inV",
            Step::BothV => "bothV",
            Step::OtherV => "otherV",
            Step::Properties { .. } => "properties",
            Step::Values { .. } => "values",
            Step::Key => "key",
            Step::Value => "value",
            Step::Id => "id",
            Step::Label => "label",
            Step::ValueMap { .. } => "valueMap",
            Step::PropertyMap { .. } => "propertyMap",
            Step::Count => "count",
            Step::Fold => "fold",
            Step::Tree => "tree",
            Step::Path => "path",
            Step::Unfold => "unfold",
            Step::Group { .. } => "group",
            Step::Max => "max",
            Step::Min => "min",
            Step::Mean => "mean",
            Step::Sum => "sum",
            Step::Order => "order",
            Step::Union { .. } => "union",
            Step::Optional { .. } => "optional",
            Step::Local { .. } => "local",
            Step::Map { .. } => "map",
            Step::FlatMap { .. } => "flatMap",
            Step::Coalesce { .. } => "coalesce",
            Step::Project { .. } => "project",
            Step::Repeat { .. } => "repeat",
            Step::Choose { .. } | Step::ChoosePredicate { .. } => "choose",
            Step::ChooseOption { .. } => "option",
            Step::Match { .. } => "match",
            Step::Times { .. } => "times",
            Step::Until { .. } => "until",
            Step::Emit { .. } => "emit",
            Step::Store { .. } => "store",
            Step::Aggregate { .. } => "aggregate",
            Step::SideEffect { .. } => "sideEffect",
            Step::Cap { .. } => "cap",
            Step::Barrier => "barrier",
            Step::Iterate => "iterate",
            Step::TimeLimit { .. } => "timeLimit",
            Step::As { .. } => "as",
            Step::Select { .. } | Step::SelectKeys { .. } => "select",
            Step::Property { .. } => "property",
            Step::Drop => "drop",
            Step::From { .. } => "from",
            Step::To { .. } => "to",
        }
    }
}
