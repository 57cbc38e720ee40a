//! Typed Variable System for the traversal compiler
//!
//! Every step of a traversal produces a [`Variable`]: the compiler's model of "what
//! flows out of this step". Variables live in the [`PlanCtx`] arena and are addressed
//! by [`VarId`]; scopes refer to them by handle, never by ownership.
//!
//! # Architecture
//!
//! A variable carries:
//! - a fixed [`VariableType`] (vertex, edge, scalar, table, property, null, undefined)
//!   that decides which steps apply to it,
//! - a [`VariableKind`] describing how it was produced, which decides how it lowers
//!   into a table reference,
//! - the labels attached by `as()` and the properties required from it so far
//!   (both only ever grow),
//! - a back-reference to the scope that currently owns it.
//!
//! # Example
//!
//! ```text
//! g.V().out('knows').count()
//! ```
//!
//! - `V()`     → N_0  FreeVertex          (Vertex)
//! - `out()`   → E_1  BoundEdge{N_0, Out} (Edge), N_2 BoundVertex{E_1} (Vertex)
//! - `count()` → R_3  Count{sub-scope}    (Scalar)
//!
//! [`PlanCtx`]: crate::query_planner::plan_ctx::PlanCtx

use std::fmt;

use crate::{
    plan_ir::Literal,
    query_planner::{plan_ctx::ScopeId, step::Pop},
};

// ============================================================================
// Document model keys
// ============================================================================

/// Vertex id; also the default projection of vertices.
pub const KEY_ID: &str = "id";
pub const KEY_LABEL: &str = "label";
/// Outgoing adjacency list of a vertex document.
pub const KEY_EDGE: &str = "_edge";
/// Incoming adjacency list of a vertex document.
pub const KEY_REVERSE_EDGE: &str = "_reverse_edge";
/// Edge id inside an adjacency entry; default projection of edges.
pub const KEY_EDGE_ID: &str = "_edgeId";
pub const KEY_SOURCE: &str = "_srcV";
pub const KEY_SINK: &str = "_sink";
/// The endpoint opposite to the one the traversal came from.
pub const KEY_OTHER: &str = "_other";
/// Default projection of every non-graph variable.
pub const KEY_VALUE: &str = "_value";
pub const KEY_KEY: &str = "_key";
/// Reserved type discriminator, never requested directly.
pub const KEY_TYPE: &str = "_t";

// ============================================================================
// Core Enums
// ============================================================================

/// Handle of a variable inside the [`PlanCtx`](crate::query_planner::plan_ctx::PlanCtx) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    Vertex,
    Edge,
    Scalar,
    Table,
    Property,
    Null,
    Undefined,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableType::Vertex => "Vertex",
            VariableType::Edge => "Edge",
            VariableType::Scalar => "Scalar",
            VariableType::Table => "Table",
            VariableType::Property => "Property",
            VariableType::Null => "Null",
            VariableType::Undefined => "Undefined",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Out,
    In,
    Both,
}

impl EdgeDirection {
    /// Adjacency list on the source vertex document that holds these edges.
    pub fn adjacency_key(self) -> &'static str {
        match self {
            EdgeDirection::Out | EdgeDirection::Both => KEY_EDGE,
            EdgeDirection::In => KEY_REVERSE_EDGE,
        }
    }

    pub fn adjacency_function(self) -> &'static str {
        match self {
            EdgeDirection::Out => "AdjacencyList",
            EdgeDirection::In => "ReverseAdjacencyList",
            EdgeDirection::Both => "BothAdjacencyList",
        }
    }
}

/// Which endpoint of an edge a bound vertex is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexEnd {
    Source,
    Sink,
    Other,
    /// Either endpoint (`bothV()`).
    Both,
}

/// Loop controls of a compiled `repeat`, with sub-plans already compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatControl {
    pub times: Option<u32>,
    pub until: Option<ScopeId>,
    pub emit: Option<ScopeId>,
    pub emit_all: bool,
    pub check_first: bool,
}

/// How a variable was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    /// `V()`: the whole vertex collection.
    FreeVertex,
    /// A vertex reached through an edge.
    BoundVertex { edge: VarId, end: VertexEnd },
    /// Edges read from the adjacency list of `source`.
    BoundEdge {
        source: VarId,
        direction: EdgeDirection,
    },
    Constant { value: Literal },
    Inject { values: Vec<Literal> },
    Properties { owner: VarId, keys: Vec<String> },
    Values { owner: VarId, keys: Vec<String> },
    PropertyKey { owner: VarId },
    PropertyValue { owner: VarId },
    Count { sub: ScopeId },
    Fold { sub: ScopeId, element: VariableType },
    Tree { sub: ScopeId },
    Path { steps: Vec<VarId> },
    Unfold { source: VarId },
    Group {
        input: VarId,
        side_effect_key: Option<String>,
        key_by: Option<ScopeId>,
        value_by: Option<ScopeId>,
    },
    Union { branches: Vec<ScopeId> },
    Optional { input: VarId, branch: ScopeId },
    Local { sub: ScopeId },
    Map { sub: ScopeId },
    FlatMap { sub: ScopeId },
    Coalesce { branches: Vec<ScopeId> },
    Project { keys: Vec<String>, by: Vec<ScopeId> },
    Repeat { body: ScopeId, control: RepeatControl },
    /// The loop accumulator a repeat body starts from.
    RepeatInput { seed: VarId },
    Choose {
        condition: ScopeId,
        true_branch: ScopeId,
        false_branch: ScopeId,
    },
    Dedup { input: VarId, labels: Vec<String> },
    Store { key: String, input: VarId },
    SideEffect { sub: ScopeId },
    /// `cap(key)`: reads a side-effect channel.
    SideEffectKey { key: String },
    /// `select(label)` with several bindings and no pop.
    List { members: Vec<VarId> },
    AddV { label: Option<String> },
    AddE { source: VarId, label: String },
    UpdateProperties {
        target: VarId,
        properties: Vec<(String, Literal)>,
    },
    Drop { target: VarId },
    /// Rows of a scope whose pivot was cut by `range()`/`limit()` before a later step.
    Window { sub: ScopeId },
}

impl VariableKind {
    /// Results of union/choose/repeat-style constructs, whose bindings cannot be
    /// told apart statically.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            VariableKind::Union { .. }
                | VariableKind::Coalesce { .. }
                | VariableKind::Choose { .. }
                | VariableKind::Repeat { .. }
                | VariableKind::Optional { .. }
        )
    }

    /// Sub-plans whose pivots feed this variable's output rows. A property
    /// required on this variable has to be projected by each of them.
    pub fn output_scopes(&self) -> Vec<ScopeId> {
        match self {
            VariableKind::Union { branches } | VariableKind::Coalesce { branches } => {
                branches.clone()
            }
            VariableKind::Optional { branch, .. } => vec![*branch],
            VariableKind::Local { sub }
            | VariableKind::Map { sub }
            | VariableKind::FlatMap { sub }
            | VariableKind::Fold { sub, .. }
            | VariableKind::Window { sub } => vec![*sub],
            VariableKind::Repeat { body, .. } => vec![*body],
            VariableKind::Choose {
                true_branch,
                false_branch,
                ..
            } => vec![*true_branch, *false_branch],
            _ => vec![],
        }
    }

    /// Every sub-plan owned by this variable, in argument order.
    pub fn nested_scopes(&self) -> Vec<ScopeId> {
        match self {
            VariableKind::Count { sub }
            | VariableKind::Tree { sub }
            | VariableKind::SideEffect { sub } => vec![*sub],
            VariableKind::Group {
                key_by, value_by, ..
            } => key_by.iter().chain(value_by.iter()).copied().collect(),
            VariableKind::Project { by, .. } => by.clone(),
            VariableKind::Repeat { body, control } => std::iter::once(*body)
                .chain(control.until)
                .chain(control.emit)
                .collect(),
            VariableKind::Choose {
                condition,
                true_branch,
                false_branch,
            } => vec![*condition, *true_branch, *false_branch],
            other => other.output_scopes(),
        }
    }

    /// Table-function name used when lowering.
    pub fn function_name(&self) -> &'static str {
        match self {
            VariableKind::FreeVertex | VariableKind::BoundVertex { .. } => "Node",
            VariableKind::BoundEdge { direction, .. } => direction.adjacency_function(),
            VariableKind::Constant { .. } => "Constant",
            VariableKind::Inject { .. } => "Inject",
            VariableKind::Properties { .. } => "Properties",
            VariableKind::Values { .. } => "Values",
            VariableKind::PropertyKey { .. } => "Key",
            VariableKind::PropertyValue { .. } => "Value",
            VariableKind::Count { .. } => "Count",
            VariableKind::Fold { .. } => "Fold",
            VariableKind::Tree { .. } => "Tree",
            VariableKind::Path { .. } => "Path",
            VariableKind::Unfold { .. } => "Unfold",
            VariableKind::Group { .. } => "Group",
            VariableKind::Union { .. } => "Union",
            VariableKind::Optional { .. } => "Optional",
            VariableKind::Local { .. } => "Local",
            VariableKind::Map { .. } => "Map",
            VariableKind::FlatMap { .. } => "FlatMap",
            VariableKind::Coalesce { .. } => "Coalesce",
            VariableKind::Project { .. } => "Project",
            VariableKind::Repeat { .. } => "Repeat",
            VariableKind::RepeatInput { .. } => "RepeatInput",
            VariableKind::Choose { .. } => "Choose",
            VariableKind::Dedup { .. } => "Dedup",
            VariableKind::Store { .. } => "Store",
            VariableKind::SideEffect { .. } => "SideEffect",
            VariableKind::SideEffectKey { .. } => "Cap",
            VariableKind::List { .. } => "List",
            VariableKind::AddV { .. } => "AddV",
            VariableKind::AddE { .. } => "AddE",
            VariableKind::UpdateProperties { .. } => "UpdateProperties",
            VariableKind::Drop { .. } => "Drop",
            VariableKind::Window { .. } => "Window",
        }
    }
}

/// Recorded on a variable resolved through `select`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub label: String,
    pub pop: Option<Pop>,
}

// ============================================================================
// Variable
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    id: VarId,
    name: String,
    variable_type: VariableType,
    kind: VariableKind,
    low: i64,
    high: i64,
    labels: Vec<String>,
    projected_properties: Vec<String>,
    home_scope: Option<ScopeId>,
    selection: Option<Selection>,
}

impl Variable {
    pub(crate) fn new(id: VarId, variable_type: VariableType, kind: VariableKind) -> Self {
        let prefix = match variable_type {
            VariableType::Vertex => "N",
            VariableType::Edge => "E",
            VariableType::Property => "P",
            VariableType::Scalar
            | VariableType::Table
            | VariableType::Null
            | VariableType::Undefined => "R",
        };
        Variable {
            id,
            name: format!("{}_{}", prefix, id.0),
            variable_type,
            kind,
            low: i64::MIN,
            high: i64::MAX,
            labels: Vec::new(),
            projected_properties: Vec::new(),
            home_scope: None,
            selection: None,
        }
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    /// Table alias of this variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable_type(&self) -> VariableType {
        self.variable_type
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut VariableKind {
        &mut self.kind
    }

    pub fn is_branch(&self) -> bool {
        self.kind.is_branch()
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    pub fn is_range_narrowed(&self) -> bool {
        self.low != i64::MIN || self.high != i64::MAX
    }

    /// Apply `[low, high)` to the rows left by the current range. `high == i64::MAX`
    /// leaves the upper bound open.
    pub(crate) fn narrow_range(&mut self, low: i64, high: i64) {
        let base = self.low.max(0);
        let new_low = base.saturating_add(low);
        let new_high = if high == i64::MAX {
            self.high
        } else {
            self.high.min(base.saturating_add(high))
        };
        self.low = new_low;
        self.high = new_high.max(new_low);
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Returns false when the label was already attached.
    pub(crate) fn add_label(&mut self, label: &str) -> bool {
        if self.contains_label(label) {
            return false;
        }
        self.labels.push(label.to_string());
        true
    }

    pub fn projected_properties(&self) -> &[String] {
        &self.projected_properties
    }

    pub fn contains_property(&self, property: &str) -> bool {
        self.projected_properties.iter().any(|p| p == property)
    }

    /// Raw insert into the projected set. Returns false when already present.
    pub(crate) fn insert_property(&mut self, property: &str) -> bool {
        if self.contains_property(property) {
            return false;
        }
        self.projected_properties.push(property.to_string());
        true
    }

    pub fn home_scope(&self) -> Option<ScopeId> {
        self.home_scope
    }

    pub(crate) fn set_home_scope(&mut self, scope: ScopeId) {
        self.home_scope = Some(scope);
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub(crate) fn mark_selected(&mut self, label: &str, pop: Option<Pop>) {
        self.selection = Some(Selection {
            label: label.to_string(),
            pop,
        });
    }

    /// Only variables that carry rows can remember how they were selected.
    pub fn is_taggable(&self) -> bool {
        !matches!(
            self.variable_type,
            VariableType::Null | VariableType::Undefined
        )
    }

    /// The column that stands for the whole variable when it is projected.
    pub fn default_projection(&self) -> &'static str {
        match self.variable_type {
            VariableType::Vertex => KEY_ID,
            VariableType::Edge => KEY_EDGE_ID,
            VariableType::Scalar
            | VariableType::Table
            | VariableType::Property
            | VariableType::Null
            | VariableType::Undefined => KEY_VALUE,
        }
    }
}
