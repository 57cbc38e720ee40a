//! Scope for one nesting level of a traversal
//!
//! `Scope` accumulates the plan fragment of one level: declared variables, the subset
//! of them that materialize as FROM items, the predicate conjunction, the current
//! pivot and the tag registry. Nested sub-plans get their own scope whose
//! `home_variable` is the composite variable that owns them.

use std::collections::BTreeMap;

use crate::{plan_ir::BooleanExpr, query_planner::typed_variable::VarId};

/// Handle of a scope inside the [`PlanCtx`](super::PlanCtx) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Accepting steps.
    Open,
    /// Lowered, or handed to a nested operator. Never reopened.
    Closed,
}

/// A property a nested scope must project so that an enclosing plan can read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub owner: VarId,
    pub property: String,
    /// Output column name, `<alias>_<property>`.
    pub column_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub(super) id: ScopeId,
    pub(super) variables: Vec<VarId>,
    pub(super) table_refs: Vec<VarId>,
    pub(super) pivot: Option<VarId>,
    pub(super) predicates: Vec<BooleanExpr>,
    pub(super) tags: BTreeMap<String, Vec<VarId>>,
    pub(super) side_effect_keys: Vec<String>,
    pub(super) projected_columns: Vec<ProjectedColumn>,
    pub(super) home_variable: Option<VarId>,
    /// Lexically enclosing scope, used until the home variable exists.
    pub(super) parent: Option<ScopeId>,
    pub(super) state: ScopeState,
}

impl Scope {
    pub(super) fn new(id: ScopeId, parent: Option<ScopeId>) -> Self {
        Scope {
            id,
            variables: Vec::new(),
            table_refs: Vec::new(),
            pivot: None,
            predicates: Vec::new(),
            tags: BTreeMap::new(),
            side_effect_keys: Vec::new(),
            projected_columns: Vec::new(),
            home_variable: None,
            parent,
            state: ScopeState::Open,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Declared variables in step order.
    pub fn variables(&self) -> &[VarId] {
        &self.variables
    }

    /// Variables that materialize as FROM items, in step order.
    pub fn table_refs(&self) -> &[VarId] {
        &self.table_refs
    }

    pub fn pivot(&self) -> Option<VarId> {
        self.pivot
    }

    pub fn predicates(&self) -> &[BooleanExpr] {
        &self.predicates
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<VarId>> {
        &self.tags
    }

    pub fn side_effect_keys(&self) -> &[String] {
        &self.side_effect_keys
    }

    pub fn projected_columns(&self) -> &[ProjectedColumn] {
        &self.projected_columns
    }

    pub fn home_variable(&self) -> Option<VarId> {
        self.home_variable
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ScopeState::Open
    }

    pub fn declares(&self, var: VarId) -> bool {
        self.variables.contains(&var)
    }

    /// Returns false when an identical column was already recorded.
    pub(super) fn add_projected_column(&mut self, column: ProjectedColumn) -> bool {
        if self.projected_columns.contains(&column) {
            return false;
        }
        self.projected_columns.push(column);
        true
    }
}
