//! Compilation context.
//!
//! [`PlanCtx`] is the arena that owns every [`Scope`] and every [`Variable`] of one
//! traversal. Everything else refers to them through [`ScopeId`] / [`VarId`]
//! handles, so the logical graph (scope → home variable → enclosing scope) can have
//! cycles while ownership stays a flat tree.
//!
//! # Key Components
//!
//! - [`Scope`] - one nesting level: declared variables, FROM items, predicates, pivot
//! - [`Variable`] - one step's output
//! - tag resolution - [`PlanCtx::select`] walks the scope chain upwards
//! - property propagation - [`PlanCtx::populate`] / [`PlanCtx::column_name`]
//!
//! # Scope Chain
//!
//! Nested sub-plans form a chain through their home variables:
//! ```text
//! g.V().as('a').union(__.out().count(), __.in())
//! └─ root ──────────────────────────────────────┘  pivot: R_union
//!                     └─ branch 0 ──────┘          home: R_union
//!                          └─ dup ─┘               home: R_count
//! ```
//!
//! Tag lookup from the innermost scope visits `dup`, `branch 0`, then `root`.
//!
//! A `PlanCtx` belongs to exactly one compilation. Build a fresh one per traversal.

pub mod scope;

pub use scope::{ProjectedColumn, Scope, ScopeId, ScopeState};

use crate::{
    plan_ir::{BooleanExpr, ScalarExpr},
    query_planner::{
        errors::{CompilationError, CompileError, CompileResult},
        typed_variable::{VarId, Variable, VariableKind, VariableType, KEY_TYPE},
    },
};

#[derive(Debug, Clone)]
pub struct PlanCtx {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
    /// Collection that holds every vertex document.
    vertex_collection: String,
}

impl PlanCtx {
    pub fn new(vertex_collection: impl Into<String>) -> Self {
        PlanCtx {
            scopes: Vec::new(),
            variables: Vec::new(),
            vertex_collection: vertex_collection.into(),
        }
    }

    pub fn vertex_collection(&self) -> &str {
        &self.vertex_collection
    }

    // ========================================================================
    // Arena access
    // ========================================================================

    pub fn new_root_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(id, None));
        log::debug!("PlanCtx: created root scope {:?}", id);
        id
    }

    /// A scope for a sub-plan nested under `parent`. Its home variable is attached
    /// once the composite that owns it exists.
    pub fn new_child_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(id, Some(parent)));
        log::debug!("PlanCtx: created scope {:?} under {:?}", id, parent);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub(crate) fn variable_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    pub fn create_variable(&mut self, variable_type: VariableType, kind: VariableKind) -> VarId {
        let id = VarId(self.variables.len());
        let variable = Variable::new(id, variable_type, kind);
        log::trace!(
            "PlanCtx: new {} variable `{}` ({})",
            variable_type,
            variable.name(),
            variable.kind().function_name()
        );
        self.variables.push(variable);
        id
    }

    pub fn pivot(&self, scope: ScopeId) -> Option<VarId> {
        self.scope(scope).pivot
    }

    /// `Undefined` when the scope has no pivot yet.
    pub fn pivot_type(&self, scope: ScopeId) -> VariableType {
        self.pivot(scope)
            .map(|v| self.variable(v).variable_type())
            .unwrap_or(VariableType::Undefined)
    }

    // ========================================================================
    // Scope mutation
    // ========================================================================

    pub fn ensure_open(&self, scope: ScopeId) -> Result<(), CompilationError> {
        if self.scope(scope).is_open() {
            Ok(())
        } else {
            Err(CompilationError::ScopeClosed)
        }
    }

    /// Add `var` to the declared-variable list only. Declaring twice is a no-op.
    pub fn declare(&mut self, scope: ScopeId, var: VarId) -> CompileResult<()> {
        self.ensure_open(scope)?;
        let s = self.scope_mut(scope);
        if !s.variables.contains(&var) {
            s.variables.push(var);
        }
        Ok(())
    }

    /// Declare `var` as owned by `scope` without making it a FROM item.
    pub fn adopt(&mut self, scope: ScopeId, var: VarId) -> CompileResult<()> {
        self.declare(scope, var)?;
        self.variable_mut(var).set_home_scope(scope);
        Ok(())
    }

    /// Declare `var` and register it as a FROM item of `scope`.
    pub fn declare_table(&mut self, scope: ScopeId, var: VarId) -> CompileResult<()> {
        self.ensure_open(scope)?;
        let s = self.scope_mut(scope);
        if !s.variables.contains(&var) {
            s.variables.push(var);
        }
        if !s.table_refs.contains(&var) {
            s.table_refs.push(var);
        }
        self.variable_mut(var).set_home_scope(scope);
        Ok(())
    }

    /// The previous pivot stays declared.
    pub fn set_pivot(&mut self, scope: ScopeId, var: VarId) -> CompileResult<()> {
        self.ensure_open(scope)?;
        self.scope_mut(scope).pivot = Some(var);
        Ok(())
    }

    /// Declare `var` as a FROM item and make it the pivot.
    pub fn pivot_to(&mut self, scope: ScopeId, var: VarId) -> CompileResult<()> {
        self.declare_table(scope, var)?;
        self.set_pivot(scope, var)
    }

    /// Conjoin `expr` onto the scope predicate. `True` is the identity.
    pub fn add_predicate(&mut self, scope: ScopeId, expr: BooleanExpr) -> CompileResult<()> {
        self.ensure_open(scope)?;
        match expr {
            BooleanExpr::True => {}
            BooleanExpr::And(items) => self.scope_mut(scope).predicates.extend(items),
            other => self.scope_mut(scope).predicates.push(other),
        }
        Ok(())
    }

    pub fn add_label(&mut self, scope: ScopeId, var: VarId, label: &str) -> CompileResult<()> {
        self.ensure_open(scope)?;
        self.variable_mut(var).add_label(label);
        let bindings = self
            .scope_mut(scope)
            .tags
            .entry(label.to_string())
            .or_default();
        if !bindings.contains(&var) {
            bindings.push(var);
        }
        Ok(())
    }

    pub fn register_side_effect_key(&mut self, scope: ScopeId, key: &str) -> CompileResult<()> {
        self.ensure_open(scope)?;
        let keys = &mut self.scope_mut(scope).side_effect_keys;
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
        Ok(())
    }

    pub fn side_effect_key_defined(&self, scope: ScopeId, key: &str) -> bool {
        self.ancestors(scope)
            .into_iter()
            .any(|s| self.scope(s).side_effect_keys.iter().any(|k| k == key))
    }

    pub fn attach_home(&mut self, scope: ScopeId, home: VarId) {
        self.scope_mut(scope).home_variable = Some(home);
    }

    pub fn close(&mut self, scope: ScopeId) {
        if self.scope(scope).is_open() {
            log::trace!("PlanCtx: closing scope {:?}", scope);
        }
        self.scope_mut(scope).state = ScopeState::Closed;
    }

    /// An independent scope sharing the same variables, FROM items and predicates.
    ///
    /// Variables owned by `scope` move their home to the duplicate, since the
    /// original is about to be reset.
    pub fn duplicate(&mut self, scope: ScopeId) -> CompileResult<ScopeId> {
        self.ensure_open(scope)?;
        let id = ScopeId(self.scopes.len());
        let mut dup = self.scope(scope).clone();
        dup.id = id;
        dup.home_variable = None;
        dup.state = ScopeState::Open;
        let owned: Vec<VarId> = dup
            .variables
            .iter()
            .copied()
            .filter(|v| self.variable(*v).home_scope() == Some(scope))
            .collect();
        self.scopes.push(dup);
        for var in owned {
            self.variable_mut(var).set_home_scope(id);
        }
        log::debug!("PlanCtx: duplicated scope {:?} into {:?}", scope, id);
        Ok(id)
    }

    /// Clear the scope back to empty with an undefined pivot.
    pub fn reset(&mut self, scope: ScopeId) -> CompileResult<()> {
        self.ensure_open(scope)?;
        let s = self.scope_mut(scope);
        s.variables.clear();
        s.table_refs.clear();
        s.predicates.clear();
        s.tags.clear();
        s.projected_columns.clear();
        s.pivot = None;
        log::debug!("PlanCtx: reset scope {:?}", scope);
        Ok(())
    }

    // ========================================================================
    // Scope chain and tags
    // ========================================================================

    /// The enclosing scope: the home scope of the home variable, or the lexical
    /// parent while the home variable does not exist yet.
    pub fn ancestor(&self, scope: ScopeId) -> Option<ScopeId> {
        let s = self.scope(scope);
        match s.home_variable {
            Some(home) => self.variable(home).home_scope().or(s.parent),
            None => s.parent,
        }
    }

    /// `scope` followed by every enclosing scope, innermost first.
    pub fn ancestors(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(next) = self.ancestor(current) {
            if chain.contains(&next) {
                break;
            }
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Number of enclosing scopes.
    pub fn depth(&self, scope: ScopeId) -> u32 {
        (self.ancestors(scope).len() - 1) as u32
    }

    /// Every variable visible from `scope` that carries `label`, outermost scope
    /// first and in declaration order within a scope.
    pub fn select(&self, scope: ScopeId, label: &str) -> Vec<VarId> {
        let mut found = Vec::new();
        for s in self.ancestors(scope).into_iter().rev() {
            for var in &self.scope(s).variables {
                if self.variable(*var).contains_label(label) && !found.contains(var) {
                    found.push(*var);
                }
            }
        }
        found
    }

    /// True when `var` was produced inside a repeat body.
    pub fn is_inside_repeat(&self, var: VarId) -> bool {
        if matches!(
            self.variable(var).kind(),
            VariableKind::RepeatInput { .. }
        ) {
            return true;
        }
        let Some(home_scope) = self.variable(var).home_scope() else {
            return false;
        };
        // A body still being compiled has no home variable yet; it is recognised
        // by the accumulator it starts from.
        self.ancestors(home_scope).into_iter().any(|s| {
            let scope = self.scope(s);
            scope
                .home_variable
                .is_some_and(|h| matches!(self.variable(h).kind(), VariableKind::Repeat { .. }))
                || scope.variables.iter().any(|v| {
                    matches!(self.variable(*v).kind(), VariableKind::RepeatInput { .. })
                        && self.variable(*v).home_scope() == Some(s)
                })
        })
    }

    // ========================================================================
    // Property requirements
    // ========================================================================

    /// Require `property` from `var`. Idempotent. Composite variables forward the
    /// requirement into the sub-plans that produce their rows.
    pub fn populate(&mut self, var: VarId, property: &str) -> CompileResult<()> {
        if property == KEY_TYPE {
            return Err(CompilationError::ReservedProperty {
                property: property.to_string(),
            }
            .into());
        }
        if !self.variable_mut(var).insert_property(property) {
            return Ok(());
        }
        log::trace!(
            "PlanCtx: `{}` requires property `{}`",
            self.variable(var).name(),
            property
        );

        let kind = self.variable(var).kind().clone();
        match &kind {
            VariableKind::RepeatInput { seed } => self.populate(*seed, property)?,
            VariableKind::Unfold { source } => self.populate(*source, property)?,
            VariableKind::Optional { input, .. } => self.populate(*input, property)?,
            VariableKind::List { members } => {
                for member in members {
                    self.populate(*member, property)?;
                }
            }
            VariableKind::Repeat { body, .. } => {
                let loop_input = self.scope(*body).variables.iter().copied().find(|v| {
                    matches!(self.variable(*v).kind(), VariableKind::RepeatInput { .. })
                });
                if let Some(loop_input) = loop_input {
                    self.populate(loop_input, property)?;
                }
            }
            _ => {}
        }

        if property == self.variable(var).default_projection() {
            return Ok(());
        }
        for sub in kind.output_scopes() {
            if let Some(pivot) = self.pivot(sub) {
                if pivot != var {
                    self.export_from(sub, pivot, property)?;
                }
            }
        }
        Ok(())
    }

    /// Name of the column under which `var` exposes `property`.
    ///
    /// Variables whose rows come from the pivots of nested scopes read forwarded
    /// properties as `<alias>_<property>`. The default projection is always exposed
    /// under its own key.
    pub fn column_name(&self, var: VarId, property: &str) -> String {
        let v = self.variable(var);
        if property != v.default_projection() && self.forwards_properties(var) {
            format!("{}_{}", v.name(), property)
        } else {
            property.to_string()
        }
    }

    fn forwards_properties(&self, var: VarId) -> bool {
        self.variable(var)
            .kind()
            .output_scopes()
            .into_iter()
            .any(|sub| self.pivot(sub).is_some_and(|p| p != var))
    }

    /// Project `property` of `owner` out of `scope` for the scope's home variable.
    /// Returns the output column name.
    fn export_from(
        &mut self,
        scope: ScopeId,
        owner: VarId,
        property: &str,
    ) -> CompileResult<String> {
        if matches!(
            self.variable(owner).kind(),
            VariableKind::RepeatInput { .. }
        ) {
            return Err(CompileError::not_implemented(
                "property propagation through a repeat() accumulator",
            ));
        }
        let home = self.scope(scope).home_variable.ok_or_else(|| {
            CompilationError::MissingHomeScope {
                alias: self.variable(owner).name().to_string(),
            }
        })?;
        self.populate(owner, property)?;
        let read = self.column_name(owner, property);
        let column_name = self.column_name(home, property);

        self.scope_mut(scope).add_projected_column(ProjectedColumn {
            owner,
            property: read,
            column_name: column_name.clone(),
        });
        // The loop output is re-read through the accumulator, not through the
        // repeat variable's own columns.
        if !matches!(self.variable(home).kind(), VariableKind::Repeat { .. }) {
            self.variable_mut(home).insert_property(&column_name);
        }
        log::trace!(
            "PlanCtx: propagated `{}` through {:?} as `{}`",
            property,
            scope,
            column_name
        );
        Ok(column_name)
    }

    /// Column expression for `var.property`, requiring the property on the way.
    pub fn property_expr(&mut self, var: VarId, property: &str) -> CompileResult<ScalarExpr> {
        self.populate(var, property)?;
        Ok(ScalarExpr::column(
            self.variable(var).name(),
            &self.column_name(var, property),
        ))
    }

    /// Column expression for the variable as a whole.
    pub fn default_expr(&mut self, var: VarId) -> CompileResult<ScalarExpr> {
        let key = self.variable(var).default_projection();
        self.property_expr(var, key)
    }

    /// Common variant of the pivots of `scopes`; `Table` when they disagree.
    pub fn common_pivot_type(&self, scopes: &[ScopeId]) -> VariableType {
        let mut types = scopes.iter().map(|s| match self.pivot_type(*s) {
            VariableType::Undefined => VariableType::Null,
            other => other,
        });
        let Some(first) = types.next() else {
            return VariableType::Null;
        };
        if types.all(|t| t == first) {
            first
        } else {
            VariableType::Table
        }
    }
}
