//! Mutation steps.
//!
//! `property()` does not move the pivot: consecutive calls on the same target are
//! collected into a single update.

use crate::{
    plan_ir::Literal,
    query_planner::{
        errors::{CompilationError, CompileResult},
        plan_ctx::ScopeId,
        typed_variable::{VarId, VariableKind, VariableType, KEY_ID, KEY_TYPE},
        TraversalCompiler,
    },
};

impl TraversalCompiler {
    pub(super) fn add_v(&mut self, scope: ScopeId, label: Option<&str>) -> CompileResult<()> {
        let var = self.ctx.create_variable(
            VariableType::Vertex,
            VariableKind::AddV {
                label: label.map(str::to_string),
            },
        );
        self.ctx.pivot_to(scope, var)
    }

    pub(super) fn add_e(&mut self, scope: ScopeId, source: VarId, label: &str) -> CompileResult<()> {
        self.ctx.populate(source, KEY_ID)?;
        let var = self.ctx.create_variable(
            VariableType::Edge,
            VariableKind::AddE {
                source,
                label: label.to_string(),
            },
        );
        self.ctx.pivot_to(scope, var)
    }

    pub(super) fn property(
        &mut self,
        scope: ScopeId,
        target: VarId,
        key: &str,
        value: &Literal,
    ) -> CompileResult<()> {
        if key == KEY_TYPE {
            return Err(CompilationError::ReservedProperty {
                property: key.to_string(),
            }
            .into());
        }

        let existing = self.ctx.scope(scope).variables().iter().copied().find(|v| {
            matches!(
                self.ctx.variable(*v).kind(),
                VariableKind::UpdateProperties { target: t, .. } if *t == target
            )
        });
        if let Some(update) = existing {
            if let VariableKind::UpdateProperties { properties, .. } =
                self.ctx.variable_mut(update).kind_mut()
            {
                match properties.iter_mut().find(|(k, _)| k == key) {
                    Some(entry) => entry.1 = value.clone(),
                    None => properties.push((key.to_string(), value.clone())),
                }
            }
            return Ok(());
        }

        self.ctx.default_expr(target)?;
        let update = self.ctx.create_variable(
            VariableType::Table,
            VariableKind::UpdateProperties {
                target,
                properties: vec![(key.to_string(), value.clone())],
            },
        );
        self.ctx.declare_table(scope, update)
    }

    pub(super) fn drop(&mut self, scope: ScopeId, target: VarId) -> CompileResult<()> {
        self.ctx.default_expr(target)?;
        let var = self
            .ctx
            .create_variable(VariableType::Null, VariableKind::Drop { target });
        self.ctx.pivot_to(scope, var)
    }
}
