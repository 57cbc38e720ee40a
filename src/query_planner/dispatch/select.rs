//! `as()` and `select()`.

use crate::query_planner::{
    errors::{CompilationError, CompileError, CompileResult},
    plan_ctx::ScopeId,
    step::Pop,
    typed_variable::{VarId, VariableKind, VariableType},
    TraversalCompiler,
};

use super::pop_name;

impl TraversalCompiler {
    pub(super) fn tag(&mut self, scope: ScopeId, input: VarId, labels: &[String]) -> CompileResult<()> {
        if labels.is_empty() {
            return Err(CompilationError::InvalidArgument {
                step: "as",
                reason: "at least one label is required".to_string(),
            }
            .into());
        }
        for label in labels {
            self.ctx.add_label(scope, input, label)?;
        }
        Ok(())
    }

    /// Resolve `label` against this scope and its ancestors and pivot to the result.
    pub(super) fn select(&mut self, scope: ScopeId, label: &str, pop: Option<Pop>) -> CompileResult<()> {
        let bindings = self.ctx.select(scope, label);
        let resolved = match (bindings.as_slice(), pop) {
            ([], _) => {
                return Err(CompilationError::TagNotDefined {
                    label: label.to_string(),
                }
                .into())
            }
            ([only], _) => *only,
            (many, Some(Pop::First)) => self.pick(many[0], label, Pop::First)?,
            (many, Some(Pop::Last)) => self.pick(many[many.len() - 1], label, Pop::Last)?,
            (many, None) => {
                let members = many.to_vec();
                for member in &members {
                    self.selectable(*member, label)?;
                }
                let list = self
                    .ctx
                    .create_variable(VariableType::Table, VariableKind::List { members });
                self.ctx.pivot_to(scope, list)?;
                self.ctx.variable_mut(list).mark_selected(label, None);
                return Ok(());
            }
            (_, Some(other)) => {
                return Err(CompileError::not_implemented(format!(
                    "select({}, \"{}\") over several bindings",
                    pop_name(other),
                    label
                )))
            }
        };
        self.selectable(resolved, label)?;
        log::debug!(
            "select(\"{}\") resolved to `{}`",
            label,
            self.ctx.variable(resolved).name()
        );

        self.ctx.variable_mut(resolved).set_home_scope(scope);
        self.ctx.declare(scope, resolved)?;
        self.ctx.set_pivot(scope, resolved)?;
        if self.ctx.variable(resolved).is_taggable() {
            self.ctx.variable_mut(resolved).mark_selected(label, pop);
        }
        Ok(())
    }

    /// First/last disambiguation cannot see through branch results.
    fn pick(&self, var: VarId, label: &str, pop: Pop) -> CompileResult<VarId> {
        if self.ctx.variable(var).is_branch() {
            return Err(CompileError::not_implemented(format!(
                "select({}, \"{}\") resolving to a {} result",
                pop_name(pop),
                label,
                self.ctx.variable(var).kind().function_name()
            )));
        }
        Ok(var)
    }

    fn selectable(&self, var: VarId, label: &str) -> CompileResult<()> {
        if self.ctx.is_inside_repeat(var) {
            return Err(CompileError::not_implemented(format!(
                "select(\"{}\") of a variable bound inside repeat()",
                label
            )));
        }
        Ok(())
    }
}
