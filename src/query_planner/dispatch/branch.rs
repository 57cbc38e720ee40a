//! Composite steps owning nested sub-plans.
//!
//! Each sub-plan is compiled in a child scope starting from the parent pivot.
//! Once the composite variable exists it becomes the home variable of every child,
//! which closes them.

use std::collections::BTreeSet;

use crate::query_planner::{
    errors::{CompilationError, CompileResult},
    plan_ctx::ScopeId,
    step::{RepeatCondition, Step, Traversal},
    typed_variable::{RepeatControl, VarId, VariableKind, VariableType},
    TraversalCompiler,
};

impl TraversalCompiler {
    /// Create the composite, adopt its sub-plans and pivot to it.
    fn compose(
        &mut self,
        scope: ScopeId,
        variable_type: VariableType,
        kind: VariableKind,
    ) -> CompileResult<VarId> {
        let nested = kind.nested_scopes();
        let var = self.ctx.create_variable(variable_type, kind);
        for sub in nested {
            self.ctx.attach_home(sub, var);
            self.ctx.close(sub);
        }
        self.ctx.pivot_to(scope, var)?;
        Ok(var)
    }

    fn compile_branches(
        &mut self,
        scope: ScopeId,
        traversals: &[Traversal],
    ) -> CompileResult<Vec<ScopeId>> {
        traversals
            .iter()
            .map(|steps| self.compile_subtraversal(scope, steps))
            .collect()
    }

    pub(super) fn union(&mut self, scope: ScopeId, traversals: &[Traversal]) -> CompileResult<()> {
        let branches = self.compile_branches(scope, traversals)?;
        let variable_type = self.ctx.common_pivot_type(&branches);
        self.compose(scope, variable_type, VariableKind::Union { branches })
            .map(|_| ())
    }

    pub(super) fn coalesce(
        &mut self,
        scope: ScopeId,
        traversals: &[Traversal],
    ) -> CompileResult<()> {
        let branches = self.compile_branches(scope, traversals)?;
        let variable_type = self.ctx.common_pivot_type(&branches);
        self.compose(scope, variable_type, VariableKind::Coalesce { branches })
            .map(|_| ())
    }

    /// Rows of the branch, or the input itself when the branch yields nothing.
    pub(super) fn optional(
        &mut self,
        scope: ScopeId,
        input: VarId,
        steps: &[Step],
    ) -> CompileResult<()> {
        let branch = self.compile_subtraversal(scope, steps)?;
        let input_type = self.ctx.variable(input).variable_type();
        let variable_type = if self.ctx.pivot_type(branch) == input_type {
            input_type
        } else {
            VariableType::Table
        };
        self.compose(scope, variable_type, VariableKind::Optional { input, branch })
            .map(|_| ())
    }

    fn single_sub(
        &mut self,
        scope: ScopeId,
        steps: &[Step],
        make: impl FnOnce(ScopeId) -> VariableKind,
    ) -> CompileResult<()> {
        let sub = self.compile_subtraversal(scope, steps)?;
        let variable_type = self.ctx.common_pivot_type(&[sub]);
        self.compose(scope, variable_type, make(sub)).map(|_| ())
    }

    pub(super) fn local(&mut self, scope: ScopeId, steps: &[Step]) -> CompileResult<()> {
        self.single_sub(scope, steps, |sub| VariableKind::Local { sub })
    }

    pub(super) fn map(&mut self, scope: ScopeId, steps: &[Step]) -> CompileResult<()> {
        self.single_sub(scope, steps, |sub| VariableKind::Map { sub })
    }

    pub(super) fn flat_map(&mut self, scope: ScopeId, steps: &[Step]) -> CompileResult<()> {
        self.single_sub(scope, steps, |sub| VariableKind::FlatMap { sub })
    }

    /// `project(keys...).by(...)`; keys without a `by` project the input itself.
    pub(super) fn project(
        &mut self,
        scope: ScopeId,
        keys: &[String],
        by: &[Traversal],
    ) -> CompileResult<()> {
        if keys.is_empty() {
            return Err(CompilationError::InvalidArgument {
                step: "project",
                reason: "at least one key is required".to_string(),
            }
            .into());
        }
        if by.len() > keys.len() {
            return Err(CompilationError::InvalidArgument {
                step: "project",
                reason: format!("{} by() modulators for {} keys", by.len(), keys.len()),
            }
            .into());
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = keys.iter().find(|k| !seen.insert(k.as_str())) {
            return Err(CompilationError::InvalidArgument {
                step: "project",
                reason: format!("duplicate key \"{}\"", dup),
            }
            .into());
        }

        let by = self.compile_branches(scope, by)?;
        self.compose(
            scope,
            VariableType::Table,
            VariableKind::Project {
                keys: keys.to_vec(),
                by,
            },
        )
        .map(|_| ())
    }

    /// The body starts from a loop accumulator seeded with the current pivot;
    /// `until`/`emit` are evaluated on the body output.
    pub(super) fn repeat(
        &mut self,
        scope: ScopeId,
        input: VarId,
        steps: &[Step],
        condition: &RepeatCondition,
    ) -> CompileResult<()> {
        let body = self.open_child_scope(scope)?;
        let seed_type = self.ctx.variable(input).variable_type();
        let loop_input = self
            .ctx
            .create_variable(seed_type, VariableKind::RepeatInput { seed: input });
        self.ctx.adopt(body, loop_input)?;
        self.ctx.set_pivot(body, loop_input)?;
        self.compile_steps(body, steps)?;

        let until = condition
            .until
            .as_deref()
            .map(|steps| self.compile_subtraversal(body, steps))
            .transpose()?;
        let emit = condition
            .emit
            .as_deref()
            .map(|steps| self.compile_subtraversal(body, steps))
            .transpose()?;

        let variable_type = self.ctx.common_pivot_type(&[body]);
        log::debug!(
            "repeat over {:?}: times={:?} until={} emit={}",
            body,
            condition.times,
            until.is_some(),
            emit.is_some() || condition.emit_all
        );
        self.compose(
            scope,
            variable_type,
            VariableKind::Repeat {
                body,
                control: RepeatControl {
                    times: condition.times,
                    until,
                    emit,
                    emit_all: condition.emit_all,
                    check_first: condition.check_first,
                },
            },
        )
        .map(|_| ())
    }

    pub(super) fn choose(
        &mut self,
        scope: ScopeId,
        condition: &[Step],
        true_branch: &[Step],
        false_branch: &[Step],
    ) -> CompileResult<()> {
        let condition = self.compile_subtraversal(scope, condition)?;
        let true_branch = self.compile_subtraversal(scope, true_branch)?;
        let false_branch = self.compile_subtraversal(scope, false_branch)?;
        let variable_type = self.ctx.common_pivot_type(&[true_branch, false_branch]);
        self.compose(
            scope,
            variable_type,
            VariableKind::Choose {
                condition,
                true_branch,
                false_branch,
            },
        )
        .map(|_| ())
    }
}
