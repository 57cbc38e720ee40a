//! Barriers and side effects.
//!
//! `count`, `fold` and `tree` collapse everything compiled so far: the scope is
//! duplicated, the duplicate becomes the aggregate's sub-plan and the original
//! restarts from the aggregate alone.

use crate::query_planner::{
    errors::{CompilationError, CompileResult},
    plan_ctx::ScopeId,
    step::Step,
    typed_variable::{VarId, VariableKind, VariableType},
    TraversalCompiler,
};

impl TraversalCompiler {
    /// Duplicate + reset, then pivot to the aggregate built over the duplicate.
    pub(super) fn collapse(
        &mut self,
        scope: ScopeId,
        variable_type: VariableType,
        make: impl FnOnce(ScopeId) -> VariableKind,
    ) -> CompileResult<VarId> {
        let sub = self.ctx.duplicate(scope)?;
        self.ctx.reset(scope)?;
        let var = self.ctx.create_variable(variable_type, make(sub));
        self.ctx.attach_home(sub, var);
        self.ctx.close(sub);
        self.ctx.pivot_to(scope, var)?;
        Ok(var)
    }

    pub(super) fn count(&mut self, scope: ScopeId) -> CompileResult<()> {
        self.collapse(scope, VariableType::Scalar, |sub| VariableKind::Count { sub })
            .map(|_| ())
    }

    pub(super) fn fold(&mut self, scope: ScopeId, input: VarId) -> CompileResult<()> {
        let element = self.ctx.variable(input).variable_type();
        self.collapse(scope, VariableType::Table, |sub| VariableKind::Fold {
            sub,
            element,
        })
        .map(|_| ())
    }

    pub(super) fn tree(&mut self, scope: ScopeId) -> CompileResult<()> {
        self.require_step_columns(scope)?;
        self.collapse(scope, VariableType::Table, |sub| VariableKind::Tree { sub })
            .map(|_| ())
    }

    pub(super) fn path(&mut self, scope: ScopeId) -> CompileResult<()> {
        let steps = self.require_step_columns(scope)?;
        let var = self
            .ctx
            .create_variable(VariableType::Table, VariableKind::Path { steps });
        self.ctx.pivot_to(scope, var)
    }

    /// Requires the default projection of every FROM variable of `scope`.
    fn require_step_columns(&mut self, scope: ScopeId) -> CompileResult<Vec<VarId>> {
        let steps = self.ctx.scope(scope).table_refs().to_vec();
        for var in &steps {
            self.ctx.default_expr(*var)?;
        }
        Ok(steps)
    }

    pub(super) fn unfold(&mut self, scope: ScopeId, input: VarId) -> CompileResult<()> {
        let variable_type = match self.ctx.variable(input).kind() {
            VariableKind::Fold { element, .. } => *element,
            VariableKind::Inject { .. } => VariableType::Scalar,
            VariableKind::List { members } => {
                let mut types = members.iter().map(|m| self.ctx.variable(*m).variable_type());
                match types.next() {
                    Some(first) if types.all(|t| t == first) => first,
                    _ => VariableType::Table,
                }
            }
            _ => self.ctx.variable(input).variable_type(),
        };
        let var = self
            .ctx
            .create_variable(variable_type, VariableKind::Unfold { source: input });
        self.ctx.pivot_to(scope, var)
    }

    pub(super) fn group(
        &mut self,
        scope: ScopeId,
        input: VarId,
        side_effect_key: Option<&str>,
        key_by: Option<&[Step]>,
        value_by: Option<&[Step]>,
    ) -> CompileResult<()> {
        let key_by = key_by
            .map(|steps| self.compile_subtraversal(scope, steps))
            .transpose()?;
        let value_by = value_by
            .map(|steps| self.compile_subtraversal(scope, steps))
            .transpose()?;
        self.ctx.default_expr(input)?;

        let var = self.ctx.create_variable(
            VariableType::Table,
            VariableKind::Group {
                input,
                side_effect_key: side_effect_key.map(str::to_string),
                key_by,
                value_by,
            },
        );
        for sub in key_by.into_iter().chain(value_by) {
            self.ctx.attach_home(sub, var);
            self.ctx.close(sub);
        }

        match side_effect_key {
            Some(key) => {
                self.ctx.declare_table(scope, var)?;
                self.ctx.register_side_effect_key(scope, key)
            }
            None => self.ctx.pivot_to(scope, var),
        }
    }

    pub(super) fn store(&mut self, scope: ScopeId, input: VarId, key: &str) -> CompileResult<()> {
        self.ctx.default_expr(input)?;
        let var = self.ctx.create_variable(
            VariableType::Table,
            VariableKind::Store {
                key: key.to_string(),
                input,
            },
        );
        self.ctx.declare_table(scope, var)?;
        self.ctx.register_side_effect_key(scope, key)
    }

    pub(super) fn side_effect(&mut self, scope: ScopeId, steps: &[Step]) -> CompileResult<()> {
        let sub = self.compile_subtraversal(scope, steps)?;
        let var = self
            .ctx
            .create_variable(VariableType::Table, VariableKind::SideEffect { sub });
        self.ctx.attach_home(sub, var);
        self.ctx.close(sub);
        self.ctx.declare_table(scope, var)
    }

    pub(super) fn cap(&mut self, scope: ScopeId, key: &str) -> CompileResult<()> {
        if !self.ctx.side_effect_key_defined(scope, key) {
            return Err(CompilationError::SideEffectKeyNotDefined {
                key: key.to_string(),
            }
            .into());
        }
        let var = self.ctx.create_variable(
            VariableType::Table,
            VariableKind::SideEffectKey {
                key: key.to_string(),
            },
        );
        self.ctx.pivot_to(scope, var)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::CompilerConfig,
        query_planner::{
            errors::{CompilationError, CompileError},
            plan_ctx::ScopeState,
            step::Step,
            typed_variable::{VariableKind, VariableType},
            TraversalCompiler,
        },
    };

    fn compiler_with(steps: &[Step]) -> TraversalCompiler {
        let mut compiler = TraversalCompiler::new(&CompilerConfig::default());
        let root = compiler.root_scope();
        compiler.compile_steps(root, steps).unwrap();
        compiler
    }

    #[test]
    fn test_fold_captures_everything_so_far() {
        let compiler = compiler_with(&[
            Step::V { ids: vec![] },
            Step::Out { labels: vec![] },
            Step::Fold,
        ]);
        let ctx = compiler.ctx();
        let root = compiler.root_scope();
        let fold = ctx.pivot(root).unwrap();
        let VariableKind::Fold { sub, element } = ctx.variable(fold).kind() else {
            panic!("expected a fold variable");
        };
        assert_eq!(*element, VariableType::Vertex);
        assert_eq!(ctx.scope(*sub).table_refs().len(), 3);
        assert_eq!(ctx.scope(*sub).home_variable(), Some(fold));
        assert_eq!(ctx.scope(*sub).state(), ScopeState::Closed);
        assert_eq!(ctx.scope(root).variables(), &[fold]);
    }

    #[test]
    fn test_unfold_restores_element_type() {
        let compiler = compiler_with(&[Step::V { ids: vec![] }, Step::Fold, Step::Unfold]);
        assert_eq!(
            compiler.ctx().pivot_type(compiler.root_scope()),
            VariableType::Vertex
        );
    }

    #[test]
    fn test_store_registers_without_pivot() {
        let compiler = compiler_with(&[
            Step::V { ids: vec![] },
            Step::Store {
                key: "x".to_string(),
            },
        ]);
        let ctx = compiler.ctx();
        let root = compiler.root_scope();
        assert_eq!(ctx.pivot_type(root), VariableType::Vertex);
        assert_eq!(ctx.scope(root).side_effect_keys(), &["x".to_string()]);
        assert_eq!(ctx.scope(root).table_refs().len(), 2);
    }

    #[test]
    fn test_cap_requires_registered_key() {
        let mut compiler = compiler_with(&[Step::V { ids: vec![] }]);
        let root = compiler.root_scope();
        let err = compiler
            .apply(
                root,
                &Step::Cap {
                    key: "x".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Compilation(CompilationError::SideEffectKeyNotDefined { .. })
        ));

        compiler
            .apply(
                root,
                &Step::Group {
                    side_effect_key: Some("x".to_string()),
                    key_by: None,
                    value_by: None,
                },
            )
            .unwrap();
        compiler
            .apply(
                root,
                &Step::Cap {
                    key: "x".to_string(),
                },
            )
            .unwrap();
        assert_eq!(compiler.ctx().pivot_type(root), VariableType::Table);
    }
}
