//! Value sources and property projections.

use crate::{
    plan_ir::Literal,
    query_planner::{
        errors::CompileResult,
        plan_ctx::ScopeId,
        typed_variable::{VarId, VariableKind, VariableType, KEY_KEY, KEY_LABEL, KEY_VALUE},
        TraversalCompiler,
    },
};

impl TraversalCompiler {
    pub(super) fn constant(&mut self, scope: ScopeId, value: &Literal) -> CompileResult<()> {
        let variable_type = match value {
            Literal::Null => VariableType::Null,
            _ => VariableType::Scalar,
        };
        let var = self.ctx.create_variable(
            variable_type,
            VariableKind::Constant {
                value: value.clone(),
            },
        );
        self.ctx.pivot_to(scope, var)
    }

    pub(super) fn inject(&mut self, scope: ScopeId, values: &[Literal]) -> CompileResult<()> {
        let var = self.ctx.create_variable(
            VariableType::Scalar,
            VariableKind::Inject {
                values: values.to_vec(),
            },
        );
        self.ctx.pivot_to(scope, var)
    }

    /// No keys means every property.
    pub(super) fn properties(
        &mut self,
        scope: ScopeId,
        owner: VarId,
        keys: &[String],
    ) -> CompileResult<()> {
        for key in keys {
            self.ctx.populate(owner, key)?;
        }
        let var = self.ctx.create_variable(
            VariableType::Property,
            VariableKind::Properties {
                owner,
                keys: keys.to_vec(),
            },
        );
        self.ctx.pivot_to(scope, var)
    }

    pub(super) fn values(
        &mut self,
        scope: ScopeId,
        owner: VarId,
        keys: &[String],
    ) -> CompileResult<()> {
        for key in keys {
            self.ctx.populate(owner, key)?;
        }
        let var = self.ctx.create_variable(
            VariableType::Scalar,
            VariableKind::Values {
                owner,
                keys: keys.to_vec(),
            },
        );
        self.ctx.pivot_to(scope, var)
    }

    pub(super) fn id(&mut self, scope: ScopeId, owner: VarId) -> CompileResult<()> {
        let key = self.ctx.variable(owner).default_projection().to_string();
        self.values(scope, owner, &[key])
    }

    pub(super) fn label(&mut self, scope: ScopeId, owner: VarId) -> CompileResult<()> {
        self.values(scope, owner, &[KEY_LABEL.to_string()])
    }

    pub(super) fn property_key(&mut self, scope: ScopeId, owner: VarId) -> CompileResult<()> {
        self.ctx.populate(owner, KEY_KEY)?;
        let var = self
            .ctx
            .create_variable(VariableType::Scalar, VariableKind::PropertyKey { owner });
        self.ctx.pivot_to(scope, var)
    }

    pub(super) fn property_value(&mut self, scope: ScopeId, owner: VarId) -> CompileResult<()> {
        self.ctx.populate(owner, KEY_VALUE)?;
        let var = self
            .ctx
            .create_variable(VariableType::Scalar, VariableKind::PropertyValue { owner });
        self.ctx.pivot_to(scope, var)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::CompilerConfig,
        plan_ir::Literal,
        query_planner::{
            errors::{CompilationError, CompileError},
            step::Step,
            typed_variable::VariableType,
            TraversalCompiler,
        },
    };

    #[test]
    fn test_values_then_key_is_rejected() {
        let mut compiler = TraversalCompiler::new(&CompilerConfig::default());
        let root = compiler.root_scope();
        compiler.apply(root, &Step::V { ids: vec![] }).unwrap();
        compiler
            .apply(
                root,
                &Step::Values {
                    keys: vec!["name".to_string()],
                },
            )
            .unwrap();
        assert_eq!(compiler.ctx().pivot_type(root), VariableType::Scalar);

        let err = compiler.apply(root, &Step::Key).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Compilation(CompilationError::StepNotApplicable { step: "key", .. })
        ));
    }

    #[test]
    fn test_properties_then_value() {
        let mut compiler = TraversalCompiler::new(&CompilerConfig::default());
        let root = compiler.root_scope();
        compiler.apply(root, &Step::V { ids: vec![] }).unwrap();
        compiler
            .apply(
                root,
                &Step::Properties {
                    keys: vec!["age".to_string()],
                },
            )
            .unwrap();
        assert_eq!(compiler.ctx().pivot_type(root), VariableType::Property);
        compiler.apply(root, &Step::Value).unwrap();
        assert_eq!(compiler.ctx().pivot_type(root), VariableType::Scalar);

        let owner = compiler.ctx().scope(root).variables()[0];
        assert!(compiler.ctx().variable(owner).contains_property("age"));
    }

    #[test]
    fn test_constant_null_is_null_variant() {
        let mut compiler = TraversalCompiler::new(&CompilerConfig::default());
        let root = compiler.root_scope();
        compiler
            .apply(root, &Step::Constant { value: Literal::Null })
            .unwrap();
        assert_eq!(compiler.ctx().pivot_type(root), VariableType::Null);
    }
}
