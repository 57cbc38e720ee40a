//! Traversal compiler.
//!
//! Turns an ordered step sequence into a tree of scopes (see [`plan_ctx`]) and then
//! into a Plan IR [`QueryBlock`](crate::plan_ir::QueryBlock):
//!
//! ```text
//! Vec<Step> ──dispatch──▶ PlanCtx (scopes + variables) ──lowering──▶ QueryBlock
//!                                                         └─analyzer─▶ accessed columns
//! ```
//!
//! One [`TraversalCompiler`] compiles exactly one traversal; nested sub-plans are
//! compiled recursively on the same call stack.

use serde::Serialize;

use crate::{
    config::CompilerConfig,
    plan_ir::QueryBlock,
    query_planner::{
        analyzer::accessed_columns::{infer_accessed_columns, AccessedColumns},
        errors::{CompilationError, CompileResult},
        plan_ctx::{PlanCtx, ScopeId},
        step::Step,
    },
};

pub mod analyzer;
pub mod dispatch;
pub mod errors;
pub mod lowering;
pub mod plan_ctx;
pub mod step;
pub mod typed_variable;

/// Compile a whole traversal with a fresh context.
pub fn compile_traversal(steps: &[Step], config: &CompilerConfig) -> CompileResult<CompiledTraversal> {
    log::debug!("compile_traversal: {} steps", steps.len());
    let mut compiler = TraversalCompiler::new(config);
    let root = compiler.root_scope();
    compiler.compile_steps(root, steps)?;
    Ok(compiler.finish())
}

pub struct TraversalCompiler {
    pub(crate) ctx: PlanCtx,
    root: ScopeId,
    max_nesting_depth: u32,
    pub(crate) strict_tags: bool,
}

impl TraversalCompiler {
    pub fn new(config: &CompilerConfig) -> Self {
        let mut ctx = PlanCtx::new(config.vertex_collection.clone());
        let root = ctx.new_root_scope();
        TraversalCompiler {
            ctx,
            root,
            max_nesting_depth: config.max_nesting_depth,
            strict_tags: config.strict_tags,
        }
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root
    }

    pub fn ctx(&self) -> &PlanCtx {
        &self.ctx
    }

    /// Apply `steps` one after another to `scope`.
    pub fn compile_steps(&mut self, scope: ScopeId, steps: &[Step]) -> CompileResult<()> {
        for step in steps {
            self.apply(scope, step)?;
        }
        Ok(())
    }

    /// Compile a nested sub-plan that starts from the pivot of `parent`.
    ///
    /// The parent pivot is declared in the child without a table reference. The
    /// caller attaches the child's home variable once the composite exists.
    pub(crate) fn compile_subtraversal(
        &mut self,
        parent: ScopeId,
        steps: &[Step],
    ) -> CompileResult<ScopeId> {
        let child = self.open_child_scope(parent)?;
        if let Some(pivot) = self.ctx.pivot(parent) {
            self.ctx.declare(child, pivot)?;
            self.ctx.set_pivot(child, pivot)?;
        }
        self.compile_steps(child, steps)?;
        Ok(child)
    }

    /// An empty child scope of `parent`, within the nesting limit.
    pub(crate) fn open_child_scope(&mut self, parent: ScopeId) -> CompileResult<ScopeId> {
        let depth = self.ctx.depth(parent) + 1;
        if depth > self.max_nesting_depth {
            return Err(CompilationError::NestingTooDeep {
                depth,
                max: self.max_nesting_depth,
            }
            .into());
        }
        Ok(self.ctx.new_child_scope(parent))
    }

    pub fn finish(self) -> CompiledTraversal {
        CompiledTraversal {
            ctx: self.ctx,
            root: self.root,
        }
    }
}

/// The scope tree of one compiled traversal.
#[derive(Debug, Clone)]
pub struct CompiledTraversal {
    ctx: PlanCtx,
    root: ScopeId,
}

impl CompiledTraversal {
    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn ctx(&self) -> &PlanCtx {
        &self.ctx
    }

    /// Close the root scope and lower it.
    pub fn lower(&mut self) -> CompileResult<LoweredPlan> {
        self.ctx.close(self.root);
        self.lower_scope(self.root)
    }

    /// Lower any scope of the tree, with the accessed columns of its own aliases.
    pub fn lower_scope(&self, scope: ScopeId) -> CompileResult<LoweredPlan> {
        let query = self.ctx.query_block(scope);
        let aliases = query.table_aliases();
        let accessed_columns = infer_accessed_columns(&query, &aliases)?;
        Ok(LoweredPlan {
            query,
            accessed_columns,
        })
    }
}

/// A lowered fragment plus the properties the store must fetch per alias.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoweredPlan {
    pub query: QueryBlock,
    pub accessed_columns: AccessedColumns,
}
