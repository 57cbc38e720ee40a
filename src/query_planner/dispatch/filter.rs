//! In-place filter steps: they add a predicate to the scope and keep the pivot.

use crate::{
    plan_ir::{BooleanExpr, CompareOp, Literal, ScalarExpr},
    query_planner::{
        errors::{CompilationError, CompileError, CompileResult},
        plan_ctx::ScopeId,
        step::{Predicate, PredicateOp, PredicateOperand, Step, Traversal},
        typed_variable::{VarId, VariableKind, VariableType, KEY_KEY, KEY_LABEL, KEY_VALUE},
        TraversalCompiler,
    },
};

/// `left <op> operand`. `tagged` is the resolved right-hand side when the operand
/// is a tag.
pub(crate) fn predicate_expr(
    step: &'static str,
    left: ScalarExpr,
    predicate: &Predicate,
    tagged: Option<ScalarExpr>,
) -> CompileResult<BooleanExpr> {
    let op = predicate.op;
    let operands: Vec<ScalarExpr> = match (&predicate.operand, tagged) {
        (PredicateOperand::Tag(_), Some(right)) if op.is_comparison() => vec![right],
        (PredicateOperand::Tag(_), _) => {
            return Err(CompileError::not_implemented(format!(
                "{}() over a tag",
                op.name()
            )))
        }
        (PredicateOperand::Value(value), _) => vec![ScalarExpr::Literal(value.clone())],
        (PredicateOperand::Values(values), _) => {
            values.iter().cloned().map(ScalarExpr::Literal).collect()
        }
    };

    let compare = |cmp: CompareOp, mut operands: Vec<ScalarExpr>| match operands.len() {
        1 => Ok(BooleanExpr::compare(cmp, left.clone(), operands.remove(0))),
        n => Err(invalid(step, format!("{}() takes one value, got {}", op.name(), n))),
    };
    let bounds = |operands: Vec<ScalarExpr>| -> CompileResult<(ScalarExpr, ScalarExpr)> {
        let n = operands.len();
        let [low, high]: [ScalarExpr; 2] = operands
            .try_into()
            .map_err(|_| invalid(step, format!("{}() takes two bounds, got {}", op.name(), n)))?;
        Ok((low, high))
    };

    match op {
        PredicateOp::Eq => compare(CompareOp::Eq, operands),
        PredicateOp::Neq => compare(CompareOp::Neq, operands),
        PredicateOp::Lt => compare(CompareOp::Lt, operands),
        PredicateOp::Lte => compare(CompareOp::Lte, operands),
        PredicateOp::Gt => compare(CompareOp::Gt, operands),
        PredicateOp::Gte => compare(CompareOp::Gte, operands),
        PredicateOp::Within | PredicateOp::Without => Ok(BooleanExpr::In {
            expr: left.clone(),
            list: operands,
            negated: op == PredicateOp::Without,
        }),
        PredicateOp::Between => {
            let (low, high) = bounds(operands)?;
            Ok(BooleanExpr::And(vec![
                BooleanExpr::compare(CompareOp::Gte, left.clone(), low),
                BooleanExpr::compare(CompareOp::Lt, left.clone(), high),
            ]))
        }
        PredicateOp::Inside => {
            let (low, high) = bounds(operands)?;
            Ok(BooleanExpr::And(vec![
                BooleanExpr::compare(CompareOp::Gt, left.clone(), low),
                BooleanExpr::compare(CompareOp::Lt, left.clone(), high),
            ]))
        }
        PredicateOp::Outside => {
            let (low, high) = bounds(operands)?;
            Ok(BooleanExpr::Or(vec![
                BooleanExpr::compare(CompareOp::Lt, left.clone(), low),
                BooleanExpr::compare(CompareOp::Gt, left.clone(), high),
            ]))
        }
    }
}

/// `left = v` for one value, `left IN (...)` for several.
pub(crate) fn membership(left: ScalarExpr, values: &[Literal]) -> BooleanExpr {
    match values {
        [single] => BooleanExpr::eq(left, ScalarExpr::Literal(single.clone())),
        _ => BooleanExpr::In {
            expr: left,
            list: values.iter().cloned().map(ScalarExpr::Literal).collect(),
            negated: false,
        },
    }
}

fn invalid(step: &'static str, reason: impl Into<String>) -> CompileError {
    CompilationError::InvalidArgument {
        step,
        reason: reason.into(),
    }
    .into()
}

fn non_empty<T>(step: &'static str, values: &[T]) -> CompileResult<()> {
    if values.is_empty() {
        Err(invalid(step, "at least one value is required"))
    } else {
        Ok(())
    }
}

impl TraversalCompiler {
    /// The single variable `label` refers to from `scope`.
    pub(crate) fn resolve_tag(&self, scope: ScopeId, label: &str) -> CompileResult<VarId> {
        let bindings = self.ctx.select(scope, label);
        match bindings.as_slice() {
            [] => Err(CompilationError::TagNotDefined {
                label: label.to_string(),
            }
            .into()),
            [only] => Ok(*only),
            [.., last] if !self.strict_tags => {
                log::debug!(
                    "tag `{}` has {} bindings, using the last one",
                    label,
                    bindings.len()
                );
                Ok(*last)
            }
            _ => Err(CompilationError::AmbiguousTag {
                label: label.to_string(),
                count: bindings.len(),
            }
            .into()),
        }
    }

    /// Right-hand side of a tag operand: `key` of the tagged variable, or its
    /// default projection.
    fn tagged_operand(
        &mut self,
        scope: ScopeId,
        predicate: &Predicate,
        key: Option<&str>,
    ) -> CompileResult<Option<ScalarExpr>> {
        let Some(label) = predicate.tag_label() else {
            return Ok(None);
        };
        if !predicate.op.is_comparison() {
            return Err(CompileError::not_implemented(format!(
                "{}() over a tag",
                predicate.op.name()
            )));
        }
        let tagged = self.resolve_tag(scope, label)?;
        let key = key.unwrap_or(self.ctx.variable(tagged).default_projection());
        Ok(Some(self.ctx.property_expr(tagged, key)?))
    }

    pub(super) fn has(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        label: Option<&str>,
        key: &str,
        predicate: Option<&Predicate>,
    ) -> CompileResult<()> {
        if let Some(label) = label {
            let left = self.ctx.property_expr(pivot, KEY_LABEL)?;
            self.ctx
                .add_predicate(scope, membership(left, &[Literal::from(label)]))?;
        }
        let left = self.ctx.property_expr(pivot, key)?;
        let expr = match predicate {
            None => BooleanExpr::IsNotNull(left),
            Some(predicate) => {
                let tagged = self.tagged_operand(scope, predicate, Some(key))?;
                predicate_expr("has", left, predicate, tagged)?
            }
        };
        self.ctx.add_predicate(scope, expr)
    }

    pub(super) fn has_not(&mut self, scope: ScopeId, pivot: VarId, key: &str) -> CompileResult<()> {
        let left = self.ctx.property_expr(pivot, key)?;
        self.ctx.add_predicate(scope, BooleanExpr::IsNull(left))
    }

    pub(super) fn has_id(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        values: &[Literal],
    ) -> CompileResult<()> {
        non_empty("hasId", values)?;
        let left = self.ctx.default_expr(pivot)?;
        self.ctx.add_predicate(scope, membership(left, values))
    }

    pub(super) fn has_label(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        values: &[Literal],
    ) -> CompileResult<()> {
        non_empty("hasLabel", values)?;
        let left = self.ctx.property_expr(pivot, KEY_LABEL)?;
        self.ctx.add_predicate(scope, membership(left, values))
    }

    pub(super) fn has_key(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        keys: &[String],
    ) -> CompileResult<()> {
        non_empty("hasKey", keys)?;
        let keys: Vec<Literal> = keys.iter().map(|k| Literal::from(k.as_str())).collect();
        let left = self.ctx.property_expr(pivot, KEY_KEY)?;
        self.ctx.add_predicate(scope, membership(left, &keys))
    }

    pub(super) fn has_value(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        values: &[Literal],
    ) -> CompileResult<()> {
        non_empty("hasValue", values)?;
        let left = self.ctx.property_expr(pivot, KEY_VALUE)?;
        self.ctx.add_predicate(scope, membership(left, values))
    }

    pub(super) fn is(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        predicate: &Predicate,
    ) -> CompileResult<()> {
        if predicate.tag_label().is_some() {
            return Err(CompileError::not_implemented("is() with a tag predicate"));
        }
        let left = self.ctx.default_expr(pivot)?;
        let expr = predicate_expr("is", left, predicate, None)?;
        self.ctx.add_predicate(scope, expr)
    }

    /// `where(P(tag))`: compares the pivot with the tagged variable.
    pub(super) fn where_predicate(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        predicate: &Predicate,
    ) -> CompileResult<()> {
        if predicate.tag_label().is_none() {
            return Err(invalid("where", "the predicate must reference a tag"));
        }
        let key = self.ctx.variable(pivot).default_projection();
        let left = self.ctx.property_expr(pivot, key)?;
        let tagged = self.tagged_operand(scope, predicate, Some(key))?;
        let expr = predicate_expr("where", left, predicate, tagged)?;
        self.ctx.add_predicate(scope, expr)
    }

    /// Compile a condition sub-plan and return its filter, closing the sub-scope.
    fn condition(
        &mut self,
        scope: ScopeId,
        steps: &[Step],
        negated: bool,
    ) -> CompileResult<BooleanExpr> {
        let child = self.compile_subtraversal(scope, steps)?;
        let expr = self.ctx.filter_expression(child, negated);
        self.ctx.close(child);
        Ok(expr)
    }

    pub(super) fn where_traversal(
        &mut self,
        scope: ScopeId,
        traversal: &Traversal,
    ) -> CompileResult<()> {
        let expr = self.condition(scope, traversal, false)?;
        self.ctx.add_predicate(scope, expr)
    }

    pub(super) fn and(&mut self, scope: ScopeId, traversals: &[Traversal]) -> CompileResult<()> {
        let mut terms = Vec::with_capacity(traversals.len());
        for traversal in traversals {
            terms.push(self.condition(scope, traversal, false)?);
        }
        self.ctx.add_predicate(scope, BooleanExpr::conjunction(terms))
    }

    pub(super) fn or(&mut self, scope: ScopeId, traversals: &[Traversal]) -> CompileResult<()> {
        non_empty("or", traversals)?;
        let mut terms = Vec::with_capacity(traversals.len());
        for traversal in traversals {
            terms.push(self.condition(scope, traversal, false)?);
        }
        self.ctx.add_predicate(scope, BooleanExpr::disjunction(terms))
    }

    pub(super) fn not(&mut self, scope: ScopeId, traversal: &Traversal) -> CompileResult<()> {
        let expr = self.condition(scope, traversal, true)?;
        self.ctx.add_predicate(scope, expr)
    }

    /// `range(low, high)`; `high = -1` leaves the upper end open.
    ///
    /// An inherited pivot is not narrowed in place: the sub-plan is wrapped first so
    /// the enclosing scope keeps its own rows.
    pub(super) fn range(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        step: &'static str,
        low: i64,
        high: i64,
    ) -> CompileResult<()> {
        let high = if high == -1 { i64::MAX } else { high };
        if low < 0 || high < low {
            return Err(invalid(step, format!("invalid window [{}, {})", low, high)));
        }
        let target = if self.ctx.scope(scope).table_refs().contains(&pivot) {
            pivot
        } else {
            self.window(scope, pivot)?
        };
        self.ctx.variable_mut(target).narrow_range(low, high);
        Ok(())
    }

    /// Seals a pending `range()` on the pivot of `scope` before another step reads
    /// it. Returns the window variable that became the pivot, if any.
    pub(super) fn close_window(&mut self, scope: ScopeId) -> CompileResult<Option<VarId>> {
        match self.ctx.pivot(scope) {
            Some(pivot) if self.ctx.variable(pivot).is_range_narrowed() => {
                log::debug!(
                    "{:?}: closing range window of `{}`",
                    scope,
                    self.ctx.variable(pivot).name()
                );
                self.window(scope, pivot).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Collapses `scope` into a window variable of the pivot's variant. Labels the
    /// pivot carries in `scope` move to the window.
    fn window(&mut self, scope: ScopeId, pivot: VarId) -> CompileResult<VarId> {
        let labels: Vec<String> = self
            .ctx
            .scope(scope)
            .tags()
            .iter()
            .filter(|(_, bindings)| bindings.contains(&pivot))
            .map(|(label, _)| label.clone())
            .collect();
        let variable_type = self.ctx.variable(pivot).variable_type();
        let window = self.collapse(scope, variable_type, |sub| VariableKind::Window { sub })?;
        for label in &labels {
            self.ctx.add_label(scope, window, label)?;
        }
        Ok(window)
    }

    /// Registers a dedup marker; the pivot stays.
    pub(super) fn dedup(
        &mut self,
        scope: ScopeId,
        pivot: VarId,
        labels: &[String],
    ) -> CompileResult<()> {
        for label in labels {
            if self.ctx.select(scope, label).is_empty() {
                return Err(CompilationError::TagNotDefined {
                    label: label.clone(),
                }
                .into());
            }
        }
        self.ctx.default_expr(pivot)?;
        let var = self.ctx.create_variable(
            VariableType::Table,
            VariableKind::Dedup {
                input: pivot,
                labels: labels.to_vec(),
            },
        );
        self.ctx.declare_table(scope, var)
    }
}
