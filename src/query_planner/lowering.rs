//! Lowering of compiled scopes into Plan IR.
//!
//! - every FROM variable becomes one [`TableRef`]
//! - every scope becomes one [`QueryBlock`]; nested scopes appear as `Subquery`
//!   arguments of the table function of the composite that owns them
//!
//! Edge table functions receive the edge's projected properties as trailing
//! string arguments so the store only unpacks the adjacency fields that are read.

use crate::{
    plan_ir::{BooleanExpr, Literal, QueryBlock, ScalarExpr, SelectElement, TableRef},
    query_planner::{
        analyzer::accessed_columns::WILDCARD,
        plan_ctx::{PlanCtx, ScopeId},
        typed_variable::{
            EdgeDirection, VarId, VariableKind, VariableType, KEY_ID, KEY_REVERSE_EDGE,
        },
    },
};

impl PlanCtx {
    /// The query block of `scope`.
    pub fn query_block(&self, scope: ScopeId) -> QueryBlock {
        let s = self.scope(scope);
        let mut select = Vec::new();
        if let Some(pivot) = s.pivot() {
            select.push(SelectElement {
                expr: self.default_column(pivot),
                alias: self.default_column_alias(scope, pivot),
            });
        }
        for column in s.projected_columns() {
            select.push(SelectElement {
                expr: ScalarExpr::column(self.variable(column.owner).name(), &column.property),
                alias: Some(column.column_name.clone()),
            });
        }

        let from = s.table_refs().iter().map(|v| self.table_ref(*v)).collect();
        let predicate = self.predicate_expression(scope);
        let range = s
            .pivot()
            .map(|p| self.variable(p))
            .filter(|v| v.is_range_narrowed())
            .map(|v| (v.low().max(0), v.high()));

        QueryBlock {
            select,
            from,
            where_clause: (!predicate.is_true()).then_some(predicate),
            range,
        }
    }

    /// The accumulated predicates as one expression, `True` when there are none.
    pub fn predicate_expression(&self, scope: ScopeId) -> BooleanExpr {
        BooleanExpr::conjunction(self.scope(scope).predicates().to_vec())
    }

    /// Filter contributed by a sub-plan used as a condition.
    ///
    /// A sub-plan that only added predicates is inlined; one that introduced FROM
    /// items becomes an existence test over its own block.
    pub fn filter_expression(&self, scope: ScopeId, negated: bool) -> BooleanExpr {
        if self.scope(scope).table_refs().is_empty() {
            let predicate = self.predicate_expression(scope);
            if negated {
                BooleanExpr::Not(Box::new(predicate))
            } else {
                predicate
            }
        } else {
            let block = Box::new(self.query_block(scope));
            if negated {
                BooleanExpr::NotExists(block)
            } else {
                BooleanExpr::Exists(block)
            }
        }
    }

    /// The FROM item a variable lowers to.
    pub fn table_ref(&self, var: VarId) -> TableRef {
        let variable = self.variable(var);
        let alias = variable.name().to_string();
        let function = |args: Vec<ScalarExpr>| TableRef::Function {
            name: variable.kind().function_name().to_string(),
            args,
            alias: alias.clone(),
        };

        match variable.kind() {
            VariableKind::FreeVertex | VariableKind::BoundVertex { .. } => TableRef::Named {
                collection: self.vertex_collection().to_string(),
                alias: alias.clone(),
            },
            VariableKind::BoundEdge { source, direction } => {
                let mut args = vec![self.property_column(*source, direction.adjacency_key())];
                if *direction == EdgeDirection::Both {
                    args.push(self.property_column(*source, KEY_REVERSE_EDGE));
                }
                args.extend(
                    variable
                        .projected_properties()
                        .iter()
                        .map(|p| ScalarExpr::literal(p.as_str())),
                );
                function(args)
            }
            VariableKind::Constant { value } => function(vec![ScalarExpr::Literal(value.clone())]),
            VariableKind::Inject { values } => {
                function(values.iter().cloned().map(ScalarExpr::Literal).collect())
            }
            VariableKind::Properties { owner, keys } | VariableKind::Values { owner, keys } => {
                if keys.is_empty() {
                    function(vec![ScalarExpr::column(
                        self.variable(*owner).name(),
                        WILDCARD,
                    )])
                } else {
                    function(keys.iter().map(|k| self.property_column(*owner, k)).collect())
                }
            }
            VariableKind::PropertyKey { owner } | VariableKind::PropertyValue { owner } => {
                function(vec![self.default_column(*owner)])
            }
            VariableKind::Count { sub }
            | VariableKind::Fold { sub, .. }
            | VariableKind::Tree { sub }
            | VariableKind::Local { sub }
            | VariableKind::Map { sub }
            | VariableKind::FlatMap { sub }
            | VariableKind::SideEffect { sub }
            | VariableKind::Window { sub } => function(vec![self.subquery(*sub)]),
            VariableKind::Path { steps } => {
                function(steps.iter().map(|v| self.default_column(*v)).collect())
            }
            VariableKind::Unfold { source } => function(vec![self.default_column(*source)]),
            VariableKind::Group {
                input,
                side_effect_key,
                key_by,
                value_by,
            } => function(vec![
                side_effect_key
                    .as_deref()
                    .map(ScalarExpr::literal)
                    .unwrap_or(ScalarExpr::Literal(Literal::Null)),
                self.default_column(*input),
                self.optional_subquery(*key_by),
                self.optional_subquery(*value_by),
            ]),
            VariableKind::Union { branches } | VariableKind::Coalesce { branches } => {
                function(branches.iter().map(|b| self.subquery(*b)).collect())
            }
            VariableKind::Optional { input, branch } => {
                function(vec![self.default_column(*input), self.subquery(*branch)])
            }
            VariableKind::Project { keys, by } => {
                let mut args = Vec::with_capacity(keys.len() * 2);
                for (i, key) in keys.iter().enumerate() {
                    args.push(ScalarExpr::literal(key.as_str()));
                    args.push(self.optional_subquery(by.get(i).copied()));
                }
                function(args)
            }
            VariableKind::Repeat { body, control } => function(vec![
                self.subquery(*body),
                control
                    .times
                    .map(|t| ScalarExpr::literal(i64::from(t)))
                    .unwrap_or(ScalarExpr::Literal(Literal::Null)),
                self.optional_subquery(control.until),
                self.optional_subquery(control.emit),
                ScalarExpr::literal(control.emit_all),
                ScalarExpr::literal(control.check_first),
            ]),
            VariableKind::RepeatInput { seed } => TableRef::Variable {
                name: format!("@{}", self.variable(*seed).name()),
                alias: alias.clone(),
            },
            VariableKind::Choose {
                condition,
                true_branch,
                false_branch,
            } => function(vec![
                self.subquery(*condition),
                self.subquery(*true_branch),
                self.subquery(*false_branch),
            ]),
            VariableKind::Dedup { input, labels } => {
                let mut args = vec![self.default_column(*input)];
                args.extend(labels.iter().map(|l| ScalarExpr::literal(l.as_str())));
                function(args)
            }
            VariableKind::Store { key, input } => function(vec![
                ScalarExpr::literal(key.as_str()),
                self.default_column(*input),
            ]),
            VariableKind::SideEffectKey { key } => TableRef::Variable {
                name: format!("@{}", key),
                alias: alias.clone(),
            },
            VariableKind::List { members } => {
                function(members.iter().map(|m| self.default_column(*m)).collect())
            }
            VariableKind::AddV { label } => function(vec![label
                .as_deref()
                .map(ScalarExpr::literal)
                .unwrap_or(ScalarExpr::Literal(Literal::Null))]),
            VariableKind::AddE { source, label } => function(vec![
                ScalarExpr::column(self.variable(*source).name(), KEY_ID),
                ScalarExpr::literal(label.as_str()),
            ]),
            VariableKind::UpdateProperties { target, properties } => {
                let mut args = vec![self.default_column(*target)];
                for (key, value) in properties {
                    args.push(ScalarExpr::literal(key.as_str()));
                    args.push(ScalarExpr::Literal(value.clone()));
                }
                function(args)
            }
            VariableKind::Drop { target } => {
                let mut args = vec![self.default_column(*target)];
                if let VariableKind::BoundEdge { source, .. } = self.variable(*target).kind() {
                    args.push(ScalarExpr::column(self.variable(*source).name(), KEY_ID));
                }
                if self.variable(*target).variable_type() == VariableType::Property {
                    if let VariableKind::Properties { owner, .. } = self.variable(*target).kind() {
                        args.push(self.default_column(*owner));
                    }
                }
                function(args)
            }
        }
    }

    fn default_column(&self, var: VarId) -> ScalarExpr {
        let v = self.variable(var);
        ScalarExpr::column(v.name(), v.default_projection())
    }

    /// `var.property` under the column name `var` exposes it as.
    fn property_column(&self, var: VarId, property: &str) -> ScalarExpr {
        ScalarExpr::column(self.variable(var).name(), &self.column_name(var, property))
    }

    /// The home variable of an output scope reads the pivot through its own default
    /// projection, which differs from the pivot's when the variants differ.
    fn default_column_alias(&self, scope: ScopeId, pivot: VarId) -> Option<String> {
        let home = self.scope(scope).home_variable()?;
        if !self.variable(home).kind().output_scopes().contains(&scope) {
            return None;
        }
        let expected = self.variable(home).default_projection();
        (expected != self.variable(pivot).default_projection()).then(|| expected.to_string())
    }

    fn subquery(&self, scope: ScopeId) -> ScalarExpr {
        ScalarExpr::Subquery(Box::new(self.query_block(scope)))
    }

    fn optional_subquery(&self, scope: Option<ScopeId>) -> ScalarExpr {
        scope
            .map(|s| self.subquery(s))
            .unwrap_or(ScalarExpr::Literal(Literal::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_planner::typed_variable::KEY_EDGE;

    #[test]
    fn test_vertex_and_edge_table_refs() {
        let mut ctx = PlanCtx::new("Graph");
        let root = ctx.new_root_scope();
        let n = ctx.create_variable(VariableType::Vertex, VariableKind::FreeVertex);
        ctx.pivot_to(root, n).unwrap();
        let e = ctx.create_variable(
            VariableType::Edge,
            VariableKind::BoundEdge {
                source: n,
                direction: EdgeDirection::Out,
            },
        );
        ctx.pivot_to(root, e).unwrap();
        ctx.populate(e, "weight").unwrap();

        assert_eq!(
            ctx.table_ref(n),
            TableRef::Named {
                collection: "Graph".to_string(),
                alias: "N_0".to_string()
            }
        );
        assert_eq!(
            ctx.table_ref(e),
            TableRef::Function {
                name: "AdjacencyList".to_string(),
                args: vec![
                    ScalarExpr::column("N_0", KEY_EDGE),
                    ScalarExpr::literal("weight"),
                ],
                alias: "E_1".to_string(),
            }
        );
    }

    #[test]
    fn test_query_block_shape() {
        let mut ctx = PlanCtx::new("Node");
        let root = ctx.new_root_scope();
        let n = ctx.create_variable(VariableType::Vertex, VariableKind::FreeVertex);
        ctx.pivot_to(root, n).unwrap();
        ctx.variable_mut(n).narrow_range(0, 5);
        let predicate = BooleanExpr::IsNotNull(ScalarExpr::column("N_0", "age"));
        ctx.add_predicate(root, predicate.clone()).unwrap();

        let block = ctx.query_block(root);
        assert_eq!(block.select.len(), 1);
        assert_eq!(block.select[0].expr, ScalarExpr::column("N_0", KEY_ID));
        assert_eq!(block.from.len(), 1);
        assert_eq!(block.where_clause, Some(predicate));
        assert_eq!(block.range, Some((0, 5)));
    }

    #[test]
    fn test_filter_expression_inlines_predicate_only_scopes() {
        let mut ctx = PlanCtx::new("Node");
        let root = ctx.new_root_scope();
        let n = ctx.create_variable(VariableType::Vertex, VariableKind::FreeVertex);
        ctx.pivot_to(root, n).unwrap();

        let child = ctx.new_child_scope(root);
        ctx.declare(child, n).unwrap();
        ctx.set_pivot(child, n).unwrap();
        let predicate = BooleanExpr::IsNotNull(ScalarExpr::column("N_0", "age"));
        ctx.add_predicate(child, predicate.clone()).unwrap();

        assert_eq!(ctx.filter_expression(child, false), predicate);
        assert_eq!(
            ctx.filter_expression(child, true),
            BooleanExpr::Not(Box::new(predicate))
        );

        let m = ctx.create_variable(VariableType::Vertex, VariableKind::FreeVertex);
        ctx.pivot_to(child, m).unwrap();
        assert!(matches!(
            ctx.filter_expression(child, true),
            BooleanExpr::NotExists(_)
        ));
    }
}
