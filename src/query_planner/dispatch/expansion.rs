//! Graph sources and adjacency expansion.
//!
//! Edges are read from the adjacency lists embedded in vertex documents:
//!
//! ```text
//! g.V().out('knows')
//!   N_0  Node                                  (V)
//!   E_1  AdjacencyList(N_0._edge, ...)         E_1.label = 'knows'
//!   N_2  Node                                  N_2.id = E_1._other
//! ```

use crate::{
    plan_ir::{BooleanExpr, Literal},
    query_planner::{
        errors::CompileResult,
        plan_ctx::ScopeId,
        typed_variable::{
            EdgeDirection, VarId, VariableKind, VariableType, VertexEnd, KEY_ID, KEY_LABEL,
            KEY_OTHER, KEY_REVERSE_EDGE, KEY_SINK, KEY_SOURCE,
        },
        TraversalCompiler,
    },
};

use super::filter::membership;

impl TraversalCompiler {
    pub(super) fn v(&mut self, scope: ScopeId, ids: &[Literal]) -> CompileResult<()> {
        let vertex = self
            .ctx
            .create_variable(VariableType::Vertex, VariableKind::FreeVertex);
        self.ctx.pivot_to(scope, vertex)?;
        if !ids.is_empty() {
            let left = self.ctx.property_expr(vertex, KEY_ID)?;
            self.ctx.add_predicate(scope, membership(left, ids))?;
        }
        Ok(())
    }

    /// `E()`: every outgoing adjacency entry of every vertex.
    pub(super) fn e(&mut self, scope: ScopeId, ids: &[Literal]) -> CompileResult<()> {
        let vertex = self
            .ctx
            .create_variable(VariableType::Vertex, VariableKind::FreeVertex);
        self.ctx.declare_table(scope, vertex)?;
        let edge = self.expand_edge(scope, vertex, EdgeDirection::Out, &[])?;
        if !ids.is_empty() {
            let left = self.ctx.default_expr(edge)?;
            self.ctx.add_predicate(scope, membership(left, ids))?;
        }
        Ok(())
    }

    pub(super) fn expand_edge(
        &mut self,
        scope: ScopeId,
        source: VarId,
        direction: EdgeDirection,
        labels: &[String],
    ) -> CompileResult<VarId> {
        self.ctx.populate(source, direction.adjacency_key())?;
        if direction == EdgeDirection::Both {
            self.ctx.populate(source, KEY_REVERSE_EDGE)?;
        }
        let edge = self.ctx.create_variable(
            VariableType::Edge,
            VariableKind::BoundEdge { source, direction },
        );
        self.ctx.pivot_to(scope, edge)?;

        if !labels.is_empty() {
            let labels: Vec<Literal> = labels.iter().map(|l| Literal::from(l.as_str())).collect();
            let left = self.ctx.property_expr(edge, KEY_LABEL)?;
            self.ctx.add_predicate(scope, membership(left, &labels))?;
        }
        Ok(edge)
    }

    pub(super) fn expand_vertex(
        &mut self,
        scope: ScopeId,
        source: VarId,
        direction: EdgeDirection,
        labels: &[String],
    ) -> CompileResult<()> {
        let edge = self.expand_edge(scope, source, direction, labels)?;
        self.bind_vertex(scope, edge, VertexEnd::Other)
    }

    /// Join the vertex collection on one endpoint of `edge`.
    pub(super) fn bind_vertex(
        &mut self,
        scope: ScopeId,
        edge: VarId,
        end: VertexEnd,
    ) -> CompileResult<()> {
        let vertex = self.ctx.create_variable(
            VariableType::Vertex,
            VariableKind::BoundVertex { edge, end },
        );
        self.ctx.pivot_to(scope, vertex)?;

        let id = self.ctx.property_expr(vertex, KEY_ID)?;
        let join = match end {
            VertexEnd::Source => BooleanExpr::eq(id, self.ctx.property_expr(edge, KEY_SOURCE)?),
            VertexEnd::Sink => BooleanExpr::eq(id, self.ctx.property_expr(edge, KEY_SINK)?),
            VertexEnd::Other => BooleanExpr::eq(id, self.ctx.property_expr(edge, KEY_OTHER)?),
            VertexEnd::Both => BooleanExpr::In {
                expr: id,
                list: vec![
                    self.ctx.property_expr(edge, KEY_SOURCE)?,
                    self.ctx.property_expr(edge, KEY_SINK)?,
                ],
                negated: false,
            },
        };
        self.ctx.add_predicate(scope, join)
    }
}
