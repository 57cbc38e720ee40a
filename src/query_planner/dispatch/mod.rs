//! Step dispatch.
//!
//! Every step goes through two exhaustive matches:
//!
//! 1. [`applicability`] - which pivot variants the step accepts, or that it is a
//!    catalogued step without semantics yet
//! 2. [`TraversalCompiler::apply`] - the step's effect on the scope
//!
//! Neither match has a wildcard arm, so adding a [`Step`] variant does not compile
//! until both decide what to do with it.
//!
//! Step families live in the submodules:
//!
//! | module       | steps                                                        |
//! |--------------|--------------------------------------------------------------|
//! | `filter`     | has*, is, where, and/or/not, range/limit, dedup             |
//! | `expansion`  | V, E, out/in/both(E), outV/inV/bothV/otherV                  |
//! | `projection` | properties, values, key, value, id, label, constant, inject |
//! | `aggregate`  | count, fold, tree, path, unfold, group, store, cap, sideEffect |
//! | `branch`     | union, optional, local, map, flatMap, coalesce, project, repeat, choose |
//! | `select`     | as, select                                                   |
//! | `mutation`   | addV, addE, property, drop                                   |

mod aggregate;
mod branch;
mod expansion;
mod filter;
mod mutation;
mod projection;
mod select;

use crate::query_planner::{
    errors::{CompilationError, CompileError, CompileResult, Requirement},
    plan_ctx::ScopeId,
    step::{Pop, Step},
    typed_variable::{EdgeDirection, VarId, VertexEnd},
    TraversalCompiler,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// Starts from the graph, a literal or a tag; valid with any pivot or none.
    Source,
    Requires(Requirement),
    NotImplemented(&'static str),
}

pub fn applicability(step: &Step) -> Applicability {
    use Applicability::{NotImplemented, Requires, Source};

    match step {
        Step::V { .. }
        | Step::E { .. }
        | Step::AddV { .. }
        | Step::Inject { .. }
        | Step::Constant { .. }
        | Step::Cap { .. }
        | Step::Select { .. } => Source,

        Step::AddE { .. }
        | Step::Out { .. }
        | Step::In { .. }
        | Step::Both { .. }
        | Step::OutE { .. }
        | Step::InE { .. }
        | Step::BothE { .. } => Requires(Requirement::Vertex),

        Step::OutV | Step::InV | Step::BothV | Step::OtherV => Requires(Requirement::Edge),

        Step::Has { .. }
        | Step::HasNot { .. }
        | Step::HasId { .. }
        | Step::HasLabel { .. }
        | Step::Properties { .. }
        | Step::Values { .. }
        | Step::Id
        | Step::Label
        | Step::Property { .. } => Requires(Requirement::VertexOrEdge),

        Step::HasKey { .. } | Step::HasValue { .. } | Step::Key | Step::Value => {
            Requires(Requirement::Property)
        }

        Step::Drop => Requires(Requirement::VertexEdgeOrProperty),

        Step::Is { .. }
        | Step::Where { .. }
        | Step::WhereTraversal { .. }
        | Step::And { .. }
        | Step::Or { .. }
        | Step::Not { .. }
        | Step::Range { .. }
        | Step::Limit { .. }
        | Step::Dedup { .. }
        | Step::Count
        | Step::Fold
        | Step::Tree
        | Step::Path
        | Step::Unfold
        | Step::Group { .. }
        | Step::Union { .. }
        | Step::Optional { .. }
        | Step::Local { .. }
        | Step::Map { .. }
        | Step::FlatMap { .. }
        | Step::Coalesce { .. }
        | Step::Project { .. }
        | Step::Repeat { .. }
        | Step::Choose { .. }
        | Step::Store { .. }
        | Step::SideEffect { .. }
        | Step::As { .. } => Requires(Requirement::AnyValue),

        Step::WhereStartKey { .. } => NotImplemented("where(startKey, predicate)"),
        Step::SelectKeys { pop: None, .. } => NotImplemented("select(keys)"),
        Step::SelectKeys { pop: Some(_), .. } => NotImplemented("select(pop, keys)"),
        Step::ChoosePredicate { .. } => NotImplemented("choose(predicate, ...)"),
        Step::ChooseOption { .. } => NotImplemented("option"),
        Step::Tail { .. } => NotImplemented("tail"),
        Step::Coin { .. } => NotImplemented("coin"),
        Step::Sample { .. } => NotImplemented("sample"),
        Step::ValueMap { .. } => NotImplemented("valueMap"),
        Step::PropertyMap { .. } => NotImplemented("propertyMap"),
        Step::Max => NotImplemented("max"),
        Step::Min => NotImplemented("min"),
        Step::Mean => NotImplemented("mean"),
        Step::Sum => NotImplemented("sum"),
        Step::Order => NotImplemented("order"),
        Step::Match { .. } => NotImplemented("match"),
        Step::Times { .. } => NotImplemented("times"),
        Step::Until { .. } => NotImplemented("until"),
        Step::Emit { .. } => NotImplemented("emit"),
        Step::Aggregate { .. } => NotImplemented("aggregate"),
        Step::Barrier => NotImplemented("barrier"),
        Step::Iterate => NotImplemented("iterate"),
        Step::TimeLimit { .. } => NotImplemented("timeLimit"),
        Step::From { .. } => NotImplemented("from"),
        Step::To { .. } => NotImplemented("to"),
    }
}

impl TraversalCompiler {
    /// Apply one step to `scope`.
    pub fn apply(&mut self, scope: ScopeId, step: &Step) -> CompileResult<()> {
        self.ctx.ensure_open(scope)?;
        let name = step.name();
        log::debug!(
            "{:?}: {}() on {} pivot",
            scope,
            name,
            self.ctx.pivot_type(scope)
        );

        let pivot = match applicability(step) {
            Applicability::Source => self.ctx.pivot(scope),
            Applicability::Requires(required) => Some(self.require(scope, name, required)?),
            Applicability::NotImplemented(feature) => {
                return Err(CompileError::not_implemented(feature))
            }
        };
        let pivot = match step {
            Step::Range { .. } | Step::Limit { .. } => pivot,
            _ => self.close_window(scope)?.or(pivot),
        };
        let input = pivot.ok_or(CompilationError::NoInput { step: name });

        match step {
            Step::V { ids } => self.v(scope, ids),
            Step::E { ids } => self.e(scope, ids),
            Step::AddV { label } => self.add_v(scope, label.as_deref()),
            Step::AddE { label } => self.add_e(scope, input?, label),
            Step::Inject { values } => self.inject(scope, values),
            Step::Constant { value } => self.constant(scope, value),

            Step::Has {
                key,
                label,
                predicate,
            } => self.has(scope, input?, label.as_deref(), key, predicate.as_ref()),
            Step::HasNot { key } => self.has_not(scope, input?, key),
            Step::HasId { values } => self.has_id(scope, input?, values),
            Step::HasLabel { values } => self.has_label(scope, input?, values),
            Step::HasKey { keys } => self.has_key(scope, input?, keys),
            Step::HasValue { values } => self.has_value(scope, input?, values),
            Step::Is { predicate } => self.is(scope, input?, predicate),
            Step::Where { predicate } => self.where_predicate(scope, input?, predicate),
            Step::WhereTraversal { traversal } => self.where_traversal(scope, traversal),
            Step::And { traversals } => self.and(scope, traversals),
            Step::Or { traversals } => self.or(scope, traversals),
            Step::Not { traversal } => self.not(scope, traversal),
            Step::Range { low, high } => self.range(scope, input?, name, *low, *high),
            Step::Limit { limit } => self.range(scope, input?, name, 0, *limit),
            Step::Dedup { labels } => self.dedup(scope, input?, labels),

            Step::Out { labels } => self.expand_vertex(scope, input?, EdgeDirection::Out, labels),
            Step::In { labels } => self.expand_vertex(scope, input?, EdgeDirection::In, labels),
            Step::Both { labels } => {
                self.expand_vertex(scope, input?, EdgeDirection::Both, labels)
            }
            Step::OutE { labels } => self
                .expand_edge(scope, input?, EdgeDirection::Out, labels)
                .map(|_| ()),
            Step::InE { labels } => self
                .expand_edge(scope, input?, EdgeDirection::In, labels)
                .map(|_| ()),
            Step::BothE { labels } => self
                .expand_edge(scope, input?, EdgeDirection::Both, labels)
                .map(|_| ()),
            Step::OutV => self.bind_vertex(scope, input?, VertexEnd::Source),
            Step::InV => self.bind_vertex(scope, input?, VertexEnd::Sink),
            Step::BothV => self.bind_vertex(scope, input?, VertexEnd::Both),
            Step::OtherV => self.bind_vertex(scope, input?, VertexEnd::Other),

            Step::Properties { keys } => self.properties(scope, input?, keys),
            Step::Values { keys } => self.values(scope, input?, keys),
            Step::Key => self.property_key(scope, input?),
            Step::Value => self.property_value(scope, input?),
            Step::Id => self.id(scope, input?),
            Step::Label => self.label(scope, input?),

            Step::Count => self.count(scope),
            Step::Fold => self.fold(scope, input?),
            Step::Tree => self.tree(scope),
            Step::Path => self.path(scope),
            Step::Unfold => self.unfold(scope, input?),
            Step::Group {
                side_effect_key,
                key_by,
                value_by,
            } => self.group(
                scope,
                input?,
                side_effect_key.as_deref(),
                key_by.as_deref(),
                value_by.as_deref(),
            ),
            Step::Store { key } => self.store(scope, input?, key),
            Step::SideEffect { traversal } => self.side_effect(scope, traversal),
            Step::Cap { key } => self.cap(scope, key),

            Step::Union { traversals } => self.union(scope, traversals),
            Step::Optional { traversal } => self.optional(scope, input?, traversal),
            Step::Local { traversal } => self.local(scope, traversal),
            Step::Map { traversal } => self.map(scope, traversal),
            Step::FlatMap { traversal } => self.flat_map(scope, traversal),
            Step::Coalesce { traversals } => self.coalesce(scope, traversals),
            Step::Project { keys, by } => self.project(scope, keys, by),
            Step::Repeat {
                traversal,
                condition,
            } => self.repeat(scope, input?, traversal, condition),
            Step::Choose {
                condition,
                true_branch,
                false_branch,
            } => self.choose(scope, condition, true_branch, false_branch),

            Step::As { labels } => self.tag(scope, input?, labels),
            Step::Select { label, pop } => self.select(scope, label, *pop),

            Step::Property { key, value } => self.property(scope, input?, key, value),
            Step::Drop => self.drop(scope, input?),

            Step::WhereStartKey { .. }
            | Step::SelectKeys { .. }
            | Step::ChoosePredicate { .. }
            | Step::ChooseOption { .. }
            | Step::Tail { .. }
            | Step::Coin { .. }
            | Step::Sample { .. }
            | Step::ValueMap { .. }
            | Step::PropertyMap { .. }
            | Step::Max
            | Step::Min
            | Step::Mean
            | Step::Sum
            | Step::Order
            | Step::Match { .. }
            | Step::Times { .. }
            | Step::Until { .. }
            | Step::Emit { .. }
            | Step::Aggregate { .. }
            | Step::Barrier
            | Step::Iterate
            | Step::TimeLimit { .. }
            | Step::From { .. }
            | Step::To { .. } => Err(CompileError::not_implemented(name)),
        }
    }

    /// The pivot of `scope`, checked against `required`.
    fn require(
        &self,
        scope: ScopeId,
        step: &'static str,
        required: Requirement,
    ) -> CompileResult<VarId> {
        let pivot = self
            .ctx
            .pivot(scope)
            .ok_or(CompilationError::NoInput { step })?;
        let actual = self.ctx.variable(pivot).variable_type();
        if required.admits(actual) {
            Ok(pivot)
        } else {
            Err(CompilationError::StepNotApplicable {
                step,
                required,
                actual,
            }
            .into())
        }
    }
}

/// `Pop` spelled the way it appears in messages.
pub(crate) fn pop_name(pop: Pop) -> &'static str {
    match pop {
        Pop::First => "first",
        Pop::Last => "last",
        Pop::All => "all",
        Pop::Mixed => "mixed",
    }
}
