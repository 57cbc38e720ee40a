//! DocGraph - Gremlin traversal compiler for document stores
//!
//! This crate compiles a parsed traversal (an ordered sequence of steps) into a
//! structured query plan over a document collection that embeds adjacency lists:
//! - Typed variables and nested scopes modelling what each step produces
//! - Lazy, bottom-up property projection across sub-plans
//! - Tag / select resolution for named back-references
//! - Table classification and accessed-column inference over the produced plan

pub mod config;
pub mod plan_ir;
pub mod query_planner;
