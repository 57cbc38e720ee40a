//! Error types for traversal compilation.
//!
//! Two kinds, kept apart so callers can tell them apart programmatically:
//! - [`CompilationError`]: the traversal is invalid.
//! - [`NotImplemented`]: the traversal uses a catalogued feature that has no
//!   semantics yet.
//!
//! Both abort the whole compilation; there is no partial plan.

use std::fmt::Display;

use thiserror::Error;

use crate::query_planner::typed_variable::VariableType;

/// Which variable variants a step accepts, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Vertex,
    Edge,
    VertexOrEdge,
    VertexEdgeOrProperty,
    Property,
    AnyValue,
}

impl Requirement {
    /// Whether a pivot of type `actual` satisfies this requirement.
    pub fn admits(self, actual: VariableType) -> bool {
        match actual {
            VariableType::Vertex => matches!(
                self,
                Requirement::Vertex
                    | Requirement::VertexOrEdge
                    | Requirement::VertexEdgeOrProperty
                    | Requirement::AnyValue
            ),
            VariableType::Edge => matches!(
                self,
                Requirement::Edge
                    | Requirement::VertexOrEdge
                    | Requirement::VertexEdgeOrProperty
                    | Requirement::AnyValue
            ),
            VariableType::Property => matches!(
                self,
                Requirement::Property | Requirement::VertexEdgeOrProperty | Requirement::AnyValue
            ),
            VariableType::Scalar | VariableType::Table | VariableType::Null => {
                self == Requirement::AnyValue
            }
            VariableType::Undefined => false,
        }
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Requirement::Vertex => write!(f, "vertices"),
            Requirement::Edge => write!(f, "edges"),
            Requirement::VertexOrEdge => write!(f, "vertices and edges"),
            Requirement::VertexEdgeOrProperty => write!(f, "vertices, edges and properties"),
            Requirement::Property => write!(f, "properties"),
            Requirement::AnyValue => write!(f, "a defined input"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompilationError {
    #[error("The {step}() step only applies to {required}, but the current pivot is a {actual} variable.")]
    StepNotApplicable {
        step: &'static str,
        required: Requirement,
        actual: VariableType,
    },

    #[error("The {step}() step has no input to apply to.")]
    NoInput { step: &'static str },

    #[error("The specified tag \"{label}\" is not defined.")]
    TagNotDefined { label: String },

    #[error("The tag \"{label}\" is bound to {count} variables; a single binding is required here.")]
    AmbiguousTag { label: String, count: usize },

    #[error("Identifier {column} must be bound to a table alias.")]
    UnboundColumn { column: String },

    #[error("Property \"{property}\" is reserved for internal use and cannot be requested.")]
    ReservedProperty { property: String },

    #[error("The side-effect key \"{key}\" is not defined.")]
    SideEffectKeyNotDefined { key: String },

    #[error("The scope has already been closed and cannot accept more steps.")]
    ScopeClosed,

    #[error("Variable `{alias}` is not attached to a scope.")]
    MissingHomeScope { alias: String },

    #[error("Invalid argument to {step}(): {reason}")]
    InvalidArgument { step: &'static str, reason: String },

    #[error("Sub-plans are nested {depth} levels deep, the maximum is {max}.")]
    NestingTooDeep { depth: u32, max: u32 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{feature} is not supported yet")]
pub struct NotImplemented {
    pub feature: String,
}

impl NotImplemented {
    pub fn new(feature: impl Into<String>) -> Self {
        let feature = feature.into();
        log::warn!("not implemented: {}", feature);
        NotImplemented { feature }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Compilation,
    NotImplemented,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("Compilation error: {0}")]
    Compilation(#[from] CompilationError),

    #[error("Not implemented: {0}")]
    NotImplemented(#[from] NotImplemented),
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Compilation(_) => ErrorKind::Compilation,
            CompileError::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }

    pub fn not_implemented(feature: impl Into<String>) -> Self {
        CompileError::NotImplemented(NotImplemented::new(feature))
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
