use crate::compiler::ir::FunctionId;
use crate::model::ClassError;
use thiserror::Error;

/// Result alias used across the compiler.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that abort a compilation pass for one record type.
///
/// A record type without a mapping is not an error: the driver reports it as
/// skipped instead.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The class model itself could not be built.
    #[error(transparent)]
    Class(#[from] ClassError),

    /// The mapping names a record class the class model does not know.
    #[error("record class '{class}' is not a known class")]
    UnknownRecordClass { class: String },

    /// A descriptor id used by a field is not registered in the mapping.
    #[error("field '{field}' references unknown property descriptor '{id}'")]
    DanglingProperty { field: String, id: String },

    /// Embedded descriptors reference each other in a loop.
    #[error("field '{field}' has cyclic embedded properties: {}", cycle.join(" -> "))]
    CyclicEmbedding { field: String, cycle: Vec<String> },

    /// A direct descriptor names a class that is not declared.
    #[error("field '{field}' references unknown class '{class}'")]
    UnknownClass { field: String, class: String },

    /// A direct descriptor names a property its class does not declare.
    #[error("field '{field}' references unknown property '{class}::{property}'")]
    UnknownProperty {
        field: String,
        class: String,
        property: String,
    },

    /// A chain navigates through a property that does not hold a value object.
    #[error("field '{field}' navigates through '{class}::{property}', which is not embedded")]
    NotEmbedded {
        field: String,
        class: String,
        property: String,
    },

    /// Consecutive hops of a chain do not line up in the type graph.
    #[error("field '{field}' reaches a '{found}' where a '{expected}' is required")]
    BrokenChain {
        field: String,
        expected: String,
        found: String,
    },

    /// No unique most-derived owner among a group's first steps.
    #[error("ambiguous class hierarchy under '{prefix}': no most-derived class among {}", classes.join(", "))]
    AmbiguousHierarchy { prefix: String, classes: Vec<String> },

    /// A chain reached an emitter in a shape it cannot compile.
    #[error("cannot compile chain '{chain}': {reason}")]
    InvalidChain { chain: String, reason: &'static str },

    /// The compiled program could not be serialized into an artifact.
    #[error("failed to serialize accessors for '{record}': {source}")]
    Serialize {
        record: String,
        #[source]
        source: serde_json::Error,
    },

    /// The artifact sink could not be written.
    #[error("failed to write accessor artifact '{artifact}': {source}")]
    ArtifactWrite {
        artifact: String,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /* Errors caused by the supplied metadata rather than the environment */
    pub fn is_malformed_metadata(&self) -> bool {
        matches!(
            self,
            CompileError::Class(_)
                | CompileError::UnknownRecordClass { .. }
                | CompileError::DanglingProperty { .. }
                | CompileError::CyclicEmbedding { .. }
                | CompileError::UnknownClass { .. }
                | CompileError::UnknownProperty { .. }
                | CompileError::NotEmbedded { .. }
                | CompileError::BrokenChain { .. }
        )
    }
}

/// Errors raised while turning an accessor program into callable functions.
///
/// Programs built by the compiler always link; these guard programs read back
/// from artifacts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("function {function} references {target}, which is not defined before it")]
    ForwardReference {
        function: FunctionId,
        target: FunctionId,
    },

    #[error("function {function} expects {target} to be a {expected}")]
    KindMismatch {
        function: FunctionId,
        target: FunctionId,
        expected: &'static str,
    },

    #[error("accessor for '{field}' references missing function {target}")]
    MissingFunction { field: String, target: FunctionId },
}
