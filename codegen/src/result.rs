//! Error taxonomy for the code generator core (spec.md §7).

use crate::ir::Type;
use thiserror::Error;

/// A fatal error from one of the core pipeline stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    /// Malformed IR caught by the verifier: use-before-def, a type
    /// mismatch, or a missing terminator.
    #[error("malformed IR in function `{function}`: {detail}")]
    IRStructureError { function: String, detail: String },

    /// The instruction selector found a DAG node no tile covers.
    #[error("no tile matches opcode `{opcode}` of type {ty}")]
    NoMatchingTile { opcode: String, ty: Type },

    /// The register allocator could not converge (a pre-colored-only class
    /// overflowed its K).
    #[error("register allocation failed to converge for class `{class}`")]
    AllocationFailure { class: String },

    /// A target callback returned an instruction referencing an unknown
    /// register or a malformed operand -- a target bug, not a user error.
    #[error("target contract violation: {0}")]
    TargetContractViolation(String),

    /// Wraps the first fatal stage error encountered while compiling one
    /// function. Partial output for that function is not committed.
    #[error("compilation of `{function}` failed")]
    CompilationError {
        function: String,
        #[source]
        source: Box<CodegenError>,
    },
}

impl CodegenError {
    /// Wrap this error as the `CompilationError` for `function`, unless it
    /// already is one.
    pub fn into_compilation_error(self, function: &str) -> CodegenError {
        match self {
            CodegenError::CompilationError { .. } => self,
            other => CodegenError::CompilationError {
                function: function.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;
