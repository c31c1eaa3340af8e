//! Define the `Location`, parse/generation error, and result types.
//!
//! Mirrors the narrow error surface of a textual-format reader: a location
//! plus a message, nothing more elaborate.

use std::fmt;
use thiserror::Error;

/// The location of a token or a generation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// Line number. Line 0 is used for synthetic/EOF tokens.
    pub line_number: usize,
}

impl fmt::Display for Location {
    /// Renders as an empty prefix for synthetic/EOF tokens (line 0), or
    /// `"<line>: "` otherwise, so a message can be built by simple
    /// concatenation.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line_number == 0 {
            Ok(())
        } else {
            write!(f, "{}: ", self.line_number)
        }
    }
}

/// Raised when the grammar itself cannot be turned into an LR(1) parser
/// (an unresolvable reduce/reduce conflict, an undefined symbol, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot build parser: {message}")]
pub struct ParserGenerationError {
    pub message: String,
}

/// Raised at parse time when the generated parser has no action for the
/// current state and lookahead token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location}{message}")]
pub struct ParserError {
    pub location: Location,
    pub message: String,
}

pub type GenResult<T> = Result<T, ParserGenerationError>;
pub type ParseResult<T> = Result<T, ParserError>;
