//! A bundled LR(1) parser-generator.
//!
//! This crate is a narrow collaborator: the retargetable code generator
//! core never calls into it. It exists because the compiler's front end is
//! built on it, and because pinning its contract (build a grammar, build a
//! parser, parse something) is cheap insurance against silent regressions
//! in a dependency the rest of the toolchain takes for granted.

pub mod error;
pub mod grammar;
pub mod lr;

pub use error::{Location, ParseResult, ParserError, ParserGenerationError};
pub use grammar::{Grammar, Value};
pub use lr::{LrParser, LrParserBuilder, Token, TokenSource};
