//! This module contains the error type that pertains to the structural
//! parsing of Solidity source text.
//!
//! Parse errors are never fatal: the parser skips the offending construct,
//! records a located diagnostic on the resulting
//! [`crate::parse::unit::SourceUnit`], and continues.

use thiserror::Error;

use crate::error::container;

/// Problems that occur while scanning source text for declarations.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// A declaration's opening brace was found but no matching closing brace
    /// exists before the end of the text.
    #[error("No closing brace found for the `{construct}` declaration `{name}`")]
    UnbalancedBraces { construct: &'static str, name: String },

    /// A function's opening parenthesis was found but no matching closing
    /// parenthesis exists before the end of the text.
    #[error("No closing parenthesis found for the parameter list of `{name}`")]
    UnbalancedParameterList { name: String },

    /// A declaration header was found but neither a body nor a terminating
    /// semicolon follows it.
    #[error("No body found for the `{construct}` declaration `{name}`")]
    MissingBody { construct: &'static str, name: String },
}

/// A parse error with an associated line in the source text.
pub type LocatedError = container::Located<Error>;

/// The result type for functions that may return parse errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach source lines to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, line: u32) -> Self::Located {
        container::Located { line, payload: self }
    }
}
