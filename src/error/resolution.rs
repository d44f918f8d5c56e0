//! This module contains the error type that pertains to type resolution and
//! dependency collection.

use thiserror::Error;

use crate::error::container;

/// Errors that occur while resolving types or collecting the dependency
/// closure for a function.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// A struct definition could not be reduced to a tuple type because it
    /// participates in a reference cycle.
    ///
    /// Solidity forbids directly recursive struct values in memory, but
    /// adversarial or truncated source can still present them; the struct is
    /// treated as absent from the symbol table rather than looping forever.
    #[error("Struct `{name}` participates in a definition cycle and cannot be resolved")]
    CyclicStructReference { name: String },

    /// A struct definition has no braced field list to extract a tuple type
    /// from.
    #[error("Struct `{name}` has no field list and cannot be resolved")]
    MalformedStruct { name: String },

    /// The watchdog requested that the resolver stop its work.
    #[error("The watchdog stopped the resolver")]
    StoppedByWatchdog,
}

/// A resolution error with an associated line in the source text.
pub type LocatedError = container::Located<Error>;

/// The result type for functions that may return resolution errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Make it possible to attach source lines to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, line: u32) -> Self::Located {
        container::Located { line, payload: self }
    }
}
