//! This module contains the primary error type for the resolver's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod container;
pub mod parse;
pub mod resolution;

use thiserror::Error;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
///
/// Note that _all_ of the library is public in order to facilitate use-cases
/// beyond the ones designed for.
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by
/// the clients of the library) should be members of this enum.
///
/// Most failure modes of a resolution are deliberately _not_ errors: parse
/// problems are recorded as diagnostics on the parsed unit, a missing target
/// function is reported as [`crate::resolver::Resolution::NotFound`], and an
/// exceeded line budget produces a truncated closure. The variants here cover
/// the remaining genuinely fatal cases.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// Errors from the structural parsing subsystem.
    ///
    /// The parser itself never fails; this variant exists so callers that
    /// treat a parse diagnostic as fatal can promote it.
    #[error(transparent)]
    Parse(#[from] parse::LocatedError),

    /// Errors from the type-resolution and collection subsystem.
    #[error(transparent)]
    Resolution(#[from] resolution::Error),

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
