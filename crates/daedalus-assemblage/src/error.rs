//! Assemblage errors.

use daedalus_processor::AssemblyError;
use thiserror::Error;

/// Errors raised while building the assemblage.
#[derive(Debug, Error)]
pub enum AssemblageError {
    /// The assemblage stages do not compile.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Why a reference was left in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("reference '{uri}' unavailable ({status}): {reason}")]
pub struct Unavailable {
    /// The referenced URI.
    pub uri: String,
    /// Status of the sub-request.
    pub status: u16,
    /// Code or text of the failed sub-request.
    pub reason: String,
}
