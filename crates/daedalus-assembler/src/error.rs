//! Assembler errors.

use daedalus_codec::CodecAssemblyError;
use daedalus_processor::{AssemblyError, ProcessorError};
use daedalus_router::TreeError;
use thiserror::Error;

/// Failure of the assembler itself.
///
/// Problems with single calls never surface here; they exclude the call
/// and are reported in the resources.
#[derive(Error, Debug)]
pub enum AssemblerError {
    /// The assembler stages do not compile together.
    #[error("Assembler stages cannot be compiled: {0}")]
    Assembly(#[from] AssemblyError),

    /// A stage failed while running.
    #[error("Assembler stage failed: {0}")]
    Processing(#[from] ProcessorError),

    /// The stages ran but did not produce a tree.
    #[error("Assembler finished without a resource tree")]
    MissingTree,
}

/// Why a call was left out of the resource tree.
#[derive(Error, Debug)]
pub enum ExcludeReason {
    /// The call method has no HTTP counterpart.
    #[error("Method '{method}' cannot be published over HTTP")]
    InvalidMethod {
        /// The call method.
        method: String,
    },

    /// No model could be derived for the call.
    #[error("Cannot extract the target model")]
    NoTarget,

    /// The same model property appears twice among the inputs.
    #[error("Property '{property}' should appear at most once among the inputs")]
    DuplicatePathInput {
        /// The qualified property.
        property: String,
    },

    /// An update already takes the updated model from the path.
    #[error("Cannot update '{model}' because it is already present as input")]
    TargetIsInput {
        /// The model name.
        model: String,
    },

    /// A model domain is empty or has invalid segments.
    #[error("Invalid domain '{domain}' of model '{model}'")]
    InvalidDomain {
        /// The model name.
        model: String,
        /// The declared domain.
        domain: String,
    },

    /// The web name is not a single word.
    #[error("Invalid web name '{name}', only alphanumeric characters are allowed")]
    InvalidWebName {
        /// The declared web name.
        name: String,
    },

    /// The decoders of an input could not be created.
    #[error("Cannot decode input '{input}': {source}")]
    Decoding {
        /// The input name.
        input: String,
        /// The codec failure.
        #[source]
        source: CodecAssemblyError,
    },

    /// Inputs that nothing binds and that have no default.
    #[error("Unsolved inputs {}", .inputs.join(", "))]
    Unsolved {
        /// The unsolved input names.
        inputs: Vec<String>,
    },

    /// The output encoder could not be compiled.
    #[error("Cannot encode output: {0}")]
    Encoding(#[source] CodecAssemblyError),

    /// The call carries a hint the assembler does not know.
    #[error("Unknown call hint '{hint}', the known hints are {}", .known.join(", "))]
    UnknownHint {
        /// The hint name.
        hint: String,
        /// Names of the known hints.
        known: Vec<String>,
    },

    /// Other invokers answer the same method on the same node.
    #[error("Method {method} on '{path}' is also answered by {}", .others.join(", "))]
    Conflict {
        /// The HTTP method.
        method: String,
        /// The node path.
        path: String,
        /// Ids of the other invokers.
        others: Vec<String>,
    },

    /// The conflicting invokers all replace one another.
    #[error("Replace hints for {method} on '{path}' are circular")]
    CircularReplace {
        /// The HTTP method.
        method: String,
        /// The node path.
        path: String,
    },

    /// The invoker does not fit in the resource tree.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
