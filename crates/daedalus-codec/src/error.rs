//! Codec errors.

use daedalus_core::ConversionError;
use daedalus_processor::{AssemblyError, ProcessorError};
use thiserror::Error;

/// Failure decoding one parameter or the request content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No decoding exists for a parameter name.
    #[error("Unknown parameter '{name}'")]
    UnknownParameter {
        /// The parameter name as received.
        name: String,
    },

    /// A parameter value could not be converted.
    #[error("Invalid value '{value}' for parameter '{name}': {source}")]
    InvalidValue {
        /// The parameter name.
        name: String,
        /// The received value.
        value: String,
        /// The conversion failure.
        #[source]
        source: ConversionError,
    },

    /// An ordering parameter names a criterion that cannot be ordered.
    #[error("Cannot order by '{criterion}'")]
    NotOrdered {
        /// The criterion name.
        criterion: String,
    },

    /// The content type is not supported by the content decoder.
    #[error("Unsupported content type '{content_type}'")]
    UnsupportedContent {
        /// The received content type.
        content_type: String,
    },

    /// The content is not well formed.
    #[error("Malformed content: {message}")]
    MalformedContent {
        /// Parser message.
        message: String,
    },

    /// The content carries a property the model does not declare.
    #[error("Unknown property '{property}' of model '{model}'")]
    UnknownProperty {
        /// Model name.
        model: String,
        /// Property name.
        property: String,
    },

    /// A content property has a value of the wrong type.
    #[error("Invalid value for property '{property}': {source}")]
    InvalidProperty {
        /// Property name.
        property: String,
        /// The conversion failure.
        #[source]
        source: ConversionError,
    },

    /// The content sets a property already given by the request path.
    #[error("Cannot set value {found} for '{property}', expected value {expected}")]
    ConflictingValue {
        /// Property name.
        property: String,
        /// Value taken from the path.
        expected: String,
        /// Value found in the content.
        found: String,
    },
}

impl DecodeError {
    /// The field the failure is about, when there is one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownParameter { name } | Self::InvalidValue { name, .. } => Some(name),
            Self::NotOrdered { criterion } => Some(criterion),
            Self::UnknownProperty { property, .. }
            | Self::InvalidProperty { property, .. }
            | Self::ConflictingValue { property, .. } => Some(property),
            Self::UnsupportedContent { .. } | Self::MalformedContent { .. } => None,
        }
    }
}

/// Failure rendering a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A primitive could not be rendered as text.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The value does not match the encoder.
    #[error("Expected {expected} for '{name}' but got a {found} value")]
    Unexpected {
        /// The rendered name.
        name: String,
        /// What the encoder handles.
        expected: String,
        /// Variant name of the value.
        found: &'static str,
    },
}

/// Failure compiling decoders or encoders for a call.
#[derive(Error, Debug)]
pub enum CodecAssemblyError {
    /// No decoder handles the input type.
    #[error("No decoder for input '{input}' of type {ty}")]
    UnsupportedInput {
        /// The input name.
        input: String,
        /// The input type.
        ty: String,
    },

    /// Two decodings share a parameter path.
    #[error("Parameter '{path}' is decoded more than once")]
    DuplicatePath {
        /// The duplicated parameter path.
        path: String,
    },

    /// More than one input is decoded from the content.
    #[error("Inputs '{first}' and '{second}' both decode the request content")]
    AmbiguousContent {
        /// The first content input.
        first: String,
        /// The second content input.
        second: String,
    },

    /// No encoder handles the output type.
    #[error("No encoder for output type {ty}")]
    UnsupportedOutput {
        /// The output type.
        ty: String,
    },

    /// The decoder assembly does not compile.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// The decoder processing failed.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}
