//! # Daedalus Codec
//!
//! Decoders turn query parameters and request content into call
//! arguments; encoders turn call results into response bodies.
//!
//! ```text
//!  ?name.like=A%&asc=name ──Decodings──▶ Arguments ──Call──▶ Value
//!  {"User": {...}}  ──ContentDecoding──▶     │                  │
//!                                            ▼                  ▼
//!                                     OutputEncoder ──Renderer──▶ body + indexes
//! ```
//!
//! ## Key Features
//!
//! - **Decoder assembly**: primitive, list, query, option and content decoders run as a processing
//! - **Dotted parameter paths**: `criterion.field` and option parameters share one namespace
//! - **Ordering**: `asc` / `desc` parameters assign growing priorities to ordered criteria
//! - **Encoders**: models, id outputs, collections with totals, dictionaries and references
//! - **Specifiers**: `href` hyperlinks and index markers of nested referenced blocks
//! - **JSON renderer**: every primitive rendered as text through the converter
//!
//! ## Example
//!
//! ```
//! use daedalus_codec::{DecodeSettings, Decoders, Decodings};
//! use daedalus_core::{Arguments, Input, Primitive, Type, TypeOption, Value};
//!
//! let decoders = Decoders::new(DecodeSettings::default()).unwrap();
//! let mut decodings = Decodings::new();
//! for input in [
//!     Input::new("name", Type::Primitive(Primitive::Str)),
//!     Input::new("opts", Type::Option(TypeOption::slice())),
//! ] {
//!     for decoding in decoders.create(&input).unwrap().decodings {
//!         decodings.insert(decoding).unwrap();
//!     }
//! }
//!
//! let mut args = Arguments::new();
//! let parameters = vec![
//!     ("name".to_string(), "Ada".to_string()),
//!     ("limit".to_string(), "5".to_string()),
//! ];
//! assert!(decodings.decode_all(&mut args, &parameters).is_empty());
//! assert_eq!(args.lookup(&["opts", "limit"]), Some(&Value::Int(5)));
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-codec/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod decoder;
mod decoding;
mod definition;
mod encoder;
mod error;
mod render;
mod specifier;

pub use decoder::{decoder_assembly, Created, Decoders, ORDER_ASCENDING, ORDER_DESCENDING};
pub use decoding::{explode, ContentDecoding, DecodeSettings, Decoding, Decodings, DoDecode};
pub use definition::{Category, Definition};
pub use encoder::{
    create_encoder, output_name, CollectionEncoder, DictEncoder, Encoder, ModelEncoder,
    ModelPropertyEncoder, OutputEncoder, PrimitiveEncoder, ReferenceEncoder,
    ReferencePropertyEncoder,
};
pub use error::{CodecAssemblyError, DecodeError, EncodeError};
pub use render::{
    JsonRenderer, Output, Render, Rendered, Renderer, Specs, ATTRIBUTE_HREF, ATTRIBUTE_TOTAL,
};
pub use specifier::{EncodeSupport, HrefSpecifier, IndexSpecifier, NoPaths, PathEncoder, Specifier};
