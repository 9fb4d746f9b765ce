//! # Daedalus Core
//!
//! Core types shared by every Daedalus crate.
//!
//! - [`Value`] and [`Arguments`] - runtime values handed to and returned by services
//! - [`Type`], [`TypeModel`], [`TypeProperty`], [`TypeQuery`], [`TypeOption`] - the type model
//! - [`Service`] and [`Call`] - declarative service registration
//! - [`Converter`] - text form of primitive values
//! - [`CodeHttp`] - symbolic response codes bound to HTTP statuses
//! - [`Request`], [`Response`] and [`Dispatch`] - the records exchanged with the host server
//! - [`Index`] - markers locating referenced blocks inside a rendered body

#![doc(html_root_url = "https://docs.rs/daedalus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod code;
mod converter;
mod error;
pub mod headers;
mod index;
mod registry;
mod request;
mod request_id;
mod service;
mod types;
mod value;

pub use code::CodeHttp;
pub use converter::{Converter, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
pub use error::{ConversionError, ErrorReport, InputError, ServiceError, ServiceResult};
pub use index::{format_content_index, parse_content_index, Index, IndexKind};
pub use registry::TypeRegistry;
pub use request::{parse_query, Dispatch, Request, Response};
pub use request_id::RequestId;
pub use service::{Call, CallMethod, Invoke, Service, CALL_HINTS, HINT_REPLACE_FOR, HINT_WEB_NAME};
pub use types::{
    CollectionKind, Comparator, Criterion, Input, Primitive, PropertyKind, Type, TypeModel,
    TypeModelBuilder, TypeOption, TypeProperty, TypeQuery, TypeQueryBuilder, FIELD_ASCENDING,
    FIELD_EQUAL, FIELD_ILIKE, FIELD_LIKE, FIELD_PRIORITY, OPTION_LIMIT, OPTION_OFFSET,
    OPTION_WITH_TOTAL,
};
pub use value::{Arguments, Object, Part, Value};
