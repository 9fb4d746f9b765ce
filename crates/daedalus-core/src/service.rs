//! Declarative service registration.
//!
//! A [`Service`] groups [`Call`]s. Each call names its method, inputs and
//! output type and carries the function that implements it. The assembler
//! turns every call into one invoker of the resource tree.
//!
//! # Example
//!
//! ```
//! use daedalus_core::{Call, Primitive, Service, Type, TypeModel, Value};
//!
//! let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
//! let id = user.property_id().unwrap();
//!
//! let service = Service::new("UserService").call(
//!     Call::get("getById", |args| Ok(Value::object([("Id", args.get("id").cloned().into())])))
//!         .input("id", Type::Property(id))
//!         .output(Type::Model(user)),
//! );
//! assert_eq!(service.calls().len(), 1);
//! ```

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ServiceError;
use crate::types::{Input, Type};
use crate::value::{Arguments, Value};

/// The operation kind of a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallMethod {
    /// Read.
    Get,
    /// Remove.
    Delete,
    /// Create.
    Insert,
    /// Modify.
    Update,
    /// Anything else; calls with such methods are not published.
    Other(String),
}

impl CallMethod {
    /// Name of the method.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Delete => "DELETE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for CallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The function implementing a call.
pub type Invoke = Arc<dyn Fn(&Arguments) -> Result<Value, ServiceError> + Send + Sync>;

/// Hint overriding the web name of a call.
pub const HINT_WEB_NAME: &str = "webName";
/// Hint naming the services whose calls a call replaces on the same path
/// and method.
pub const HINT_REPLACE_FOR: &str = "replaceFor";

/// Call hints understood by the assembler, with what they do.
pub const CALL_HINTS: [(&str, &str); 2] = [
    (
        HINT_WEB_NAME,
        "a single word replacing the last literal of the derived path",
    ),
    (
        HINT_REPLACE_FOR,
        "comma separated services whose calls on the same path and method this call replaces",
    ),
];

/// One operation of a service.
#[derive(Clone)]
pub struct Call {
    name: String,
    method: CallMethod,
    inputs: Vec<Input>,
    output: Type,
    hints: IndexMap<String, String>,
    invoke: Invoke,
    location: &'static Location<'static>,
}

impl Call {
    /// Creates a call with an explicit method.
    #[track_caller]
    pub fn new<F>(name: impl Into<String>, method: CallMethod, invoke: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            method,
            inputs: Vec::new(),
            output: Type::None,
            hints: IndexMap::new(),
            invoke: Arc::new(invoke),
            location: Location::caller(),
        }
    }

    /// Creates a GET call.
    #[track_caller]
    pub fn get<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        Self::new(name, CallMethod::Get, invoke)
    }

    /// Creates a DELETE call.
    #[track_caller]
    pub fn delete<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        Self::new(name, CallMethod::Delete, invoke)
    }

    /// Creates an INSERT call.
    #[track_caller]
    pub fn insert<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        Self::new(name, CallMethod::Insert, invoke)
    }

    /// Creates an UPDATE call.
    #[track_caller]
    pub fn update<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        Self::new(name, CallMethod::Update, invoke)
    }

    /// Adds a mandatory input.
    pub fn input(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.inputs.push(Input::new(name, ty));
        self
    }

    /// Adds an optional input with its default.
    pub fn input_with_default(
        mut self,
        name: impl Into<String>,
        ty: Type,
        default: impl Into<Value>,
    ) -> Self {
        self.inputs.push(Input::new(name, ty).with_default(default));
        self
    }

    /// Sets the output type.
    pub fn output(mut self, ty: Type) -> Self {
        self.output = ty;
        self
    }

    /// Overrides the last literal of the derived path.
    pub fn web_name(self, name: impl Into<String>) -> Self {
        self.hint(HINT_WEB_NAME, name)
    }

    /// Replaces the calls of `service` answering the same path and method.
    pub fn replace_for(mut self, service: impl AsRef<str>) -> Self {
        let service = service.as_ref();
        self.hints
            .entry(HINT_REPLACE_FOR.to_string())
            .and_modify(|services| {
                services.push(',');
                services.push_str(service);
            })
            .or_insert_with(|| service.to_string());
        self
    }

    /// Attaches a hint; [`CALL_HINTS`] lists the ones the assembler knows.
    pub fn hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(key.into(), value.into());
        self
    }

    /// Call name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call method.
    #[must_use]
    pub const fn method(&self) -> &CallMethod {
        &self.method
    }

    /// Inputs in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Output type.
    #[must_use]
    pub const fn output_type(&self) -> &Type {
        &self.output
    }

    /// Web name override, if hinted.
    #[must_use]
    pub fn web_name_hint(&self) -> Option<&str> {
        self.hints.get(HINT_WEB_NAME).map(String::as_str)
    }

    /// Services this call replaces, if hinted.
    #[must_use]
    pub fn replace_for_hint(&self) -> Vec<&str> {
        self.hints
            .get(HINT_REPLACE_FOR)
            .map(|services| {
                services
                    .split(',')
                    .map(str::trim)
                    .filter(|service| !service.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All hints.
    #[must_use]
    pub const fn hints(&self) -> &IndexMap<String, String> {
        &self.hints
    }

    /// Shared handle on the implementation.
    #[must_use]
    pub fn invoker(&self) -> Invoke {
        Arc::clone(&self.invoke)
    }

    /// Runs the implementation.
    pub fn invoke(&self, arguments: &Arguments) -> Result<Value, ServiceError> {
        (self.invoke)(arguments)
    }

    /// Source location where the call was declared.
    #[must_use]
    pub fn location(&self) -> String {
        self.location.to_string()
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("hints", &self.hints)
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}

/// A named group of calls.
#[derive(Debug, Clone)]
pub struct Service {
    name: String,
    calls: Vec<Call>,
}

impl Service {
    /// Creates an empty service.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: Vec::new(),
        }
    }

    /// Adds a call.
    pub fn call(mut self, call: Call) -> Self {
        self.calls.push(call);
        self
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls in declaration order.
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn test_call_captures_location() {
        let call = Call::get("ping", |_| Ok(Value::Null));
        assert!(call.location().contains("service.rs"));
    }

    #[test]
    fn test_call_builder() {
        let call = Call::insert("create", |_| Ok(Value::Int(1)))
            .input("name", Type::Primitive(Primitive::Str))
            .input_with_default("active", Type::Primitive(Primitive::Bool), true)
            .output(Type::Primitive(Primitive::Int))
            .web_name("Register");

        assert_eq!(call.method(), &CallMethod::Insert);
        assert_eq!(call.inputs().len(), 2);
        assert!(call.inputs()[1].has_default());
        assert_eq!(call.web_name_hint(), Some("Register"));
        assert_eq!(call.invoke(&Arguments::new()).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_replace_for_accumulates() {
        let call = Call::get("find", |_| Ok(Value::Null))
            .replace_for("UserService")
            .replace_for(" LegacyService ");
        assert_eq!(call.replace_for_hint(), ["UserService", "LegacyService"]);
        assert_eq!(call.hints().len(), 1);
        assert!(Call::get("plain", |_| Ok(Value::Null)).replace_for_hint().is_empty());
    }

    #[test]
    fn test_method_names() {
        assert_eq!(CallMethod::Insert.to_string(), "INSERT");
        assert_eq!(CallMethod::Other("PATCH".into()).name(), "PATCH");
    }
}
