//! Invokers: one call bound to one HTTP method of one node.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use daedalus_codec::{ContentDecoding, Decodings, Definition, OutputEncoder};
use daedalus_core::{Arguments, Call, CallMethod, Input, Invoke, Type, TypeModel, TypeProperty};
use http::Method;
use indexmap::IndexMap;

use crate::node::NodeId;

/// Adjusts the arguments right before the call runs.
pub type Prepare = Arc<dyn Fn(&mut Arguments) + Send + Sync>;

/// One element of an invoker path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// A literal segment.
    Name(String),
    /// A segment holding the value of a property input.
    Property {
        /// The input receiving the value.
        input: String,
        /// The property type of the segment.
        property: TypeProperty,
    },
    /// A segment whose value is injected into a model input, e.g. the id
    /// of the model being updated.
    Injected {
        /// The model input receiving the value.
        input: String,
        /// The injected property.
        property: TypeProperty,
    },
}

impl PathElement {
    /// Literal element.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// The literal, for name elements.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Property { .. } | Self::Injected { .. } => None,
        }
    }

    /// The property type, for typed elements.
    #[must_use]
    pub const fn property(&self) -> Option<&TypeProperty> {
        match self {
            Self::Name(_) => None,
            Self::Property { property, .. } | Self::Injected { property, .. } => Some(property),
        }
    }

    /// The input a typed element fills.
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Property { input, .. } | Self::Injected { input, .. } => Some(input),
        }
    }

    /// Where a typed element's value lands in the arguments.
    #[must_use]
    pub fn target(&self) -> Vec<String> {
        match self {
            Self::Name(_) => Vec::new(),
            Self::Property { input, .. } => vec![input.clone()],
            Self::Injected { input, property } => vec![input.clone(), property.name().to_string()],
        }
    }

    /// Whether the element is a value placeholder.
    #[must_use]
    pub const fn is_typed(&self) -> bool {
        !matches!(self, Self::Name(_))
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Property { property, .. } | Self::Injected { property, .. } => {
                write!(f, "{{{}}}", property.qualified_name())
            }
        }
    }
}

/// The compiled form of a call for one HTTP method.
///
/// Invokers are filled in by the assembler stages and frozen into the
/// resource tree; the dispatcher only reads them.
#[derive(Clone)]
pub struct Invoker {
    /// Identifier, `Service.call`.
    pub id: String,
    /// Call method.
    pub method: CallMethod,
    /// HTTP method the invoker answers.
    pub http_method: Method,
    /// Owning service name.
    pub service: String,
    /// Source location of the call declaration.
    pub location: String,
    /// Inputs in call order.
    pub inputs: Vec<Input>,
    /// Output type.
    pub output: Type,
    /// Web name hint of the call.
    pub web_name: Option<String>,
    /// The model the call is about.
    pub target: Option<Arc<TypeModel>>,
    /// Whether the output is a collection.
    pub is_collection: bool,
    /// Path elements from the root.
    pub path: Vec<PathElement>,
    /// Parameter decodings keyed by parameter name.
    pub decodings: Decodings,
    /// Content decoding, for calls taking a model.
    pub content: Option<ContentDecoding>,
    /// Accepted parameters, content and path values.
    pub definitions: Vec<Definition>,
    /// Inputs bound by path, parameters or content.
    pub solved: BTreeSet<String>,
    /// Argument adjustments run before invoking.
    pub prepare: Vec<Prepare>,
    /// The output encoder; `None` when the call returns nothing.
    pub encoder: Option<OutputEncoder>,
    /// The implementation.
    pub invoke: Invoke,
    /// The node holding the invoker, once placed.
    pub node: Option<NodeId>,
    /// Hints of the call.
    pub hints: IndexMap<String, String>,
    /// Services whose invokers this one replaces on the same node and method.
    pub replaces: Vec<String>,
}

impl Invoker {
    /// Creates the initial invoker of a call.
    ///
    /// The HTTP method starts as `GET` and is set by the assembler.
    #[must_use]
    pub fn from_call(service: &str, call: &Call) -> Self {
        let output = call.output_type().clone();
        Self {
            id: format!("{service}.{}", call.name()),
            method: call.method().clone(),
            http_method: Method::GET,
            service: service.to_string(),
            location: call.location(),
            inputs: call.inputs().to_vec(),
            web_name: call.web_name_hint().map(ToString::to_string),
            target: output.model().cloned(),
            is_collection: output.is_collection(),
            output,
            path: Vec::new(),
            decodings: Decodings::new(),
            content: None,
            definitions: Vec::new(),
            solved: BTreeSet::new(),
            prepare: Vec::new(),
            encoder: None,
            invoke: call.invoker(),
            node: None,
            hints: call.hints().clone(),
            replaces: call.replace_for_hint().into_iter().map(String::from).collect(),
        }
    }

    /// Input by name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name() == name)
    }

    /// Whether the output is a single model, or the id of one.
    #[must_use]
    pub fn is_model(&self) -> bool {
        match &self.output {
            Type::Model(_) => true,
            Type::Property(property) => property.is_id(),
            _ => false,
        }
    }

    /// Typed path elements, in path order.
    pub fn typed_elements(&self) -> impl Iterator<Item = &PathElement> {
        self.path.iter().filter(|element| element.is_typed())
    }

    /// The path as a readable template, e.g. `User/{User.Id}`.
    #[must_use]
    pub fn path_template(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Applies defaults of unsupplied inputs, then the prepare steps.
    pub fn prepare_arguments(&self, arguments: &mut Arguments) {
        for input in &self.inputs {
            if arguments.contains(input.name()) {
                continue;
            }
            if let Some(default) = input.default() {
                arguments.set(input.name(), default.clone());
            }
        }
        for prepare in &self.prepare {
            prepare(arguments);
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("id", &self.id)
            .field("http_method", &self.http_method)
            .field("path", &self.path_template())
            .field("output", &self.output)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
