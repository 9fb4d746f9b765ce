//! Decodings: how one parameter or the content lands in the arguments.

use std::fmt;
use std::sync::Arc;

use daedalus_core::{Arguments, Converter, Primitive, TypeModel, Value};
use indexmap::IndexMap;

use crate::definition::Definition;
use crate::error::DecodeError;

/// Separators used when naming and splitting parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeSettings {
    /// Joins nested parameter names, `.` by default.
    pub separator: String,
    /// Splits list values, `,` by default.
    pub list_separator: char,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
            list_separator: ',',
        }
    }
}

/// Splits a list value, honouring `\` escapes of the separator.
///
/// ```
/// use daedalus_codec::explode;
///
/// assert_eq!(explode(r"a,b\,c", ','), ["a", "b,c"]);
/// assert_eq!(explode("", ','), Vec::<String>::new());
/// ```
#[must_use]
pub fn explode(value: &str, separator: char) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&separator) {
            current.push(separator);
            chars.next();
        } else if c == separator {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() || !items.is_empty() {
        items.push(current);
    }
    items
}

/// Writes one decoded text value into the arguments.
pub type DoDecode = Arc<dyn Fn(&mut Arguments, &str) -> Result<(), DecodeError> + Send + Sync>;

/// How one parameter is decoded.
#[derive(Clone)]
pub struct Decoding {
    input: String,
    path: Vec<String>,
    name: String,
    ty: String,
    is_list: bool,
    is_mandatory: bool,
    property: Option<String>,
    definition: Definition,
    do_decode: DoDecode,
}

impl Decoding {
    /// Creates a decoding.
    ///
    /// `path` is the parameter path, joined with `separator` to form the
    /// parameter name.
    pub fn new(
        input: impl Into<String>,
        path: Vec<String>,
        separator: &str,
        ty: impl Into<String>,
        definition: Definition,
        do_decode: DoDecode,
    ) -> Self {
        let name = path.join(separator);
        Self {
            input: input.into(),
            path,
            name,
            ty: ty.into(),
            is_list: false,
            is_mandatory: false,
            property: None,
            definition,
            do_decode,
        }
    }

    /// Marks the decoding as accepting list values.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Marks the decoding as mandatory.
    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self.definition.is_optional = false;
        self
    }

    /// Attaches the model property the decoding fills.
    #[must_use]
    pub fn for_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// The owning input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The parameter path.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Readable type.
    #[must_use]
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Whether values are exploded into a list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        self.is_list
    }

    /// Whether the parameter must be supplied.
    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        self.is_mandatory
    }

    /// The model property the decoding fills.
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// The definition.
    #[must_use]
    pub const fn definition(&self) -> &Definition {
        &self.definition
    }

    /// Mutable definition, for propagating invoker information.
    pub fn definition_mut(&mut self) -> &mut Definition {
        &mut self.definition
    }

    /// Decodes one received value into the arguments.
    pub fn decode(&self, arguments: &mut Arguments, value: &str) -> Result<(), DecodeError> {
        (self.do_decode)(arguments, value)
    }
}

impl fmt::Debug for Decoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoding")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("ty", &self.ty)
            .field("is_list", &self.is_list)
            .finish_non_exhaustive()
    }
}

/// The parameter decodings of a call, keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct Decodings {
    by_name: IndexMap<String, Decoding>,
}

impl Decodings {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a decoding, handing it back when its name is already taken.
    pub fn insert(&mut self, decoding: Decoding) -> Result<(), Decoding> {
        if self.by_name.contains_key(decoding.name()) {
            return Err(decoding);
        }
        self.by_name.insert(decoding.name().to_string(), decoding);
        Ok(())
    }

    /// Looks up a decoding by parameter name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Decoding> {
        self.by_name.get(name)
    }

    /// Decodings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Decoding> {
        self.by_name.values()
    }

    /// Mutable decodings in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Decoding> {
        self.by_name.values_mut()
    }

    /// Removes every decoding of an input.
    pub fn remove_input(&mut self, input: &str) {
        self.by_name.retain(|_, decoding| decoding.input() != input);
    }

    /// Number of decodings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether there is no decoding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Decodes every parameter, collecting all failures.
    ///
    /// List decodings append exploded values; scalar decodings keep the
    /// last value received.
    pub fn decode_all(
        &self,
        arguments: &mut Arguments,
        parameters: &[(String, String)],
    ) -> Vec<DecodeError> {
        let mut failures = Vec::new();
        for (name, value) in parameters {
            match self.by_name.get(name) {
                Some(decoding) => {
                    if let Err(error) = decoding.decode(arguments, value) {
                        failures.push(error);
                    }
                }
                None => failures.push(DecodeError::UnknownParameter { name: name.clone() }),
            }
        }
        failures
    }
}

/// Builds the setter of a scalar parameter.
pub(crate) fn scalar(name: String, target: Vec<String>, primitive: Primitive) -> DoDecode {
    Arc::new(move |arguments: &mut Arguments, text: &str| {
        let value = Converter
            .as_value(text, primitive)
            .map_err(|source| DecodeError::InvalidValue {
                name: name.clone(),
                value: text.to_string(),
                source,
            })?;
        if let Some(slot) = arguments.slot(&target) {
            *slot = value;
        }
        Ok(())
    })
}

/// Builds the setter of a list parameter.
pub(crate) fn listed(
    name: String,
    target: Vec<String>,
    primitive: Primitive,
    separator: char,
) -> DoDecode {
    Arc::new(move |arguments: &mut Arguments, text: &str| {
        let mut items = Vec::new();
        for item in explode(text, separator) {
            let value = Converter
                .as_value(&item, primitive)
                .map_err(|source| DecodeError::InvalidValue {
                    name: name.clone(),
                    value: item.clone(),
                    source,
                })?;
            items.push(value);
        }
        if let Some(slot) = arguments.slot(&target) {
            match slot {
                Value::List(existing) => existing.extend(items),
                other => *other = Value::List(items),
            }
        }
        Ok(())
    })
}

/// How the request content is decoded into a model input.
#[derive(Debug, Clone)]
pub struct ContentDecoding {
    input: String,
    model: Arc<TypeModel>,
    definitions: Vec<Definition>,
}

impl ContentDecoding {
    /// Creates the content decoding of a model input.
    #[must_use]
    pub fn new(input: impl Into<String>, model: Arc<TypeModel>) -> Self {
        let input = input.into();
        let definitions = model
            .properties()
            .iter()
            .map(|(name, kind)| {
                Definition::new(
                    name.clone(),
                    crate::definition::Category::Content,
                    kind.primitive().name(),
                    input.clone(),
                )
                .optional()
            })
            .collect();
        Self {
            input,
            model,
            definitions,
        }
    }

    /// The input receiving the decoded model.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The expected model.
    #[must_use]
    pub const fn model(&self) -> &Arc<TypeModel> {
        &self.model
    }

    /// Definitions of the accepted properties.
    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Decodes JSON content into the input's argument.
    ///
    /// The object may be wrapped in a single key named after the model.
    /// Properties already present in the argument, such as an id injected
    /// from the path, are kept.
    pub fn decode(
        &self,
        arguments: &mut Arguments,
        content: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), DecodeError> {
        if let Some(content_type) = content_type {
            let parsed: Option<mime::Mime> = content_type.parse().ok();
            let is_json = parsed.is_some_and(|m| {
                m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON)
            });
            if !is_json {
                return Err(DecodeError::UnsupportedContent {
                    content_type: content_type.to_string(),
                });
            }
        }

        let document: serde_json::Value =
            serde_json::from_slice(content).map_err(|error| DecodeError::MalformedContent {
                message: error.to_string(),
            })?;
        let mut object = match document {
            serde_json::Value::Object(object) => object,
            other => {
                return Err(DecodeError::MalformedContent {
                    message: format!("expected an object, got {other}"),
                })
            }
        };
        let wrapped = object.len() == 1
            && object
                .get(self.model.name())
                .is_some_and(serde_json::Value::is_object);
        if wrapped {
            if let Some(serde_json::Value::Object(inner)) = object.remove(self.model.name()) {
                object = inner;
            }
        }

        let mut decoded = IndexMap::new();
        for (property, raw) in object {
            let kind = self
                .model
                .property(&property)
                .ok_or_else(|| DecodeError::UnknownProperty {
                    model: self.model.name().to_string(),
                    property: property.clone(),
                })?;
            let value = json_to_value(&raw, kind.primitive()).map_err(|source| {
                DecodeError::InvalidProperty {
                    property: property.clone(),
                    source,
                }
            })?;
            decoded.insert(property, value);
        }

        let slot = arguments
            .slot(&[self.input.as_str()])
            .ok_or_else(|| DecodeError::MalformedContent {
                message: "no argument slot".to_string(),
            })?;
        match slot {
            Value::Object(existing) => {
                for (property, value) in decoded {
                    match existing.get(&property) {
                        Some(current) if *current != value && value != Value::Null => {
                            return Err(DecodeError::ConflictingValue {
                                expected: render(current),
                                found: render(&value),
                                property,
                            });
                        }
                        Some(_) => {}
                        None => {
                            existing.insert(property, value);
                        }
                    }
                }
            }
            other => *other = Value::Object(decoded),
        }
        Ok(())
    }
}

fn render(value: &Value) -> String {
    Converter
        .as_string(value)
        .unwrap_or_else(|_| format!("{value:?}"))
}

fn json_to_value(
    raw: &serde_json::Value,
    primitive: Primitive,
) -> Result<Value, daedalus_core::ConversionError> {
    let converter = Converter;
    match raw {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => converter.normalize(Value::Bool(*b), primitive),
        serde_json::Value::Number(n) => {
            let value = n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or(Value::Null);
            converter.normalize(value, primitive)
        }
        serde_json::Value::String(s) => converter.as_value(s, primitive),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| json_to_value(item, primitive))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        serde_json::Value::Object(_) => Err(daedalus_core::ConversionError::Unsupported {
            kind: "object",
        }),
    }
}
