//! Output encoders.
//!
//! An encoder is compiled once per call output type and renders values of
//! that type through a [`Render`]. Model encoders compose property
//! encoders and decorate their block with specifiers, so a model renders
//! its `href` and is indexed when nested.

use std::fmt;
use std::sync::Arc;

use daedalus_core::{IndexKind, Primitive, PropertyKind, Type, TypeModel, TypeProperty, Value};

use crate::error::{CodecAssemblyError, EncodeError};
use crate::render::{Render, Rendered, Renderer, Specs, ATTRIBUTE_HREF, ATTRIBUTE_TOTAL};
use crate::specifier::{EncodeSupport, HrefSpecifier, IndexSpecifier, PathEncoder, Specifier};

/// Renders values of one type.
pub trait Encoder: Send + Sync + fmt::Debug {
    /// Renders `value` under `name`.
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError>;
}

fn unexpected(name: &str, expected: impl Into<String>, value: &Value) -> EncodeError {
    EncodeError::Unexpected {
        name: name.to_string(),
        expected: expected.into(),
        found: value.kind(),
    }
}

fn specs_for(specifiers: &[Arc<dyn Specifier>], value: &Value, support: &EncodeSupport<'_>) -> Specs {
    let mut specs = Specs::new();
    for specifier in specifiers {
        specifier.populate(value, &mut specs, support);
    }
    specs
}

/// Renders a primitive through the converter.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveEncoder {
    primitive: Primitive,
}

impl PrimitiveEncoder {
    /// Creates the encoder.
    #[must_use]
    pub const fn new(primitive: Primitive) -> Self {
        Self { primitive }
    }
}

impl Encoder for PrimitiveEncoder {
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError> {
        if value.is_null() {
            return Ok(());
        }
        let value = support.converter.normalize(value.clone(), self.primitive)?;
        let text = support.converter.as_string(&value)?;
        render.value(name, &text);
        Ok(())
    }
}

/// Renders a property holding the id of another model as a hyperlinked
/// block, or as the plain id when that model has no path.
#[derive(Debug, Clone)]
pub struct ReferencePropertyEncoder {
    model: String,
    primitive: Primitive,
}

impl Encoder for ReferencePropertyEncoder {
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError> {
        if value.is_null() {
            return Ok(());
        }
        let id = support
            .converter
            .as_string(&support.converter.normalize(value.clone(), self.primitive)?)?;
        match support.path_encoder.model_path(&self.model, &id) {
            Some(path) => {
                let specs = Specs {
                    attributes: [(ATTRIBUTE_HREF.to_string(), path.clone())].into_iter().collect(),
                    index: Some(IndexKind::Reference),
                    reference: Some(path),
                };
                render.begin_object(name, &specs);
                render.end_object();
            }
            None => render.value(name, &id),
        }
        Ok(())
    }
}

/// Renders a model: specifiers first, then properties in declared order.
#[derive(Debug, Clone)]
pub struct ModelEncoder {
    properties: Vec<(String, Arc<dyn Encoder>)>,
    specifiers: Vec<Arc<dyn Specifier>>,
}

impl ModelEncoder {
    /// Compiles the encoder of a model.
    #[must_use]
    pub fn new(model: &TypeModel) -> Self {
        let properties = model
            .properties()
            .iter()
            .map(|(name, kind)| (name.clone(), property_encoder(kind)))
            .collect();
        Self {
            properties,
            specifiers: model_specifiers(model),
        }
    }
}

fn model_specifiers(model: &TypeModel) -> Vec<Arc<dyn Specifier>> {
    match model.id() {
        Some(id) => {
            let href: Arc<dyn Specifier> = Arc::new(HrefSpecifier::new(model.name(), id));
            let index: Arc<dyn Specifier> = Arc::new(IndexSpecifier::new(IndexKind::Reference));
            vec![href, index]
        }
        None => Vec::new(),
    }
}

fn property_encoder(kind: &PropertyKind) -> Arc<dyn Encoder> {
    match kind {
        PropertyKind::Primitive(primitive) => Arc::new(PrimitiveEncoder::new(*primitive)),
        PropertyKind::Reference { model, primitive } => Arc::new(ReferencePropertyEncoder {
            model: model.clone(),
            primitive: *primitive,
        }),
        PropertyKind::List(primitive) => Arc::new(CollectionEncoder {
            item: Arc::new(PrimitiveEncoder::new(*primitive)),
            item_name: "Value".to_string(),
        }),
    }
}

impl Encoder for ModelEncoder {
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError> {
        let object = match value {
            Value::Null => return Ok(()),
            Value::Object(object) => object,
            other => return Err(unexpected(name, name, other)),
        };
        render.begin_object(name, &specs_for(&self.specifiers, value, support));
        for (property, encoder) in &self.properties {
            if let Some(value) = object.get(property) {
                encoder.encode(value, property, render, support)?;
            }
        }
        render.end_object();
        Ok(())
    }
}

/// Renders an id output as a block holding the hyperlink and the id.
#[derive(Debug, Clone)]
pub struct ModelPropertyEncoder {
    property: String,
    primitive: Primitive,
    specifiers: Vec<Arc<dyn Specifier>>,
}

impl ModelPropertyEncoder {
    /// Creates the encoder for an id property.
    #[must_use]
    pub fn new(property: &TypeProperty) -> Self {
        Self {
            property: property.name().to_string(),
            primitive: property.primitive(),
            specifiers: model_specifiers(property.model()),
        }
    }
}

impl Encoder for ModelPropertyEncoder {
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError> {
        if value.is_null() {
            return Ok(());
        }
        render.begin_object(name, &specs_for(&self.specifiers, value, support));
        PrimitiveEncoder::new(self.primitive).encode(value, &self.property, render, support)?;
        render.end_object();
        Ok(())
    }
}

/// Renders a list or a part; a part's total becomes the `total` attribute.
#[derive(Debug, Clone)]
pub struct CollectionEncoder {
    item: Arc<dyn Encoder>,
    item_name: String,
}

impl CollectionEncoder {
    /// Creates the encoder.
    #[must_use]
    pub fn new(item: Arc<dyn Encoder>, item_name: impl Into<String>) -> Self {
        Self {
            item,
            item_name: item_name.into(),
        }
    }
}

impl Encoder for CollectionEncoder {
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError> {
        let (items, total) = match value {
            Value::Null => (&[][..], None),
            Value::List(items) => (items.as_slice(), None),
            Value::Part(part) => (part.items.as_slice(), part.total),
            other => return Err(unexpected(name, "a collection", other)),
        };
        let mut specs = Specs::new();
        if let Some(total) = total {
            specs = specs.attribute(ATTRIBUTE_TOTAL, total.to_string());
        }
        render.begin_collection(name, &specs);
        for item in items {
            self.item.encode(item, &self.item_name, render, support)?;
        }
        render.end_collection();
        Ok(())
    }
}

/// Renders a dictionary as a block with one entry per key.
#[derive(Debug, Clone)]
pub struct DictEncoder {
    value: Arc<dyn Encoder>,
}

impl Encoder for DictEncoder {
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError> {
        let entries = match value {
            Value::Null => return Ok(()),
            Value::Object(entries) => entries,
            other => return Err(unexpected(name, "a dictionary", other)),
        };
        render.begin_object(name, &Specs::new());
        for (key, entry) in entries {
            self.value.encode(entry, key, render, support)?;
        }
        render.end_object();
        Ok(())
    }
}

/// Renders a reference value as a block holding its `href`.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceEncoder;

impl Encoder for ReferenceEncoder {
    fn encode(
        &self,
        value: &Value,
        name: &str,
        render: &mut dyn Render,
        support: &EncodeSupport<'_>,
    ) -> Result<(), EncodeError> {
        let uri = match value {
            Value::Null => return Ok(()),
            Value::Str(uri) => uri,
            other => return Err(unexpected(name, "a reference", other)),
        };
        let href = support.path_encoder.encode_uri(uri);
        let specs = Specs::new().attribute(ATTRIBUTE_HREF, href);
        render.begin_object(name, &specs);
        render.end_object();
        Ok(())
    }
}

/// The compiled encoder of a call output together with its root name.
#[derive(Debug, Clone)]
pub struct OutputEncoder {
    name: String,
    encoder: Arc<dyn Encoder>,
}

impl OutputEncoder {
    /// Root name, e.g. `User` or `UserList`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders a value.
    pub fn encode(
        &self,
        value: &Value,
        renderer: &dyn Renderer,
        path_encoder: &dyn PathEncoder,
    ) -> Result<Rendered, EncodeError> {
        let support = EncodeSupport::new(path_encoder);
        let mut output = renderer.create();
        self.encoder.encode(value, &self.name, output.as_render(), &support)?;
        Ok(output.finish())
    }
}

/// Default root name of an output type.
#[must_use]
pub fn output_name(ty: &Type) -> String {
    match ty {
        Type::Model(model) => model.name().to_string(),
        Type::Property(property) if property.is_id() => property.model().name().to_string(),
        Type::Property(property) => property.name().to_string(),
        Type::Collection(_, item) => format!("{}List", output_name(item)),
        Type::Primitive(primitive) => primitive.name().to_string(),
        Type::Dict(..) => "Dict".to_string(),
        Type::Reference => "Reference".to_string(),
        other => other.to_string(),
    }
}

fn compile(ty: &Type) -> Result<Arc<dyn Encoder>, CodecAssemblyError> {
    let encoder: Arc<dyn Encoder> = match ty {
        Type::Primitive(primitive) => Arc::new(PrimitiveEncoder::new(*primitive)),
        Type::Model(model) => Arc::new(ModelEncoder::new(model)),
        Type::Property(property) if property.is_id() => {
            Arc::new(ModelPropertyEncoder::new(property))
        }
        Type::Property(property) => property_encoder(property.kind()),
        Type::Collection(_, item) => Arc::new(CollectionEncoder::new(compile(item)?, output_name(item))),
        Type::Dict(_, value) => Arc::new(DictEncoder {
            value: compile(value)?,
        }),
        Type::Reference => Arc::new(ReferenceEncoder),
        other => {
            return Err(CodecAssemblyError::UnsupportedOutput {
                ty: other.to_string(),
            })
        }
    };
    Ok(encoder)
}

/// Compiles the encoder of an output type; `None` for calls without output.
///
/// # Example
///
/// ```
/// use daedalus_codec::{create_encoder, JsonRenderer, NoPaths};
/// use daedalus_core::{Primitive, Type, TypeModel, Value};
///
/// let user = TypeModel::builder("User").id("Id", Primitive::Int).property("Name", Primitive::Str).build();
/// let encoder = create_encoder(&Type::Model(user), None).unwrap().unwrap();
/// let value = Value::object([("Id", Value::Int(1)), ("Name", Value::from("Ada"))]);
/// let rendered = encoder.encode(&value, &JsonRenderer, &NoPaths).unwrap();
/// assert_eq!(rendered.body, br#"{"Id":"1","Name":"Ada"}"#);
/// ```
pub fn create_encoder(
    ty: &Type,
    name: Option<&str>,
) -> Result<Option<OutputEncoder>, CodecAssemblyError> {
    if ty.is_none() {
        return Ok(None);
    }
    Ok(Some(OutputEncoder {
        name: name.map_or_else(|| output_name(ty), ToString::to_string),
        encoder: compile(ty)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::JsonRenderer;
    use daedalus_core::Part;

    struct Paths;

    impl PathEncoder for Paths {
        fn model_path(&self, model: &str, id: &str) -> Option<String> {
            Some(format!("/{model}/{id}"))
        }
    }

    fn user() -> Arc<TypeModel> {
        TypeModel::builder("User")
            .id("Id", Primitive::Int)
            .property("Name", Primitive::Str)
            .build()
    }

    fn article() -> Arc<TypeModel> {
        TypeModel::builder("Article")
            .id("Id", Primitive::Int)
            .reference("Author", "User", Primitive::Int)
            .build()
    }

    fn json(rendered: &Rendered) -> serde_json::Value {
        serde_json::from_slice(&rendered.body).unwrap()
    }

    #[test]
    fn test_model_with_href() {
        let encoder = create_encoder(&Type::Model(user()), None).unwrap().unwrap();
        let value = Value::object([("Id", Value::Int(42)), ("Name", Value::from("Ada"))]);
        let rendered = encoder.encode(&value, &JsonRenderer, &Paths).unwrap();
        assert_eq!(
            json(&rendered),
            serde_json::json!({"href": "/User/42", "Id": "42", "Name": "Ada"})
        );
        assert!(rendered.indexes.is_empty());
    }

    #[test]
    fn test_reference_property_is_indexed() {
        let encoder = create_encoder(&Type::Model(article()), None).unwrap().unwrap();
        let value = Value::object([("Id", Value::Int(7)), ("Author", Value::Int(3))]);
        let rendered = encoder.encode(&value, &JsonRenderer, &Paths).unwrap();

        assert_eq!(json(&rendered)["Author"]["href"], "/User/3");
        assert_eq!(rendered.indexes.len(), 1);
        assert_eq!(rendered.indexes[0].name, "Author");
        assert_eq!(rendered.indexes[0].kind, IndexKind::Reference);
    }

    #[test]
    fn test_collection_with_total() {
        let ty = Type::iter(Type::Model(user()));
        let encoder = create_encoder(&ty, None).unwrap().unwrap();
        assert_eq!(encoder.name(), "UserList");

        let items = vec![Value::object([("Id", Value::Int(1))])];
        let value = Value::Part(Part::with_total(items, 12));
        let rendered = encoder.encode(&value, &JsonRenderer, &Paths).unwrap();
        let body = json(&rendered);
        assert_eq!(body["total"], "12");
        assert_eq!(body["UserList"][0]["href"], "/User/1");
    }

    #[test]
    fn test_id_output() {
        let id = user().property_id().unwrap();
        let encoder = create_encoder(&Type::Property(id), None).unwrap().unwrap();
        let rendered = encoder.encode(&Value::Int(9), &JsonRenderer, &Paths).unwrap();
        assert_eq!(json(&rendered), serde_json::json!({"href": "/User/9", "Id": "9"}));
    }

    #[test]
    fn test_dict_of_references() {
        let ty = Type::dict(Primitive::Str, Type::Reference);
        let encoder = create_encoder(&ty, Some("Resources")).unwrap().unwrap();
        let value = Value::object([("User", Value::from("/User"))]);
        let rendered = encoder.encode(&value, &JsonRenderer, &Paths).unwrap();
        assert_eq!(json(&rendered), serde_json::json!({"User": {"href": "/User"}}));
    }

    #[test]
    fn test_mismatched_value() {
        let encoder = create_encoder(&Type::Model(user()), None).unwrap().unwrap();
        assert!(matches!(
            encoder.encode(&Value::Int(1), &JsonRenderer, &Paths),
            Err(EncodeError::Unexpected { .. })
        ));
    }

    #[test]
    fn test_no_output() {
        assert!(create_encoder(&Type::None, None).unwrap().is_none());
        assert!(create_encoder(&Type::Option(daedalus_core::TypeOption::slice()), None).is_err());
    }
}
