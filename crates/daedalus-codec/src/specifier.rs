//! Specifiers and the support encoders render with.

use std::fmt;

use daedalus_core::{Converter, IndexKind, Value};

use crate::render::{Specs, ATTRIBUTE_HREF};

/// Builds the URIs hyperlinks point to.
pub trait PathEncoder: Send + Sync {
    /// Path of the model instance with the given id, when the model can
    /// be fetched by id.
    fn model_path(&self, model: &str, id: &str) -> Option<String>;

    /// Turns a reference value into the URI to emit.
    fn encode_uri(&self, uri: &str) -> String {
        uri.to_string()
    }
}

/// A path encoder producing no hyperlinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPaths;

impl PathEncoder for NoPaths {
    fn model_path(&self, _model: &str, _id: &str) -> Option<String> {
        None
    }
}

/// Shared state of one encoding run.
pub struct EncodeSupport<'a> {
    /// Hyperlink builder.
    pub path_encoder: &'a dyn PathEncoder,
    /// Primitive text conversion.
    pub converter: Converter,
}

impl<'a> EncodeSupport<'a> {
    /// Creates the support.
    #[must_use]
    pub fn new(path_encoder: &'a dyn PathEncoder) -> Self {
        Self {
            path_encoder,
            converter: Converter,
        }
    }
}

impl fmt::Debug for EncodeSupport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeSupport").finish_non_exhaustive()
    }
}

/// Augments the specs of a block before it is rendered.
pub trait Specifier: Send + Sync + fmt::Debug {
    /// Adds attributes or markers for `value`.
    fn populate(&self, value: &Value, specs: &mut Specs, support: &EncodeSupport<'_>);
}

/// Adds the `href` of a model instance.
///
/// The id is read from the property `id` of object values, or is the value
/// itself for id outputs.
#[derive(Debug, Clone)]
pub struct HrefSpecifier {
    model: String,
    id: String,
}

impl HrefSpecifier {
    /// Creates the specifier for a model and its id property.
    #[must_use]
    pub fn new(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
        }
    }
}

impl Specifier for HrefSpecifier {
    fn populate(&self, value: &Value, specs: &mut Specs, support: &EncodeSupport<'_>) {
        let id = match value {
            Value::Object(object) => object.get(&self.id),
            Value::Null | Value::List(_) | Value::Part(_) => None,
            atom => Some(atom),
        };
        let Some(id) = id.and_then(|id| support.converter.as_string(id).ok()) else {
            return;
        };
        if let Some(path) = support.path_encoder.model_path(&self.model, &id) {
            specs.attributes.insert(ATTRIBUTE_HREF.to_string(), path.clone());
            specs.reference = Some(path);
        }
    }
}

/// Flags blocks carrying a reference for indexing.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpecifier {
    kind: IndexKind,
}

impl IndexSpecifier {
    /// Creates the specifier.
    #[must_use]
    pub const fn new(kind: IndexKind) -> Self {
        Self { kind }
    }
}

impl Specifier for IndexSpecifier {
    fn populate(&self, _value: &Value, specs: &mut Specs, _support: &EncodeSupport<'_>) {
        if specs.reference.is_some() {
            specs.index = Some(self.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Users;

    impl PathEncoder for Users {
        fn model_path(&self, model: &str, id: &str) -> Option<String> {
            (model == "User").then(|| format!("/User/{id}"))
        }
    }

    #[test]
    fn test_href_from_object_and_atom() {
        let support = EncodeSupport::new(&Users);
        let href = HrefSpecifier::new("User", "Id");

        let mut specs = Specs::new();
        href.populate(&Value::object([("Id", Value::Int(4))]), &mut specs, &support);
        assert_eq!(specs.attributes[ATTRIBUTE_HREF], "/User/4");

        let mut specs = Specs::new();
        href.populate(&Value::Int(5), &mut specs, &support);
        assert_eq!(specs.reference.as_deref(), Some("/User/5"));

        IndexSpecifier::new(IndexKind::Reference).populate(&Value::Null, &mut specs, &support);
        assert_eq!(specs.index, Some(IndexKind::Reference));
    }

    #[test]
    fn test_no_paths() {
        let support = EncodeSupport::new(&NoPaths);
        let mut specs = Specs::new();
        HrefSpecifier::new("User", "Id").populate(&Value::Int(1), &mut specs, &support);
        IndexSpecifier::new(IndexKind::Reference).populate(&Value::Int(1), &mut specs, &support);
        assert_eq!(specs, Specs::new());
    }
}
