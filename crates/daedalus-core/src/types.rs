//! The type model.
//!
//! Every service input and output is described by a [`Type`]. Models,
//! queries and options are shared through `Arc` so that the assembler, the
//! decoders and the encoders all point at the same descriptor.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::Value;

/// Atomic value types understood by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    /// Text.
    Str,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// Boolean.
    Bool,
    /// Date and time (`YYYY-MM-DDTHH:MM:SSZ`).
    DateTime,
    /// Date (`YYYY-MM-DD`).
    Date,
    /// Time of day (`HH:MM:SS`).
    Time,
}

impl Primitive {
    /// Lower case name of the primitive.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    /// Whether a path segment of this type can swallow an extension and
    /// therefore needs a mandatory trailing slash when it has children.
    #[must_use]
    pub const fn needs_slash(self) -> bool {
        matches!(self, Self::Str | Self::Float)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared type of a model property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// A plain primitive property.
    Primitive(Primitive),
    /// A property holding the id of another model.
    Reference {
        /// Name of the referenced model.
        model: String,
        /// Primitive type of the referenced id.
        primitive: Primitive,
    },
    /// A list of primitives.
    List(Primitive),
}

impl PropertyKind {
    /// The primitive carried by this property.
    #[must_use]
    pub const fn primitive(&self) -> Primitive {
        match self {
            Self::Primitive(p) | Self::List(p) | Self::Reference { primitive: p, .. } => *p,
        }
    }

    /// Name of the referenced model for reference properties.
    #[must_use]
    pub fn referenced_model(&self) -> Option<&str> {
        match self {
            Self::Reference { model, .. } => Some(model),
            _ => None,
        }
    }
}

/// A model: named, ordered properties with an optional id.
///
/// # Example
///
/// ```
/// use daedalus_core::{Primitive, TypeModel};
///
/// let user = TypeModel::builder("User")
///     .id("Id", Primitive::Int)
///     .property("Name", Primitive::Str)
///     .build();
///
/// assert_eq!(user.id(), Some("Id"));
/// assert_eq!(user.properties().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TypeModel {
    name: String,
    properties: IndexMap<String, PropertyKind>,
    id: Option<String>,
    domain: Option<String>,
}

impl TypeModel {
    /// Starts building a model.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TypeModelBuilder {
        TypeModelBuilder {
            model: Self {
                name: name.into(),
                properties: IndexMap::new(),
                id: None,
                domain: None,
            },
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in declaration order.
    #[must_use]
    pub const fn properties(&self) -> &IndexMap<String, PropertyKind> {
        &self.properties
    }

    /// Looks up a property kind.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyKind> {
        self.properties.get(name)
    }

    /// Name of the id property.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Domain prefix for paths of this model.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Returns the property type for the id of this model.
    #[must_use]
    pub fn property_id(self: &Arc<Self>) -> Option<TypeProperty> {
        self.id().and_then(|id| TypeProperty::new(self, id))
    }

    /// Returns the property type for a named property.
    #[must_use]
    pub fn property_type(self: &Arc<Self>, name: &str) -> Option<TypeProperty> {
        TypeProperty::new(self, name)
    }
}

impl PartialEq for TypeModel {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeModel {}

impl Hash for TypeModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Builder for [`TypeModel`].
#[derive(Debug)]
pub struct TypeModelBuilder {
    model: TypeModel,
}

impl TypeModelBuilder {
    /// Declares the id property.
    pub fn id(mut self, name: impl Into<String>, primitive: Primitive) -> Self {
        let name = name.into();
        self.model
            .properties
            .insert(name.clone(), PropertyKind::Primitive(primitive));
        self.model.id = Some(name);
        self
    }

    /// Declares a primitive property.
    pub fn property(mut self, name: impl Into<String>, primitive: Primitive) -> Self {
        self.model
            .properties
            .insert(name.into(), PropertyKind::Primitive(primitive));
        self
    }

    /// Declares a property referencing another model by id.
    pub fn reference(
        mut self,
        name: impl Into<String>,
        model: impl Into<String>,
        primitive: Primitive,
    ) -> Self {
        self.model.properties.insert(
            name.into(),
            PropertyKind::Reference {
                model: model.into(),
                primitive,
            },
        );
        self
    }

    /// Declares a list of primitives.
    pub fn list(mut self, name: impl Into<String>, primitive: Primitive) -> Self {
        self.model
            .properties
            .insert(name.into(), PropertyKind::List(primitive));
        self
    }

    /// Sets the domain prefix, e.g. `admin` or `admin/security`.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.model.domain = Some(domain.into());
        self
    }

    /// Finishes the model.
    #[must_use]
    pub fn build(self) -> Arc<TypeModel> {
        Arc::new(self.model)
    }
}

/// A property of a model, used as an input or output type.
#[derive(Debug, Clone)]
pub struct TypeProperty {
    model: Arc<TypeModel>,
    name: String,
    kind: PropertyKind,
}

impl TypeProperty {
    /// Creates the property type if the model declares the property.
    #[must_use]
    pub fn new(model: &Arc<TypeModel>, name: &str) -> Option<Self> {
        let kind = model.property(name)?.clone();
        Some(Self {
            model: Arc::clone(model),
            name: name.to_string(),
            kind,
        })
    }

    /// The owning model.
    #[must_use]
    pub const fn model(&self) -> &Arc<TypeModel> {
        &self.model
    }

    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind.
    #[must_use]
    pub const fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Primitive carried by the property.
    #[must_use]
    pub const fn primitive(&self) -> Primitive {
        self.kind.primitive()
    }

    /// Whether this is the id property of its model.
    #[must_use]
    pub fn is_id(&self) -> bool {
        self.model.id() == Some(self.name.as_str())
    }

    /// `Model.Property` notation.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.model.name(), self.name)
    }
}

impl PartialEq for TypeProperty {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name() && self.name == other.name
    }
}

impl Eq for TypeProperty {}

impl Hash for TypeProperty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.model.name().hash(state);
        self.name.hash(state);
    }
}

/// Comparators a query criterion supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// Exact match, field `equal`.
    Equal,
    /// Pattern match, fields `like` and `ilike`.
    Like,
    /// Ordering, fields `ascending` and `priority`.
    Ordered,
}

/// Field name for equality values.
pub const FIELD_EQUAL: &str = "equal";
/// Field name for like patterns.
pub const FIELD_LIKE: &str = "like";
/// Field name for case-insensitive like patterns.
pub const FIELD_ILIKE: &str = "ilike";
/// Field name for the ordering direction.
pub const FIELD_ASCENDING: &str = "ascending";
/// Field name for the ordering priority.
pub const FIELD_PRIORITY: &str = "priority";

/// One criterion of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    name: String,
    primitive: Primitive,
    comparators: Vec<Comparator>,
}

impl Criterion {
    /// Criterion name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primitive of the compared values.
    #[must_use]
    pub const fn primitive(&self) -> Primitive {
        self.primitive
    }

    /// Supported comparators.
    #[must_use]
    pub fn comparators(&self) -> &[Comparator] {
        &self.comparators
    }

    /// Whether the criterion can be used for ordering.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.comparators.contains(&Comparator::Ordered)
    }

    /// Decodable fields with their primitive types, in a stable order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, Primitive)> {
        let mut fields = Vec::new();
        for comparator in &self.comparators {
            match comparator {
                Comparator::Equal => fields.push((FIELD_EQUAL, self.primitive)),
                Comparator::Like => {
                    fields.push((FIELD_LIKE, Primitive::Str));
                    fields.push((FIELD_ILIKE, Primitive::Str));
                }
                Comparator::Ordered => {
                    fields.push((FIELD_ASCENDING, Primitive::Bool));
                    fields.push((FIELD_PRIORITY, Primitive::Int));
                }
            }
        }
        fields
    }

    /// The field a bare `criterion=value` parameter writes to.
    #[must_use]
    pub fn main_field(&self) -> Option<(&'static str, Primitive)> {
        if self.comparators.contains(&Comparator::Equal) {
            Some((FIELD_EQUAL, self.primitive))
        } else if self.comparators.contains(&Comparator::Like) {
            Some((FIELD_LIKE, Primitive::Str))
        } else {
            None
        }
    }
}

/// A set of criteria over a target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeQuery {
    name: String,
    target: String,
    criteria: IndexMap<String, Criterion>,
}

impl TypeQuery {
    /// Starts building a query for the named target model.
    #[must_use]
    pub fn builder(name: impl Into<String>, target: impl Into<String>) -> TypeQueryBuilder {
        TypeQueryBuilder {
            query: Self {
                name: name.into(),
                target: target.into(),
                criteria: IndexMap::new(),
            },
        }
    }

    /// Query name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the queried model.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Criteria in declaration order.
    #[must_use]
    pub const fn criteria(&self) -> &IndexMap<String, Criterion> {
        &self.criteria
    }
}

/// Builder for [`TypeQuery`].
#[derive(Debug)]
pub struct TypeQueryBuilder {
    query: TypeQuery,
}

impl TypeQueryBuilder {
    /// Adds a criterion.
    pub fn criterion(
        mut self,
        name: impl Into<String>,
        primitive: Primitive,
        comparators: &[Comparator],
    ) -> Self {
        let name = name.into();
        self.query.criteria.insert(
            name.clone(),
            Criterion {
                name,
                primitive,
                comparators: comparators.to_vec(),
            },
        );
        self
    }

    /// Finishes the query.
    #[must_use]
    pub fn build(self) -> Arc<TypeQuery> {
        Arc::new(self.query)
    }
}

/// Option property holding the slice offset.
pub const OPTION_OFFSET: &str = "offset";
/// Option property holding the slice size.
pub const OPTION_LIMIT: &str = "limit";
/// Option property asking for the total count.
pub const OPTION_WITH_TOTAL: &str = "withTotal";

/// A named holder of optional call parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeOption {
    name: String,
    properties: IndexMap<String, Primitive>,
}

impl TypeOption {
    /// Creates an option holder.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, properties: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (S, Primitive)>,
        S: Into<String>,
    {
        Arc::new(Self {
            name: name.into(),
            properties: properties
                .into_iter()
                .map(|(name, primitive)| (name.into(), primitive))
                .collect(),
        })
    }

    /// The `Slice` option: `offset` and `limit`.
    #[must_use]
    pub fn slice() -> Arc<Self> {
        Self::new(
            "Slice",
            [(OPTION_OFFSET, Primitive::Int), (OPTION_LIMIT, Primitive::Int)],
        )
    }

    /// The `SliceAndTotal` option: `offset`, `limit` and `withTotal`.
    #[must_use]
    pub fn slice_and_total() -> Arc<Self> {
        Self::new(
            "SliceAndTotal",
            [
                (OPTION_OFFSET, Primitive::Int),
                (OPTION_LIMIT, Primitive::Int),
                (OPTION_WITH_TOTAL, Primitive::Bool),
            ],
        )
    }

    /// Option name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in declaration order.
    #[must_use]
    pub const fn properties(&self) -> &IndexMap<String, Primitive> {
        &self.properties
    }

    /// Whether the option holds the named property.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }
}

/// Collection flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Lazily produced items.
    Iter,
    /// Materialized list.
    List,
}

/// The declared type of an input or output.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// No value, e.g. an update returning nothing.
    None,
    /// An atomic value.
    Primitive(Primitive),
    /// A model instance.
    Model(Arc<TypeModel>),
    /// A single property of a model.
    Property(TypeProperty),
    /// A query over a model.
    Query(Arc<TypeQuery>),
    /// An option holder.
    Option(Arc<TypeOption>),
    /// A collection of items.
    Collection(CollectionKind, Box<Type>),
    /// A mapping from primitive keys to values.
    Dict(Primitive, Box<Type>),
    /// A URL-like reference.
    Reference,
}

impl Type {
    /// `Iter(item)`.
    #[must_use]
    pub fn iter(item: Self) -> Self {
        Self::Collection(CollectionKind::Iter, Box::new(item))
    }

    /// `List(item)`.
    #[must_use]
    pub fn list(item: Self) -> Self {
        Self::Collection(CollectionKind::List, Box::new(item))
    }

    /// `Dict(key, value)`.
    #[must_use]
    pub fn dict(key: Primitive, value: Self) -> Self {
        Self::Dict(key, Box::new(value))
    }

    /// Atoms: primitives, model properties and references.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::Property(_) | Self::Reference)
    }

    /// Coarse compatibility test against a primitive.
    #[must_use]
    pub fn is_of(&self, primitive: Primitive) -> bool {
        self.primitive() == Some(primitive)
    }

    /// The primitive for atoms that carry one.
    #[must_use]
    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(p) => Some(*p),
            Self::Property(property) => Some(property.primitive()),
            _ => None,
        }
    }

    /// Whether this is a collection.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(..))
    }

    /// Item type of a collection.
    #[must_use]
    pub fn item(&self) -> Option<&Self> {
        match self {
            Self::Collection(_, item) => Some(item),
            _ => None,
        }
    }

    /// The model this type is about: the model itself, the owner of a
    /// property, or the model of collection items.
    #[must_use]
    pub fn model(&self) -> Option<&Arc<TypeModel>> {
        match self {
            Self::Model(model) => Some(model),
            Self::Property(property) => Some(property.model()),
            Self::Collection(_, item) => item.model(),
            _ => None,
        }
    }

    /// Whether this is [`Type::None`].
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Model(model) => f.write_str(model.name()),
            Self::Property(property) => f.write_str(&property.qualified_name()),
            Self::Query(query) => f.write_str(query.name()),
            Self::Option(option) => f.write_str(option.name()),
            Self::Collection(CollectionKind::Iter, item) => write!(f, "Iter({item})"),
            Self::Collection(CollectionKind::List, item) => write!(f, "List({item})"),
            Self::Dict(key, value) => write!(f, "Dict({key}, {value})"),
            Self::Reference => f.write_str("Reference"),
        }
    }
}

/// A named call input.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    name: String,
    ty: Type,
    default: Option<Value>,
}

impl Input {
    /// Creates a mandatory input.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Gives the input a default, making it optional.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Input name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub const fn ty(&self) -> &Type {
        &self.ty
    }

    /// Default value, when optional.
    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether the input is optional.
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Arc<TypeModel> {
        TypeModel::builder("User")
            .id("Id", Primitive::Int)
            .property("Name", Primitive::Str)
            .build()
    }

    #[test]
    fn test_property_id() {
        let user = user();
        let id = user.property_id().unwrap();
        assert!(id.is_id());
        assert_eq!(id.primitive(), Primitive::Int);
        assert_eq!(id.qualified_name(), "User.Id");
    }

    #[test]
    fn test_unknown_property() {
        assert!(user().property_type("Missing").is_none());
    }

    #[test]
    fn test_type_display() {
        let user = user();
        assert_eq!(Type::iter(Type::Model(user.clone())).to_string(), "Iter(User)");
        assert_eq!(
            Type::Property(user.property_id().unwrap()).to_string(),
            "User.Id"
        );
        assert_eq!(Type::Option(TypeOption::slice()).to_string(), "Slice");
    }

    #[test]
    fn test_type_model_of_collection() {
        let user = user();
        let ty = Type::list(Type::Model(user));
        assert_eq!(ty.model().map(|m| m.name()), Some("User"));
        assert!(ty.is_collection());
        assert!(!ty.is_primitive());
    }

    #[test]
    fn test_criterion_fields() {
        let query = TypeQuery::builder("QUser", "User")
            .criterion("name", Primitive::Str, &[Comparator::Like, Comparator::Ordered])
            .build();
        let criterion = &query.criteria()["name"];
        let names: Vec<_> = criterion.fields().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["like", "ilike", "ascending", "priority"]);
        assert_eq!(criterion.main_field(), Some((FIELD_LIKE, Primitive::Str)));
        assert!(criterion.is_ordered());
    }

    #[test]
    fn test_slice_and_total() {
        let option = TypeOption::slice_and_total();
        assert!(option.has(OPTION_WITH_TOTAL));
        assert!(!TypeOption::slice().has(OPTION_WITH_TOTAL));
    }

    #[test]
    fn test_needs_slash() {
        assert!(Primitive::Str.needs_slash());
        assert!(Primitive::Float.needs_slash());
        assert!(!Primitive::Int.needs_slash());
    }
}
