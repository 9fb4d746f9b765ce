//! Runtime values exchanged between decoders, services and encoders.
//!
//! Services receive their arguments as an [`Arguments`] bag and return a
//! [`Value`]. Both sides are untyped at runtime; the declared [`Type`] of an
//! input or output decides how a value is decoded or rendered.
//!
//! [`Type`]: crate::Type

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;

/// Ordered name to value mapping used for model instances.
pub type Object = IndexMap<String, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Str(String),
    /// Date and time without zone, rendered in UTC notation.
    DateTime(NaiveDateTime),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Model instance or nested parameter holder.
    Object(Object),
    /// A slice of a larger collection, optionally carrying the total count.
    Part(Part),
}

/// A page of items returned by collection calls that support slicing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Part {
    /// The items in this slice.
    pub items: Vec<Value>,
    /// The total number of items available, when requested.
    pub total: Option<i64>,
}

impl Part {
    /// Creates a part without total.
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self { items, total: None }
    }

    /// Creates a part carrying the total count.
    #[must_use]
    pub fn with_total(items: Vec<Value>, total: i64) -> Self {
        Self {
            items,
            total: Some(total),
        }
    }
}

impl Value {
    /// Builds an object value from name/value pairs.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_core::Value;
    ///
    /// let user = Value::object([("Id", Value::Int(42)), ("Name", Value::from("Ada"))]);
    /// assert_eq!(user.get("Id"), Some(&Value::Int(42)));
    /// ```
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean payload.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric payload as float, widening integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the text payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items of a list or of a part.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            Self::Part(part) => Some(&part.items),
            _ => None,
        }
    }

    /// Returns the object payload.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the mutable object payload.
    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a member of an object value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(name))
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::DateTime(_) => "datetime",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::List(_) => "list",
            Self::Object(_) => "object",
            Self::Part(_) => "part",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl From<Part> for Value {
    fn from(value: Part) -> Self {
        Self::Part(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// The keyword argument bag handed to a service call.
///
/// Arguments are keyed by input name. Decoders write into nested slots
/// using [`Arguments::slot`], so a query input named `q` receives an object
/// such as `{"name": {"like": "A%"}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, Value>,
    locale: Vec<String>,
}

impl Arguments {
    /// Creates an empty argument bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the argument for an input.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the mutable argument for an input.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// Sets an argument, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Removes an argument.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    /// Returns `true` when the input has a non-null argument.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|value| !value.is_null())
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no argument is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over arguments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the slot at a nested path, creating intermediate objects.
    ///
    /// Returns `None` for an empty path.
    pub fn slot<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self
            .values
            .entry(first.as_ref().to_string())
            .or_insert(Value::Null);
        for name in rest {
            if !matches!(current, Value::Object(_)) {
                *current = Value::Object(Object::new());
            }
            current = match current {
                Value::Object(map) => map
                    .entry(name.as_ref().to_string())
                    .or_insert(Value::Null),
                _ => return None,
            };
        }
        Some(current)
    }

    /// Reads the value at a nested path without creating anything.
    #[must_use]
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.values.get(first.as_ref())?;
        for name in rest {
            current = current.get(name.as_ref())?;
        }
        Some(current)
    }

    /// Accepted languages, most preferred first.
    #[must_use]
    pub fn locale(&self) -> &[String] {
        &self.locale
    }

    /// Replaces the accepted languages.
    pub fn set_locale(&mut self, locale: Vec<String>) {
        self.locale = locale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_creates_nested_objects() {
        let mut args = Arguments::new();
        *args.slot(&["q", "name", "like"]).unwrap() = Value::from("A%");

        assert_eq!(args.lookup(&["q", "name", "like"]), Some(&Value::from("A%")));
        assert!(args.get("q").unwrap().as_object().is_some());
    }

    #[test]
    fn test_slot_replaces_scalar_with_object() {
        let mut args = Arguments::new();
        args.set("opts", 3);
        *args.slot(&["opts", "limit"]).unwrap() = Value::Int(10);

        assert_eq!(args.lookup(&["opts", "limit"]), Some(&Value::Int(10)));
    }

    #[test]
    fn test_empty_slot_path() {
        let mut args = Arguments::new();
        let empty: [&str; 0] = [];
        assert!(args.slot(&empty).is_none());
    }

    #[test]
    fn test_contains_ignores_null() {
        let mut args = Arguments::new();
        args.set("a", Value::Null);
        args.set("b", 1);
        assert!(!args.contains("a"));
        assert!(args.contains("b"));
    }

    #[test]
    fn test_part_items() {
        let part = Value::from(Part::with_total(vec![Value::Int(1)], 10));
        assert_eq!(part.as_items().map(<[Value]>::len), Some(1));
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
