//! Renderers: the output side of encoders.
//!
//! Encoders walk a value and call a [`Render`] with objects, collections
//! and primitive values. A renderer turns these events into bytes and
//! records [`Index`] markers for the blocks specifiers flagged.

use std::fmt;

use daedalus_core::{Index, IndexKind};
use indexmap::IndexMap;

/// Attribute name of hyperlinks.
pub const ATTRIBUTE_HREF: &str = "href";
/// Attribute name of collection totals.
pub const ATTRIBUTE_TOTAL: &str = "total";

/// Rendering decorations of one object or collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specs {
    /// Attributes rendered ahead of the content, in order.
    pub attributes: IndexMap<String, String>,
    /// Marks the block for indexing.
    pub index: Option<IndexKind>,
    /// The URI the block refers to.
    pub reference: Option<String>,
}

impl Specs {
    /// Empty specs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Receives the structure of an encoded value.
pub trait Render {
    /// Opens an object.
    fn begin_object(&mut self, name: &str, specs: &Specs);

    /// Closes the last opened object.
    fn end_object(&mut self);

    /// Opens a collection.
    fn begin_collection(&mut self, name: &str, specs: &Specs);

    /// Closes the last opened collection.
    fn end_collection(&mut self);

    /// Emits a primitive value already converted to text.
    fn value(&mut self, name: &str, text: &str);
}

/// A rendered body with its markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// The bytes.
    pub body: Vec<u8>,
    /// Markers of indexed blocks.
    pub indexes: Vec<Index>,
}

/// A renderer that can be finished.
pub trait Output: Render {
    /// The output as a plain render target.
    fn as_render(&mut self) -> &mut dyn Render;

    /// Completes rendering.
    fn finish(self: Box<Self>) -> Rendered;
}

/// A content type and the renderers producing it.
pub trait Renderer: Send + Sync + fmt::Debug {
    /// MIME type produced, without parameters.
    fn content_type(&self) -> &'static str;

    /// Path extension selecting this renderer, without the dot.
    fn extension(&self) -> &'static str;

    /// Creates a fresh output.
    fn create(&self) -> Box<dyn Output>;
}

/// The JSON renderer.
///
/// Every primitive renders as a JSON string, so that the text form of a
/// value is the one the converter produces. A root collection is wrapped
/// in an object carrying its attributes.
///
/// ```
/// use daedalus_codec::{JsonRenderer, Renderer, Specs};
///
/// let mut out = JsonRenderer.create();
/// out.begin_object("User", &Specs::new().attribute("href", "/User/1"));
/// out.value("Id", "1");
/// out.end_object();
/// let rendered = out.finish();
/// assert_eq!(rendered.body, br#"{"href":"/User/1","Id":"1"}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn create(&self) -> Box<dyn Output> {
        Box::new(JsonOutput::default())
    }
}

#[derive(Debug)]
struct Frame {
    is_array: bool,
    wraps_root: bool,
    has_entries: bool,
    name: Option<String>,
    marker: Option<Marker>,
}

#[derive(Debug)]
struct Marker {
    kind: IndexKind,
    name: String,
    start: usize,
    reference: Option<String>,
}

#[derive(Debug, Default)]
struct JsonOutput {
    buffer: String,
    frames: Vec<Frame>,
    indexes: Vec<Index>,
}

impl JsonOutput {
    fn quoted(&mut self, text: &str) {
        match serde_json::to_string(text) {
            Ok(quoted) => self.buffer.push_str(&quoted),
            Err(_) => {
                self.buffer.push('"');
                self.buffer.push('"');
            }
        }
    }

    /// Writes the separator and, inside objects, the key of a new entry.
    fn entry(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            let is_array = frame.is_array;
            if std::mem::replace(&mut frame.has_entries, true) {
                self.buffer.push(',');
            }
            if !is_array {
                self.quoted(name);
                self.buffer.push(':');
            }
        }
    }

    fn attributes(&mut self, specs: &Specs) {
        for (key, value) in &specs.attributes {
            self.entry(key);
            self.quoted(value);
        }
    }

    /// Name part of a child block: objects nested in objects only.
    fn name_part(&self, name: &str) -> Option<String> {
        match self.frames.last() {
            Some(parent) if !parent.is_array => Some(name.to_string()),
            _ => None,
        }
    }

    fn path_name(&self, own: Option<&str>) -> String {
        self.frames
            .iter()
            .filter_map(|frame| frame.name.as_deref())
            .chain(own)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl Render for JsonOutput {
    fn begin_object(&mut self, name: &str, specs: &Specs) {
        let is_root = self.frames.is_empty();
        let name_part = if is_root { None } else { self.name_part(name) };
        self.entry(name);

        let marker = match specs.index {
            Some(kind) if !is_root => {
                let path = self.path_name(name_part.as_deref());
                (!path.is_empty()).then(|| Marker {
                    kind,
                    name: path,
                    start: self.buffer.len(),
                    reference: specs.reference.clone(),
                })
            }
            _ => None,
        };

        self.buffer.push('{');
        self.frames.push(Frame {
            is_array: false,
            wraps_root: false,
            has_entries: false,
            name: name_part,
            marker,
        });
        self.attributes(specs);
    }

    fn end_object(&mut self) {
        self.buffer.push('}');
        if let Some(frame) = self.frames.pop() {
            if let Some(marker) = frame.marker {
                self.indexes.push(Index {
                    kind: marker.kind,
                    name: marker.name,
                    start: marker.start,
                    end: self.buffer.len(),
                    reference: marker.reference,
                });
            }
        }
    }

    fn begin_collection(&mut self, name: &str, specs: &Specs) {
        let wraps_root = self.frames.is_empty();
        if wraps_root {
            self.buffer.push('{');
            self.frames.push(Frame {
                is_array: false,
                wraps_root: true,
                has_entries: false,
                name: None,
                marker: None,
            });
            self.attributes(specs);
        }
        self.entry(name);
        self.buffer.push('[');
        self.frames.push(Frame {
            is_array: true,
            wraps_root: false,
            has_entries: false,
            name: None,
            marker: None,
        });
    }

    fn end_collection(&mut self) {
        self.buffer.push(']');
        self.frames.pop();
        if self.frames.last().is_some_and(|frame| frame.wraps_root) {
            self.buffer.push('}');
            self.frames.pop();
        }
    }

    fn value(&mut self, name: &str, text: &str) {
        if self.frames.is_empty() {
            // A lone primitive at the root is wrapped like a collection.
            self.buffer.push('{');
            self.quoted(name);
            self.buffer.push(':');
            self.quoted(text);
            self.buffer.push('}');
            return;
        }
        self.entry(name);
        self.quoted(text);
    }
}

impl Output for JsonOutput {
    fn as_render(&mut self) -> &mut dyn Render {
        self
    }

    fn finish(self: Box<Self>) -> Rendered {
        let this = *self;
        Rendered {
            body: this.buffer.into_bytes(),
            indexes: this.indexes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(href: &str) -> Specs {
        Specs {
            attributes: IndexMap::from([(ATTRIBUTE_HREF.to_string(), href.to_string())]),
            index: Some(IndexKind::Reference),
            reference: Some(href.to_string()),
        }
    }

    #[test]
    fn test_root_collection_is_wrapped() {
        let mut out = JsonRenderer.create();
        out.begin_collection("UserList", &Specs::new().attribute(ATTRIBUTE_TOTAL, "2"));
        out.begin_object("User", &Specs::new());
        out.value("Id", "1");
        out.end_object();
        out.begin_object("User", &Specs::new());
        out.value("Id", "2");
        out.end_object();
        out.end_collection();
        let rendered = out.finish();

        let body = String::from_utf8(rendered.body).unwrap();
        assert_eq!(body, r#"{"total":"2","UserList":[{"Id":"1"},{"Id":"2"}]}"#);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["UserList"][1]["Id"], "2");
    }

    #[test]
    fn test_nested_reference_is_indexed() {
        let mut out = JsonRenderer.create();
        out.begin_object("Article", &reference("/Article/7"));
        out.value("Id", "7");
        out.begin_object("Author", &reference("/User/3"));
        out.end_object();
        out.end_object();
        let rendered = out.finish();

        let body = String::from_utf8(rendered.body).unwrap();
        assert_eq!(
            body,
            r#"{"href":"/Article/7","Id":"7","Author":{"href":"/User/3"}}"#
        );
        assert_eq!(rendered.indexes.len(), 1);
        let index = &rendered.indexes[0];
        assert_eq!(index.name, "Author");
        assert_eq!(&body[index.start..index.end], r#"{"href":"/User/3"}"#);
        assert_eq!(index.reference.as_deref(), Some("/User/3"));
    }

    #[test]
    fn test_items_do_not_extend_index_names() {
        let mut out = JsonRenderer.create();
        out.begin_collection("ArticleList", &Specs::new());
        out.begin_object("Article", &reference("/Article/1"));
        out.begin_object("Author", &reference("/User/3"));
        out.end_object();
        out.end_object();
        out.end_collection();
        let rendered = out.finish();

        let names: Vec<_> = rendered.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Author"]);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut out = JsonRenderer.create();
        out.begin_object("User", &Specs::new());
        out.value("Name", "say \"hi\"");
        out.end_object();
        let body = out.finish().body;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["Name"], "say \"hi\"");
    }
}
