//! Descriptions of what a call accepts, used in `400` explanations.

use std::fmt;

/// Where a definition is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A query parameter.
    Parameter,
    /// A property of the request content.
    Content,
    /// A segment of the request path.
    Path,
}

impl Category {
    /// Lower case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::Content => "content",
            Self::Path => "path",
        }
    }
}

/// One accepted parameter, content property or path value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// Name as the client writes it.
    pub name: String,
    /// Category.
    pub category: Category,
    /// Readable type, e.g. `Int` or `List(Str)`.
    pub ty: String,
    /// The call input the definition feeds.
    pub input: String,
    /// Whether the client may leave it out.
    pub is_optional: bool,
    /// Free text.
    pub description: Option<String>,
    /// Invoker the definition belongs to, once attached.
    pub invoker: Option<String>,
}

impl Definition {
    /// Creates a mandatory definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: Category,
        ty: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            ty: ty.into(),
            input: input.into(),
            is_optional: false,
            description: None,
            invoker: None,
        }
    }

    /// Marks the definition optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.category.name(), self.name, self.ty)?;
        if self.is_optional {
            f.write_str(" (optional)")?;
        }
        if let Some(description) = &self.description {
            write!(f, " - {description}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let definition = Definition::new("limit", Category::Parameter, "Int", "opts")
            .optional()
            .describe("Maximum number of items");
        assert_eq!(
            definition.to_string(),
            "parameter limit: Int (optional) - Maximum number of items"
        );
    }
}
