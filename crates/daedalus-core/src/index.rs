//! Index markers locating blocks inside a rendered body.
//!
//! Encoders record where referenced objects start and end in the output so
//! that the assemblage can replace them with the referenced content. The
//! markers travel in-process on the response and over the wire in the
//! `Content-Index` header, e.g. `reference:Author=31-62`.

use std::fmt;
use std::str::FromStr;

/// What an index marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// A named block of the output.
    Block,
    /// An object carrying an `href`, eligible for inlining.
    Reference,
    /// Content spliced in by the assemblage.
    Injected,
}

impl IndexKind {
    /// Lower case name used in headers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Reference => "reference",
            Self::Injected => "injected",
        }
    }
}

impl FromStr for IndexKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Self::Block),
            "reference" => Ok(Self::Reference),
            "injected" => Ok(Self::Injected),
            _ => Err(()),
        }
    }
}

/// A byte range of a rendered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Kind of the marked block.
    pub kind: IndexKind,
    /// Dotted property path of the block from the root model.
    pub name: String,
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
    /// The referenced URI for reference blocks.
    pub reference: Option<String>,
}

impl Index {
    /// Length of the marked range.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}={}-{}",
            self.kind.name(),
            self.name,
            self.start,
            self.end
        )
    }
}

/// Formats indexes for the `Content-Index` header.
#[must_use]
pub fn format_content_index(indexes: &[Index]) -> String {
    indexes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses a `Content-Index` header, skipping malformed entries.
#[must_use]
pub fn parse_content_index(value: &str) -> Vec<Index> {
    value
        .split(',')
        .filter_map(|entry| {
            let (kind, rest) = entry.trim().split_once(':')?;
            let (name, range) = rest.rsplit_once('=')?;
            let (start, end) = range.split_once('-')?;
            Some(Index {
                kind: kind.parse().ok()?,
                name: name.to_string(),
                start: start.parse().ok()?,
                end: end.parse().ok()?,
                reference: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_format_and_parse() {
        let indexes = vec![
            Index {
                kind: IndexKind::Reference,
                name: "Author".into(),
                start: 10,
                end: 42,
                reference: Some("/User/7".into()),
            },
            Index {
                kind: IndexKind::Injected,
                name: "Editor.Boss".into(),
                start: 50,
                end: 60,
                reference: None,
            },
        ];
        let header = format_content_index(&indexes);
        assert_eq!(header, "reference:Author=10-42, injected:Editor.Boss=50-60");

        let parsed = parse_content_index(&header);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Author");
        assert_eq!(parsed[0].len(), 32);
        assert_eq!(parsed[1].kind, IndexKind::Injected);
    }

    #[test]
    fn test_parse_skips_malformed() {
        assert!(parse_content_index("garbage, reference:x=1").is_empty());
    }
}
