//! Gateway records and their compiled form.
//!
//! A [`GatewayRecord`] is the wire form of a gateway, as found in
//! configuration files or served by a gateway listing. [`Gateway`] is the
//! same record with its patterns compiled once, ready for matching.

use std::fmt;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Wire form of a gateway.
///
/// # Example
///
/// ```
/// use daedalus_gateway::GatewayRecord;
///
/// let record: GatewayRecord = serde_json::from_str(
///     r#"{"Pattern": "^/api/(.*)$", "Methods": ["GET"], "Errors": [404], "Navigate": "error/{1}?status=404"}"#,
/// )
/// .unwrap();
/// assert_eq!(record.errors, [404]);
/// assert!(record.headers.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayRecord {
    /// Regex the request path must match; captures feed the templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Regexes over `Name:Value` header lines; each must match a line.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    /// Accepted methods; empty accepts any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    /// Access checks; alternatives of one entry are separated by `|`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    /// Statuses this gateway handles when an error is looked up.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<u16>,
    /// Upstream host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Upstream protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Target template: `*` is the original path, `{n}` the n-th capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate: Option<String>,
    /// `Name:Value` headers put on the forwarded request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub put_headers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordList {
    Wrapped {
        #[serde(rename = "GatewayList")]
        gateways: Vec<GatewayRecord>,
    },
    Plain(Vec<GatewayRecord>),
}

impl GatewayRecord {
    /// Record matching a path pattern.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Sets the accepted methods.
    #[must_use]
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the handled error statuses.
    #[must_use]
    pub fn errors(mut self, errors: impl IntoIterator<Item = u16>) -> Self {
        self.errors = errors.into_iter().collect();
        self
    }

    /// Sets the navigate template.
    #[must_use]
    pub fn navigate(mut self, navigate: impl Into<String>) -> Self {
        self.navigate = Some(navigate.into());
        self
    }

    /// Adds a filter entry.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Adds a header pattern.
    #[must_use]
    pub fn header(mut self, pattern: impl Into<String>) -> Self {
        self.headers.push(pattern.into());
        self
    }

    /// Adds a header put on the forwarded request.
    #[must_use]
    pub fn put_header(mut self, header: impl Into<String>) -> Self {
        self.put_headers.push(header.into());
        self
    }

    /// Sets the upstream host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Parses a JSON gateway list, either a plain array or the
    /// `{"GatewayList": [...]}` listing form.
    pub fn list_from_json(text: &str) -> Result<Vec<Self>, GatewayError> {
        Ok(match serde_json::from_str::<RecordList>(text)? {
            RecordList::Wrapped { gateways } | RecordList::Plain(gateways) => gateways,
        })
    }
}

/// A gateway ready for matching.
#[derive(Debug, Clone)]
pub struct Gateway {
    record: GatewayRecord,
    pattern: Option<Regex>,
    headers: Vec<Regex>,
    methods: Vec<Method>,
    put_headers: Vec<(HeaderName, HeaderValue)>,
}

impl Gateway {
    /// Compiles the patterns of a record.
    ///
    /// Patterns are anchored at the start like the path they match.
    /// Header patterns ignore case since header names do.
    pub fn compile(record: GatewayRecord) -> Result<Self, GatewayError> {
        let pattern = record
            .pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})"))
                    .map_err(|source| GatewayError::invalid_pattern("Pattern", pattern, source))
            })
            .transpose()?;

        let headers = record
            .headers
            .iter()
            .map(|pattern| {
                RegexBuilder::new(&format!("^(?:{pattern})"))
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| GatewayError::invalid_pattern("Headers", pattern, source))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let methods = record
            .methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| GatewayError::InvalidMethod(method.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let put_headers = record
            .put_headers
            .iter()
            .map(|header| {
                let invalid = || GatewayError::InvalidHeader(header.clone());
                let (name, value) = daedalus_core::headers::split_header(header).ok_or_else(invalid)?;
                let name = HeaderName::try_from(name).map_err(|_| invalid())?;
                let value = HeaderValue::try_from(value).map_err(|_| invalid())?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        Ok(Self {
            record,
            pattern,
            headers,
            methods,
            put_headers,
        })
    }

    /// The source record.
    #[must_use]
    pub const fn record(&self) -> &GatewayRecord {
        &self.record
    }

    /// Accepted methods; empty accepts any.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Headers put on the forwarded request.
    #[must_use]
    pub fn put_headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.put_headers
    }

    /// Whether the gateway lists error statuses.
    #[must_use]
    pub fn is_error_gateway(&self) -> bool {
        !self.record.errors.is_empty()
    }

    /// Matches the gateway, returning the path captures.
    ///
    /// Every criterion left out is not checked. With an `error`, only a
    /// gateway listing that status matches; without one, `Errors` is
    /// ignored, so error gateways also serve plain requests unless an
    /// earlier gateway takes them.
    #[must_use]
    pub fn matches(
        &self,
        method: Option<&Method>,
        header_lines: Option<&[String]>,
        uri: Option<&str>,
        error: Option<u16>,
    ) -> Option<Vec<String>> {
        if let Some(method) = method {
            if !self.methods.is_empty() && !self.methods.contains(method) {
                return None;
            }
        }
        if let Some(lines) = header_lines {
            let all = self
                .headers
                .iter()
                .all(|pattern| lines.iter().any(|line| pattern.is_match(line)));
            if !all {
                return None;
            }
        }
        match error {
            Some(status) if !self.record.errors.contains(&status) => return None,
            _ => {}
        }

        let mut groups = Vec::new();
        if let (Some(uri), Some(pattern)) = (uri, &self.pattern) {
            let captures = pattern.captures(uri)?;
            groups.extend(
                captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string())),
            );
        }
        Some(groups)
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record.pattern.as_deref().unwrap_or("*"))?;
        if !self.methods.is_empty() {
            let methods: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
            write!(f, " [{}]", methods.join(", "))?;
        }
        if !self.record.errors.is_empty() {
            write!(f, " errors {:?}", self.record.errors)?;
        }
        Ok(())
    }
}

/// Headers as the `Name:Value` lines gateway header patterns match.
#[must_use]
pub fn header_lines(headers: &HeaderMap) -> Vec<String> {
    headers
        .iter()
        .filter_map(|(name, value)| Some(format!("{}:{}", name.as_str(), value.to_str().ok()?)))
        .collect()
}

/// Fills a template with capture groups.
///
/// `{n}` is the n-th capture, counted from 1. `{{` and `}}` are literal
/// braces.
///
/// # Example
///
/// ```
/// use daedalus_gateway::format_template;
///
/// let groups = vec!["foo".to_string()];
/// assert_eq!(format_template("error/{1}?status=404", &groups).unwrap(), "error/foo?status=404");
/// ```
pub fn format_template(template: &str, groups: &[String]) -> Result<String, GatewayError> {
    let malformed = || GatewayError::MalformedTemplate(template.to_string());
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        _ => return Err(malformed()),
                    }
                }
                let index: usize = digits.parse().map_err(|_| malformed())?;
                let group = index
                    .checked_sub(1)
                    .and_then(|position| groups.get(position))
                    .ok_or_else(|| GatewayError::MissingGroup {
                        template: template.to_string(),
                        index,
                        groups: groups.len(),
                    })?;
                out.push_str(group);
            }
            '}' => return Err(malformed()),
            c => out.push(c),
        }
    }
    Ok(out)
}
