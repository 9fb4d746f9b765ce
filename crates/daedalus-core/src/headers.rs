//! Header names and value parsing used by the core.

use http::HeaderMap;

/// Overrides the effective method for routing.
pub const X_HTTP_METHOD_OVERRIDE: &str = "x-http-method-override";
/// Assemblage directive listing the references to inline.
pub const X_FILTER: &str = "x-filter";
/// Index markers of a rendered body.
pub const CONTENT_INDEX: &str = "content-index";
/// Correlation id of a request.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Parses a header with quality parameters into values ordered by
/// preference.
///
/// Entries with `q=0` are dropped; ties keep their original order.
///
/// # Example
///
/// ```
/// use daedalus_core::headers::parse_quality_list;
///
/// let values = parse_quality_list("text/html;q=0.5, application/json, text/plain;q=0");
/// assert_eq!(values, ["application/json", "text/html"]);
/// ```
#[must_use]
pub fn parse_quality_list(value: &str) -> Vec<String> {
    let mut entries: Vec<(f32, String)> = Vec::new();
    for item in value.split(',') {
        let mut parts = item.split(';');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            continue;
        }
        let mut quality = 1.0_f32;
        for parameter in parts {
            if let Some((key, raw)) = parameter.split_once('=') {
                if key.trim().eq_ignore_ascii_case("q") {
                    quality = raw.trim().parse().unwrap_or(0.0);
                }
            }
        }
        if quality > 0.0 {
            entries.push((quality, name.to_string()));
        }
    }
    entries.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    entries.into_iter().map(|(_, name)| name).collect()
}

/// Splits a `Name:Value` header line.
#[must_use]
pub fn split_header(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// Returns all values of a header joined by `", "`.
#[must_use]
pub fn joined_values(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_quality_list_keeps_ties_in_order() {
        let values = parse_quality_list("en, fr;q=0.8, de");
        assert_eq!(values, ["en", "de", "fr"]);
    }

    #[test]
    fn test_quality_list_ignores_blanks() {
        assert!(parse_quality_list(" , ").is_empty());
    }

    #[test]
    fn test_split_header() {
        assert_eq!(split_header("X-Zone: eu"), Some(("X-Zone", "eu")));
        assert_eq!(split_header(":x"), None);
        assert_eq!(split_header("novalue"), None);
    }

    #[test]
    fn test_joined_values() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("a"));
        headers.append("accept", HeaderValue::from_static("b"));
        assert_eq!(joined_values(&headers, "accept").as_deref(), Some("a, b"));
        assert_eq!(joined_values(&headers, "allow"), None);
    }
}
