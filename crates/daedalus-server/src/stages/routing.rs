//! Path matching and content negotiation.

use std::sync::Arc;

use daedalus_codec::Renderer;
use daedalus_core::code::{ENCODING_UNKNOWN, PATH_NOT_FOUND};
use daedalus_core::headers::{joined_values, parse_quality_list};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::ResourceTree;
use http::header::{ACCEPT, ACCEPT_CHARSET, ACCEPT_LANGUAGE};

use crate::context::{fail, has_failed, LOCALE, PATH, RENDERER, REQUEST, RESPONSE};

/// Matches the request path against the resource tree.
#[derive(Debug, Clone)]
pub struct UriMatch {
    tree: Arc<ResourceTree>,
}

impl UriMatch {
    /// Creates the stage.
    #[must_use]
    pub fn new(tree: Arc<ResourceTree>) -> Self {
        Self { tree }
    }
}

impl Handler for UriMatch {
    fn name(&self) -> &'static str {
        "uri"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .defines_if(&PATH)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        if has_failed(ctx) {
            return Ok(());
        }
        match self.tree.match_uri(&ctx.get(&REQUEST)?.uri) {
            Ok(path) => {
                tracing::trace!(node = %self.tree.path(path.node), "Path matched");
                ctx.set(&PATH, path);
            }
            Err(error) => {
                let suggestions = error.suggestions().to_vec();
                let report = fail(ctx, PATH_NOT_FOUND, error.to_string())?;
                if !suggestions.is_empty() {
                    report.add_message(format!("Try {}", suggestions.join(", ")));
                }
            }
        }
        Ok(())
    }
}

/// Chooses the renderer and reads the preferred languages.
///
/// A path extension selects the renderer of that extension. Otherwise the
/// `Accept` header is walked in quality order; without one the default
/// content type is used.
#[derive(Debug, Clone)]
pub struct Negotiation {
    renderers: Vec<Arc<dyn Renderer>>,
    default_content_type: String,
    charset: String,
}

impl Negotiation {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        renderers: Vec<Arc<dyn Renderer>>,
        default_content_type: impl Into<String>,
        charset: impl Into<String>,
    ) -> Self {
        Self {
            renderers,
            default_content_type: default_content_type.into(),
            charset: charset.into(),
        }
    }

    fn by_extension(&self, extension: &str) -> Option<&Arc<dyn Renderer>> {
        self.renderers
            .iter()
            .find(|renderer| renderer.extension().eq_ignore_ascii_case(extension))
    }

    fn by_media(&self, media: &str) -> Option<&Arc<dyn Renderer>> {
        self.renderers.iter().find(|renderer| accepts(media, renderer.content_type()))
    }

    fn choose(&self, extension: Option<&str>, accept: Option<&str>) -> Result<&Arc<dyn Renderer>, String> {
        if let Some(extension) = extension {
            return self
                .by_extension(extension)
                .ok_or_else(|| format!("Unknown extension '.{extension}'"));
        }
        let Some(accept) = accept else {
            return self
                .by_media(&self.default_content_type)
                .or_else(|| self.renderers.first())
                .ok_or_else(|| "No renderer is configured".to_string());
        };
        let preferred = parse_quality_list(accept);
        preferred
            .iter()
            .find_map(|media| self.by_media(media))
            .ok_or_else(|| format!("None of '{accept}' can be produced"))
    }

    fn charset_accepted(&self, accept_charset: Option<&str>) -> bool {
        accept_charset.map_or(true, |value| {
            parse_quality_list(value)
                .iter()
                .any(|charset| charset == "*" || charset.eq_ignore_ascii_case(&self.charset))
        })
    }
}

/// Whether a media range of `Accept` covers a content type.
fn accepts(media: &str, content_type: &str) -> bool {
    if media == "*/*" || media.eq_ignore_ascii_case(content_type) {
        return true;
    }
    match (media.split_once('/'), content_type.split_once('/')) {
        (Some((kind, "*")), Some((produced, _))) => kind.eq_ignore_ascii_case(produced),
        _ => false,
    }
}

impl Handler for Negotiation {
    fn name(&self) -> &'static str {
        "negotiation"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .optional(&PATH)
            .defines(&LOCALE)
            .defines_if(&RENDERER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let request = ctx.get(&REQUEST)?;
        let locale = joined_values(&request.headers, ACCEPT_LANGUAGE.as_str())
            .map(|value| parse_quality_list(&value))
            .unwrap_or_default();
        let accept = joined_values(&request.headers, ACCEPT.as_str());
        let accept_charset = joined_values(&request.headers, ACCEPT_CHARSET.as_str());
        ctx.set(&LOCALE, locale);
        if has_failed(ctx) {
            return Ok(());
        }

        let extension = ctx.find(&PATH).and_then(|path| path.extension.clone());
        if !self.charset_accepted(accept_charset.as_deref()) {
            fail(ctx, ENCODING_UNKNOWN, format!("Charset {} is not accepted", self.charset))?;
            return Ok(());
        }
        match self.choose(extension.as_deref(), accept.as_deref()) {
            Ok(renderer) => {
                tracing::trace!(content_type = renderer.content_type(), "Renderer chosen");
                ctx.set(&RENDERER, Arc::clone(renderer));
            }
            Err(message) => {
                let available: Vec<&str> = self.renderers.iter().map(|r| r.content_type()).collect();
                fail(ctx, ENCODING_UNKNOWN, message)?
                    .add_message(format!("Available: {}", available.join(", ")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_codec::JsonRenderer;

    fn negotiation() -> Negotiation {
        Negotiation::new(vec![Arc::new(JsonRenderer)], "application/json", "UTF-8")
    }

    #[test]
    fn test_accepts_ranges() {
        assert!(accepts("*/*", "application/json"));
        assert!(accepts("application/*", "application/json"));
        assert!(accepts("Application/JSON", "application/json"));
        assert!(!accepts("text/*", "application/json"));
        assert!(!accepts("text/html", "application/json"));
    }

    #[test]
    fn test_choose_renderer() {
        let negotiation = negotiation();
        assert!(negotiation.choose(None, None).is_ok());
        assert!(negotiation.choose(Some("JSON"), None).is_ok());
        assert!(negotiation.choose(Some("xml"), None).is_err());
        assert!(negotiation.choose(None, Some("text/html;q=0.9, */*;q=0.1")).is_ok());
        assert!(negotiation.choose(None, Some("text/html")).is_err());
        assert!(negotiation.choose(None, Some("application/json;q=0")).is_err());
    }

    #[test]
    fn test_charset() {
        let negotiation = negotiation();
        assert!(negotiation.charset_accepted(None));
        assert!(negotiation.charset_accepted(Some("utf-8")));
        assert!(negotiation.charset_accepted(Some("iso-8859-1, *;q=0.1")));
        assert!(!negotiation.charset_accepted(Some("iso-8859-1")));
    }
}
