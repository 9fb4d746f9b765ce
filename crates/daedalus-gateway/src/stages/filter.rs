//! Access filters of the selected gateway.

use std::fmt;
use std::sync::Arc;

use daedalus_core::code::FORBIDDEN_ACCESS;
use daedalus_core::{Dispatch, Request};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_server::context::fail;
use http::header::ACCEPT;

use crate::context::{FILTER_CACHE, MATCH, REPOSITORY, REQUEST, RESPONSE};
use crate::record::format_template;
use crate::repository::Cache;

/// Checks the filters of the selected gateway.
///
/// Every filter entry must allow the request; an entry allows it when
/// any of its `|` separated alternatives does. An alternative is filled
/// with the path captures and fetched with `GET`; it allows the request
/// when it answers `true` or `{"HasAccess": "True"}`. A denial answers
/// 403, through the error gateway for 403 when there is one.
pub struct Filter {
    checker: Arc<dyn Dispatch>,
    cache: bool,
}

impl Filter {
    /// Creates the stage; `checker` answers the filter requests.
    #[must_use]
    pub fn new(checker: Arc<dyn Dispatch>, cache: bool) -> Self {
        Self { checker, cache }
    }

    fn allows(&self, uri: &str, cache: Option<&Cache>) -> bool {
        if let Some(allowed) = cache.and_then(|cache| cache.get(uri).map(|entry| *entry)) {
            return allowed;
        }
        let response = self
            .checker
            .dispatch(Request::get(uri).with_header(ACCEPT.as_str(), "application/json"));
        let allowed = response.is_success && response.json().is_ok_and(|json| has_access(&json));
        tracing::debug!(filter = uri, status = response.status, allowed, "Filter checked");
        if let Some(cache) = cache {
            cache.insert(uri.to_string(), allowed);
        }
        allowed
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("cache", &self.cache).finish_non_exhaustive()
    }
}

/// Whether a filter answer grants access.
#[must_use]
pub fn has_access(answer: &serde_json::Value) -> bool {
    match answer {
        serde_json::Value::Bool(allowed) => *allowed,
        serde_json::Value::Object(object) => match object.get("HasAccess") {
            Some(serde_json::Value::Bool(allowed)) => *allowed,
            Some(serde_json::Value::String(text)) => text.eq_ignore_ascii_case("true"),
            _ => false,
        },
        _ => false,
    }
}

impl Handler for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .requires(&REPOSITORY)
            .optional(&MATCH)
            .defines_if(&MATCH)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(matched) = ctx.find(&MATCH).cloned() else {
            return Ok(());
        };
        let filters = &matched.gateway.record().filters;
        if filters.is_empty() {
            return Ok(());
        }
        let repository = Arc::clone(ctx.get(&REPOSITORY)?);
        let cache = self.cache.then(|| repository.obtain_cache(FILTER_CACHE));

        for entry in filters {
            let mut allowed = false;
            for alternative in entry.split('|') {
                let uri = format_template(alternative.trim(), &matched.groups)?;
                if self.allows(&uri, cache.as_deref()) {
                    allowed = true;
                    break;
                }
            }
            if allowed {
                continue;
            }

            fail(ctx, FORBIDDEN_ACCESS, "Access denied")?;
            ctx.take(&MATCH);
            let request = ctx.get(&REQUEST)?;
            let status = FORBIDDEN_ACCESS.status();
            let found = repository.find(Some(&request.method), Some(&request.headers), Some(&request.uri), Some(status));
            tracing::debug!(filter = %entry, error_gateway = found.is_some(), "Access denied");
            if let Some(found) = found {
                ctx.set(&MATCH, found);
            }
            return Ok(());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_access() {
        assert!(has_access(&json!(true)));
        assert!(has_access(&json!({"HasAccess": "True"})));
        assert!(has_access(&json!({"HasAccess": true})));
        assert!(!has_access(&json!({"HasAccess": "False"})));
        assert!(!has_access(&json!({"Other": "True"})));
        assert!(!has_access(&json!("True")));
    }
}
