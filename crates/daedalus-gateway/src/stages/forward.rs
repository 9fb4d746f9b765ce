//! Error placement and forwarding to the upstream.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use daedalus_core::code::BAD_GATEWAY;
use daedalus_core::{parse_query, Dispatch, Request, Response};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_server::context::{fail, has_failed};
use http::header::ALLOW;
use http::Method;

use crate::context::{ALLOWS, MATCH, REPOSITORY, REQUEST, RESPONSE};
use crate::error::GatewayError;
use crate::record::{format_template, Gateway};
use crate::repository::Match;

/// Parameter carrying the status served by an error gateway.
pub const PARAMETER_STATUS: &str = "status";
/// Parameter carrying one allowed method on a 405.
pub const PARAMETER_ALLOW: &str = "allow";

/// Appends the error parameters for an error gateway, skipping pairs
/// already present.
pub fn place_error(parameters: &mut Vec<(String, String)>, status: u16, allows: &[Method]) {
    let mut push = |name: &str, value: String| {
        if !parameters.iter().any(|(n, v)| n == name && *v == value) {
            parameters.push((name.to_string(), value));
        }
    };
    push(PARAMETER_STATUS, status.to_string());
    if status == 405 {
        for method in allows {
            push(PARAMETER_ALLOW, method.to_string());
        }
    }
}

/// Tells the error gateway which error it serves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPlacement;

impl Handler for ErrorPlacement {
    fn name(&self) -> &'static str {
        "error_placement"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .optional(&MATCH)
            .optional(&ALLOWS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        if !has_failed(ctx) || !ctx.contains(&MATCH) {
            return Ok(());
        }
        let status = ctx.get(&RESPONSE)?.status;
        let allows = ctx.find(&ALLOWS).cloned().unwrap_or_default();
        place_error(&mut ctx.get_mut(&REQUEST)?.parameters, status, &allows);
        Ok(())
    }
}

/// The request sent upstream for a match.
///
/// With a navigate template the path becomes the template filled with the
/// captures, `*` standing for the original path. The template query comes
/// first, then the caller's parameters not already in it. `PutHeaders`
/// replace request headers of the same name.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use daedalus_core::Request;
/// use daedalus_gateway::{rewrite, Gateway, GatewayRecord, Match};
///
/// let gateway = Gateway::compile(GatewayRecord::new("^/api/(.*)$").navigate("error/{1}?status=404")).unwrap();
/// let matched = Match { gateway: Arc::new(gateway), groups: vec!["foo".into()] };
///
/// let forwarded = rewrite(&Request::get("/api/foo?lang=en"), &matched).unwrap();
/// assert_eq!(forwarded.target(), "/error/foo?status=404&lang=en");
/// ```
pub fn rewrite(request: &Request, matched: &Match) -> Result<Request, GatewayError> {
    let mut forwarded = request.clone();
    let record = matched.gateway.record();
    if let Some(navigate) = &record.navigate {
        let path = request
            .uri
            .trim_start_matches('/')
            .replace('{', "{{")
            .replace('}', "}}");
        let target = format_template(&navigate.replace('*', &path), &matched.groups)?;
        let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
        forwarded.uri = format!("/{}", path.trim_start_matches('/'));
        forwarded.parameters = parse_query(query);
        for parameter in &request.parameters {
            if !forwarded.parameters.contains(parameter) {
                forwarded.parameters.push(parameter.clone());
            }
        }
    }
    for (name, value) in matched.gateway.put_headers() {
        forwarded.headers.insert(name.clone(), value.clone());
    }
    Ok(forwarded)
}

/// Where forwarded requests go.
///
/// Gateways without a `Host` use the default upstream; the others use the
/// upstream registered for their host.
#[derive(Clone)]
pub struct Upstreams {
    default: Arc<dyn Dispatch>,
    hosts: HashMap<String, Arc<dyn Dispatch>>,
}

impl Upstreams {
    /// Upstreams with a default.
    #[must_use]
    pub fn new(default: Arc<dyn Dispatch>) -> Self {
        Self {
            default,
            hosts: HashMap::new(),
        }
    }

    /// Registers the upstream of a host.
    #[must_use]
    pub fn host(mut self, host: impl AsRef<str>, upstream: Arc<dyn Dispatch>) -> Self {
        self.hosts.insert(host.as_ref().to_ascii_lowercase(), upstream);
        self
    }

    /// The upstream of a gateway.
    #[must_use]
    pub fn resolve(&self, gateway: &Gateway) -> Option<&Arc<dyn Dispatch>> {
        match gateway.record().host.as_deref() {
            None => Some(&self.default),
            Some(host) => self.hosts.get(&host.to_ascii_lowercase()),
        }
    }
}

impl fmt::Debug for Upstreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upstreams")
            .field("hosts", &self.hosts.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Sends the request through the selected gateway.
///
/// The upstream answer becomes the response and ends the chain. When the
/// upstream answers an error that an error gateway serves, the request is
/// sent once more through that gateway.
#[derive(Debug, Clone)]
pub struct Forward {
    upstreams: Upstreams,
}

impl Forward {
    /// Creates the stage.
    #[must_use]
    pub fn new(upstreams: Upstreams) -> Self {
        Self { upstreams }
    }

    fn send(&self, request: &Request, matched: &Match) -> Result<Option<Response>, GatewayError> {
        let Some(upstream) = self.upstreams.resolve(&matched.gateway) else {
            return Ok(None);
        };
        let forwarded = rewrite(request, matched)?;
        tracing::debug!(
            gateway = %matched.gateway,
            host = matched.gateway.record().host.as_deref(),
            protocol = matched.gateway.record().protocol.as_deref(),
            target = %forwarded.target(),
            "Forwarding"
        );
        Ok(Some(upstream.dispatch(forwarded)))
    }
}

impl Handler for Forward {
    fn name(&self) -> &'static str {
        "forward"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .requires(&REPOSITORY)
            .optional(&MATCH)
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(matched) = ctx.find(&MATCH).cloned() else {
            return Ok(());
        };
        let mut request = ctx.get(&REQUEST)?.clone();
        let Some(mut response) = self.send(&request, &matched)? else {
            let host = matched.gateway.record().host.clone().unwrap_or_default();
            fail(ctx, BAD_GATEWAY, format!("No upstream for host '{host}'"))?;
            return Ok(());
        };

        if !response.is_success && !matched.gateway.is_error_gateway() {
            let repository = Arc::clone(ctx.get(&REPOSITORY)?);
            let found = repository.find(
                Some(&request.method),
                Some(&request.headers),
                Some(&request.uri),
                Some(response.status),
            );
            if let Some(found) = found {
                tracing::debug!(status = response.status, gateway = %found.gateway, "Upstream error redirected");
                let allows: Vec<Method> = response
                    .header(ALLOW.as_str())
                    .map(|allow| allow.split(',').filter_map(|m| m.trim().parse().ok()).collect())
                    .unwrap_or_default();
                place_error(&mut request.parameters, response.status, &allows);
                if let Some(redirected) = self.send(&request, &found)? {
                    response = redirected;
                }
            }
        }

        *ctx.get_mut(&RESPONSE)? = response;
        chain.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayRecord;

    fn matched(record: GatewayRecord, groups: &[&str]) -> Match {
        Match {
            gateway: Arc::new(Gateway::compile(record).unwrap()),
            groups: groups.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_place_error() {
        let mut parameters = vec![("status".to_string(), "404".to_string())];
        place_error(&mut parameters, 404, &[]);
        assert_eq!(parameters.len(), 1);

        let mut parameters = Vec::new();
        place_error(&mut parameters, 405, &[Method::GET, Method::PUT]);
        assert_eq!(
            parameters,
            [
                ("status".to_string(), "405".to_string()),
                ("allow".to_string(), "GET".to_string()),
                ("allow".to_string(), "PUT".to_string()),
            ]
        );
    }

    #[test]
    fn test_rewrite_star_and_headers() {
        let matched = matched(
            GatewayRecord::new("^/(.*)$")
                .navigate("v2/*")
                .put_header("Authorization: Basic abc"),
            &["User/1"],
        );
        let request = Request::get("/User/1").with_header("authorization", "Bearer x");
        let forwarded = rewrite(&request, &matched).unwrap();
        assert_eq!(forwarded.uri, "/v2/User/1");
        assert_eq!(forwarded.header("authorization"), Some("Basic abc"));
    }

    #[test]
    fn test_rewrite_captures_are_not_rescanned() {
        let starred = matched(GatewayRecord::new("^/api/(.*)$").navigate("x/{1}"), &["a*b"]);
        assert_eq!(rewrite(&Request::get("/api/a*b"), &starred).unwrap().uri, "/x/a*b");

        let braced = matched(GatewayRecord::new("^/api/(.*)$").navigate("v1/*/{1}"), &["{1}"]);
        assert_eq!(rewrite(&Request::get("/api/{1}"), &braced).unwrap().uri, "/v1/api/{1}/{1}");
    }

    #[test]
    fn test_rewrite_without_navigate_keeps_target() {
        let matched = matched(GatewayRecord::new("^/User"), &[]);
        let request = Request::get("/User?limit=1");
        assert_eq!(rewrite(&request, &matched).unwrap().target(), "/User?limit=1");
    }

    #[test]
    fn test_rewrite_missing_group() {
        let matched = matched(GatewayRecord::new("^/api/").navigate("{2}"), &[]);
        assert!(matches!(
            rewrite(&Request::get("/api/x"), &matched),
            Err(GatewayError::MissingGroup { index: 2, groups: 0, .. })
        ));
    }

    #[test]
    fn test_upstreams_by_host() {
        struct Fixed(u16);
        impl Dispatch for Fixed {
            fn dispatch(&self, _request: Request) -> Response {
                let mut response = Response::new(daedalus_core::code::PATH_FOUND);
                response.status = self.0;
                response
            }
        }

        let upstreams = Upstreams::new(Arc::new(Fixed(200))).host("Auth.Local", Arc::new(Fixed(401)));
        let plain = Gateway::compile(GatewayRecord::new("^/")).unwrap();
        let auth = Gateway::compile(GatewayRecord::new("^/").host("auth.local")).unwrap();
        let unknown = Gateway::compile(GatewayRecord::new("^/").host("nowhere")).unwrap();

        let status = |gateway: &Gateway| upstreams.resolve(gateway).map(|u| u.dispatch(Request::get("/")).status);
        assert_eq!(status(&plain), Some(200));
        assert_eq!(status(&auth), Some(401));
        assert_eq!(status(&unknown), None);
    }
}
