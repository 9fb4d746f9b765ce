//! Gateways granted per authorization.
//!
//! A request carrying an authorization header gets the gateways listed for
//! that authorization by an upstream, searched before the shared ones.
//! Listings are kept while the authorization is in use and dropped once it
//! has been idle for [`AuthorizedSettings::idle_seconds`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use daedalus_core::{Dispatch, Request};
use dashmap::DashMap;
use http::header::ACCEPT;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::record::GatewayRecord;
use crate::repository::GatewayRepository;

/// Placeholder of the authorization in [`AuthorizedSettings::uri`].
pub const AUTHORIZATION_MARKER: &str = "{authorization}";

/// Where the gateways of an authorization are listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizedSettings {
    /// Upstream path of the listing, holding [`AUTHORIZATION_MARKER`].
    pub uri: String,
    /// Header carrying the authorization.
    pub header: String,
    /// Seconds an unused authorization keeps its gateways.
    pub idle_seconds: u64,
}

impl Default for AuthorizedSettings {
    fn default() -> Self {
        Self {
            uri: format!("resources/Security/Login/{AUTHORIZATION_MARKER}/Gateway"),
            header: "Authorization".to_string(),
            idle_seconds: 60,
        }
    }
}

struct Granted {
    repository: Arc<GatewayRepository>,
    last_access: Instant,
}

/// Gateway repositories fetched per authorization.
///
/// A listing answered with 400 means the authorization is not valid;
/// any other failure means the listing is unavailable.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use daedalus_core::{code, Dispatch, Request, Response};
/// use daedalus_gateway::{AuthorizedRepositories, AuthorizedSettings, GatewayError, Repository};
///
/// struct Login;
///
/// impl Dispatch for Login {
///     fn dispatch(&self, request: Request) -> Response {
///         if request.uri != "/resources/Security/Login/t0k/Gateway" {
///             return Response::new(code::PARAMETER_ILLEGAL);
///         }
///         let mut response = Response::new(code::PATH_FOUND);
///         response.body = r#"{"GatewayList": [{"Pattern": "^/admin$"}]}"#.into();
///         response
///     }
/// }
///
/// let authorized = AuthorizedRepositories::new(AuthorizedSettings::default(), Arc::new(Login));
/// let granted = authorized.obtain("t0k").unwrap();
/// assert!(granted.find(None, None, Some("/admin"), None).is_some());
/// assert!(matches!(authorized.obtain("nope"), Err(GatewayError::InvalidAuthorization)));
/// ```
pub struct AuthorizedRepositories {
    settings: AuthorizedSettings,
    upstream: Arc<dyn Dispatch>,
    granted: DashMap<String, Granted>,
    last_purge: Mutex<Instant>,
}

impl AuthorizedRepositories {
    /// Repositories listed by `upstream`.
    #[must_use]
    pub fn new(settings: AuthorizedSettings, upstream: Arc<dyn Dispatch>) -> Self {
        Self {
            settings,
            upstream,
            granted: DashMap::new(),
            last_purge: Mutex::new(Instant::now()),
        }
    }

    /// Header carrying the authorization.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.settings.header
    }

    /// Number of authorizations holding gateways.
    #[must_use]
    pub fn len(&self) -> usize {
        self.granted.len()
    }

    /// Whether no authorization holds gateways.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    fn idle(&self) -> Duration {
        Duration::from_secs(self.settings.idle_seconds)
    }

    /// The gateways of an authorization, fetched on first use.
    pub fn obtain(&self, authorization: &str) -> Result<Arc<GatewayRepository>, GatewayError> {
        self.purge_idle();
        if let Some(mut granted) = self.granted.get_mut(authorization) {
            granted.last_access = Instant::now();
            return Ok(Arc::clone(&granted.repository));
        }

        let repository = Arc::new(self.fetch(authorization)?);
        self.granted.insert(
            authorization.to_string(),
            Granted {
                repository: Arc::clone(&repository),
                last_access: Instant::now(),
            },
        );
        Ok(repository)
    }

    fn fetch(&self, authorization: &str) -> Result<GatewayRepository, GatewayError> {
        let path = self
            .settings
            .uri
            .replace(AUTHORIZATION_MARKER, &urlencoding::encode(authorization));
        let request = Request::get(format!("/{}", path.trim_start_matches('/')))
            .with_header(ACCEPT.as_str(), "application/json");
        let response = self.upstream.dispatch(request);
        if response.status == 400 {
            return Err(GatewayError::InvalidAuthorization);
        }
        if !response.is_success {
            return Err(GatewayError::Listing {
                status: response.status,
                text: response.text.clone().unwrap_or_else(|| response.body_text().into_owned()),
            });
        }
        let records = GatewayRecord::list_from_json(&response.body_text())?;
        tracing::debug!(gateways = records.len(), "Fetched authorized gateways");
        GatewayRepository::new(records)
    }

    /// Drops the gateways of authorizations idle for too long.
    ///
    /// Runs at most once per idle period; [`AuthorizedRepositories::obtain`]
    /// calls it.
    pub fn purge_idle(&self) {
        let idle = self.idle();
        {
            let mut last_purge = self.last_purge.lock();
            if last_purge.elapsed() < idle {
                return;
            }
            *last_purge = Instant::now();
        }
        let before = self.granted.len();
        self.granted.retain(|_, granted| granted.last_access.elapsed() < idle);
        let cleared = before.saturating_sub(self.granted.len());
        if cleared > 0 {
            tracing::debug!(cleared, "Cleared idle authorizations");
        }
    }
}

impl fmt::Debug for AuthorizedRepositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedRepositories")
            .field("settings", &self.settings)
            .field("granted", &self.granted.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use daedalus_core::code::{INTERNAL_ERROR, PARAMETER_ILLEGAL, PATH_FOUND};
    use daedalus_core::Response;

    use super::*;
    use crate::repository::Repository;

    #[derive(Default)]
    struct Listing {
        calls: AtomicUsize,
    }

    impl Dispatch for Listing {
        fn dispatch(&self, request: Request) -> Response {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.uri.as_str() {
                "/resources/Security/Login/Bearer%20a/Gateway" => {
                    let mut response = Response::new(PATH_FOUND);
                    response.body = r#"{"GatewayList": [{"Pattern": "^/admin/(.*)$", "Navigate": "{1}"}]}"#.into();
                    response
                }
                "/resources/Security/Login/broken/Gateway" => Response::new(INTERNAL_ERROR),
                _ => Response::new(PARAMETER_ILLEGAL),
            }
        }
    }

    fn authorized(idle_seconds: u64) -> (AuthorizedRepositories, Arc<Listing>) {
        let listing = Arc::new(Listing::default());
        let settings = AuthorizedSettings {
            idle_seconds,
            ..AuthorizedSettings::default()
        };
        (AuthorizedRepositories::new(settings, listing.clone()), listing)
    }

    #[test]
    fn test_listing_fetched_once() {
        let (authorized, listing) = authorized(60);
        let first = authorized.obtain("Bearer a").unwrap();
        let again = authorized.obtain("Bearer a").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(listing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.find(None, None, Some("/admin/x"), None).unwrap().groups, ["x"]);
    }

    #[test]
    fn test_listing_failures() {
        let (authorized, _) = authorized(60);
        assert!(matches!(authorized.obtain("other"), Err(GatewayError::InvalidAuthorization)));
        assert!(matches!(
            authorized.obtain("broken"),
            Err(GatewayError::Listing { status: 500, .. })
        ));
        assert!(authorized.is_empty());
    }

    #[test]
    fn test_idle_authorizations_are_dropped() {
        let (authorized, listing) = authorized(0);
        authorized.obtain("Bearer a").unwrap();
        authorized.obtain("Bearer a").unwrap();
        assert_eq!(listing.calls.load(Ordering::SeqCst), 2);
        assert_eq!(authorized.len(), 1);
    }
}
