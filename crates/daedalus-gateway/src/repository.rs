//! Searchable sets of gateways.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use http::{HeaderMap, Method};
use parking_lot::RwLock;

use crate::error::GatewayError;
use crate::record::{header_lines, Gateway, GatewayRecord};

/// Per-repository cache of boolean answers, keyed by text.
pub type Cache = DashMap<String, bool>;

/// A matched gateway with the captures of the request path.
#[derive(Debug, Clone)]
pub struct Match {
    /// The gateway.
    pub gateway: Arc<Gateway>,
    /// Path captures, in pattern order.
    pub groups: Vec<String>,
}

/// A searchable set of gateways.
pub trait Repository: Send + Sync {
    /// First gateway matching the request.
    ///
    /// Criteria left out are not checked. With an `error`, only gateways
    /// handling that status are considered; without one, every gateway is,
    /// so error gateways belong after the gateways they back.
    fn find(
        &self,
        method: Option<&Method>,
        headers: Option<&HeaderMap>,
        uri: Option<&str>,
        error: Option<u16>,
    ) -> Option<Match>;

    /// Methods of the gateways matching headers and path, sorted.
    fn allows_for(&self, headers: Option<&HeaderMap>, uri: Option<&str>) -> Vec<Method>;

    /// A cache living as long as the repository.
    fn obtain_cache(&self, identifier: &str) -> Arc<Cache>;
}

/// Gateways matched in declaration order.
///
/// # Example
///
/// ```
/// use daedalus_gateway::{GatewayRecord, GatewayRepository, Repository};
/// use http::Method;
///
/// let repository = GatewayRepository::new(vec![
///     GatewayRecord::new("^/api/(.*)$").methods(["GET"]).navigate("{1}"),
/// ])
/// .unwrap();
///
/// let matched = repository.find(Some(&Method::GET), None, Some("/api/User"), None).unwrap();
/// assert_eq!(matched.groups, ["User"]);
/// assert_eq!(repository.allows_for(None, Some("/api/User")), [Method::GET]);
/// ```
#[derive(Default)]
pub struct GatewayRepository {
    gateways: Vec<Arc<Gateway>>,
    caches: DashMap<String, Arc<Cache>>,
}

impl GatewayRepository {
    /// Compiles the records; the first invalid one fails the load.
    pub fn new(records: Vec<GatewayRecord>) -> Result<Self, GatewayError> {
        let gateways = records
            .into_iter()
            .map(|record| Gateway::compile(record).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(gateways = gateways.len(), "Loaded gateway repository");
        Ok(Self {
            gateways,
            caches: DashMap::new(),
        })
    }

    /// The gateways in matching order.
    #[must_use]
    pub fn gateways(&self) -> &[Arc<Gateway>] {
        &self.gateways
    }

    /// Number of gateways.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    /// Whether there is no gateway.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

impl Repository for GatewayRepository {
    fn find(
        &self,
        method: Option<&Method>,
        headers: Option<&HeaderMap>,
        uri: Option<&str>,
        error: Option<u16>,
    ) -> Option<Match> {
        let lines = headers.map(header_lines);
        self.gateways.iter().find_map(|gateway| {
            let groups = gateway.matches(method, lines.as_deref(), uri, error)?;
            tracing::trace!(gateway = %gateway, ?groups, "Gateway matched");
            Some(Match {
                gateway: Arc::clone(gateway),
                groups,
            })
        })
    }

    fn allows_for(&self, headers: Option<&HeaderMap>, uri: Option<&str>) -> Vec<Method> {
        let lines = headers.map(header_lines);
        let mut allowed = Vec::new();
        for gateway in &self.gateways {
            if gateway.matches(None, lines.as_deref(), uri, None).is_some() {
                allowed.extend(gateway.methods().iter().cloned());
            }
        }
        sorted(allowed)
    }

    fn obtain_cache(&self, identifier: &str) -> Arc<Cache> {
        Arc::clone(
            self.caches
                .entry(identifier.to_string())
                .or_insert_with(|| Arc::new(Cache::new()))
                .value(),
        )
    }
}

impl fmt::Debug for GatewayRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRepository")
            .field("gateways", &self.gateways.len())
            .field("caches", &self.caches.len())
            .finish()
    }
}

fn sorted(mut methods: Vec<Method>) -> Vec<Method> {
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods.dedup();
    methods
}

/// Repositories searched in priority order.
///
/// The first repository that finds a gateway wins. Caches are held by
/// the main repository.
pub struct JoinedRepository {
    main: Arc<dyn Repository>,
    others: Vec<Arc<dyn Repository>>,
}

impl JoinedRepository {
    /// Starts the chain with its main repository.
    #[must_use]
    pub fn new(main: Arc<dyn Repository>) -> Self {
        Self {
            main,
            others: Vec::new(),
        }
    }

    /// Appends a repository of lower priority.
    #[must_use]
    pub fn join(mut self, repository: Arc<dyn Repository>) -> Self {
        self.others.push(repository);
        self
    }

    fn all(&self) -> impl Iterator<Item = &Arc<dyn Repository>> {
        std::iter::once(&self.main).chain(self.others.iter())
    }
}

impl Repository for JoinedRepository {
    fn find(
        &self,
        method: Option<&Method>,
        headers: Option<&HeaderMap>,
        uri: Option<&str>,
        error: Option<u16>,
    ) -> Option<Match> {
        self.all()
            .find_map(|repository| repository.find(method, headers, uri, error))
    }

    fn allows_for(&self, headers: Option<&HeaderMap>, uri: Option<&str>) -> Vec<Method> {
        sorted(
            self.all()
                .flat_map(|repository| repository.allows_for(headers, uri))
                .collect(),
        )
    }

    fn obtain_cache(&self, identifier: &str) -> Arc<Cache> {
        self.main.obtain_cache(identifier)
    }
}

impl fmt::Debug for JoinedRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinedRepository")
            .field("repositories", &(self.others.len() + 1))
            .finish()
    }
}

/// A repository that can be replaced while requests are served.
///
/// Each request works on the [`SharedRepository::current`] snapshot; a
/// [`SharedRepository::replace`] only affects requests started later.
/// Caches belong to the snapshot and go away with it.
pub struct SharedRepository {
    current: RwLock<Arc<dyn Repository>>,
}

impl SharedRepository {
    /// Wraps an initial repository.
    #[must_use]
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            current: RwLock::new(repository),
        }
    }

    /// The repository in use.
    #[must_use]
    pub fn current(&self) -> Arc<dyn Repository> {
        Arc::clone(&*self.current.read())
    }

    /// Swaps in a new repository, returning the previous one.
    pub fn replace(&self, repository: Arc<dyn Repository>) -> Arc<dyn Repository> {
        tracing::info!("Gateway repository replaced");
        std::mem::replace(&mut *self.current.write(), repository)
    }

    /// Compiles records and swaps them in; on error the current
    /// repository stays.
    pub fn reload(&self, records: Vec<GatewayRecord>) -> Result<(), GatewayError> {
        let repository = GatewayRepository::new(records)?;
        self.replace(Arc::new(repository));
        Ok(())
    }
}

impl fmt::Debug for SharedRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRepository").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn repository(records: Vec<GatewayRecord>) -> Arc<GatewayRepository> {
        Arc::new(GatewayRepository::new(records).unwrap())
    }

    #[test]
    fn test_first_match_wins() {
        let repository = repository(vec![
            GatewayRecord::new("^/User/([0-9]+)$").methods(["GET"]).navigate("first"),
            GatewayRecord::new("^/User/(.*)$").navigate("second"),
        ]);
        let matched = repository.find(Some(&Method::GET), None, Some("/User/1"), None).unwrap();
        assert_eq!(matched.gateway.record().navigate.as_deref(), Some("first"));
        let matched = repository.find(Some(&Method::PUT), None, Some("/User/1"), None).unwrap();
        assert_eq!(matched.gateway.record().navigate.as_deref(), Some("second"));
    }

    #[test]
    fn test_find_with_error() {
        let repository = repository(vec![
            GatewayRecord::new("^/api/(.*)$").navigate("{1}"),
            GatewayRecord::new("^/api/(.*)$").errors([404, 405]).navigate("error/{1}"),
        ]);
        let matched = repository.find(None, None, Some("/api/x"), Some(404)).unwrap();
        assert!(matched.gateway.is_error_gateway());
        let plain = repository.find(None, None, Some("/api/x"), None).unwrap();
        assert!(!plain.gateway.is_error_gateway());
        assert!(repository.find(None, None, Some("/api/x"), Some(401)).is_none());
    }

    #[test]
    fn test_allows_for_includes_error_gateways() {
        let repository = repository(vec![
            GatewayRecord::new("^/User$").methods(["POST", "GET"]),
            GatewayRecord::new("^/User$").methods(["GET", "DELETE"]),
            GatewayRecord::new("^/User$").methods(["PUT"]).errors([404]),
        ]);
        assert_eq!(
            repository.allows_for(None, Some("/User")),
            [Method::DELETE, Method::GET, Method::POST, Method::PUT]
        );
        let put = repository.find(Some(&Method::PUT), None, Some("/User"), None).unwrap();
        assert!(put.gateway.is_error_gateway());
        assert!(repository.allows_for(None, Some("/Other")).is_empty());
    }

    #[test]
    fn test_find_uses_headers() {
        let repository = repository(vec![GatewayRecord::new("^/").header("x-zone:eu")]);
        let mut headers = HeaderMap::new();
        assert!(repository.find(None, Some(&headers), Some("/"), None).is_none());
        headers.insert("x-zone", HeaderValue::from_static("eu"));
        assert!(repository.find(None, Some(&headers), Some("/"), None).is_some());
    }

    #[test]
    fn test_cache_is_shared_by_identifier() {
        let repository = repository(Vec::new());
        repository.obtain_cache("filters").insert("/a".into(), true);
        assert_eq!(repository.obtain_cache("filters").get("/a").map(|v| *v), Some(true));
        assert!(repository.obtain_cache("other").is_empty());
    }

    #[test]
    fn test_joined_priority_and_cache() {
        let main = repository(vec![GatewayRecord::new("^/a$").navigate("main")]);
        let fallback = repository(vec![
            GatewayRecord::new("^/a$").navigate("fallback"),
            GatewayRecord::new("^/b$").methods(["GET"]).navigate("fallback"),
        ]);
        let joined = JoinedRepository::new(main.clone()).join(fallback.clone());

        let a = joined.find(None, None, Some("/a"), None).unwrap();
        assert_eq!(a.gateway.record().navigate.as_deref(), Some("main"));
        let b = joined.find(None, None, Some("/b"), None).unwrap();
        assert_eq!(b.gateway.record().navigate.as_deref(), Some("fallback"));
        assert_eq!(joined.allows_for(None, Some("/b")), [Method::GET]);

        joined.obtain_cache("filters").insert("k".into(), false);
        assert!(main.obtain_cache("filters").contains_key("k"));
        assert!(!fallback.obtain_cache("filters").contains_key("k"));
    }

    #[test]
    fn test_shared_reload() {
        let shared = SharedRepository::new(repository(vec![GatewayRecord::new("^/old$")]));
        let before = shared.current();
        shared.reload(vec![GatewayRecord::new("^/new$")]).unwrap();

        assert!(before.find(None, None, Some("/old"), None).is_some());
        assert!(shared.current().find(None, None, Some("/new"), None).is_some());
        assert!(shared.current().find(None, None, Some("/old"), None).is_none());

        assert!(shared.reload(vec![GatewayRecord::new("(")]).is_err());
        assert!(shared.current().find(None, None, Some("/new"), None).is_some());
    }
}
