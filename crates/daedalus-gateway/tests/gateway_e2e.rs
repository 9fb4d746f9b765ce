//! End-to-end gateway tests.
//!
//! A recording upstream stands in for the core dispatcher in most tests;
//! the last ones put the gateway in front of a real dispatcher with
//! records derived from its tree.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use daedalus_assembler::{Assembler, AssemblerSettings};
use daedalus_core::code::{INTERNAL_ERROR, METHOD_NOT_AVAILABLE, PARAMETER_ILLEGAL, PATH_FOUND, PATH_NOT_FOUND};
use daedalus_core::{Call, Dispatch, Primitive, Request, Response, Service, Type, TypeModel, Value};
use daedalus_gateway::{
    AuthorizedSettings, GatewayDispatcher, GatewayRecord, GatewayRepository, GatewaySettings, Repository, SharedRepository,
};
use daedalus_server::Dispatcher;
use http::header::ALLOW;
use http::{HeaderValue, Method};
use parking_lot::Mutex;
use proptest::prelude::*;

#[derive(Default)]
struct Upstream {
    seen: Mutex<Vec<String>>,
}

impl Upstream {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl Dispatch for Upstream {
    fn dispatch(&self, request: Request) -> Response {
        let target = request.target();
        self.seen.lock().push(format!("{} {}", request.method, target));
        let known = ["/error/", "/login", "/items", "/headers"]
            .iter()
            .any(|prefix| request.uri.starts_with(prefix));
        if !known {
            return Response::new(PATH_NOT_FOUND);
        }
        if request.method == Method::DELETE && request.uri == "/items" {
            let mut response = Response::new(METHOD_NOT_AVAILABLE);
            response.headers.insert(ALLOW, HeaderValue::from_static("GET, PUT"));
            return response;
        }
        let mut response = Response::new(PATH_FOUND);
        response.body = match request.header("authorization") {
            Some(token) if request.uri == "/headers" => token.to_string().into(),
            _ => target.into(),
        };
        response
    }
}

#[derive(Default)]
struct Access {
    calls: AtomicUsize,
}

impl Dispatch for Access {
    fn dispatch(&self, request: Request) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = match request.uri.as_str() {
            "/access/granted" => serde_json::json!({"HasAccess": "True"}),
            "/access/true" => serde_json::json!(true),
            "/access/1" => serde_json::json!({"HasAccess": "True"}),
            _ => serde_json::json!({"HasAccess": "False"}),
        };
        let mut response = Response::new(PATH_FOUND);
        response.body = serde_json::to_vec(&answer).unwrap_or_default().into();
        response
    }
}

fn shared(records: Vec<GatewayRecord>) -> Arc<SharedRepository> {
    Arc::new(SharedRepository::new(Arc::new(GatewayRepository::new(records).unwrap())))
}

fn gateway(records: Vec<GatewayRecord>, upstream: &Arc<Upstream>) -> GatewayDispatcher {
    GatewayDispatcher::builder(shared(records), upstream.clone()).build().unwrap()
}

#[test]
fn test_upstream_error_is_redirected_to_error_gateway() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(
        vec![
            GatewayRecord::new("^/api/(.*)$").methods(["GET"]).navigate("{1}"),
            GatewayRecord::new("^/api/(.*)$")
                .methods(["GET"])
                .errors([404])
                .navigate("error/{1}?status=404"),
        ],
        &upstream,
    );

    let response = gateway.dispatch(Request::get("/api/foo"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "/error/foo?status=404");
    assert_eq!(upstream.seen(), ["GET /foo", "GET /error/foo?status=404"]);
}

#[test]
fn test_redirect_happens_once() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(
        vec![
            GatewayRecord::new("^/api/(.*)$").navigate("{1}"),
            GatewayRecord::new("^/api/(.*)$").errors([404]).navigate("missing/{1}"),
        ],
        &upstream,
    );
    let response = gateway.dispatch(Request::get("/api/foo"));
    assert_eq!(response.status, 404);
    assert_eq!(upstream.seen(), ["GET /foo", "GET /missing/foo?status=404"]);
}

#[test]
fn test_error_gateway_serves_plain_requests() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(
        vec![GatewayRecord::new("^/secure/(.*)$").methods(["GET"]).errors([404]).navigate("login?from={1}")],
        &upstream,
    );
    let response = gateway.dispatch(Request::get("/secure/report?year=2024"));
    assert_eq!(response.status, 200);
    assert_eq!(upstream.seen(), ["GET /login?from=report&year=2024"]);

    let response = gateway.dispatch(Request::post("/secure/report"));
    assert_eq!(response.status, 405);
    assert_eq!(response.header("allow"), Some("GET"));
}

#[test]
fn test_not_found_without_error_gateway() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(vec![GatewayRecord::new("^/items$")], &upstream);
    let response = gateway.dispatch(Request::get("/nothing"));
    assert_eq!(response.status, 404);
    assert_eq!(response.json().unwrap()["code"], "PATH_NOT_FOUND");
    assert!(upstream.seen().is_empty());
}

#[test]
fn test_method_not_available() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(
        vec![
            GatewayRecord::new("^/items$").methods(["GET"]),
            GatewayRecord::new("^/items$").methods(["POST"]),
        ],
        &upstream,
    );
    let response = gateway.dispatch(Request::delete("/items"));
    assert_eq!(response.status, 405);
    assert_eq!(response.header("allow"), Some("GET, POST"));
    assert_eq!(response.json().unwrap()["details"]["allow"], serde_json::json!(["GET", "POST"]));
}

#[test]
fn test_method_not_available_error_gateway_gets_allows() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(
        vec![
            GatewayRecord::new("^/items$"),
            GatewayRecord::new("^/items$").errors([405]).navigate("error/method"),
        ],
        &upstream,
    );
    let response = gateway.dispatch(Request::delete("/items"));
    assert_eq!(response.status, 200);
    assert_eq!(
        upstream.seen(),
        ["DELETE /items", "DELETE /error/method?status=405&allow=GET&allow=PUT"]
    );
}

#[test]
fn test_put_headers() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(
        vec![GatewayRecord::new("^/headers$").put_header("Authorization:Basic c2VjcmV0")],
        &upstream,
    );
    let response = gateway.dispatch(Request::get("/headers").with_header("authorization", "Bearer t"));
    assert_eq!(response.body_text(), "Basic c2VjcmV0");
}

#[test]
fn test_unknown_host_is_bad_gateway() {
    let upstream = Arc::new(Upstream::default());
    let gateway = gateway(vec![GatewayRecord::new("^/items$").host("billing")], &upstream);
    let response = gateway.dispatch(Request::get("/items"));
    assert_eq!(response.status, 502);
    assert_eq!(response.json().unwrap()["message"], "No upstream for host 'billing'");
}

#[test]
fn test_registered_host() {
    let upstream = Arc::new(Upstream::default());
    let billing = Arc::new(Upstream::default());
    let gateway = GatewayDispatcher::builder(
        shared(vec![GatewayRecord::new("^/items$").host("billing")]),
        upstream.clone(),
    )
    .host("billing", billing.clone())
    .build()
    .unwrap();
    assert_eq!(gateway.dispatch(Request::get("/items")).status, 200);
    assert!(upstream.seen().is_empty());
    assert_eq!(billing.seen(), ["GET /items"]);
}

fn filtered(filters: &[&str], cache: bool) -> (GatewayDispatcher, Arc<Upstream>, Arc<Access>) {
    let upstream = Arc::new(Upstream::default());
    let access = Arc::new(Access::default());
    let mut record = GatewayRecord::new("^/items/([0-9]+)$");
    for filter in filters {
        record = record.filter(*filter);
    }
    let gateway = GatewayDispatcher::builder(shared(vec![record]), upstream.clone())
        .checker(access.clone())
        .filter_cache(cache)
        .build()
        .unwrap();
    (gateway, upstream, access)
}

#[test]
fn test_filters_and_across_or_within() {
    let (gateway, _, _) = filtered(&["/access/denied|/access/granted", "/access/true"], true);
    assert_eq!(gateway.dispatch(Request::get("/items/7")).status, 200);

    let (gateway, upstream, _) = filtered(&["/access/granted", "/access/denied"], true);
    let response = gateway.dispatch(Request::get("/items/7"));
    assert_eq!(response.status, 403);
    assert_eq!(response.json().unwrap()["code"], "FORBIDDEN_ACCESS");
    assert!(upstream.seen().is_empty());
}

#[test]
fn test_filter_uses_captures() {
    let (gateway, _, _) = filtered(&["/access/{1}"], true);
    assert_eq!(gateway.dispatch(Request::get("/items/1")).status, 200);
    assert_eq!(gateway.dispatch(Request::get("/items/2")).status, 403);
}

#[test]
fn test_filter_answers_are_cached() {
    let (gateway, _, access) = filtered(&["/access/granted"], true);
    gateway.dispatch(Request::get("/items/1"));
    gateway.dispatch(Request::get("/items/2"));
    assert_eq!(access.calls.load(Ordering::SeqCst), 1);

    let (gateway, _, access) = filtered(&["/access/granted"], false);
    gateway.dispatch(Request::get("/items/1"));
    gateway.dispatch(Request::get("/items/2"));
    assert_eq!(access.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_denial_takes_forbidden_error_gateway() {
    let upstream = Arc::new(Upstream::default());
    let access = Arc::new(Access::default());
    let records = vec![
        GatewayRecord::new("^/items/([0-9]+)$").filter("/access/{1}"),
        GatewayRecord::new("^/items/([0-9]+)$").errors([401, 403]).navigate("login?item={1}"),
    ];
    let gateway = GatewayDispatcher::builder(shared(records), upstream.clone())
        .checker(access)
        .build()
        .unwrap();
    let response = gateway.dispatch(Request::get("/items/9"));
    assert_eq!(response.status, 200);
    assert_eq!(upstream.seen(), ["GET /login?item=9&status=403"]);
}

struct Listing;

impl Dispatch for Listing {
    fn dispatch(&self, request: Request) -> Response {
        match request.uri.as_str() {
            "/resources/Security/Login/good/Gateway" => {
                let mut response = Response::new(PATH_FOUND);
                response.body = r#"{"GatewayList": [{"Pattern": "^/admin/(.*)$", "Navigate": "items/{1}"}]}"#.into();
                response
            }
            "/resources/Security/Login/down/Gateway" => Response::new(INTERNAL_ERROR),
            _ => Response::new(PARAMETER_ILLEGAL),
        }
    }
}

fn authorized(records: Vec<GatewayRecord>, upstream: &Arc<Upstream>) -> GatewayDispatcher {
    GatewayDispatcher::builder(shared(records), upstream.clone())
        .authorized(AuthorizedSettings::default(), Arc::new(Listing))
        .build()
        .unwrap()
}

#[test]
fn test_authorized_gateways_come_first() {
    let upstream = Arc::new(Upstream::default());
    let gateway = authorized(
        vec![GatewayRecord::new("^/items/(.*)$"), GatewayRecord::new("^/admin/(.*)$").navigate("login")],
        &upstream,
    );

    let response = gateway.dispatch(Request::get("/admin/7").with_header("authorization", "good"));
    assert_eq!(response.status, 200);
    gateway.dispatch(Request::get("/admin/7"));
    gateway.dispatch(Request::get("/items/3").with_header("authorization", "good"));
    assert_eq!(upstream.seen(), ["GET /items/7", "GET /login", "GET /items/3"]);
}

#[test]
fn test_invalid_authorization() {
    let upstream = Arc::new(Upstream::default());
    let gateway = authorized(vec![GatewayRecord::new("^/items$")], &upstream);
    let response = gateway.dispatch(Request::get("/items").with_header("authorization", "stolen"));
    assert_eq!(response.status, 401);
    assert_eq!(response.json().unwrap()["code"], "UNAUTHORIZED_ACCESS");
    assert!(upstream.seen().is_empty());

    let gateway = authorized(
        vec![
            GatewayRecord::new("^/items$").methods(["GET"]),
            GatewayRecord::new("^/items$").errors([401]).navigate("login"),
        ],
        &upstream,
    );
    let response = gateway.dispatch(Request::get("/items").with_header("authorization", "stolen"));
    assert_eq!(response.status, 200);
    assert_eq!(upstream.seen(), ["GET /login?status=401"]);
}

#[test]
fn test_authorization_listing_down() {
    let upstream = Arc::new(Upstream::default());
    let gateway = authorized(vec![GatewayRecord::new("^/items$")], &upstream);
    let response = gateway.dispatch(Request::get("/items").with_header("authorization", "down"));
    assert_eq!(response.status, 502);
    assert_eq!(response.json().unwrap()["code"], "BAD_GATEWAY");
    assert!(upstream.seen().is_empty());
}

#[test]
fn test_reload_while_serving() {
    let upstream = Arc::new(Upstream::default());
    let repository = shared(vec![GatewayRecord::new("^/items$")]);
    let gateway = GatewayDispatcher::builder(repository.clone(), upstream.clone()).build().unwrap();
    assert_eq!(gateway.dispatch(Request::get("/login")).status, 404);

    repository.reload(vec![GatewayRecord::new("^/login$")]).unwrap();
    assert_eq!(gateway.dispatch(Request::get("/login")).status, 200);
    assert_eq!(gateway.dispatch(Request::get("/items")).status, 404);
}

fn core() -> (Dispatcher, Vec<GatewayRecord>) {
    let user = TypeModel::builder("User")
        .id("Id", Primitive::Int)
        .property("Name", Primitive::Str)
        .build();
    let id = Type::Property(user.property_id().unwrap());
    let service = Service::new("UserService")
        .call(
            Call::get("get", |args| {
                let id = args.get("id").cloned().unwrap_or_default();
                Ok(Value::object([("Id", id), ("Name", Value::from("Ada"))]))
            })
            .input("id", id.clone())
            .output(Type::Model(user)),
        )
        .call(Call::delete("remove", |_| Ok(Value::Bool(true))).input("id", id));
    let resources = Assembler::new(AssemblerSettings::default())
        .unwrap()
        .assemble(vec![service])
        .unwrap();
    let records = GatewaySettings::default().records(&resources.tree);
    let dispatcher = Dispatcher::builder(Arc::new(resources.tree)).build().unwrap();
    (dispatcher, records)
}

#[test]
fn test_derived_gateways_front_the_dispatcher() {
    let (dispatcher, records) = core();
    let gateway = GatewayDispatcher::builder(shared(records), Arc::new(dispatcher))
        .build()
        .unwrap();

    let response = gateway.dispatch(Request::get("/User/5"));
    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["Name"], "Ada");
    assert_eq!(gateway.dispatch(Request::get("/User/5.json")).status, 200);

    let response = gateway.dispatch(Request::post("/User/5"));
    assert_eq!(response.status, 405);
    assert_eq!(response.header("allow"), Some("DELETE, GET"));

    let response = gateway.dispatch(Request::get("/User/5").with_header("X-HTTP-Method-Override", "DELETE"));
    assert_eq!(response.status, 204);

    assert_eq!(gateway.dispatch(Request::get("/Article")).status, 404);
}

#[test]
fn test_derived_repository_finds_node_methods() {
    let (_, records) = core();
    let repository = GatewayRepository::new(records).unwrap();
    assert_eq!(repository.allows_for(None, Some("/User/1")), [Method::DELETE, Method::GET]);
    assert!(repository.find(Some(&Method::GET), None, Some("/User/1/"), None).is_some());
    assert!(repository.find(Some(&Method::GET), None, Some("/User/1/Name"), None).is_none());
}

proptest! {
    #[test]
    fn prop_find_returns_the_declaring_gateway(
        names in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
        picks in proptest::collection::vec(proptest::collection::btree_set(0usize..4, 1..4), 6),
    ) {
        const METHODS: [&str; 4] = ["DELETE", "GET", "POST", "PUT"];
        let records: Vec<GatewayRecord> = names
            .iter()
            .zip(&picks)
            .map(|(name, pick)| {
                GatewayRecord::new(format!("^/{name}$")).methods(pick.iter().map(|k| METHODS[*k]))
            })
            .collect();
        let repository = GatewayRepository::new(records.clone()).unwrap();

        for record in &records {
            let uri = record.pattern.as_deref().unwrap().trim_start_matches('^').trim_end_matches('$').to_string();
            let allows = repository.allows_for(None, Some(&uri));
            for method in &record.methods {
                let method: Method = method.parse().unwrap();
                let found = repository.find(Some(&method), None, Some(&uri), None).unwrap();
                prop_assert_eq!(&found.gateway.record().pattern, &record.pattern);
                prop_assert!(allows.contains(&method));
            }
        }
    }

    #[test]
    fn prop_allows_covers_every_found_method(
        picks in proptest::collection::vec(
            (0usize..3, proptest::collection::btree_set(0usize..4, 0..3), proptest::option::of(400u16..406)),
            1..8,
        ),
    ) {
        const METHODS: [&str; 4] = ["DELETE", "GET", "POST", "PUT"];
        const PATTERNS: [&str; 3] = ["^/a$", "^/(a|b)$", "^/.*$"];
        let records: Vec<GatewayRecord> = picks
            .iter()
            .map(|(pattern, methods, error)| {
                let record = GatewayRecord::new(PATTERNS[*pattern]).methods(methods.iter().map(|k| METHODS[*k]));
                match error {
                    Some(status) => record.errors([*status]),
                    None => record,
                }
            })
            .collect();
        let repository = GatewayRepository::new(records).unwrap();

        for uri in ["/a", "/b", "/c"] {
            let allows = repository.allows_for(None, Some(uri));
            let open = repository.gateways().iter().any(|gateway| {
                gateway.methods().is_empty() && gateway.matches(None, None, Some(uri), None).is_some()
            });
            for method in METHODS {
                let method: Method = method.parse().unwrap();
                if let Some(found) = repository.find(Some(&method), None, Some(uri), None) {
                    prop_assert!(open || allows.contains(&method), "{} {} found {} but allows {:?}", method, uri, found.gateway, allows);
                }
            }
        }
    }
}
