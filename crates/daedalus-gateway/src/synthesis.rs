//! Gateway records produced from other sources: the resource tree, and the
//! method override of existing records.

use daedalus_router::{ResourceTree, Segment};
use serde::{Deserialize, Serialize};

use crate::authorized::AuthorizedSettings;
use crate::record::GatewayRecord;

/// Override header pattern; `{}` is replaced by the overriding method.
pub const METHOD_OVERRIDE_PATTERN: &str = r"X-HTTP-Method-Override:\s*{}\s*$";

/// Overriding method and the methods it may be sent over.
const OVERRIDES: [(&str, &[&str]); 2] = [("DELETE", &["GET"]), ("PUT", &["POST"])];

/// Where the gateway records come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Records declared in configuration, matched first.
    pub gateways: Vec<GatewayRecord>,
    /// Adds one pass-through record per resource of the tree.
    pub derive_from_tree: bool,
    /// Adds the method override records.
    pub method_override: bool,
    /// Caches filter answers for the lifetime of the repository.
    pub filter_cache: bool,
    /// Gateways listed per authorization, when set.
    pub authorized: Option<AuthorizedSettings>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            gateways: Vec::new(),
            derive_from_tree: true,
            method_override: true,
            filter_cache: true,
            authorized: None,
        }
    }
}

impl GatewaySettings {
    /// The records to load for a tree.
    #[must_use]
    pub fn records(&self, tree: &ResourceTree) -> Vec<GatewayRecord> {
        let mut records = self.gateways.clone();
        if self.derive_from_tree {
            records.extend(gateways_from_tree(tree));
        }
        if self.method_override {
            records = with_method_overrides(records);
        }
        records
    }
}

/// One pass-through record per node answering requests.
///
/// The pattern is the node path with typed segments captured as
/// `([^/]+)`, an optional representation extension and an optional
/// trailing slash; the methods are the node methods.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use daedalus_assembler::{Assembler, AssemblerSettings};
/// use daedalus_core::{Call, Primitive, Service, Type, TypeModel, Value};
/// use daedalus_gateway::gateways_from_tree;
///
/// let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
/// let service = Service::new("UserService").call(
///     Call::get("get", |_| Ok(Value::Null))
///         .input("id", Type::Property(user.property_id().unwrap()))
///         .output(Type::Model(user)),
/// );
/// let tree = Assembler::new(AssemblerSettings::default()).unwrap().assemble(vec![service]).unwrap().tree;
///
/// let records = gateways_from_tree(&tree);
/// let record = records.iter().find(|r| r.pattern.as_deref().unwrap().contains("User")).unwrap();
/// assert_eq!(record.pattern.as_deref(), Some(r"^/User/([^/]+)(?:/?\.\w+)?/?$"));
/// assert_eq!(record.methods, ["GET"]);
/// ```
#[must_use]
pub fn gateways_from_tree(tree: &ResourceTree) -> Vec<GatewayRecord> {
    let records: Vec<GatewayRecord> = tree
        .nodes()
        .filter(|(_, node)| !node.invokers().is_empty())
        .map(|(id, node)| {
            let segments: Vec<String> = tree
                .segments(id)
                .into_iter()
                .map(|segment| match segment {
                    Segment::Literal(name) => regex::escape(&name),
                    Segment::Typed(_) => "([^/]+)".to_string(),
                })
                .collect();
            let pattern = format!(r"^/{}(?:/?\.\w+)?/?$", segments.join("/"));
            GatewayRecord::new(pattern).methods(node.allowed().iter().map(ToString::to_string))
        })
        .collect();
    tracing::debug!(gateways = records.len(), "Derived gateways from the resource tree");
    records
}

/// Adds the records that let clients tunnel `DELETE` over `GET` and
/// `PUT` over `POST` with `X-HTTP-Method-Override`.
///
/// An override record copies its source with the tunnelling methods and
/// the header pattern of one overriding method. It is placed before the
/// first record of the same pattern accepting a tunnelling method, so it
/// wins over it, or last when there is none. No record is added when the
/// source already accepts the tunnelling methods.
#[must_use]
pub fn with_method_overrides(records: Vec<GatewayRecord>) -> Vec<GatewayRecord> {
    let mut pending: Vec<(&'static [&'static str], GatewayRecord)> = Vec::new();
    for record in &records {
        for (method, tunnels) in OVERRIDES {
            if !has_method(record, method) || tunnels.iter().all(|tunnel| has_method(record, tunnel)) {
                continue;
            }
            let mut synthesized = record.clone();
            synthesized.methods = tunnels.iter().map(ToString::to_string).collect();
            synthesized
                .headers
                .push(METHOD_OVERRIDE_PATTERN.replace("{}", method));
            pending.push((tunnels, synthesized));
        }
    }
    if pending.is_empty() {
        return records;
    }

    let mut out = Vec::with_capacity(records.len() + pending.len());
    for record in records {
        if !record.methods.is_empty() {
            let mut k = 0;
            while k < pending.len() {
                let (tunnels, synthesized) = &pending[k];
                let placed = synthesized.pattern == record.pattern
                    && tunnels.iter().any(|method| has_method(&record, method));
                if placed {
                    out.push(pending.remove(k).1);
                } else {
                    k += 1;
                }
            }
        }
        out.push(record);
    }
    out.extend(pending.into_iter().map(|(_, synthesized)| synthesized));
    out
}

fn has_method(record: &GatewayRecord, method: &str) -> bool {
    record.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayRepository, Repository};
    use http::{HeaderMap, HeaderValue, Method};

    #[test]
    fn test_override_placed_before_tunnelling_record() {
        let records = with_method_overrides(vec![
            GatewayRecord::new("^/User/([0-9]+)$").methods(["GET"]).navigate("read/{1}"),
            GatewayRecord::new("^/User/([0-9]+)$").methods(["DELETE"]).navigate("write/{1}"),
        ]);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].methods, ["GET"]);
        assert_eq!(records[0].headers, [r"X-HTTP-Method-Override:\s*DELETE\s*$"]);
        assert_eq!(records[0].navigate.as_deref(), Some("write/{1}"));
        assert_eq!(records[1].navigate.as_deref(), Some("read/{1}"));
    }

    #[test]
    fn test_override_appended_without_tunnelling_record() {
        let records = with_method_overrides(vec![GatewayRecord::new("^/User$").methods(["PUT", "DELETE"])]);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].methods, ["GET"]);
        assert_eq!(records[1].headers, [r"X-HTTP-Method-Override:\s*DELETE\s*$"]);
        assert_eq!(records[2].methods, ["POST"]);
        assert_eq!(records[2].headers, [r"X-HTTP-Method-Override:\s*PUT\s*$"]);
    }

    #[test]
    fn test_no_override_when_all_declared_or_no_methods() {
        let records = vec![
            GatewayRecord::new("^/a$").methods(["GET", "DELETE"]),
            GatewayRecord::new("^/b$"),
            GatewayRecord::new("^/c$").methods(["GET"]),
        ];
        assert_eq!(with_method_overrides(records.clone()), records);
    }

    #[test]
    fn test_override_header_routes_the_tunnelled_request() {
        let records = with_method_overrides(vec![
            GatewayRecord::new("^/User$").methods(["GET"]).navigate("read"),
            GatewayRecord::new("^/User$").methods(["DELETE"]).navigate("write"),
        ]);
        let repository = GatewayRepository::new(records).unwrap();

        let mut headers = HeaderMap::new();
        let plain = repository.find(Some(&Method::GET), Some(&headers), Some("/User"), None).unwrap();
        assert_eq!(plain.gateway.record().navigate.as_deref(), Some("read"));

        headers.insert("x-http-method-override", HeaderValue::from_static("delete"));
        let tunnelled = repository.find(Some(&Method::GET), Some(&headers), Some("/User"), None).unwrap();
        assert_eq!(tunnelled.gateway.record().navigate.as_deref(), Some("write"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: GatewaySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, GatewaySettings::default());
        assert!(settings.derive_from_tree && settings.method_override && settings.filter_cache);
    }
}
