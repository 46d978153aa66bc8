//! precedence chain across node, service and site documents
//!
//! For a key path `k`, an optional service `s` and an optional namespace `ns`, the first of these
//! lookups that finds a value wins:
//!
//! | step | document        | key path                        |
//! |------|-----------------|---------------------------------|
//! | 1    | node            | `services.<s>.<ns>.<k>`         |
//! | 1b   | node            | `Services.<s>.<ns>.<k>` (legacy) |
//! | 2    | node            | `<ns>.<k>`                      |
//! | 3    | service         | `<ns>.<k>`                      |
//! | 4    | site            | `<ns>.<k>`                      |
//!
//! Steps that need a service are skipped without one. A namespace with a legacy spelling is tried
//! with the current spelling first, then with the legacy one, within each step.
//!
//! Only "not found" moves on to the next step: `false`, `0`, `""` and `null` are values.
use crate::deprecation::{self, Deprecations, Renamed};
use crate::error::UsageError;
use crate::json_document::Loadable;
use crate::key_path::KeyPath;
use crate::node::Node;
use crate::service::Service;
use crate::site::Site;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Node,
    Service,
    Site,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Node => f.write_str("node"),
            Scope::Service => f.write_str("service"),
            Scope::Site => f.write_str("site"),
        }
    }
}

/// Optional leading key segment inserted in front of every lookup of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Namespace {
    #[default]
    None,
    Key(&'static str),
    /// with a legacy spelling
    Renamed(Renamed),
}

impl Namespace {
    pub const DBMS: Namespace = Namespace::Key("DBMS");
    pub const TELEMETRY: Namespace = Namespace::Renamed(deprecation::TELEMETRY);
}

/// A value together with the scope it was found in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Found<'a> {
    pub scope: Scope,
    pub value: &'a Value,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeArgs<'a> {
    pub node: Option<&'a Node>,
    pub service: Option<&'a Service>,
}

impl<'a> ScopeArgs<'a> {
    pub fn node(node: &'a Node) -> Self {
        Self {
            node: Some(node),
            service: None,
        }
    }

    pub fn service(mut self, service: &'a Service) -> Self {
        self.service = Some(service);
        self
    }
}

#[derive(derive_new::new)]
pub struct ScopeChain<'a> {
    site: &'a Site,
    deprecations: &'a Deprecations,
}

impl<'a> ScopeChain<'a> {
    pub fn resolve(
        &self,
        key_path: &KeyPath,
        args: ScopeArgs<'a>,
    ) -> Result<Option<&'a Value>, UsageError> {
        self.resolve_in(Namespace::None, key_path, args)
    }

    pub fn resolve_dbms(
        &self,
        key_path: &KeyPath,
        args: ScopeArgs<'a>,
    ) -> Result<Option<&'a Value>, UsageError> {
        self.resolve_in(Namespace::DBMS, key_path, args)
    }

    pub fn resolve_telemetry(
        &self,
        key_path: &KeyPath,
        args: ScopeArgs<'a>,
    ) -> Result<Option<&'a Value>, UsageError> {
        self.resolve_in(Namespace::TELEMETRY, key_path, args)
    }

    pub fn resolve_in(
        &self,
        namespace: Namespace,
        key_path: &KeyPath,
        args: ScopeArgs<'a>,
    ) -> Result<Option<&'a Value>, UsageError> {
        Ok(self
            .find(namespace, key_path, args)?
            .map(|found| found.value))
    }

    /// Like [ScopeChain::resolve_in] but also reports which scope answered
    pub fn find(
        &self,
        namespace: Namespace,
        key_path: &KeyPath,
        args: ScopeArgs<'a>,
    ) -> Result<Option<Found<'a>>, UsageError> {
        let node_document = args
            .node
            .and_then(Loadable::document)
            .map(|document| document.evaluated());

        if let (Some(service), Some(document)) = (args.service, node_document) {
            let found = self
                .deprecations
                .lookup_spelling(&deprecation::SERVICES, |services| {
                    let mut prefix: Vec<&str> = services.to_vec();
                    prefix.push(service.name());
                    self.lookup(namespace, document, &prefix, key_path)
                })?;
            if let Some(value) = found {
                return Ok(Some(self.found(Scope::Node, key_path, value)));
            }
        }

        if let Some(document) = node_document {
            if let Some(value) = self.lookup(namespace, document, &[], key_path)? {
                return Ok(Some(self.found(Scope::Node, key_path, value)));
            }
        }

        if let Some(document) = args
            .service
            .and_then(Loadable::document)
            .map(|document| document.evaluated())
        {
            if let Some(value) = self.lookup(namespace, document, &[], key_path)? {
                return Ok(Some(self.found(Scope::Service, key_path, value)));
            }
        }

        if let Some(document) = self.site.document().map(|document| document.evaluated()) {
            if let Some(value) = self.lookup(namespace, document, &[], key_path)? {
                return Ok(Some(self.found(Scope::Site, key_path, value)));
            }
        }

        tracing::debug!(path = %key_path, ?namespace, "not found in any scope");
        Ok(None)
    }

    fn found(&self, scope: Scope, key_path: &KeyPath, value: &'a Value) -> Found<'a> {
        tracing::debug!(path = %key_path, %scope, "found");
        Found { scope, value }
    }

    /// `<prefix>.<namespace>.<key_path>` in one document
    fn lookup(
        &self,
        namespace: Namespace,
        document: &'a Value,
        prefix: &[&str],
        key_path: &KeyPath,
    ) -> Result<Option<&'a Value>, UsageError> {
        let resolve = |namespace: &[&'static str]| {
            let mut keys: Vec<&str> = prefix.to_vec();
            keys.extend_from_slice(namespace);
            key_path.prefixed(keys).resolve(document)
        };

        match namespace {
            Namespace::None => resolve(&[]),
            Namespace::Key(key) => resolve(&[key]),
            Namespace::Renamed(renamed) => self.deprecations.lookup_spelling(&renamed, resolve),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{json_document, key_path};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn site() -> Site {
        Site::with_document(json_document!({
            "port": 8080,
            "domain": "example.org",
            "DBMS": { "host": "db.example.org" },
            "Telemetry": { "endpoint": "collector:4317" },
        }))
    }

    #[test]
    fn node_service_section_wins() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document(
            "web01",
            json_document!({ "services": { "nginx": { "port": 80 } } }),
        );
        let service = Service::new("nginx");
        let chain = ScopeChain::new(&site, &deprecations);

        let found = chain
            .find(
                Namespace::None,
                &key_path!["port"],
                ScopeArgs::node(&node).service(&service),
            )
            .unwrap();

        assert_eq!(
            found,
            Some(Found {
                scope: Scope::Node,
                value: &json!(80)
            })
        );
    }

    #[test]
    fn falls_back_to_site() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document("web01", json_document!({ "services": {} }));
        let service = Service::new("nginx");
        let chain = ScopeChain::new(&site, &deprecations);

        let found = chain
            .find(
                Namespace::None,
                &key_path!["port"],
                ScopeArgs::node(&node).service(&service),
            )
            .unwrap()
            .unwrap();

        assert_eq!(found.scope, Scope::Site);
        assert_eq!(found.value, &json!(8080));
    }

    #[test]
    fn legacy_services_section_warns_once() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document(
            "web01",
            json_document!({ "Services": { "nginx": { "port": 81, "user": "www" } } }),
        );
        let service = Service::new("nginx");
        let chain = ScopeChain::new(&site, &deprecations);
        let args = ScopeArgs::node(&node).service(&service);

        assert_eq!(
            chain.resolve(&key_path!["port"], args).unwrap(),
            Some(&json!(81))
        );
        assert_eq!(
            chain.resolve(&key_path!["user"], args).unwrap(),
            Some(&json!("www"))
        );
        assert!(deprecations.has_warned("Services"));
        assert_eq!(deprecations.warned_count(), 1);
    }

    #[test]
    fn current_services_section_shadows_legacy() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document(
            "web01",
            json_document!({
                "services": { "nginx": { "port": 80 } },
                "Services": { "nginx": { "port": 81 } },
            }),
        );
        let service = Service::new("nginx");
        let chain = ScopeChain::new(&site, &deprecations);

        assert_eq!(
            chain
                .resolve(&key_path!["port"], ScopeArgs::node(&node).service(&service))
                .unwrap(),
            Some(&json!(80))
        );
        assert_eq!(deprecations.warned_count(), 0);
    }

    #[test]
    fn falsy_values_stop_the_chain() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document(
            "web01",
            json_document!({ "port": 0, "debug": false, "banner": "", "proxy": null }),
        );
        let chain = ScopeChain::new(&site, &deprecations);
        let args = ScopeArgs::node(&node);

        for (key, expected) in [
            ("port", json!(0)),
            ("debug", json!(false)),
            ("banner", json!("")),
            ("proxy", Value::Null),
        ] {
            let found = chain
                .find(Namespace::None, &key_path![key], args)
                .unwrap()
                .unwrap();
            assert_eq!(found.scope, Scope::Node, "{key}");
            assert_eq!(found.value, &expected, "{key}");
        }
    }

    #[test]
    fn node_top_level_before_service_document() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document("web01", json_document!({ "user": "node-user" }));
        let service = Service::with_document(
            "nginx",
            json_document!({ "user": "service-user", "workers": 4 }),
        );
        let chain = ScopeChain::new(&site, &deprecations);
        let args = ScopeArgs::node(&node).service(&service);

        assert_eq!(
            chain.resolve(&key_path!["user"], args).unwrap(),
            Some(&json!("node-user"))
        );
        let found = chain
            .find(Namespace::None, &key_path!["workers"], args)
            .unwrap()
            .unwrap();
        assert_eq!(found.scope, Scope::Service);
    }

    #[test]
    fn without_node_only_service_and_site_are_consulted() {
        let site = site();
        let deprecations = Deprecations::new();
        let service = Service::with_document("nginx", json_document!({ "workers": 4 }));
        let chain = ScopeChain::new(&site, &deprecations);
        let args = ScopeArgs::default().service(&service);

        assert_eq!(
            chain.resolve(&key_path!["workers"], args).unwrap(),
            Some(&json!(4))
        );
        assert_eq!(
            chain.resolve(&key_path!["domain"], args).unwrap(),
            Some(&json!("example.org"))
        );
        assert_eq!(chain.resolve(&key_path!["missing"], args).unwrap(), None);
    }

    #[test]
    fn dbms_namespace() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document(
            "db01",
            json_document!({ "services": { "billing": { "DBMS": { "user": "billing" } } } }),
        );
        let service = Service::new("billing");
        let chain = ScopeChain::new(&site, &deprecations);
        let args = ScopeArgs::node(&node).service(&service);

        assert_eq!(
            chain.resolve_dbms(&key_path!["user"], args).unwrap(),
            Some(&json!("billing"))
        );
        assert_eq!(
            chain.resolve_dbms(&key_path!["host"], args).unwrap(),
            Some(&json!("db.example.org"))
        );
        // the namespace is not optional
        assert_eq!(chain.resolve_dbms(&key_path!["port"], args).unwrap(), None);
    }

    #[test]
    fn telemetry_namespace_accepts_legacy_spelling() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document(
            "web01",
            json_document!({ "telemetry": { "sampling": 0.5 } }),
        );
        let chain = ScopeChain::new(&site, &deprecations);
        let args = ScopeArgs::node(&node);

        assert_eq!(
            chain.resolve_telemetry(&key_path!["sampling"], args).unwrap(),
            Some(&json!(0.5))
        );
        assert_eq!(deprecations.warned_count(), 0);

        assert_eq!(
            chain.resolve_telemetry(&key_path!["endpoint"], args).unwrap(),
            Some(&json!("collector:4317"))
        );
        assert!(deprecations.has_warned("Telemetry"));
    }

    #[test]
    fn alternatives_inside_the_chain() {
        let site = site();
        let deprecations = Deprecations::new();
        let node = Node::with_document(
            "web01",
            json_document!({ "listen": { "https": { "port": 443 } } }),
        );
        let chain = ScopeChain::new(&site, &deprecations);

        assert_eq!(
            chain
                .resolve(
                    &key_path!["listen", ["http", "https"], "port"],
                    ScopeArgs::node(&node)
                )
                .unwrap(),
            Some(&json!(443))
        );
    }

    #[test]
    fn non_object_base_is_a_usage_error() {
        let site = Site::new();
        let deprecations = Deprecations::new();
        let node = Node::with_document("web01", json_document!([1, 2]));
        let chain = ScopeChain::new(&site, &deprecations);

        assert_eq!(
            chain.resolve(&key_path!["port"], ScopeArgs::node(&node)),
            Err(UsageError::NonMapBase)
        );
    }
}
