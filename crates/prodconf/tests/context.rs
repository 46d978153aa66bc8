//! Context tests against configuration trees on disk

use prodconf::json_document::Loadable;
use prodconf::{key_path, Context, Options};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;

fn write(root: &Path, name: &str, contents: &str) {
    let path = root.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn options(roots: &[&Path]) -> Options {
    Options {
        roots: roots.iter().map(|root| root.to_path_buf()).collect(),
        node: Some("web01".to_string()),
        warn_on_uninitialized: false,
        ..Options::default()
    }
}

fn tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "etc/prodconf/site.json",
        r#"{
            "domain": "example.org",
            "port": 8080,
            "fqdn": "[eval: \"${node}.${doc.domain}\"]",
            "nodes": { "dirs": ["etc/nodes"] },
            "servicesDirs": ["etc/services"],
            "credentials": { "dirs": ["/etc/prodconf/credentials"] },
            "Telemetry": { "endpoint": "[eval: \"collector.${doc.domain}:4317\"]" }
        }"#,
    );
    write(
        root,
        "etc/nodes/web01.json",
        r#"{
            "services": {
                "nginx": { "port": 80, "logs": "/var/log/nginx/<NODE>.log" }
            },
            "Services": {
                "billing": { "DBMS": { "user": "billing_rw" } }
            },
            "workers": "[eval: 2 * 4]",
            "hostname": "[eval: upper(node)]"
        }"#,
    );
    write(
        root,
        "etc/services/nginx.json",
        r#"{
            "user": "www-data",
            "port": 8081,
            "root": "/srv/<SERVICE>/<NODE>",
            "domain": "[eval: site.domain]"
        }"#,
    );
    write(
        root,
        "etc/services/billing.json",
        r#"{ "DBMS": { "databases": ["billing", "ledger"] } }"#,
    );
    write(
        root,
        "etc/services/legacy.json",
        r#"{ "enabled": false, "user": "nobody" }"#,
    );

    dir
}

#[test]
fn site_is_evaluated_at_bootstrap() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    let site = context.site().document().expect("site loaded");
    assert_eq!(site.evaluated()["fqdn"], json!("web01.example.org"));
    assert_eq!(site.raw()["fqdn"], json!("[eval: \"${node}.${doc.domain}\"]"));
}

#[test]
fn precedence_chain() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();
    let port = key_path!["port"];

    // node `services.nginx` beats the service document
    assert_eq!(context.var(&port, Some("nginx")).unwrap(), Some(json!(80)));
    // site without a service
    assert_eq!(context.var(&port, None).unwrap(), Some(json!(8080)));
    // service document
    assert_eq!(
        context.var(&key_path!["user"], Some("nginx")).unwrap(),
        Some(json!("www-data"))
    );
    assert_eq!(
        context.var(&key_path!["domain"], Some("nginx")).unwrap(),
        Some(json!("example.org"))
    );
    // evaluated node values are strings
    assert_eq!(
        context.var(&key_path!["workers"], None).unwrap(),
        Some(json!("8"))
    );
    assert_eq!(
        context.var(&key_path!["hostname"], None).unwrap(),
        Some(json!("WEB01"))
    );
    assert_eq!(context.var(&key_path!["missing"], None).unwrap(), None);
    assert_eq!(context.error_count(), 0);
}

#[test]
fn macros_are_substituted() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    assert_eq!(
        context.var(&key_path!["logs"], Some("nginx")).unwrap(),
        Some(json!("/var/log/nginx/web01.log"))
    );
    assert_eq!(
        context.var(&key_path!["root"], Some("nginx")).unwrap(),
        Some(json!("/srv/nginx/web01"))
    );
}

#[test]
fn deprecated_keys_are_honoured_and_reported_once() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    for _ in 0..2 {
        assert_eq!(
            context.dbms_var(&key_path!["user"], Some("billing")).unwrap(),
            Some(json!("billing_rw"))
        );
        assert_eq!(
            context.telemetry_var(&key_path!["endpoint"], None).unwrap(),
            Some(json!("collector.example.org:4317"))
        );
        assert_eq!(
            context.databases("billing").unwrap(),
            vec!["billing".to_string(), "ledger".to_string()]
        );
    }

    let deprecations = context.deprecations();
    assert!(deprecations.has_warned("Services"));
    assert!(deprecations.has_warned("Telemetry"));
    assert!(deprecations.has_warned("DBMS.databases"));
    // the service directory came from `servicesDirs`
    assert!(deprecations.has_warned("servicesDirs"));
    assert_eq!(deprecations.warned_count(), 4);
}

#[test]
fn credentials_dirs() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    assert_eq!(
        context.credentials_dirs().unwrap(),
        vec![std::path::PathBuf::from("/etc/prodconf/credentials")]
    );
    assert!(!context.deprecations().has_warned("credentialsDirs"));
}

#[test]
fn disabled_service_document_is_ignored() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    let service = context.service("legacy").unwrap();
    assert!(!service.is_loaded());
    assert_eq!(context.var(&key_path!["user"], Some("legacy")).unwrap(), None);
    assert_eq!(context.error_count(), 0);
}

#[test]
fn disabled_node_falls_back_to_site() {
    let dir = tree();
    write(
        dir.path(),
        "etc/nodes/web01.json",
        r#"{ "enabled": false, "port": 1 }"#,
    );
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    assert!(context.node().unwrap().is_none());
    assert_eq!(
        context.var(&key_path!["port"], None).unwrap(),
        Some(json!(8080))
    );
}

#[test]
fn unknown_node_and_missing_site() {
    let dir = tempfile::tempdir().unwrap();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    assert!(context.site().document().is_none());
    assert!(context.node().unwrap().is_none());
    assert_eq!(context.var(&key_path!["port"], Some("nginx")).unwrap(), None);
    assert_eq!(context.error_count(), 0);
}

#[test]
fn roots_are_searched_in_order_and_broken_files_skipped() {
    let broken = tempfile::tempdir().unwrap();
    write(broken.path(), "etc/prodconf/site.json", "{ not json");
    let shadowing = tempfile::tempdir().unwrap();
    write(shadowing.path(), "etc/site.json", r#"{ "port": 9090 }"#);
    let dir = tree();

    let context =
        Context::bootstrap(options(&[broken.path(), shadowing.path(), dir.path()])).unwrap();

    assert_eq!(
        context.var(&key_path!["port"], None).unwrap(),
        Some(json!(9090))
    );
    assert_eq!(context.error_count(), 0);
}

#[test]
fn services_are_cached() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    let first = context.service("nginx").unwrap();
    std::fs::remove_file(dir.path().join("etc/services/nginx.json")).unwrap();
    let second = context.service("nginx").unwrap();

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(second.is_loaded());
}

#[test]
fn context_is_shared_across_threads() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(
                    context.var(&key_path!["port"], Some("nginx")).unwrap(),
                    Some(json!(80))
                );
            });
        }
    });

    assert_eq!(context.deprecations().warned_count(), 1);
}

#[test]
fn dotted_key_paths() {
    let dir = tree();
    let context = Context::bootstrap(options(&[dir.path()])).unwrap();

    let path: prodconf::KeyPath = "services.nginx|apache.port".parse().unwrap();
    assert_eq!(context.var(&path, None).unwrap(), Some(json!(80)));
}
