//! Snapshot tests
//!
//! Loads each fixture in /tests/fixtures/, evaluates it and compares the evaluated tree.

use prodconf::evaluate::{EvalOptions, Evaluator};
use prodconf::json_document::{Evaluable, JsonDocument, LoadRequest};
use prodconf::KeyPath;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn evaluated(name: &str) -> JsonDocument {
    let mut document = JsonDocument::load(&LoadRequest::path(fixture(name)))
        .expect("fixture must load")
        .expect("fixture is accepted");

    let evaluator = Evaluator::new().with_var("node", "web01");
    document
        .evaluate(&evaluator, EvalOptions::new(false))
        .expect("fixture must converge");
    document
}

#[test]
fn arithmetic() {
    insta::assert_json_snapshot!(evaluated("arithmetic.json").evaluated(), @r###"
    {
      "sum": "5",
      "text": "workers: 8, ratio: 2.5",
      "flag": "true",
      "list": "[1,2,\"three\"]",
      "untouched": 42,
      "nested": {
        "deeper": [
          "A",
          true,
          null
        ]
      }
    }
    "###);
}

#[test]
fn siblings_and_escapes() {
    insta::assert_json_snapshot!(evaluated("siblings.json").evaluated(), @r###"
    {
      "url": "https://web01.example.org/",
      "fqdn": "web01.example.org",
      "domain": "example.org",
      "escaped": "example.org",
      "deep_escape": "2",
      "broken": "(undef)"
    }
    "###);
}

#[test]
fn site() {
    let document = evaluated("site.json");

    insta::assert_json_snapshot!(document.evaluated(), @r###"
    {
      "domain": "example.org",
      "port": 8080,
      "listen": {
        "http": {
          "address": "0.0.0.0"
        },
        "https": {
          "address": "0.0.0.0",
          "port": 443
        }
      },
      "logs": "/var/log/web01",
      "mail": {
        "relay": "smtp.example.org"
      }
    }
    "###);

    let port: KeyPath = "listen.http|https.port".parse().unwrap();
    insta::assert_json_snapshot!(document.get(&port).unwrap(), @"443");
}

#[test]
fn root_path_returns_the_whole_evaluated_document() {
    for name in ["arithmetic.json", "siblings.json", "site.json"] {
        let document = evaluated(name);
        let whole = document.get(&KeyPath::root()).unwrap();

        assert_eq!(whole, Some(document.evaluated()), "{name}");
        let text = serde_json::to_string(document.evaluated()).unwrap();
        assert!(!text.contains("[eval:"), "{name}: {text}");
        assert_ne!(document.raw(), document.evaluated(), "{name}");
    }
}
