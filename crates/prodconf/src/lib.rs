//! # prodconf - layered configuration for production nodes and services
//!
//! ## Introduction for developers
//!
//! Read this to understand how `prodconf` resolves a value.
//!
//! ### Documents
//!
//! Configuration lives in JSON files, each holding a single top-level object:
//!
//! - the **site** document (`etc/prodconf/site.json` or `etc/site.json` below a root) applies to
//!   every node
//! - one **node** document per host (`<NODE>.json` in the node directories)
//! - optionally one **service** document per service (`<SERVICE>.json` in the service
//!   directories)
//!
//! Node and service documents holding `"enabled": false` are ignored. See
//! [json_document::JsonDocument::load] for how files are located.
//!
//! ### Evaluation
//!
//! String values may embed expressions:
//!
//! ```json
//! {
//!   "workers": "[eval: 2 * 4]",
//!   "logs": "/var/log/[eval: lower(node)]",
//!   "literal": "[_eval: stays an expression for a later consumer]"
//! }
//! ```
//!
//! A document keeps its `raw` tree as loaded and an `evaluated` tree. Evaluation runs passes over
//! the whole tree until it stops changing, so an expression may refer to siblings through `doc`
//! regardless of key order. See [evaluate] for the details, and [macros] for the `<NODE>` and
//! `<SERVICE>` substitution that runs afterwards.
//!
//! ### Lookup
//!
//! A [key_path::KeyPath] is a list of selectors, each a key or a list of alternative keys:
//!
//! ```
//! # use prodconf::key_path;
//! # use serde_json::json;
//! let document = json!({ "listen": { "https": { "port": 443 } } });
//! let path = key_path!["listen", ["http", "https"], "port"];
//! assert_eq!(path.resolve(&document).unwrap(), Some(&json!(443)));
//! ```
//!
//! Alternatives backtrack: if `http` exists but has no `port`, `https` is tried next.
//!
//! [scope::ScopeChain] asks the node document (service section first), then the service document,
//! then the site document. [context::Context] ties everything together for a process.
pub mod context;
pub mod deprecation;
pub mod error;
pub mod evaluate;
pub mod json_document;
pub mod key_path;
pub mod macros;
pub mod node;
pub mod scope;
pub mod service;
pub mod site;
pub mod value;
mod visit;

pub use context::{Context, Options};
pub use error::{ConfigError, UsageError};
pub use key_path::{KeyPath, KeySelector};

// used by exported macros
#[doc(hidden)]
pub use serde_json;
