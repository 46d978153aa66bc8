//! error taxonomy shared by all components
//!
//! "not found" is never an error: lookups return `Option` and callers cascade on `None`.
//! Acceptance rejection is not an error either: loading returns `Ok(None)`/`Ok(false)`.
use std::path::PathBuf;

/// Caller violated a precondition
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("key path must not be empty")]
    EmptyKeyPath,
    #[error("alternative set at position {0} of the key path is empty")]
    EmptyAlternatives(usize),
    #[error("invalid key path `{0}`")]
    InvalidKeyPath(String),
    #[error("lookup base must be a JSON object")]
    NonMapBase,
    #[error("a document is loaded either from a path or from a locator, not both")]
    PathAndLocator,
    #[error("neither a path nor a locator was given")]
    NoSource,
    #[error("file not found: {}", .0.display())]
    MissingPath(PathBuf),
    #[error("`{0}` is not usable as a node name")]
    InvalidNodeName(String),
}

/// Any failure surfaced by the configuration layer
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Load(#[from] crate::json_document::LoadError),
    #[error(transparent)]
    Eval(#[from] crate::evaluate::EvalError),
    #[error(transparent)]
    Expression(#[from] crate::evaluate::ExprError),
    #[error("unable to determine the node name from the host name")]
    NodeName(#[source] std::io::Error),
}
