//! JSON documents (raw and evaluated tree plus source path)
//!
//! A [JsonDocument] is read either from an explicit path or by a [Locator] that tries an ordered
//! list of directories crossed with an ordered list of file names. An [Acceptable] predicate may
//! reject a document that parsed fine, which is reported as "not loaded" rather than as an error.
//!
//! Loading never evaluates: `evaluated` starts out as a copy of `raw` until [Evaluable::evaluate]
//! is called.
use crate::error::UsageError;
use crate::evaluate::{EvalError, EvalOptions, Evaluator};
use crate::key_path::KeyPath;
use crate::macros::Macros;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    path: Option<PathBuf>,
    raw: Value,
    evaluated: Value,
}

impl JsonDocument {
    pub fn new(raw: Value, path: impl Into<Option<PathBuf>>) -> Self {
        Self {
            path: path.into(),
            evaluated: raw.clone(),
            raw,
        }
    }

    /// Load according to `request`
    ///
    /// `Ok(None)` when the locator found no acceptable candidate or the acceptor rejected the file
    /// at the explicit path.
    pub fn load(request: &LoadRequest<'_>) -> Result<Option<Self>, LoadError> {
        match (&request.path, &request.locator) {
            (Some(_), Some(_)) => Err(UsageError::PathAndLocator.into()),
            (None, None) => Err(UsageError::NoSource.into()),
            (Some(path), None) => {
                let document = Self::load_file(path)?;
                Ok(document.accepted_by(request.acceptor))
            }
            (None, Some(locator)) => {
                for candidate in locator.candidates() {
                    if !candidate.is_file() {
                        tracing::trace!(path=%candidate.display(), "no candidate");
                        continue;
                    }

                    let document = match Self::load_file(&candidate) {
                        Ok(document) => document,
                        Err(err @ (LoadError::Parse { .. } | LoadError::NotAnObject { .. })) => {
                            tracing::warn!(path=%candidate.display(), error=%err, "skipping candidate");
                            continue;
                        }
                        Err(err) => return Err(err),
                    };

                    if let Some(document) = document.accepted_by(request.acceptor) {
                        return Ok(Some(document));
                    }
                }

                tracing::debug!(?locator, "no acceptable document found");
                Ok(None)
            }
        }
    }

    pub fn load_file(file_path: &Path) -> Result<Self, LoadError> {
        if !file_path.exists() {
            return Err(UsageError::MissingPath(file_path.to_path_buf()).into());
        }

        let io_error = |source| LoadError::Io {
            path: file_path.to_path_buf(),
            source,
        };
        let file_path = file_path.canonicalize().map_err(io_error)?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path).map_err(io_error)?;
        let raw: Value =
            serde_json::from_str(&file_contents).map_err(|source| LoadError::Parse {
                path: file_path.clone(),
                source,
            })?;

        if !raw.is_object() {
            return Err(LoadError::NotAnObject { path: file_path });
        }

        Ok(Self::new(raw, file_path))
    }

    fn accepted_by(self, acceptor: Option<&dyn Acceptable>) -> Option<Self> {
        match acceptor {
            Some(acceptor) if !acceptor.accept(&self.raw) => {
                tracing::debug!(path=?self.path, "document rejected");
                None
            }
            _ => Some(self),
        }
    }

    /// Canonical path of the source file, `None` for documents built in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn evaluated(&self) -> &Value {
        &self.evaluated
    }

    pub fn get(&self, key_path: &KeyPath) -> Result<Option<&Value>, UsageError> {
        key_path.resolve(&self.evaluated)
    }

    /// Replace `<NAME>` macros in the evaluated tree
    pub fn substitute(&mut self, macros: &Macros) {
        macros.apply(&mut self.evaluated);
    }
}

impl Evaluable for JsonDocument {
    fn evaluate(&mut self, evaluator: &Evaluator, options: EvalOptions) -> Result<(), EvalError> {
        self.evaluated = evaluator.evaluate(&self.raw, options)?;
        Ok(())
    }
}

/// Where to load a document from
///
/// Exactly one of `path` and `locator` must be set.
#[derive(Default, Clone)]
pub struct LoadRequest<'a> {
    pub path: Option<PathBuf>,
    pub locator: Option<Locator>,
    pub acceptor: Option<&'a dyn Acceptable>,
}

impl<'a> LoadRequest<'a> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn locator(locator: Locator) -> Self {
        Self {
            locator: Some(locator),
            ..Default::default()
        }
    }

    pub fn accepted_by<'b>(self, acceptor: &'b dyn Acceptable) -> LoadRequest<'b>
    where
        'a: 'b,
    {
        LoadRequest {
            path: self.path,
            locator: self.locator,
            acceptor: Some(acceptor),
        }
    }
}

/// Ordered directories crossed with ordered file names
///
/// Candidates are tried directory by directory: every name in the first directory, then every name
/// in the second, and so on.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct Locator {
    dirs: Vec<PathBuf>,
    names: Vec<String>,
}

impl Locator {
    pub fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.dirs
            .iter()
            .flat_map(|dir| self.names.iter().map(move |name| dir.join(name)))
    }
}

/// Predicate deciding whether a parsed document is used
pub trait Acceptable {
    fn accept(&self, raw: &Value) -> bool;
}

// blanket impl for predicates
impl<F> Acceptable for F
where
    F: Fn(&Value) -> bool,
{
    fn accept(&self, raw: &Value) -> bool {
        self(raw)
    }
}

/// Rejects documents holding `"enabled": false` at the top level
#[derive(Debug, Clone, Copy, Default)]
pub struct EnabledFlag;

impl Acceptable for EnabledFlag {
    fn accept(&self, raw: &Value) -> bool {
        raw.get("enabled").and_then(Value::as_bool) != Some(false)
    }
}

/// Something backed by a [JsonDocument] that it loads itself
pub trait Loadable {
    fn document(&self) -> Option<&JsonDocument>;

    fn replace_document(&mut self, document: JsonDocument);

    fn is_loaded(&self) -> bool {
        self.document().is_some()
    }

    /// Returns whether a document was loaded. A rejected or missing candidate keeps the previous
    /// document.
    fn load(&mut self, request: LoadRequest<'_>) -> Result<bool, LoadError> {
        match JsonDocument::load(&request)? {
            Some(document) => {
                self.replace_document(document);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// [Loadable::load] with `self` as the acceptor
    fn load_accepted(&mut self, request: LoadRequest<'_>) -> Result<bool, LoadError>
    where
        Self: Acceptable + Sized,
    {
        let loaded = JsonDocument::load(&request.accepted_by(&*self))?;
        match loaded {
            Some(document) => {
                self.replace_document(document);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Something whose evaluated state can be (re)computed from its raw state
pub trait Evaluable {
    fn evaluate(&mut self, evaluator: &Evaluator, options: EvalOptions) -> Result<(), EvalError>;
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("IO error reading {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse json file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("top level of {} is not a JSON object", .path.display())]
    NotAnObject { path: PathBuf },
}

/// Utility macro to create a [JsonDocument] in memory
///
/// ```
/// # use prodconf::json_document;
/// let document = json_document!({ "port": 80 });
/// assert!(document.path().is_none());
/// ```
#[macro_export]
macro_rules! json_document {
    ($($json:tt)+) => {
        $crate::json_document::JsonDocument::new($crate::serde_json::json!($($json)+), None)
    };
}
