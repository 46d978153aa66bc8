//! process-wide configuration context
//!
//! A [Context] is built once with [Context::bootstrap] and then shared (it is `Send + Sync`). The
//! site document is loaded and evaluated eagerly, the node document on first use, service
//! documents on first use of each service.
//!
//! Every error that surfaces through a [Context] bumps [Context::error_count], which the binary
//! turns into its exit status. "Not found" and rejected documents are not errors.
use crate::deprecation::{self, Deprecations};
use crate::error::{ConfigError, UsageError};
use crate::evaluate::{EvalOptions, Evaluator, DEFAULT_MAX_PASSES};
use crate::json_document::{Evaluable, LoadRequest, Loadable};
use crate::key_path::KeyPath;
use crate::node::{Node, DEFAULT_NODE_DIRS};
use crate::scope::{Namespace, Scope, ScopeArgs, ScopeChain};
use crate::service::{Service, DEFAULT_SERVICE_DIRS};
use crate::site::Site;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// directories that site, node and service locations are relative to, tried in order
    pub roots: Vec<PathBuf>,
    /// node name, the short host name when unset
    pub node: Option<String>,
    pub max_passes: usize,
    pub warn_on_uninitialized: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("/")],
            node: None,
            max_passes: DEFAULT_MAX_PASSES,
            warn_on_uninitialized: true,
        }
    }
}

pub struct Context {
    options: Options,
    node_name: String,
    site: Site,
    node: OnceLock<Option<Arc<Node>>>,
    services: RwLock<HashMap<String, Arc<Service>>>,
    deprecations: Deprecations,
    errors: AtomicUsize,
}

impl Context {
    /// Load and evaluate the site document
    ///
    /// A missing site document is not an error, lookups just never fall back to it.
    pub fn bootstrap(options: Options) -> Result<Self, ConfigError> {
        let node_name = match &options.node {
            Some(name) => name.clone(),
            None => short_hostname()?,
        };
        tracing::debug!(node = %node_name, roots = ?options.roots, "bootstrap");

        let mut site = Site::new();
        if !site.load_accepted(LoadRequest::locator(Site::locator(&options.roots)))? {
            tracing::warn!(roots = ?options.roots, "no site document found");
        }

        let evaluator = Evaluator::new()
            .with_max_passes(options.max_passes)
            .with_var("node", node_name.as_str());
        site.evaluate(&evaluator, eval_options(&options))?;

        Ok(Self {
            options,
            node_name,
            site,
            node: OnceLock::new(),
            services: RwLock::new(HashMap::new()),
            deprecations: Deprecations::new(),
            errors: AtomicUsize::new(0),
        })
    }

    /// Wrap already loaded documents, nothing is read from disk
    pub fn with_documents(options: Options, site: Site, node: Option<Node>) -> Self {
        let node_name = node
            .as_ref()
            .map(|node| node.name().to_string())
            .or_else(|| options.node.clone())
            .unwrap_or_default();

        let cached_node = OnceLock::new();
        let _ = cached_node.set(node.map(Arc::new));

        Self {
            options,
            node_name,
            site,
            node: cached_node,
            services: RwLock::new(HashMap::new()),
            deprecations: Deprecations::new(),
            errors: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn deprecations(&self) -> &Deprecations {
        &self.deprecations
    }

    /// Number of errors reported through this context so far
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// The node document, loaded on first call
    ///
    /// `Ok(None)` when no enabled node document exists. Failures are not cached.
    pub fn node(&self) -> Result<Option<Arc<Node>>, ConfigError> {
        if let Some(node) = self.node.get() {
            return Ok(node.clone());
        }

        let node = self.track(self.load_node())?;
        Ok(self.node.get_or_init(|| node).clone())
    }

    fn load_node(&self) -> Result<Option<Arc<Node>>, ConfigError> {
        let mut node = Node::new(&self.node_name);

        let configured = self.site.get(&KeyPath::root().prefixed(["nodes", "dirs"]))?;
        let dirs = self.search_dirs(configured, DEFAULT_NODE_DIRS);
        let locator = node.locator(dirs);
        if !node.load_accepted(LoadRequest::locator(locator))? {
            tracing::info!(node = %self.node_name, "no enabled node document found");
            return Ok(None);
        }

        node.evaluate(&self.evaluator(None), self.eval_options())?;
        Ok(Some(Arc::new(node)))
    }

    /// A service, loaded on first call per name
    ///
    /// Services without a document of their own are valid: they may be described entirely in the
    /// node document.
    pub fn service(&self, name: &str) -> Result<Arc<Service>, ConfigError> {
        if let Some(service) = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(service.clone());
        }

        let service = self.track(self.load_service(name))?;
        Ok(self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(service)
            .clone())
    }

    fn load_service(&self, name: &str) -> Result<Arc<Service>, ConfigError> {
        let mut service = Service::new(name).on_node(&self.node_name);

        let configured = self
            .deprecations
            .lookup(&deprecation::SERVICES_DIRS, |path| self.site.get(path))?;
        let dirs = self.search_dirs(configured, DEFAULT_SERVICE_DIRS);
        let locator = service.locator(dirs);
        if service.load_accepted(LoadRequest::locator(locator))? {
            service.evaluate(&self.evaluator(Some(name)), self.eval_options())?;
        } else {
            tracing::debug!(service = name, "no service document, node document only");
        }

        Ok(Arc::new(service))
    }

    /// Resolve `key_path` through node, service and site
    pub fn var(&self, key_path: &KeyPath, service: Option<&str>) -> Result<Option<Value>, ConfigError> {
        self.var_in(Namespace::None, key_path, service)
    }

    /// [Context::var] below the `DBMS` namespace
    pub fn dbms_var(&self, key_path: &KeyPath, service: Option<&str>) -> Result<Option<Value>, ConfigError> {
        self.var_in(Namespace::DBMS, key_path, service)
    }

    /// [Context::var] below the `telemetry` (or legacy `Telemetry`) namespace
    pub fn telemetry_var(&self, key_path: &KeyPath, service: Option<&str>) -> Result<Option<Value>, ConfigError> {
        self.var_in(Namespace::TELEMETRY, key_path, service)
    }

    pub fn var_in(
        &self,
        namespace: Namespace,
        key_path: &KeyPath,
        service: Option<&str>,
    ) -> Result<Option<Value>, ConfigError> {
        Ok(self
            .lookup(namespace, key_path, service)?
            .map(|(_, value)| value))
    }

    /// Like [Context::var_in] but also reports the scope that answered
    pub fn lookup(
        &self,
        namespace: Namespace,
        key_path: &KeyPath,
        service: Option<&str>,
    ) -> Result<Option<(Scope, Value)>, ConfigError> {
        let node = self.node()?;
        let service = service.map(|name| self.service(name)).transpose()?;
        let args = ScopeArgs {
            node: node.as_deref(),
            service: service.as_deref(),
        };

        let chain = ScopeChain::new(&self.site, &self.deprecations);
        let found = self.track(chain.find(namespace, key_path, args))?;
        Ok(found.map(|found| (found.scope, found.value.clone())))
    }

    /// Databases of `service`, `databases` or legacy `DBMS.databases` anywhere in the chain
    pub fn databases(&self, service: &str) -> Result<Vec<String>, ConfigError> {
        let found = self
            .deprecations
            .lookup(&deprecation::DATABASES, |path| {
                self.var(path, Some(service))
            })?;
        Ok(found.as_ref().map(string_list).unwrap_or_default())
    }

    /// `credentials.dirs` (or legacy `credentialsDirs`) of the site document
    pub fn credentials_dirs(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let found = self.track(
            self.deprecations
                .lookup(&deprecation::CREDENTIALS_DIRS, |path| self.site.get(path)),
        )?;
        Ok(found
            .map(string_list)
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    /// Longest key prefix of `key_path` matched in each loaded scope
    pub fn diagnose(
        &self,
        key_path: &KeyPath,
        service: Option<&str>,
    ) -> Result<Vec<(Scope, Vec<String>)>, ConfigError> {
        let mut matched = vec![];

        if let Some(node) = self.node()? {
            if let Some(document) = node.document() {
                matched.push((Scope::Node, key_path.diagnose(document.evaluated())));
            }
        }
        if let Some(name) = service {
            if let Some(document) = self.service(name)?.document() {
                matched.push((Scope::Service, key_path.diagnose(document.evaluated())));
            }
        }
        if let Some(document) = self.site.document() {
            matched.push((Scope::Site, key_path.diagnose(document.evaluated())));
        }

        Ok(matched)
    }

    /// Evaluate a single expression with the variables a document of `service` would see
    ///
    /// `doc` is the node document, or the site document when there is no node document.
    pub fn eval(&self, expression: &str, service: Option<&str>) -> Result<Value, ConfigError> {
        let node = self.node()?;
        let doc = node
            .as_deref()
            .and_then(Loadable::document)
            .or_else(|| self.site.document())
            .map(|document| document.evaluated().clone())
            .unwrap_or_else(|| Value::Object(Default::default()));

        self.track(
            self.evaluator(service)
                .evaluate_expression(expression, &doc)
                .map_err(ConfigError::from),
        )
    }

    /// Evaluator with `node`, `site` and, if given, `service` declared
    pub fn evaluator(&self, service: Option<&str>) -> Evaluator {
        let mut evaluator = Evaluator::new().with_max_passes(self.options.max_passes);
        evaluator.declare_var("node", self.node_name.as_str());
        if let Some(service) = service {
            evaluator.declare_var("service", service);
        }
        if let Some(site) = self.site.document() {
            evaluator.declare_var("site", site.evaluated().clone());
        }
        evaluator
    }

    fn eval_options(&self) -> EvalOptions {
        eval_options(&self.options)
    }

    /// `configured` directories (or `defaults`) below every root
    ///
    /// Absolute directories are used as they are.
    fn search_dirs(&self, configured: Option<&Value>, defaults: &[&str]) -> Vec<PathBuf> {
        let dirs = match configured.map(string_list) {
            Some(dirs) if !dirs.is_empty() => dirs,
            _ => defaults.iter().map(|dir| dir.to_string()).collect(),
        };

        let mut search_dirs: Vec<PathBuf> = vec![];
        for root in &self.options.roots {
            for dir in &dirs {
                let dir = root.join(dir);
                if !search_dirs.contains(&dir) {
                    search_dirs.push(dir);
                }
            }
        }
        search_dirs
    }

    fn track<T, E: Into<ConfigError>>(&self, result: Result<T, E>) -> Result<T, ConfigError> {
        result.map_err(|err| {
            let err = err.into();
            self.errors.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(error = %err, "configuration error");
            err
        })
    }
}

fn eval_options(options: &Options) -> EvalOptions {
    EvalOptions::new(options.warn_on_uninitialized)
}

/// a string or the strings of an array
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => vec![],
    }
}

fn short_hostname() -> Result<String, ConfigError> {
    let hostname = whoami::fallible::hostname().map_err(ConfigError::NodeName)?;
    match hostname.split('.').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(UsageError::InvalidNodeName(hostname).into()),
    }
}
