//! service scope
//!
//! A service may be described only inside node documents (`services.<name>`), or additionally by
//! its own standalone document.
use crate::evaluate::{EvalError, EvalOptions, Evaluator};
use crate::json_document::{Acceptable, EnabledFlag, Evaluable, JsonDocument, Loadable, Locator};
use crate::macros::{self, Macros};
use serde_json::Value;
use std::path::PathBuf;

/// Service directories used when the site document configures neither `services.dirs` nor
/// `servicesDirs`
pub const DEFAULT_SERVICE_DIRS: &[&str] = &["etc/services", "services"];

#[derive(Debug)]
pub struct Service {
    name: String,
    /// node the service runs on, for `<NODE>` substitution
    node: Option<String>,
    document: Option<JsonDocument>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: None,
            document: None,
        }
    }

    pub fn with_document(name: impl Into<String>, document: JsonDocument) -> Self {
        Self {
            document: Some(document),
            ..Self::new(name)
        }
    }

    pub fn on_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>.json` in each of `dirs`
    pub fn locator(&self, dirs: Vec<PathBuf>) -> Locator {
        Locator::new(dirs, vec![format!("{}.json", self.name)])
    }

    pub fn macros(&self) -> Macros {
        let macros = Macros::new().with(macros::SERVICE, &self.name);
        match &self.node {
            Some(node) => macros.with(macros::NODE, node),
            None => macros,
        }
    }
}

impl Acceptable for Service {
    fn accept(&self, raw: &Value) -> bool {
        EnabledFlag.accept(raw)
    }
}

impl Loadable for Service {
    fn document(&self) -> Option<&JsonDocument> {
        self.document.as_ref()
    }

    fn replace_document(&mut self, document: JsonDocument) {
        self.document = Some(document);
    }
}

/// evaluation is followed by `<SERVICE>` and `<NODE>` substitution
impl Evaluable for Service {
    fn evaluate(&mut self, evaluator: &Evaluator, options: EvalOptions) -> Result<(), EvalError> {
        let macros = self.macros();
        if let Some(document) = &mut self.document {
            document.evaluate(evaluator, options)?;
            document.substitute(&macros);
        }
        Ok(())
    }
}
