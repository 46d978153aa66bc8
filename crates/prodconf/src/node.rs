//! node scope
use crate::evaluate::{EvalError, EvalOptions, Evaluator};
use crate::json_document::{Acceptable, EnabledFlag, Evaluable, JsonDocument, Loadable, Locator};
use crate::macros::{self, Macros};
use serde_json::Value;
use std::path::PathBuf;

/// Node directories used when the site document does not configure `nodes.dirs`
pub const DEFAULT_NODE_DIRS: &[&str] = &["etc/nodes", "nodes"];

#[derive(Debug)]
pub struct Node {
    name: String,
    document: Option<JsonDocument>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: None,
        }
    }

    pub fn with_document(name: impl Into<String>, document: JsonDocument) -> Self {
        Self {
            name: name.into(),
            document: Some(document),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>.json` in each of `dirs`
    pub fn locator(&self, dirs: Vec<PathBuf>) -> Locator {
        Locator::new(dirs, vec![format!("{}.json", self.name)])
    }

    pub fn macros(&self) -> Macros {
        Macros::new().with(macros::NODE, &self.name)
    }
}

impl Acceptable for Node {
    fn accept(&self, raw: &Value) -> bool {
        EnabledFlag.accept(raw)
    }
}

impl Loadable for Node {
    fn document(&self) -> Option<&JsonDocument> {
        self.document.as_ref()
    }

    fn replace_document(&mut self, document: JsonDocument) {
        self.document = Some(document);
    }
}

/// evaluation is followed by `<NODE>` substitution
impl Evaluable for Node {
    fn evaluate(&mut self, evaluator: &Evaluator, options: EvalOptions) -> Result<(), EvalError> {
        let macros = self.macros();
        if let Some(document) = &mut self.document {
            document.evaluate(evaluator, options)?;
            document.substitute(&macros);
        }
        Ok(())
    }
}
