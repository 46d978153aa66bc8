//! site scope, the fallback of last resort
use crate::error::UsageError;
use crate::evaluate::{EvalError, EvalOptions, Evaluator};
use crate::json_document::{Acceptable, Evaluable, JsonDocument, Loadable, Locator};
use crate::key_path::KeyPath;
use serde_json::Value;
use std::path::PathBuf;

/// Site document locations, relative to each root
pub const SITE_FILES: &[&str] = &["etc/prodconf/site.json", "etc/site.json"];

#[derive(Debug, Default)]
pub struct Site {
    document: Option<JsonDocument>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: JsonDocument) -> Self {
        Self {
            document: Some(document),
        }
    }

    pub fn locator(roots: &[PathBuf]) -> Locator {
        Locator::new(
            roots.to_vec(),
            SITE_FILES.iter().map(|name| name.to_string()).collect(),
        )
    }

    /// `Ok(None)` when no site document is loaded
    pub fn get(&self, key_path: &KeyPath) -> Result<Option<&Value>, UsageError> {
        match &self.document {
            Some(document) => document.get(key_path),
            None => Ok(None),
        }
    }
}

/// every parsable site document is used
impl Acceptable for Site {
    fn accept(&self, _raw: &Value) -> bool {
        true
    }
}

impl Loadable for Site {
    fn document(&self) -> Option<&JsonDocument> {
        self.document.as_ref()
    }

    fn replace_document(&mut self, document: JsonDocument) {
        self.document = Some(document);
    }
}

impl Evaluable for Site {
    fn evaluate(&mut self, evaluator: &Evaluator, options: EvalOptions) -> Result<(), EvalError> {
        match &mut self.document {
            Some(document) => document.evaluate(evaluator, options),
            None => Ok(()),
        }
    }
}
