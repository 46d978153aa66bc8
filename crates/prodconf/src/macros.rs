//! `<NAME>` macro substitution
//!
//! Runs after expression evaluation and injects names that are only known once the scope is
//! resolved, e.g. `<NODE>` and `<SERVICE>`.
use crate::visit::VisitStringsMut;
use indexmap::IndexMap;
use serde_json::Value;

pub const NODE: &str = "NODE";
pub const SERVICE: &str = "SERVICE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Macros(IndexMap<String, String>);

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace every `<NAME>` in `text`; unknown macros are left untouched
    pub fn substitute(&self, text: &str) -> String {
        self.0
            .iter()
            .fold(text.to_string(), |text, (name, value)| {
                text.replace(&format!("<{name}>"), value)
            })
    }

    /// Substitute in every string leaf, returns how many leaves changed
    pub fn apply(&self, value: &mut Value) -> usize {
        if self.is_empty() {
            return 0;
        }

        let mut changed = 0;
        value.visit_strings_mut(&mut |s: &mut String| {
            if !s.contains('<') {
                return;
            }
            let substituted = self.substitute(s);
            if substituted != *s {
                *s = substituted;
                changed += 1;
            }
        });

        tracing::trace!(changed, "macros substituted");
        changed
    }
}
