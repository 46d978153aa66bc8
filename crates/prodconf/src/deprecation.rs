//! legacy keys that are still honoured
//!
//! Each legacy key produces exactly one advisory per [Deprecations] registry, i.e. per process when
//! the registry lives in the [crate::context::Context].
use crate::key_path::KeyPath;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// A key path that replaced a legacy spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renamed {
    pub current: &'static [&'static str],
    pub legacy: &'static [&'static str],
}

impl Renamed {
    pub fn current_name(&self) -> String {
        self.current.join(".")
    }

    pub fn legacy_name(&self) -> String {
        self.legacy.join(".")
    }
}

/// `Services` in node documents
pub const SERVICES: Renamed = Renamed {
    current: &["services"],
    legacy: &["Services"],
};

/// `Telemetry` namespace
pub const TELEMETRY: Renamed = Renamed {
    current: &["telemetry"],
    legacy: &["Telemetry"],
};

/// database list of a service
pub const DATABASES: Renamed = Renamed {
    current: &["databases"],
    legacy: &["DBMS", "databases"],
};

/// credentials directories in the site document
pub const CREDENTIALS_DIRS: Renamed = Renamed {
    current: &["credentials", "dirs"],
    legacy: &["credentialsDirs"],
};

/// services directories in the site document
pub const SERVICES_DIRS: Renamed = Renamed {
    current: &["services", "dirs"],
    legacy: &["servicesDirs"],
};

#[derive(Debug, Default)]
pub struct Deprecations {
    warned: Mutex<HashSet<String>>,
}

impl Deprecations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the advisory for `legacy` unless it was emitted before
    ///
    /// Returns whether this call emitted it.
    pub fn warn_once(&self, legacy: &str, current: &str) -> bool {
        let first = self
            .warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(legacy.to_string());

        if first {
            tracing::warn!(legacy, current, "deprecated configuration key, use `{current}` instead of `{legacy}`");
        }

        first
    }

    pub fn has_warned(&self, legacy: &str) -> bool {
        self.warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(legacy)
    }

    pub fn warned_count(&self) -> usize {
        self.warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Look up `renamed.current`, falling back to `renamed.legacy`
    ///
    /// `lookup` errors are propagated, the advisory is only emitted when the legacy path is the one
    /// that produced a value.
    pub fn lookup<T, E>(
        &self,
        renamed: &Renamed,
        mut lookup: impl FnMut(&KeyPath) -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        self.lookup_spelling(renamed, |keys| {
            lookup(&KeyPath::root().prefixed(keys.iter().copied()))
        })
    }

    /// [Deprecations::lookup] for callers that build their own path around the renamed keys
    pub fn lookup_spelling<T, E>(
        &self,
        renamed: &Renamed,
        mut lookup: impl FnMut(&'static [&'static str]) -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        if let Some(found) = lookup(renamed.current)? {
            return Ok(Some(found));
        }

        let found = lookup(renamed.legacy)?;
        if found.is_some() {
            self.warn_once(&renamed.legacy_name(), &renamed.current_name());
        }
        Ok(found)
    }
}
