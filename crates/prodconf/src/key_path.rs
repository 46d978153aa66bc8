//! key paths and lookup
//!
//! A [KeyPath] is a list of selectors. A selector is either a single key or an ordered set of
//! alternative keys:
//!
//! ```
//! # use prodconf::key_path;
//! # use serde_json::json;
//! let path = key_path!["a", ["b", "c"], "d"];
//! let document = json!({ "a": { "c": { "d": 5 } } });
//!
//! assert_eq!(path.resolve(&document).unwrap(), Some(&json!(5)));
//! ```
//!
//! Alternatives are not chosen greedily per level: each alternative is tried together with the rest
//! of the path and the first one that resolves the whole path wins.
use crate::error::UsageError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum KeySelector {
    Key(String),
    Alternatives(Vec<String>),
}

impl From<&str> for KeySelector {
    fn from(value: &str) -> Self {
        KeySelector::Key(value.to_string())
    }
}

impl From<String> for KeySelector {
    fn from(value: String) -> Self {
        KeySelector::Key(value)
    }
}

impl<const N: usize> From<[&str; N]> for KeySelector {
    fn from(value: [&str; N]) -> Self {
        KeySelector::Alternatives(value.iter().map(|key| key.to_string()).collect())
    }
}

impl From<Vec<String>> for KeySelector {
    fn from(value: Vec<String>) -> Self {
        KeySelector::Alternatives(value)
    }
}

impl std::fmt::Display for KeySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySelector::Key(key) => f.write_str(key),
            KeySelector::Alternatives(keys) => f.write_str(&keys.join("|")),
        }
    }
}

/// Validated, non-empty list of [KeySelector]s
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<KeySelector>", into = "Vec<KeySelector>")]
pub struct KeyPath(Vec<KeySelector>);

impl KeyPath {
    pub fn new<I, S>(selectors: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<KeySelector>,
    {
        selectors
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>()
            .try_into()
    }

    /// The path that returns a whole document
    pub fn root() -> Self {
        KeyPath(vec![KeySelector::Key(String::new())])
    }

    pub fn selectors(&self) -> &[KeySelector] {
        &self.0
    }

    /// A new path with `prefix` keys in front
    ///
    /// A leading empty key (see [KeyPath::resolve]) is dropped, so prefixing the root path
    /// addresses the prefix itself.
    pub fn prefixed<I, S>(&self, prefix: I) -> KeyPath
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selectors: Vec<KeySelector> = prefix
            .into_iter()
            .map(|key| KeySelector::Key(key.into()))
            .collect();

        let rest = match self.0.as_slice() {
            [KeySelector::Key(first), rest @ ..] if first.is_empty() && !selectors.is_empty() => {
                rest
            }
            all => all,
        };
        selectors.extend(rest.iter().cloned());

        KeyPath(selectors)
    }

    /// Look up this path in `root`
    ///
    /// An empty key in first position stands for `root` itself. `None` means "not found" and is
    /// distinct from a JSON `null` value.
    pub fn resolve<'v>(&self, root: &'v Value) -> Result<Option<&'v Value>, UsageError> {
        if !root.is_object() {
            return Err(UsageError::NonMapBase);
        }

        let found = walk(root, self.without_root_marker());
        tracing::trace!(path = %self, found = found.is_some(), "resolve");
        Ok(found)
    }

    /// Longest chain of concrete keys that exists in `root`
    pub fn diagnose(&self, root: &Value) -> Vec<String> {
        let mut matched = vec![];
        let mut longest = vec![];
        deepest(root, self.without_root_marker(), &mut matched, &mut longest);
        longest
    }

    fn without_root_marker(&self) -> &[KeySelector] {
        match self.0.as_slice() {
            [KeySelector::Key(first), rest @ ..] if first.is_empty() => rest,
            all => all,
        }
    }
}

fn walk<'v>(node: &'v Value, selectors: &[KeySelector]) -> Option<&'v Value> {
    let Some((selector, rest)) = selectors.split_first() else {
        return Some(node);
    };

    let object = node.as_object()?;
    match selector {
        KeySelector::Key(key) => object.get(key).and_then(|child| walk(child, rest)),
        KeySelector::Alternatives(keys) => keys
            .iter()
            .filter_map(|key| object.get(key))
            .find_map(|child| walk(child, rest)),
    }
}

fn deepest(
    node: &Value,
    selectors: &[KeySelector],
    matched: &mut Vec<String>,
    longest: &mut Vec<String>,
) {
    if matched.len() > longest.len() {
        *longest = matched.clone();
    }

    let (Some((selector, rest)), Some(object)) = (selectors.split_first(), node.as_object()) else {
        return;
    };

    let keys = match selector {
        KeySelector::Key(key) => std::slice::from_ref(key),
        KeySelector::Alternatives(keys) => keys.as_slice(),
    };

    for key in keys {
        if let Some(child) = object.get(key) {
            matched.push(key.clone());
            deepest(child, rest, matched, longest);
            matched.pop();
        }
    }
}

impl TryFrom<Vec<KeySelector>> for KeyPath {
    type Error = UsageError;

    fn try_from(selectors: Vec<KeySelector>) -> Result<Self, Self::Error> {
        if selectors.is_empty() {
            return Err(UsageError::EmptyKeyPath);
        }

        if let Some(position) = selectors.iter().position(
            |selector| matches!(selector, KeySelector::Alternatives(keys) if keys.is_empty()),
        ) {
            return Err(UsageError::EmptyAlternatives(position));
        }

        Ok(KeyPath(selectors))
    }
}

impl From<KeyPath> for Vec<KeySelector> {
    fn from(value: KeyPath) -> Self {
        value.0
    }
}

/// Parses `a.b|c.d` (`.` separates selectors, `|` separates alternatives) or the JSON list form
/// `["a", ["b", "c"], "d"]`
impl std::str::FromStr for KeyPath {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim_start().starts_with('[') {
            return serde_json::from_str::<Vec<KeySelector>>(s)
                .map_err(|_| UsageError::InvalidKeyPath(s.to_string()))?
                .try_into();
        }

        s.split('.')
            .map(|selector| {
                if selector.contains('|') {
                    KeySelector::Alternatives(selector.split('|').map(str::to_string).collect())
                } else {
                    KeySelector::Key(selector.to_string())
                }
            })
            .collect::<Vec<_>>()
            .try_into()
    }
}

impl std::fmt::Display for KeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, selector) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            selector.fmt(f)?;
        }
        Ok(())
    }
}

/// Utility macro to create a [KeyPath]
///
/// Strings are single keys, arrays of strings are alternatives.
/// ```
/// # use prodconf::key_path;
/// let path = key_path!["services", ["web", "www"], "port"];
/// assert_eq!(path.to_string(), "services.web|www.port");
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use prodconf::key_path;
/// key_path![];
/// ```
#[macro_export]
macro_rules! key_path {
    [ $($selector:expr),* $(,)? ] => {{
        let selectors: ::std::vec::Vec<$crate::key_path::KeySelector> =
            ::std::vec![$($crate::key_path::KeySelector::from($selector)),*];
        $crate::key_path::KeyPath::new(selectors).expect("key path must be valid")
    }};
}
