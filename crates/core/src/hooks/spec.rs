//! Hook specifications and their JSON document form
//!
//! Document shape:
//! ```json
//! {
//!   "hooks": [
//!     { "node": "DPRandomGenerator", "method": "get_prompt", "enabled": true }
//!   ]
//! }
//! ```
//!
//! Entries are validated one by one: a malformed entry is dropped with a
//! warning and the rest of the document still counts.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::LOG_PREFIX;

/// One configured interception: silence `method` on node class `node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookSpec {
    /// Node class name as registered by the host
    #[serde(rename = "node")]
    pub class_name: String,

    /// Method attribute on that class
    #[serde(rename = "method")]
    pub method_name: String,

    /// Whether this hook is enabled (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl HookSpec {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            enabled: true,
        }
    }

    pub fn disabled(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(class_name, method_name)
        }
    }

    pub fn key(&self) -> HookKey {
        HookKey::new(&self.class_name, &self.method_name)
    }

    /// Validate one loosely-typed document entry.
    pub fn from_value(value: Value) -> Result<Self, InvalidHookSpec> {
        let spec: HookSpec = serde_json::from_value(value).map_err(InvalidHookSpec::Shape)?;
        if spec.class_name.trim().is_empty() {
            return Err(InvalidHookSpec::EmptyField("node"));
        }
        if spec.method_name.trim().is_empty() {
            return Err(InvalidHookSpec::EmptyField("method"));
        }
        Ok(spec)
    }
}

/// Why a document entry was rejected
#[derive(Debug, thiserror::Error)]
pub enum InvalidHookSpec {
    #[error("invalid hook entry: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("invalid hook entry: '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Identity of one live interception: `(class, method)`.
///
/// Renders (and serializes) as `Class.method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookKey {
    pub class_name: String,
    pub method_name: String,
}

impl HookKey {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class_name, self.method_name)
    }
}

impl Serialize for HookKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Raw hook document before per-entry validation
#[derive(Debug, Default, Deserialize)]
struct RawHooksDocument {
    #[serde(default)]
    hooks: Vec<Value>,
}

/// Hook document as written to disk
#[derive(Debug, Serialize)]
pub struct HooksDocument<'a> {
    pub hooks: &'a [HookSpec],
}

/// Parse a hook document, dropping malformed entries.
///
/// Fails only when the document itself is not valid JSON of the expected
/// shape. A document without `hooks` yields an empty list.
pub fn parse_hooks(content: &str) -> Result<Vec<HookSpec>, serde_json::Error> {
    let raw: RawHooksDocument = serde_json::from_str(content)?;

    let mut specs = Vec::with_capacity(raw.hooks.len());
    for (index, entry) in raw.hooks.into_iter().enumerate() {
        match HookSpec::from_value(entry) {
            Ok(spec) => specs.push(spec),
            Err(e) => warn!("{} Skipping hook #{}: {}", LOG_PREFIX, index, e),
        }
    }
    Ok(specs)
}

/// Render specs as a pretty-printed hook document.
pub fn render_hooks(specs: &[HookSpec]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&HooksDocument { hooks: specs })
}

/// Keep one spec per class name. The last occurrence wins, at the position
/// where that class first appeared.
pub fn last_per_class(specs: &[HookSpec]) -> Vec<&HookSpec> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &HookSpec> = HashMap::new();

    for spec in specs {
        if latest.insert(spec.class_name.as_str(), spec).is_none() {
            order.push(spec.class_name.as_str());
        }
    }

    order
        .into_iter()
        .filter_map(|name| latest.get(name).copied())
        .collect()
}
