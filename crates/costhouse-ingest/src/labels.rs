//! Pod label policy.
//!
//! Upstream reports carry pod labels as a `|`-separated list of `key:value`
//! pairs. A pod is only persisted when at least one of its label keys is in
//! the configured allow-list; everything else is dropped silently. The
//! `label_rht_comp` value, when that key is both present and recognized,
//! becomes the pod's component attribute.

use std::collections::{HashMap, HashSet};

/// The label key whose value populates the pod component.
const COMPONENT_LABEL_KEY: &str = "label_rht_comp";

/// Default allow-list when `POD_LABEL_KEYS` is unset.
pub const DEFAULT_LABEL_KEYS: &str = "label_rht_comp";

/// Outcome of evaluating one row's labels against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatch {
    /// At least one label key is in the allow-list.
    pub matched: bool,
    /// Value of `label_rht_comp`, when present and recognized.
    pub component: String,
}

/// Immutable allow-list of recognized pod label keys, captured once at
/// startup.
#[derive(Debug, Clone)]
pub struct LabelPolicy {
    keys: HashSet<String>,
}

impl LabelPolicy {
    /// Build a policy from a comma-separated key list, trimming whitespace
    /// around each key.
    pub fn new(keys: &str) -> Self {
        let keys = keys
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keys }
    }

    /// Read `POD_LABEL_KEYS` from the environment, falling back to the
    /// default allow-list.
    pub fn from_env() -> Self {
        let raw = std::env::var("POD_LABEL_KEYS").unwrap_or_default();
        if raw.is_empty() {
            Self::new(DEFAULT_LABEL_KEYS)
        } else {
            Self::new(&raw)
        }
    }

    /// Evaluate a raw `pod_labels` field.
    pub fn evaluate(&self, pod_labels: &str) -> LabelMatch {
        let labels = parse_labels(pod_labels);
        let mut matched = false;
        let mut component = String::new();
        for (key, value) in &labels {
            if self.keys.contains(key) {
                matched = true;
                if key == COMPONENT_LABEL_KEY {
                    component = value.clone();
                }
            }
        }
        LabelMatch { matched, component }
    }
}

/// Split a `|`-separated `key:value` list into a map, trimming whitespace
/// around keys and values. Entries without a `:` are ignored.
fn parse_labels(raw: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    for pair in raw.split('|') {
        if let Some((key, value)) = pair.split_once(':') {
            labels.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    labels
}
