//! Merging of settings and plugin options.

use serde_json::Value;
use tracing::debug;

pub use quire_parser::Settings;

/// Merges `from` into `into`.
///
/// Mappings merge key by key, recursively. Any other overlap replaces the
/// old value.
pub fn deep_merge(into: &mut Settings, from: Settings) {
    for (key, value) in from {
        match (into.get_mut(&key), value) {
            (Some(Value::Object(left)), Value::Object(right)) => deep_merge(left, right),
            (Some(old), value) => {
                if old != &value {
                    debug!("Replacing setting `{}`: {} -> {}", key, old, value);
                }
                *old = value;
            }
            (None, value) => {
                into.insert(key, value);
            }
        }
    }
}

/// Merges plugin options, where both sides may be absent.
///
/// Options merge only when both sides are mappings; otherwise the new
/// options win, even when they are absent.
pub fn merge_options(old: Option<Value>, new: Option<Value>) -> Option<Value> {
    match (old, new) {
        (Some(Value::Object(mut left)), Some(Value::Object(right))) => {
            deep_merge(&mut left, right);
            Some(Value::Object(left))
        }
        (_, new) => new,
    }
}
