//! Activation flags for config nodes.
//!
//! A node is active unless something vetoes it: a falsy node, a falsy
//! `is-active` entry, or an inactive nested `settings` block. Nothing nested
//! can force-activate an inactive parent.

use serde_json::Value;
use sluice_types::state::is_truthy;

/// Key that switches a node off when set to a falsy value.
pub const IS_ACTIVE_KEY: &str = "is-active";
/// Nested block whose own activation vetoes its parent.
pub const SETTINGS_KEY: &str = "settings";

/// Resolve whether a config node is active.
#[must_use]
pub fn is_active(node: &Value) -> bool {
    if !is_truthy(node) {
        return false;
    }
    let Value::Object(map) = node else {
        // `true` and any other truthy scalar.
        return true;
    };
    if map.get(IS_ACTIVE_KEY).is_some_and(|flag| !is_truthy(flag)) {
        return false;
    }
    if let Some(settings) = map.get(SETTINGS_KEY) {
        if !is_active(settings) {
            return false;
        }
    }
    true
}

/// [`is_active`] for an optional node; absent is inactive.
#[must_use]
pub fn is_active_opt(node: Option<&Value>) -> bool {
    node.is_some_and(is_active)
}
