//! The driver script run after the bundle is loaded.

use std::sync::Arc;

use crate::config::LintOption;

/// File name the driver script is evaluated under.
pub const SCRIPT_NAME: &str = "script.js";

const DEFAULT_SCRIPT: &str = include_str!("script.js");

/// Waits for the bundle's `lint` promise and formats its results as JSON.
pub fn default_script() -> Arc<str> {
    Arc::from(DEFAULT_SCRIPT)
}

/// Replaces the driver script. Its completion value (or what its promise
/// resolves to) must be the JSON output.
pub fn with_script(script: impl Into<Arc<str>>) -> LintOption {
    let script = script.into();
    LintOption::set(move |config| config.script = script)
}
