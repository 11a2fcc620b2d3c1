//! `[js]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [js]
//! compress = true        # Constant folding and dead-code elimination
//! mangle = true          # Shorten local names
//! drop_console = true    # Remove `console.*` calls
//! drop_debugger = true   # Remove `debugger` statements
//!
//! [js.defines]
//! DEBUG = "false"        # Global replaced before compression
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsConfig {
    pub compress: bool,
    pub mangle: bool,
    pub drop_console: bool,
    pub drop_debugger: bool,

    /// Global identifiers replaced by JS expressions before compression.
    pub defines: BTreeMap<String, String>,
}

impl Default for JsConfig {
    fn default() -> Self {
        Self {
            compress: true,
            mangle: true,
            drop_console: true,
            drop_debugger: true,
            defines: BTreeMap::from([("DEBUG".to_string(), "false".to_string())]),
        }
    }
}

impl JsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (name, value) in &self.defines {
            if name.trim().is_empty() || value.trim().is_empty() {
                diag.error(
                    FieldPath::new("js.defines"),
                    format!("define `{name}` must have a non-empty name and value"),
                );
            }
        }
    }
}
