//! `[html]` section configuration.
//!
//! ```toml
//! [html]
//! minify = true          # Collapse whitespace in the final markup
//! keep_comments = false
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    /// Minify the markup before writing it back.
    pub minify: bool,

    /// Keep comments when minifying.
    pub keep_comments: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            minify: true,
            keep_comments: false,
        }
    }
}
