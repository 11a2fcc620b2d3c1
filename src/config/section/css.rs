//! `[css]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [css]
//! browsers = ["iOS >= 7", "Android >= 4"]   # Vendor-prefix targets (browserslist)
//! preprocessor = ["lessc", "--include-path=$STAMP_BASE_DIR", "-"]
//! ```
//!
//! The preprocessor runs for `<link rel="stylesheet/less">` references. The
//! stylesheet source is piped to stdin and the CSS is read from stdout.
//! `$STAMP_BASE_DIR` (directory of the stylesheet) and `$STAMP_FILE_NAME`
//! (its file name) are substituted in the arguments.

use crate::config::{ConfigDiagnostics, FieldPath};
use lightningcss::targets::Browsers;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,

    /// Preprocessor command (e.g., `["lessc", "-"]` or `["npx", "lessc", "-"]`).
    pub preprocessor: Vec<String>,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            browsers: vec!["iOS >= 7".into(), "Android >= 4".into()],
            preprocessor: vec![
                "lessc".into(),
                "--include-path=$STAMP_BASE_DIR".into(),
                "-".into(),
            ],
        }
    }
}

impl CssConfig {
    /// Resolve browserslist queries. `None` means no prefixing targets.
    pub fn browsers(&self) -> Result<Option<Browsers>, String> {
        if self.browsers.is_empty() {
            return Ok(None);
        }
        Browsers::from_browserslist(self.browsers.iter()).map_err(|e| e.to_string())
    }

    /// Validate CSS configuration.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Err(e) = self.browsers() {
            diag.error(FieldPath::new("css.browsers"), format!("invalid query: {e}"));
        }

        let Some(cmd) = self.preprocessor.first() else {
            diag.error(
                FieldPath::new("css.preprocessor"),
                "preprocessor command must not be empty",
            );
            return;
        };

        // Only needed when a page links a less stylesheet, so just hint
        if which::which(cmd).is_err() {
            diag.hint(
                FieldPath::new("css.preprocessor"),
                format!("`{cmd}` not found, `stylesheet/less` links will fail"),
            );
        }
    }
}
