//! The text transforms the pipeline drives.
//!
//! The pipeline only sees [`Transforms`]; [`Toolchain`] wires it to the
//! real engines configured in `stamp.toml`.

use std::path::Path;

use anyhow::Result;
use lightningcss::targets::Browsers;
use thiserror::Error;

use super::minify::{self, JsOptions};
use super::preprocess;
use crate::config::{HtmlConfig, StampConfig};

/// How a script is parsed: `type="module"` or a classic script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Classic,
    Module,
}

impl ScriptKind {
    /// Classify a `type` attribute value.
    ///
    /// Returns `None` for non-JavaScript types (templates, JSON data), which
    /// the pipeline leaves untouched.
    pub fn from_type_attr(value: Option<&str>) -> Option<Self> {
        let Some(value) = value else {
            return Some(Self::Classic);
        };
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "" | "text/javascript" | "application/javascript" | "application/x-javascript"
            | "text/ecmascript" | "application/ecmascript" => Some(Self::Classic),
            "module" => Some(Self::Module),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{kind} syntax error: {message}")]
    Syntax { kind: &'static str, message: String },
}

/// Text transforms used by the document pipeline.
///
/// Every failure is fatal to the run.
pub trait Transforms {
    /// Compile a preprocessed stylesheet (`stylesheet/less`) to CSS.
    fn preprocess(&self, source: &str, base_dir: &Path, file_name: &str) -> Result<String>;

    /// Add vendor prefixes.
    fn prefix_css(&self, source: &str) -> Result<String>;

    fn minify_css(&self, source: &str) -> Result<String>;

    fn minify_js(&self, source: &str, kind: ScriptKind) -> Result<String>;

    /// Final pass over the serialized document.
    fn minify_html(&self, source: &str) -> Result<String>;
}

/// Engines configured from [`StampConfig`].
pub struct Toolchain {
    preprocessor: Vec<String>,
    browsers: Option<Browsers>,
    js: JsOptions,
    html: HtmlConfig,
}

impl Toolchain {
    pub fn new(config: &StampConfig) -> Result<Self> {
        let browsers = config
            .css
            .browsers()
            .map_err(|e| anyhow::anyhow!("invalid `css.browsers`: {e}"))?;
        Ok(Self {
            preprocessor: config.css.preprocessor.clone(),
            browsers,
            js: JsOptions::from(&config.js),
            html: config.html.clone(),
        })
    }
}

impl Transforms for Toolchain {
    fn preprocess(&self, source: &str, base_dir: &Path, file_name: &str) -> Result<String> {
        preprocess::preprocess(&self.preprocessor, source, base_dir, file_name)
    }

    fn prefix_css(&self, source: &str) -> Result<String> {
        minify::prefix_css(source, self.browsers)
    }

    fn minify_css(&self, source: &str) -> Result<String> {
        minify::minify_css(source)
    }

    fn minify_js(&self, source: &str, kind: ScriptKind) -> Result<String> {
        minify::minify_js(source, kind, &self.js)
    }

    fn minify_html(&self, source: &str) -> Result<String> {
        if !self.html.minify {
            return Ok(source.to_string());
        }
        minify::minify_html(source, &self.html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_kind_from_type() {
        assert_eq!(ScriptKind::from_type_attr(None), Some(ScriptKind::Classic));
        assert_eq!(
            ScriptKind::from_type_attr(Some(" Text/JavaScript ")),
            Some(ScriptKind::Classic)
        );
        assert_eq!(ScriptKind::from_type_attr(Some("module")), Some(ScriptKind::Module));
        assert_eq!(ScriptKind::from_type_attr(Some("text/template")), None);
        assert_eq!(ScriptKind::from_type_attr(Some("application/json")), None);
    }

    #[test]
    fn test_toolchain_css_chain() {
        let toolchain = Toolchain::new(&StampConfig::default()).unwrap();
        let prefixed = toolchain.prefix_css("a {\n  color: #ff0000;\n}").unwrap();
        assert_eq!(toolchain.minify_css(&prefixed).unwrap(), "a{color:red}");
    }

    #[test]
    fn test_toolchain_html_minify_disabled() {
        let mut config = StampConfig::default();
        config.html.minify = false;
        let toolchain = Toolchain::new(&config).unwrap();
        let html = "<p>  a  </p>\n<!-- c -->";
        assert_eq!(toolchain.minify_html(html).unwrap(), html);
    }
}
