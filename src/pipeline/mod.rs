//! Document processing pipeline.
//!
//! Each markup document goes through a fixed sequence of stages:
//!
//! ```text
//! Loaded -> StylesProcessed -> ScriptsProcessed -> Serialized -> Minified -> Persisted
//! ```
//!
//! Documents are processed one at a time. The [`BuildContext`] carries the
//! state shared across documents, most importantly the [`BundleTable`] that
//! lets identical bundles from different pages share a single file.

mod bundle;
mod script;
mod style;

pub use bundle::BundleTable;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::asset::{Placed, Transforms};
use crate::config::StampConfig;
use crate::debug;
use crate::dom::Document;
use crate::utils::path::split_query;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("`{document}`: script has `@bundle` without a bundle name")]
    UnnamedBundle { document: String },

    #[error("`{document}`: invalid bundle name `{name}`")]
    InvalidBundleName { document: String, name: String },
}

// =============================================================================
// Context
// =============================================================================

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub documents: usize,
    pub stylesheets: usize,
    pub scripts: usize,
    pub files_written: usize,
    pub files_reused: usize,
    pub bundles_written: usize,
    pub bundles_reused: usize,
}

impl BuildStats {
    /// Count a placed single-file asset.
    fn record_placed(&mut self, placed: &Placed) {
        if placed.reused {
            self.files_reused += 1;
        } else {
            self.files_written += 1;
        }
    }
}

/// Run-scoped state threaded through every document.
pub struct BuildContext<'a> {
    pub config: &'a StampConfig,
    pub transforms: &'a dyn Transforms,
    pub bundles: BundleTable,
    pub stats: BuildStats,
}

impl<'a> BuildContext<'a> {
    pub fn new(config: &'a StampConfig, transforms: &'a dyn Transforms) -> Self {
        Self {
            config,
            transforms,
            bundles: BundleTable::default(),
            stats: BuildStats::default(),
        }
    }

    fn hash_len(&self) -> usize {
        self.config.build.hash_length
    }
}

/// Directories a document's references resolve against.
#[derive(Debug, Clone)]
pub struct PageDirs {
    /// Directory containing the document.
    pub base: PathBuf,
    /// Output root; `/`-prefixed references and bundles live here.
    pub root: PathBuf,
}

impl PageDirs {
    pub fn new(document: &Path, root: &Path) -> Self {
        Self {
            base: document.parent().unwrap_or(root).to_path_buf(),
            root: root.to_path_buf(),
        }
    }

    /// Resolve a local reference to a file system path.
    ///
    /// `/css/app.css` resolves against the output root, anything else
    /// against the document's directory. Query strings and fragments are
    /// ignored.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let (reference, _) = split_query(reference);
        match reference.strip_prefix('/') {
            Some(rooted) => self.root.join(rooted),
            None => self.base.join(reference),
        }
    }
}

// =============================================================================
// Document stages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStage {
    Loaded,
    StylesProcessed,
    ScriptsProcessed,
    Serialized,
    Minified,
    Persisted,
}

impl fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "loaded",
            Self::StylesProcessed => "styles processed",
            Self::ScriptsProcessed => "scripts processed",
            Self::Serialized => "serialized",
            Self::Minified => "minified",
            Self::Persisted => "persisted",
        })
    }
}

/// Run one document through every stage and write it back in place.
///
/// Nothing is written to the document unless every stage succeeds.
pub fn process_document(path: &Path, ctx: &mut BuildContext<'_>) -> Result<DocumentStage> {
    let name = ctx.config.root_relative(path).display().to_string();
    let dirs = PageDirs::new(path, &ctx.config.build.output);

    // Invalid UTF-8 is replaced, not fatal
    let bytes = fs::read(path).with_context(|| format!("failed to read `{name}`"))?;
    let mut doc = Document::parse(&String::from_utf8_lossy(&bytes));
    let mut stage = DocumentStage::Loaded;
    debug!("page"; "{name}: {stage}");

    style::process_styles(&mut doc, &dirs, ctx)
        .with_context(|| format!("failed to process styles of `{name}`"))?;
    stage = DocumentStage::StylesProcessed;
    debug!("page"; "{name}: {stage}");

    script::process_scripts(&mut doc, &name, &dirs, ctx)
        .with_context(|| format!("failed to process scripts of `{name}`"))?;
    stage = DocumentStage::ScriptsProcessed;
    debug!("page"; "{name}: {stage}");

    let html = doc
        .serialize()
        .with_context(|| format!("failed to serialize `{name}`"))?;
    stage = DocumentStage::Serialized;
    debug!("page"; "{name}: {stage}");

    let html = ctx
        .transforms
        .minify_html(&html)
        .with_context(|| format!("failed to minify `{name}`"))?;
    stage = DocumentStage::Minified;
    debug!("page"; "{name}: {stage}");

    fs::write(path, html).with_context(|| format!("failed to write `{name}`"))?;
    stage = DocumentStage::Persisted;
    debug!("page"; "{name}: {stage}");

    ctx.stats.documents += 1;
    Ok(stage)
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Deterministic transforms whose output is easy to predict.
///
/// - CSS: whitespace removed
/// - JS: whitespace trimmed, `console.*` statements replaced by `;`
/// - preprocess: `@less` markers stripped, `fail` in the source is an error
/// - markup: returned unchanged
#[cfg(test)]
pub(crate) struct FakeTransforms;

#[cfg(test)]
impl Transforms for FakeTransforms {
    fn preprocess(&self, source: &str, _base_dir: &Path, file_name: &str) -> Result<String> {
        if source.contains("fail") {
            anyhow::bail!("preprocess failed for {file_name}");
        }
        Ok(source.replace("@less", ""))
    }

    fn prefix_css(&self, source: &str) -> Result<String> {
        Ok(source.to_string())
    }

    fn minify_css(&self, source: &str) -> Result<String> {
        Ok(source.split_whitespace().collect())
    }

    fn minify_js(&self, source: &str, _kind: crate::asset::ScriptKind) -> Result<String> {
        if source.contains("syntax error") {
            anyhow::bail!("js syntax error");
        }
        let code = source
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| if s.starts_with("console.") { "" } else { s })
            .collect::<Vec<_>>()
            .join(";");
        Ok(code)
    }

    fn minify_html(&self, source: &str) -> Result<String> {
        Ok(source.to_string())
    }
}

/// Complete markup document; fragments would be wrapped by the parser.
#[cfg(test)]
pub(crate) fn page(head: &str, body: &str) -> String {
    format!("<html><head>{head}</head><body>{body}</body></html>")
}

/// Config plus output directory for pipeline tests.
#[cfg(test)]
pub(crate) fn test_site(dir: &Path) -> StampConfig {
    let config = crate::config::test_config(dir);
    fs::create_dir_all(&config.build.output).unwrap();
    config
}
