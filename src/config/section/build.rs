//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "app"              # Source tree, copied into `output` before processing
//! output = "dist"             # Output root, cleared at the start of every run
//! hash_length = 7             # Hex characters of content fingerprint in file names
//! extensions = ["html", "htm"]  # Markup files processed at the output root
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::hash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source tree directory.
    pub source: PathBuf,

    /// Output root directory.
    pub output: PathBuf,

    /// Fingerprint length in hex characters.
    pub hash_length: usize,

    /// File extensions treated as markup documents (case-insensitive).
    pub extensions: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: "app".into(),
            output: "dist".into(),
            hash_length: hash::DEFAULT_LEN,
            extensions: vec!["html".into(), "htm".into()],
        }
    }
}

impl BuildConfig {
    /// Check whether a path has one of the configured markup extensions.
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Validate build configuration (expects normalized absolute paths).
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(4..=hash::MAX_LEN).contains(&self.hash_length) {
            diag.error(
                FieldPath::new("build.hash_length"),
                format!("must be between 4 and {}, got {}", hash::MAX_LEN, self.hash_length),
            );
        }

        if self.extensions.is_empty() {
            diag.error(
                FieldPath::new("build.extensions"),
                "at least one markup extension is required",
            );
        }

        if !self.source.is_dir() {
            diag.error_with_hint(
                FieldPath::new("build.source"),
                format!("directory `{}` not found", self.source.display()),
                "set `build.source` or pass `--source`",
            );
        }

        if self.output == self.source
            || self.output.starts_with(&self.source)
            || self.source.starts_with(&self.output)
        {
            diag.error(
                FieldPath::new("build.output"),
                "output and source directories must not contain each other",
            );
        }
    }
}
