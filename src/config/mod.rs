//! Project configuration management for `stamp.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [build], [css], [js], [html]
//! ├── error.rs       # ConfigError, diagnostics
//! └── mod.rs         # StampConfig (this file)
//! ```
//!
//! The config file is optional. When present, its directory is the project
//! root and relative paths resolve against it; otherwise the current
//! directory is the root and every section uses its defaults.

mod error;
pub mod section;

pub use error::{ConfigDiagnostics, ConfigError, FieldPath};
pub use section::{BuildConfig, CssConfig, HtmlConfig, JsConfig};

use crate::{
    cli::{BuildArgs, Cli, Commands},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing stamp.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Paths and naming
    pub build: BuildConfig,

    /// Stylesheet processing
    pub css: CssConfig,

    /// Script minification
    pub js: JsConfig,

    /// Markup minification
    pub html: HtmlConfig,
}

impl StampConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; falls back to defaults
    /// rooted at cwd when none exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, root) = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = Some(normalize_path(&path));
                (config, root)
            }
            None => {
                crate::debug!("config"; "`{}` not found, using defaults", cli.config.display());
                (Self::default(), cwd)
            }
        };

        config.finalize(cli, &root);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            log!("warning"; "ignoring unknown fields in {}: {}", path.display(), ignored.join(", "));
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Path relative to the project root, for display.
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply CLI overrides and resolve paths against `root`.
    fn finalize(&mut self, cli: &Cli, root: &Path) {
        Self::update_option(&mut self.build.source, cli.source.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
        }

        self.normalize_paths(root);
    }

    /// Apply build arguments from CLI.
    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);

        Self::update_option(&mut self.html.minify, args.minify.as_ref());
        if args.keep_console {
            self.js.drop_console = false;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.build.source = normalize_path(&root.join(&self.build.source));
        self.build.output = normalize_path(&root.join(&self.build.output));
        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate all sections, collecting every error before failing.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.build.validate(&mut diag);
        self.css.validate(&mut diag);
        self.js.validate(&mut diag);
        diag.into_result()?;
        Ok(())
    }
}

/// Find config file by searching upward from `start`.
///
/// Absolute `config_name` is used as-is when it exists.
fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config text and panic on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> StampConfig {
    let (parsed, ignored) = StampConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Config rooted at `dir` with `dir/app` as source and `dir/dist` as output.
#[cfg(test)]
pub fn test_config(dir: &Path) -> StampConfig {
    let mut config = StampConfig::default();
    config.root = dir.to_path_buf();
    config.build.source = dir.join("app");
    config.build.output = dir.join("dist");
    config
}

// ============================================================================
// tests
// ============================================================================
