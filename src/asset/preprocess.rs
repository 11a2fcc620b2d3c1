//! Stylesheet preprocessing through an external command.
//!
//! The command comes from `[css] preprocessor`. The stylesheet source is
//! piped to stdin and the compiled CSS is read from stdout. `$STAMP_*`
//! variables are substituted in the arguments and also exported to the
//! child's environment.

use std::path::Path;

use anyhow::{Result, bail};
use rustc_hash::FxHashMap;

use crate::utils::exec::{Cmd, FilterRule};

/// Launcher chatter that isn't about the stylesheet.
const PREPROCESS_FILTER: FilterRule = FilterRule::new(&["npm warn", "npm WARN", "npm notice"]);

// ============================================================================
// Environment Variables
// ============================================================================

/// Build `$STAMP_*` variables for one stylesheet.
pub fn build_stamp_vars(base_dir: &Path, file_name: &str) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();
    vars.insert("STAMP_BASE_DIR".into(), base_dir.display().to_string());
    vars.insert("STAMP_FILE_NAME".into(), file_name.into());
    vars
}

/// Resolve `$STAMP_*` variables in command arguments.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                result = result.replace(&format!("${key}"), value);
            }
            result
        })
        .collect()
}

// ============================================================================
// Execution
// ============================================================================

/// Run `command` over `source`, resolving imports relative to `base_dir`.
///
/// Spawn failures and non-zero exits are errors; so is a command that
/// prints nothing for non-empty input.
pub fn preprocess(command: &[String], source: &str, base_dir: &Path, file_name: &str) -> Result<String> {
    if command.is_empty() {
        bail!("no preprocessor command configured");
    }

    let vars = build_stamp_vars(base_dir, file_name);
    let resolved = resolve_args(command, &vars);

    crate::debug!("less"; "`{}` < {}", resolved.join(" "), file_name);

    let output = Cmd::from_slice(&resolved)
        .cwd(base_dir)
        .envs(&vars)
        .stdin(source)
        .filter(&PREPROCESS_FILTER)
        .run()?;

    let css = String::from_utf8(output.stdout)?;
    if css.trim().is_empty() && !source.trim().is_empty() {
        bail!("`{}` produced no output for `{file_name}`", resolved[0]);
    }
    Ok(css)
}
