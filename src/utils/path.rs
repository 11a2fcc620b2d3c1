//! Path and reference utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `is_external_ref` - references owned by another host
//! - `stamped_name`, `strip_ext` - fingerprinted file names
//! - `split_query`, `replace_file_name` - rewrite the last segment of an href

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Check whether a reference points outside the build tree.
///
/// Anything containing a colon (`https:`, `data:`, `mailto:`) or starting
/// with `//` is hosted elsewhere and left untouched.
#[inline]
pub fn is_external_ref(reference: &str) -> bool {
    reference.contains(':') || reference.starts_with("//")
}

/// Build a fingerprinted file name: `{stem}-{hash}[-{n}].{ext}`.
///
/// `attempt` 0 is the plain hashed name, later attempts append `-{n}`.
/// An empty `ext` produces no trailing dot.
pub fn stamped_name(stem: &str, hash: &str, attempt: usize, ext: &str) -> String {
    let mut name = format!("{stem}-{hash}");
    if attempt > 0 {
        name.push_str(&format!("-{attempt}"));
    }
    if !ext.is_empty() {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Strip one of the given extensions (case-insensitive) from a file name.
///
/// `app.less` with `["css", "less"]` gives `app`; `app.v2` is returned as-is.
pub fn strip_ext<'a>(file_name: &'a str, exts: &[&str]) -> &'a str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && exts.iter().any(|e| e.eq_ignore_ascii_case(ext)) => {
            stem
        }
        _ => file_name,
    }
}

/// Split an href into its path and the `?query`/`#fragment` suffix.
///
/// `app.css?v=2#x` gives `("app.css", "?v=2#x")`.
pub fn split_query(href: &str) -> (&str, &str) {
    href.split_at(href.find(['?', '#']).unwrap_or(href.len()))
}

/// Last `/`-separated segment of an href.
pub fn href_file_name(href: &str) -> &str {
    href.rsplit('/').next().unwrap_or(href)
}

/// Replace the final `/`-separated segment of an href.
///
/// # Example
/// ```ignore
/// assert_eq!(replace_file_name("css/app.less", "app-1a2b3c4.css"), "css/app-1a2b3c4.css");
/// ```
pub fn replace_file_name(href: &str, file_name: &str) -> String {
    match href.rfind('/') {
        Some(pos) => format!("{}{}", &href[..=pos], file_name),
        None => file_name.to_string(),
    }
}

/// Convert a path below `root` into a `/`-separated relative reference.
pub fn relative_ref(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}
