//! Collision-safe placement of fingerprinted files.
//!
//! `place("dist/css/app.css", content)` writes `dist/css/app-{hash}.css`.
//! If that name is taken by different bytes, `-1`, `-2`, ... are appended
//! until a free slot or a byte-identical file turns up. Identical content
//! is never written twice and different content never shares a path.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::utils::hash::fingerprint;
use crate::utils::path::stamped_name;

/// Outcome of [`place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placed {
    /// Final path of the content on disk.
    pub path: PathBuf,
    /// An identical file already existed; nothing was written.
    pub reused: bool,
}

impl Placed {
    /// File name of the placed path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Write `content` next to `desired` under a fingerprinted name.
///
/// The parent directory is created when missing.
pub fn place(desired: &Path, content: &str, hash_len: usize) -> Result<Placed> {
    let dir = desired.parent().unwrap_or(Path::new(""));
    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = desired
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let hash = fingerprint(content, hash_len);

    let mut attempt = 0;
    loop {
        let candidate = dir.join(stamped_name(&stem, &hash, attempt, &ext));

        match fs::read(&candidate) {
            Ok(existing) if existing == content.as_bytes() => {
                return Ok(Placed {
                    path: candidate,
                    reused: true,
                });
            }
            Ok(_) => attempt += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create `{}`", dir.display()))?;
                fs::write(&candidate, content)
                    .with_context(|| format!("failed to write `{}`", candidate.display()))?;
                return Ok(Placed {
                    path: candidate,
                    reused: false,
                });
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read `{}`", candidate.display()));
            }
        }
    }
}
