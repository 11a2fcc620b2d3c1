//! Bundle groups and the run-wide artifact table.
//!
//! A bundle group is the ordered list of scripts in one document sharing a
//! `@bundle` name. Its members are minified, joined with `\n` and replaced
//! by a single `<script src>` at the position of the first member. Groups
//! whose joined code is byte-identical, in any document, share one file.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use rustc_hash::FxHashMap;

use super::script::process_script;
use super::{BuildContext, PageDirs};
use crate::asset::{ScriptKind, place};
use crate::dom::{AttrAccess, Document, NodeId};
use crate::utils::hash::{self, fingerprint};
use crate::utils::path::{is_external_ref, relative_ref};
use crate::{debug, log};

/// Scripts of one document sharing a bundle name, in document order.
#[derive(Debug)]
pub struct BundleGroup {
    pub name: String,
    members: Vec<(NodeId, ScriptKind)>,
}

impl BundleGroup {
    pub fn new(name: String, first: NodeId, kind: ScriptKind) -> Self {
        Self {
            name,
            members: vec![(first, kind)],
        }
    }

    pub fn push(&mut self, id: NodeId, kind: ScriptKind) {
        self.members.push((id, kind));
    }

    fn is_module(&self) -> bool {
        self.members.iter().any(|(_, kind)| *kind == ScriptKind::Module)
    }
}

/// Bundle artifacts written during this run, keyed by content fingerprint.
///
/// Entries under one key are compared by full content, so a fingerprint
/// collision never maps different code to the same file.
#[derive(Debug, Default)]
pub struct BundleTable {
    artifacts: FxHashMap<String, Vec<(String, PathBuf)>>,
}

impl BundleTable {
    /// Path of a previously recorded artifact with exactly this content.
    pub fn lookup(&self, code: &str) -> Option<&Path> {
        self.artifacts
            .get(&fingerprint(code, hash::MAX_LEN))?
            .iter()
            .find(|(content, _)| content == code)
            .map(|(_, path)| path.as_path())
    }

    pub fn record(&mut self, code: String, path: PathBuf) {
        self.artifacts
            .entry(fingerprint(&code, hash::MAX_LEN))
            .or_default()
            .push((code, path));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.artifacts.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Replace a group's members with one `<script src>` pointing at its artifact.
pub fn materialize(
    doc: &mut Document,
    group: BundleGroup,
    dirs: &PageDirs,
    ctx: &mut BuildContext<'_>,
) -> Result<()> {
    let Some((first, _)) = group.members.first() else {
        return Ok(());
    };

    let script = doc
        .create_element("script")
        .ok_or_else(|| anyhow!("failed to create bundle element for `{}`", group.name))?;
    doc.insert_before(&script, first);

    let mut codes = Vec::with_capacity(group.members.len());
    for (id, kind) in &group.members {
        let external = doc
            .element(id)
            .and_then(|el| el.attr("src"))
            .filter(|src| is_external_ref(src.trim()));
        if let Some(src) = external {
            log!("warning"; "`{src}` is external and cannot join bundle `{}`, dropped", group.name);
        }

        codes.push(process_script(doc, id, *kind, dirs, ctx)?);
        doc.detach(id);
    }
    let code = codes.join("\n");

    let path = match ctx.bundles.lookup(&code) {
        Some(path) => {
            ctx.stats.bundles_reused += 1;
            path.to_path_buf()
        }
        None => {
            let placed = place(&dirs.root.join(format!("{}.js", group.name)), &code, ctx.hash_len())?;
            if placed.reused {
                ctx.stats.bundles_reused += 1;
            } else {
                ctx.stats.bundles_written += 1;
            }
            ctx.bundles.record(code, placed.path.clone());
            placed.path
        }
    };

    let src = relative_ref(&path, &dirs.root)
        .ok_or_else(|| anyhow!("bundle `{}` resolved outside the output root", group.name))?;
    debug!("bundle"; "{} ({} scripts) -> {src}", group.name, group.members.len());

    if let Some(mut el) = doc.element(&script) {
        if group.is_module() {
            el.set_attr("type", "module");
        }
        el.set_attr("src", &src);
    }
    Ok(())
}
