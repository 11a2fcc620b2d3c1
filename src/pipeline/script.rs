//! Script processing.
//!
//! 1. Scripts carrying [`REMOVE_MARKER`] are deleted.
//! 2. Scripts carrying [`BUNDLE_MARKER`] are grouped by bundle name.
//! 3. Every other script is minified on its own: external files are written
//!    under a fingerprinted name, inline code is replaced in place.
//! 4. Each bundle group is materialized as a single `<script src>`.

use std::fs;

use anyhow::{Context, Result};

use super::bundle::{self, BundleGroup};
use super::{BuildContext, PageDirs, PipelineError};
use crate::asset::{ScriptKind, place};
use crate::dom::{AttrAccess, Document, NodeId};
use crate::utils::path::{href_file_name, is_external_ref, replace_file_name, split_query, strip_ext};
use crate::{debug, log};

/// Boolean attribute: drop the script from the output.
pub const REMOVE_MARKER: &str = "@remove";

/// Attribute whose value names the bundle a script belongs to.
pub const BUNDLE_MARKER: &str = "@bundle";

pub fn process_scripts(
    doc: &mut Document,
    document: &str,
    dirs: &PageDirs,
    ctx: &mut BuildContext<'_>,
) -> Result<()> {
    remove_marked(doc);

    let mut groups: Vec<BundleGroup> = Vec::new();
    for id in doc.select("script") {
        let Some(el) = doc.element(&id) else {
            continue;
        };
        let Some(kind) = ScriptKind::from_type_attr(el.attr("type").as_deref()) else {
            continue;
        };

        if let Some(name) = el.attr(BUNDLE_MARKER) {
            let name = validate_bundle_name(&name, document)?;
            match groups.iter_mut().find(|g| g.name == name) {
                Some(group) => group.push(id, kind),
                None => groups.push(BundleGroup::new(name, id, kind)),
            }
            continue;
        }

        process_script(doc, &id, kind, dirs, ctx)?;
    }

    for group in groups {
        bundle::materialize(doc, group, dirs, ctx)?;
    }
    Ok(())
}

fn remove_marked(doc: &mut Document) {
    let marked: Vec<NodeId> = doc
        .select("script")
        .into_iter()
        .filter(|id| doc.element(id).is_some_and(|el| el.has_attr(REMOVE_MARKER)))
        .collect();
    for id in &marked {
        doc.detach(id);
    }
}

/// Trimmed bundle name, or an error if it is empty or escapes the output root.
fn validate_bundle_name(name: &str, document: &str) -> Result<String, PipelineError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PipelineError::UnnamedBundle {
            document: document.to_string(),
        });
    }
    let escapes = name.starts_with(['/', '\\'])
        || name.contains(':')
        || name.split(['/', '\\']).any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if escapes {
        return Err(PipelineError::InvalidBundleName {
            document: document.to_string(),
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

/// Minify one script and return its code.
///
/// - local `src`: file minified, written fingerprinted, `src` rewritten
/// - inline: text replaced with the minified code
/// - empty or external `src`: left unchanged, contributes no code
pub(super) fn process_script(
    doc: &mut Document,
    id: &NodeId,
    kind: ScriptKind,
    dirs: &PageDirs,
    ctx: &mut BuildContext<'_>,
) -> Result<String> {
    let src = doc
        .element(id)
        .and_then(|el| el.attr("src"))
        .map(|s| s.trim().to_string());

    let Some(src) = src else {
        let text = doc.text(id);
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let code = ctx
            .transforms
            .minify_js(&text, kind)
            .context("failed to minify inline script")?;
        doc.set_text(id, &code);
        ctx.stats.scripts += 1;
        return Ok(code);
    };

    if src.is_empty() {
        log!("warning"; "script with empty src, left unchanged");
        return Ok(String::new());
    }
    if is_external_ref(&src) {
        debug!("js"; "{src}: external, skipped");
        return Ok(String::new());
    }

    let (file_ref, suffix) = split_query(&src);
    let path = dirs.resolve(file_ref);
    let source = fs::read_to_string(&path)
        .with_context(|| format!("failed to read script `{}`", path.display()))?;
    let code = ctx
        .transforms
        .minify_js(&source, kind)
        .with_context(|| format!("failed to minify `{}`", path.display()))?;

    let stem = strip_ext(href_file_name(file_ref), &["js"]).to_string();
    let placed = place(&path.with_file_name(format!("{stem}.js")), &code, ctx.hash_len())?;
    ctx.stats.record_placed(&placed);
    ctx.stats.scripts += 1;

    let new_src = format!("{}{suffix}", replace_file_name(file_ref, &placed.file_name()));
    debug!("js"; "{src} -> {new_src}{}", if placed.reused { " (reused)" } else { "" });
    if let Some(mut el) = doc.element(id) {
        el.set_attr("src", &new_src);
        el.remove_attr("integrity");
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FakeTransforms, page, test_site};
    use crate::utils::hash::fingerprint;
    use std::path::Path;
    use tempfile::TempDir;

    fn run(dir: &Path, body: &str) -> Result<String> {
        let config = test_site(dir);
        let dirs = PageDirs::new(&config.build.output.join("index.html"), &config.build.output);
        let mut ctx = BuildContext::new(&config, &FakeTransforms);
        let mut doc = Document::parse(&page("", body));
        process_scripts(&mut doc, "index.html", &dirs, &mut ctx)?;
        Ok(doc.serialize()?)
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join("dist").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_removed_scripts_vanish() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dev.js", "secret()");
        let html = run(
            dir.path(),
            r#"<p></p><script @remove src="dev.js"></script><script @remove @bundle="core">secret()</script>"#,
        )
        .unwrap();
        assert_eq!(html, page("", "<p></p>"));
        // nothing but the source file
        assert_eq!(fs::read_dir(dir.path().join("dist")).unwrap().count(), 1);
    }

    #[test]
    fn test_single_script_rewritten() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "js/app.js", "  run();  ");
        let html = run(dir.path(), r#"<script defer src="js/app.js" integrity="sha384-x" id="main"></script>"#).unwrap();

        let name = format!("app-{}.js", fingerprint("run()", 7));
        assert_eq!(
            html,
            page("", &format!(r#"<script defer="" src="js/{name}" id="main"></script>"#))
        );
        let written = fs::read_to_string(dir.path().join("dist/js").join(name)).unwrap();
        assert_eq!(written, "run()");
    }

    #[test]
    fn test_query_and_fragment_kept_after_rewrite() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app.js", "run()");
        let html = run(dir.path(), r#"<script src="app.js?v=2#main"></script>"#).unwrap();

        let name = format!("app-{}.js", fingerprint("run()", 7));
        assert_eq!(html, page("", &format!(r#"<script src="{name}?v=2#main"></script>"#)));
        assert!(dir.path().join("dist").join(&name).exists());
    }

    #[test]
    fn test_inline_script_minified() {
        let dir = TempDir::new().unwrap();
        let html = run(dir.path(), "<script>\n  go();\n  console.log(1);\n</script>").unwrap();
        assert_eq!(html, page("", "<script>go();</script>"));
    }

    #[test]
    fn test_non_js_types_untouched() {
        let dir = TempDir::new().unwrap();
        let input = r#"<script type="text/template"> <b> keep </b> </script><script type="application/json">{ "a": 1 }</script>"#;
        assert_eq!(run(dir.path(), input).unwrap(), page("", input));
    }

    #[test]
    fn test_external_and_empty_src_untouched() {
        let dir = TempDir::new().unwrap();
        let input = r#"<script src="https://cdn.example.com/x.js"></script><script src=""></script>"#;
        assert_eq!(run(dir.path(), input).unwrap(), page("", input));
    }

    #[test]
    fn test_bundle_name_validation() {
        assert!(matches!(
            validate_bundle_name("  ", "a.html"),
            Err(PipelineError::UnnamedBundle { .. })
        ));
        assert!(matches!(
            validate_bundle_name("../evil", "a.html"),
            Err(PipelineError::InvalidBundleName { .. })
        ));
        assert!(matches!(
            validate_bundle_name("/abs", "a.html"),
            Err(PipelineError::InvalidBundleName { .. })
        ));
        assert_eq!(validate_bundle_name(" vendor/core ", "a.html").unwrap(), "vendor/core");
    }

    #[test]
    fn test_script_error_propagates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.js", "syntax error");
        let err = run(dir.path(), r#"<script src="bad.js"></script>"#).unwrap_err();
        assert!(format!("{err:#}").contains("bad.js"));
    }
}
