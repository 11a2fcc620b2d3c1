//! Build orchestration.
//!
//! Build phases:
//! - **Prepare** - clear the output root and copy the source tree into it
//! - **Collect** - markup documents directly under the output root
//! - **Process** - run every document through the pipeline, one at a time
//! - **Summary** - counts of processed and written files

use crate::{
    asset::{Toolchain, Transforms},
    config::StampConfig,
    debug, log,
    pipeline::{BuildContext, BuildStats, process_document},
};
use anyhow::{Context, Result};
use jwalk::WalkDir;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Files never copied into the output.
const IGNORED_FILE_NAME: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Build the output tree with the configured engines.
pub fn build(config: &StampConfig) -> Result<BuildStats> {
    let toolchain = Toolchain::new(config)?;
    build_with(config, &toolchain)
}

/// Build the output tree using `transforms`.
///
/// The first failing document aborts the run.
pub fn build_with(config: &StampConfig, transforms: &dyn Transforms) -> Result<BuildStats> {
    let copied = prepare_output(&config.build.source, &config.build.output)?;
    debug!("build"; "copied {} into {}", count(copied, "file"), config.root_relative(&config.build.output).display());

    let documents = collect_documents(config)?;
    if documents.is_empty() {
        log!("warning"; "no documents found in `{}`", config.root_relative(&config.build.output).display());
    }

    let mut ctx = BuildContext::new(config, transforms);
    for path in &documents {
        process_document(path, &mut ctx)?;
        log!("build"; "{}", config.root_relative(path).display());
    }

    let stats = ctx.stats;
    log!(
        "build";
        "done: {}, {}, {}, {} ({} reused)",
        count(stats.documents, "document"),
        count(stats.stylesheets, "stylesheet"),
        count(stats.scripts, "script"),
        count(stats.bundles_written, "bundle"),
        stats.bundles_reused
    );
    Ok(stats)
}

/// Clear `output` and copy every file of `source` into it.
///
/// Returns the number of files copied.
fn prepare_output(source: &Path, output: &Path) -> Result<usize> {
    if output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("failed to clear output `{}`", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create output `{}`", output.display()))?;

    let mut copied = 0;
    for entry in WalkDir::new(source).skip_hidden(false).sort(true) {
        let entry = entry.with_context(|| format!("failed to walk `{}`", source.display()))?;
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(source) else {
            continue;
        };
        let dest = output.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("failed to create `{}`", dest.display()))?;
        } else if entry.file_type().is_file() {
            let name = entry.file_name().to_string_lossy();
            if IGNORED_FILE_NAME.iter().any(|ignored| *ignored == name) {
                continue;
            }
            fs::copy(&path, &dest).with_context(|| {
                format!("failed to copy `{}` to `{}`", path.display(), dest.display())
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Markup documents directly under the output root, sorted by name.
fn collect_documents(config: &StampConfig) -> Result<Vec<PathBuf>> {
    let output = &config.build.output;
    let mut documents: Vec<PathBuf> = fs::read_dir(output)
        .with_context(|| format!("failed to read `{}`", output.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && config.build.is_document(p))
        .collect();
    documents.sort();
    Ok(documents)
}

/// `count(1, "file")` -> `1 file`, `count(2, "file")` -> `2 files`
fn count(n: usize, noun: &str) -> String {
    format!("{n} {noun}{}", if n == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::pipeline::FakeTransforms;
    use crate::utils::hash::fingerprint;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let path = e.path();
                let rel = path.strip_prefix(dir).unwrap().to_path_buf();
                (rel, fs::read(&path).unwrap())
            })
            .collect();
        files.sort();
        files
    }

    fn site(dir: &Path) -> StampConfig {
        let config = test_config(dir);
        let app = &config.build.source;
        write(&app.join("css/site.css"), "body { margin: 0; }");
        write(&app.join("js/a.js"), "console.log(1)");
        write(&app.join("js/b.js"), "console.log(2)");
        write(
            &app.join("index.html"),
            concat!(
                r#"<!DOCTYPE html><html><head><link rel="stylesheet" href="css/site.css">"#,
                r#"<link rel="stylesheet" href="https://cdn.example.com/a.css"></head>"#,
                r#"<body><script @bundle="core" src="js/a.js"></script>"#,
                r#"<script @bundle="core" src="js/b.js"></script></body></html>"#,
            ),
        );
        write(
            &app.join("about.htm"),
            r#"<html><body><script @bundle="core" src="js/a.js"></script><script @bundle="core" src="js/b.js"></script><style> p { x: y } </style></body></html>"#,
        );
        write(&app.join("docs/nested.html"), r#"<script src="../js/a.js"></script>"#);
        config
    }

    #[test]
    fn test_build_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path());
        let stats = build_with(&config, &FakeTransforms).unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.bundles_written, 1);
        assert_eq!(stats.bundles_reused, 1);

        let out = &config.build.output;
        let bundle = format!("core-{}.js", fingerprint("\n", 7));
        let css = format!("site-{}.css", fingerprint("body{margin:0;}", 7));

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains(&format!(r#"href="css/{css}""#)));
        assert!(index.contains(r#"href="https://cdn.example.com/a.css""#));
        assert!(index.ends_with(&format!(r#"<body><script src="{bundle}"></script></body></html>"#)));

        let about = fs::read_to_string(out.join("about.htm")).unwrap();
        assert!(about.contains(&format!(r#"<script src="{bundle}"></script>"#)));
        assert!(about.contains("<style>p{x:y}</style>"));

        // Only top-level documents are processed
        let nested = fs::read_to_string(out.join("docs/nested.html")).unwrap();
        assert_eq!(nested, r#"<script src="../js/a.js"></script>"#);
    }

    #[test]
    fn test_build_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path());

        build_with(&config, &FakeTransforms).unwrap();
        let first = snapshot(&config.build.output);
        build_with(&config, &FakeTransforms).unwrap();
        let second = snapshot(&config.build.output);
        assert_eq!(first, second);
    }

    #[test]
    fn test_prepare_output_clears_stale_files() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path());
        write(&config.build.output.join("stale.txt"), "old");
        write(&config.build.source.join(".htaccess"), "deny");
        write(&config.build.source.join(".DS_Store"), "");

        prepare_output(&config.build.source, &config.build.output).unwrap();
        assert!(!config.build.output.join("stale.txt").exists());
        assert!(config.build.output.join(".htaccess").exists());
        assert!(!config.build.output.join(".DS_Store").exists());
        assert!(config.build.output.join("js/a.js").exists());
    }

    #[test]
    fn test_collect_documents_sorted_top_level() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path());
        prepare_output(&config.build.source, &config.build.output).unwrap();

        let names: Vec<_> = collect_documents(&config)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["about.htm", "index.html"]);
    }

    #[test]
    fn test_failing_document_aborts_run() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        write(
            &config.build.source.join("index.html"),
            r#"<script @bundle="  " src="a.js"></script>"#,
        );
        assert!(build_with(&config, &FakeTransforms).is_err());
    }

    #[test]
    fn test_count() {
        assert_eq!(count(0, "file"), "0 files");
        assert_eq!(count(1, "file"), "1 file");
    }
}
