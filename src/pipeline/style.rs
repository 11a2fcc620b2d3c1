//! Stylesheet processing.
//!
//! Linked stylesheets are (optionally) preprocessed, prefixed, minified and
//! written under a fingerprinted name next to their source; inline `<style>`
//! blocks are minified in place. All links are handled before any inline
//! block, each group in document order.

use std::fs;

use anyhow::{Context, Result};

use super::{BuildContext, PageDirs};
use crate::asset::place;
use crate::dom::{AttrAccess, Document, NodeId};
use crate::utils::path::{href_file_name, is_external_ref, replace_file_name, split_query, strip_ext};
use crate::{debug, log};

/// `rel` value selecting the preprocessor.
const LESS_REL: &str = "stylesheet/less";

pub fn process_styles(doc: &mut Document, dirs: &PageDirs, ctx: &mut BuildContext<'_>) -> Result<()> {
    for id in doc.select("link") {
        process_link(doc, &id, dirs, ctx)?;
    }
    for (index, id) in doc.select("style").iter().enumerate() {
        process_inline_style(doc, id, ctx)
            .with_context(|| format!("failed to process inline <style> #{}", index + 1))?;
    }
    Ok(())
}

/// How a `<link>` takes part in stylesheet processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkRel {
    Stylesheet,
    Less,
}

impl LinkRel {
    /// `None` for icons, preloads and anything else that isn't a stylesheet.
    fn classify(rel: Option<&str>) -> Option<Self> {
        let rel = rel?.trim();
        if rel.eq_ignore_ascii_case(LESS_REL) {
            return Some(Self::Less);
        }
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            .then_some(Self::Stylesheet)
    }
}

fn process_link(
    doc: &mut Document,
    id: &NodeId,
    dirs: &PageDirs,
    ctx: &mut BuildContext<'_>,
) -> Result<()> {
    let Some(el) = doc.element(id) else {
        return Ok(());
    };
    let Some(rel) = LinkRel::classify(el.attr("rel").as_deref()) else {
        return Ok(());
    };

    let href = el.attr("href").unwrap_or_default().trim().to_string();
    if href.is_empty() {
        log!("warning"; "stylesheet link without href, left unchanged");
        return Ok(());
    }
    if is_external_ref(&href) {
        debug!("css"; "{href}: external, skipped");
        return Ok(());
    }

    let (file_ref, suffix) = split_query(&href);
    let path = dirs.resolve(file_ref);
    let source = fs::read_to_string(&path)
        .with_context(|| format!("failed to read stylesheet `{}`", path.display()))?;

    let css = match rel {
        LinkRel::Less => {
            let base_dir = path.parent().unwrap_or(&dirs.base);
            let file_name = href_file_name(file_ref);
            ctx.transforms
                .preprocess(&source, base_dir, file_name)
                .with_context(|| format!("failed to preprocess `{}`", path.display()))?
        }
        LinkRel::Stylesheet => source,
    };
    let css = minify_css(&css, ctx).with_context(|| format!("in `{}`", path.display()))?;

    let stem = strip_ext(href_file_name(file_ref), &["css", "less"]).to_string();
    let placed = place(&path.with_file_name(format!("{stem}.css")), &css, ctx.hash_len())?;
    ctx.stats.record_placed(&placed);
    ctx.stats.stylesheets += 1;

    let new_href = format!("{}{suffix}", replace_file_name(file_ref, &placed.file_name()));
    debug!("css"; "{href} -> {new_href}{}", if placed.reused { " (reused)" } else { "" });

    let Some(mut el) = doc.element(id) else {
        return Ok(());
    };
    if rel == LinkRel::Less {
        el.set_attr("rel", "stylesheet");
    }
    if el.has_attr("type") {
        el.set_attr("type", "text/css");
    }
    el.set_attr("href", &new_href);
    // The digest was computed over the unminified file
    el.remove_attr("integrity");
    Ok(())
}

fn process_inline_style(doc: &mut Document, id: &NodeId, ctx: &mut BuildContext<'_>) -> Result<()> {
    let text = doc.text(id);
    if text.trim().is_empty() {
        return Ok(());
    }
    let css = minify_css(&text, ctx)?;
    doc.set_text(id, &css);
    ctx.stats.stylesheets += 1;
    Ok(())
}

/// Vendor-prefix then minify.
fn minify_css(source: &str, ctx: &BuildContext<'_>) -> Result<String> {
    let prefixed = ctx.transforms.prefix_css(source)?;
    ctx.transforms.minify_css(&prefixed)
}
