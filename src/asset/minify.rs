//! Minification engines for JS, CSS and markup.
//!
//! Uses oxc for JavaScript, lightningcss for CSS and minify-html for the
//! final document text.

use std::collections::BTreeMap;

use anyhow::Result;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer_plugins::{ReplaceGlobalDefines, ReplaceGlobalDefinesConfig};

use super::transform::{ScriptKind, TransformError};
use crate::config::{HtmlConfig, JsConfig};

// ============================================================================
// JavaScript
// ============================================================================

/// Options for [`minify_js`], built once per run from `[js]`.
#[derive(Debug, Clone)]
pub struct JsOptions {
    pub compress: bool,
    pub mangle: bool,
    pub drop_console: bool,
    pub drop_debugger: bool,
    pub defines: BTreeMap<String, String>,
}

impl From<&JsConfig> for JsOptions {
    fn from(config: &JsConfig) -> Self {
        Self {
            compress: config.compress,
            mangle: config.mangle,
            drop_console: config.drop_console,
            drop_debugger: config.drop_debugger,
            defines: config.defines.clone(),
        }
    }
}

/// Minify JavaScript source code.
///
/// Defines are substituted before compression so the compressor can fold
/// branches guarded by them (`if (DEBUG) { ... }` disappears).
pub fn minify_js(source: &str, kind: ScriptKind, options: &JsOptions) -> Result<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs().with_module(kind == ScriptKind::Module);

    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(TransformError::Syntax { kind: "js", message }.into());
    }
    let mut program = ret.program;

    if !options.defines.is_empty() {
        let defines: Vec<(&str, &str)> = options
            .defines
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let config = ReplaceGlobalDefinesConfig::new(&defines).map_err(|errors| {
            TransformError::Syntax {
                kind: "js define",
                message: errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            }
        })?;
        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        ReplaceGlobalDefines::new(&allocator, config).build(scoping, &mut program);
    }

    let compress = options.compress.then(|| CompressOptions {
        drop_console: options.drop_console,
        drop_debugger: options.drop_debugger,
        ..CompressOptions::smallest()
    });
    let mangle = options.mangle.then(MangleOptions::default);

    let ret = Minifier::new(MinifierOptions { mangle, compress }).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

// ============================================================================
// CSS
// ============================================================================

/// Add vendor prefixes required by `browsers`, keeping the output readable.
pub fn prefix_css(source: &str, browsers: Option<Browsers>) -> Result<String> {
    let targets = Targets {
        browsers,
        ..Targets::default()
    };
    let mut stylesheet = StyleSheet::parse(source, ParserOptions::default()).map_err(css_error)?;
    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(css_error)?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: false,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(css_error)?;
    Ok(result.code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Result<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).map_err(css_error)?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(css_error)?;
    Ok(result.code)
}

fn css_error(err: impl std::fmt::Display) -> TransformError {
    TransformError::Syntax {
        kind: "css",
        message: err.to_string(),
    }
}

// ============================================================================
// Markup
// ============================================================================

/// Collapse insignificant whitespace and strip comments from markup.
///
/// Styles and scripts were already minified by the pipeline, so the
/// embedded minifiers stay off.
pub fn minify_html(source: &str, config: &HtmlConfig) -> Result<String> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = config.keep_comments;
    cfg.minify_css = false;
    cfg.minify_js = false;

    let bytes = minify_html::minify(source.as_bytes(), &cfg);
    Ok(String::from_utf8(bytes)?)
}
