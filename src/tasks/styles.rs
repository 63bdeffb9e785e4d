// src/tasks/styles.rs

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::Regex;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::types::TaskKind;

use super::{BuildTask, TaskReport};

/// Compiles the SCSS entry point and adds vendor prefixes.
#[derive(Debug)]
pub struct StylesTask {
    fs: Arc<dyn FileSystem>,
    entry: PathBuf,
    out_dir: PathBuf,
    browsers: Vec<String>,
}

impl StylesTask {
    pub fn from_config(cfg: &PipelineConfig, fs: Arc<dyn FileSystem>) -> Self {
        let section = cfg.styles();
        Self {
            fs,
            entry: cfg.resolve(&section.entry),
            out_dir: cfg.resolve(&section.out_dir),
            browsers: section.browsers.clone(),
        }
    }

    /// `out_dir/<entry stem>.css`.
    pub fn output_path(&self) -> PathBuf {
        let stem = self
            .entry
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "style".to_string());
        self.out_dir.join(format!("{stem}.css"))
    }

    fn error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::Stylesheet {
            path: self.entry.clone(),
            message: message.into(),
        }
    }
}

impl BuildTask for StylesTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Styles
    }

    fn run(&self) -> Result<TaskReport> {
        if !self.fs.is_file(&self.entry) {
            return Err(self.error("entry stylesheet not found"));
        }

        let css = compile_scss(self.fs.as_ref(), &self.entry).map_err(|m| self.error(m))?;
        let css = add_vendor_prefixes(&css, &self.browsers).map_err(|m| self.error(m))?;

        let out = self.output_path();
        self.fs.write(&out, css.as_bytes())?;
        debug!(entry = %self.entry.display(), out = %out.display(), "compiled stylesheet");

        Ok(TaskReport {
            written: vec![out],
            warnings: Vec::new(),
        })
    }
}

/// Lets the Sass compiler resolve `@use`/`@import` through [`FileSystem`].
#[derive(Debug)]
struct SassFs<'a>(&'a dyn FileSystem);

impl grass::Fs for SassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0.read(path).map_err(|e| io::Error::other(format!("{e:#}")))
    }
}

/// Compile an SCSS file to expanded (non-minified) CSS.
pub fn compile_scss(fs: &dyn FileSystem, entry: &Path) -> std::result::Result<String, String> {
    let sass_fs = SassFs(fs);
    let options = grass::Options::default()
        .fs(&sass_fs)
        .style(grass::OutputStyle::Expanded);
    grass::from_path(entry, &options).map_err(|e| e.to_string())
}

/// Add the vendor prefixes needed by `browsers` (browserslist queries).
///
/// Each declaration is prefixed on its own and the prefixed copies are
/// inserted above it. The original lines, comments, rule order and values are
/// kept as written. Prefixes that a rule already declares are not repeated.
pub fn add_vendor_prefixes(css: &str, browsers: &[String]) -> std::result::Result<String, String> {
    let browsers = Browsers::from_browserslist(browsers.iter().map(String::as_str))
        .map_err(|e| format!("invalid browser query: {e}"))?;
    let targets = Targets {
        browsers,
        ..Targets::default()
    };

    let lines: Vec<&str> = css.lines().collect();
    let blocks = enclosing_blocks(&lines);

    let mut declared_names = HashSet::new();
    let mut declared = HashSet::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(decl) = Declaration::parse(line) {
            declared_names.insert((blocks[idx], decl.name.to_string()));
            declared.insert((blocks[idx], decl.name.to_string(), decl.value.to_string()));
        }
    }

    let mut cache: HashMap<(String, String), Vec<(String, String)>> = HashMap::new();
    let mut out = String::with_capacity(css.len() + css.len() / 8);

    for (idx, line) in lines.iter().enumerate() {
        if let Some(decl) = Declaration::parse(line).filter(|d| !d.name.starts_with('-')) {
            let copies = cache
                .entry((decl.name.to_string(), decl.value.to_string()))
                .or_insert_with(|| prefixed_copies(decl.name, decl.value, &targets));

            for (name, value) in copies.iter() {
                let block = blocks[idx];
                let already = if name == decl.name {
                    declared.contains(&(block, name.clone(), value.clone()))
                } else {
                    declared_names.contains(&(block, name.clone()))
                };
                if !already {
                    out.push_str(decl.indent);
                    out.push_str(name);
                    out.push_str(": ");
                    out.push_str(value);
                    out.push_str(";\n");
                }
            }
        }
        out.push_str(line);
        out.push('\n');
    }

    Ok(out)
}

/// `  name: value;` on a line of its own, as the Sass compiler prints it.
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)([A-Za-z-][\w-]*)\s*:\s*(.+?)\s*;\s*$").expect("declaration regex")
});

const VENDOR_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-"];

#[derive(Debug)]
struct Declaration<'a> {
    indent: &'a str,
    name: &'a str,
    value: &'a str,
}

impl<'a> Declaration<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let caps = DECLARATION.captures(line)?;
        let name = caps.get(2)?.as_str();
        if name.starts_with("--") {
            return None;
        }
        Some(Self {
            indent: caps.get(1)?.as_str(),
            name,
            value: caps.get(3)?.as_str(),
        })
    }
}

/// For each line, the index of the line that opened its innermost block.
fn enclosing_blocks(lines: &[&str]) -> Vec<usize> {
    let mut stack: Vec<usize> = Vec::new();
    let mut ids = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        ids.push(stack.last().copied().unwrap_or(usize::MAX));
        for c in line.chars() {
            match c {
                '{' => stack.push(idx),
                '}' => {
                    stack.pop();
                }
                _ => {}
            }
        }
    }
    ids
}

/// The vendor-prefixed declarations `browsers` need for `name: value`, in
/// the order they go above it.
///
/// A prefixed property whose value lightningcss leaves unchanged reuses the
/// original value text.
fn prefixed_copies(name: &str, value: &str, targets: &Targets) -> Vec<(String, String)> {
    let source = format!("a{{{name}:{value}}}");
    let printed = match prefix_rule(&source, targets) {
        Ok(code) => code,
        Err(err) => {
            debug!(property = name, "not prefixing declaration: {err}");
            return Vec::new();
        }
    };
    let body = match (printed.find('{'), printed.rfind('}')) {
        (Some(open), Some(close)) if open < close => &printed[open + 1..close],
        _ => return Vec::new(),
    };

    let decls: Vec<(&str, &str)> = split_declarations(body)
        .into_iter()
        .filter_map(|d| d.split_once(':'))
        .map(|(n, v)| (n.trim(), v.trim()))
        .collect();
    let unprefixed = decls.iter().rposition(|(n, _)| *n == name);
    let unprefixed_value = unprefixed.map(|i| decls[i].1);

    decls
        .iter()
        .enumerate()
        .filter(|(i, (n, v))| {
            Some(*i) != unprefixed
                && (has_vendor_prefix(n)
                    || (*n == name && VENDOR_PREFIXES.iter().any(|p| v.contains(p))))
        })
        .map(|(_, (n, v))| {
            let value = if Some(*v) == unprefixed_value {
                value.to_string()
            } else {
                v.to_string()
            };
            (n.to_string(), value)
        })
        .collect()
}

fn prefix_rule(source: &str, targets: &Targets) -> std::result::Result<String, String> {
    let mut sheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets: targets.clone(),
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(printed.code)
}

fn has_vendor_prefix(name: &str) -> bool {
    VENDOR_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Split a declaration list on `;`, ignoring separators inside strings and
/// parentheses.
fn split_declarations(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < body.len() {
        parts.push(&body[start..]);
    }
    parts.retain(|p| !p.trim().is_empty());
    parts
}
