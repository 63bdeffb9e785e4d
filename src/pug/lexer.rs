// src/pug/lexer.rs

//! Splits template source into indented lines.

use std::path::Path;

use super::PugError;

/// One physical line of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: usize,
    /// Width of the leading whitespace, in characters.
    pub indent: usize,
    /// Line content with indentation and trailing whitespace removed.
    pub content: String,
    /// The line without its newline, used for raw text blocks.
    pub raw: String,
}

impl SourceLine {
    pub fn is_blank(&self) -> bool {
        self.content.is_empty()
    }
}

/// Indentation character seen first in a file; mixing is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentStyle {
    Spaces,
    Tabs,
}

pub fn lex(source: &str, path: &Path) -> Result<Vec<SourceLine>, PugError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut style: Option<IndentStyle> = None;
    let mut lines = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let raw = raw.trim_end_matches('\r');
        let content = raw.trim();

        let leading: &str = &raw[..raw.len() - raw.trim_start().len()];
        if !content.is_empty() && !leading.is_empty() {
            let line_style = indent_style(leading).ok_or_else(|| {
                PugError::new(path, number, "mixed tabs and spaces in indentation")
            })?;
            match style {
                None => style = Some(line_style),
                Some(s) if s != line_style => {
                    return Err(PugError::new(
                        path,
                        number,
                        "inconsistent indentation: file mixes tab- and space-indented lines",
                    ));
                }
                Some(_) => {}
            }
        }

        lines.push(SourceLine {
            number,
            indent: leading.chars().count(),
            content: content.to_string(),
            raw: raw.to_string(),
        });
    }

    Ok(lines)
}

fn indent_style(leading: &str) -> Option<IndentStyle> {
    if leading.chars().all(|c| c == ' ') {
        Some(IndentStyle::Spaces)
    } else if leading.chars().all(|c| c == '\t') {
        Some(IndentStyle::Tabs)
    } else {
        None
    }
}
