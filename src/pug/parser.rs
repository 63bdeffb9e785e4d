// src/pug/parser.rs

//! Indentation-driven parser producing the template AST.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::ast::{Attr, AttrValue, BlockMode, Element, Inline, Node};
use super::lexer::{lex, SourceLine};
use super::PugError;

/// Tag name followed by `.class` / `#id` shorthand, e.g. `a.btn#go`.
///
/// A name never ends in `:`, which is left for block expansion (`li: a`).
static TAG_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z](?:[\w:-]*\w)?)?((?:[.#][A-Za-z_-][\w-]*)*)").expect("tag head regex")
});

/// One `.class` or `#id` shorthand, as found after an attribute list.
static SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[.#][A-Za-z_-][\w-]*").expect("shorthand regex"));

/// Keywords for constructs that need a JavaScript runtime.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "each", "for", "while", "if", "else", "unless", "case", "when", "default", "mixin",
    "yield",
];

/// Parse template source into top-level nodes.
pub fn parse(source: &str, path: &Path) -> Result<Vec<Node>, PugError> {
    let lines = lex(source, path)?;
    let mut parser = Parser {
        lines: &lines,
        pos: 0,
        path,
    };
    parser.parse_children(None)
}

/// What follows the tag head and attribute list on a tag line.
enum TagRest<'s> {
    None,
    Text(&'s str),
    TextBlock,
    Expansion(&'s str),
}

struct Parser<'a> {
    lines: &'a [SourceLine],
    pos: usize,
    path: &'a Path,
}

impl<'a> Parser<'a> {
    fn err(&self, line: usize, message: impl Into<String>) -> PugError {
        PugError::new(self.path, line, message)
    }

    /// Parse sibling lines indented deeper than `parent_indent`.
    fn parse_children(&mut self, parent_indent: Option<usize>) -> Result<Vec<Node>, PugError> {
        let lines = self.lines;
        let mut nodes = Vec::new();
        let mut block_indent: Option<usize> = None;

        while self.pos < lines.len() {
            let line = &lines[self.pos];
            if line.is_blank() {
                self.pos += 1;
                continue;
            }
            if let Some(parent) = parent_indent {
                if line.indent <= parent {
                    break;
                }
            }

            match block_indent {
                None => block_indent = Some(line.indent),
                Some(expected) if line.indent < expected => {
                    return Err(self.err(line.number, "inconsistent indentation"));
                }
                Some(expected) if line.indent > expected => {
                    return Err(self.err(line.number, "unexpected indentation"));
                }
                Some(_) => {}
            }

            if let Some(node) = self.parse_line()? {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    /// Parse the line at `self.pos` together with everything nested under it.
    fn parse_line(&mut self) -> Result<Option<Node>, PugError> {
        let lines = self.lines;
        let line = &lines[self.pos];
        self.pos += 1;

        let content = line.content.as_str();
        let number = line.number;
        let indent = line.indent;

        if content.starts_with("//-") {
            self.take_raw_block(indent);
            return Ok(None);
        }
        if let Some(rest) = content.strip_prefix("//") {
            let mut text = rest.to_string();
            let body = self.take_raw_block(indent);
            if !body.is_empty() {
                text.push('\n');
                text.push_str(&body.join("\n"));
                text.push('\n');
            }
            return Ok(Some(Node::Comment(text)));
        }
        if let Some(rest) = content.strip_prefix('|') {
            let text = rest.strip_prefix(' ').unwrap_or(rest);
            self.ensure_no_children(indent, "piped text")?;
            return Ok(Some(Node::Text(self.parse_inline(text, number)?)));
        }
        if content.starts_with('<') {
            self.ensure_no_children(indent, "literal HTML")?;
            return Ok(Some(Node::Text(self.parse_inline(content, number)?)));
        }

        let (word, rest) = split_word(content);
        match word {
            "doctype" => {
                self.ensure_no_children(indent, "doctype")?;
                let value = if rest.is_empty() { "html" } else { rest };
                return Ok(Some(Node::Doctype(value.to_string())));
            }
            "include" => {
                self.ensure_no_children(indent, "include")?;
                if rest.is_empty() {
                    return Err(self.err(number, "include requires a path"));
                }
                return Ok(Some(Node::Include {
                    path: rest.to_string(),
                    line: number,
                }));
            }
            "extends" => {
                self.ensure_no_children(indent, "extends")?;
                if rest.is_empty() {
                    return Err(self.err(number, "extends requires a path"));
                }
                return Ok(Some(Node::Extends {
                    path: rest.to_string(),
                    line: number,
                }));
            }
            "block" => {
                let (mode, name) = match split_word(rest) {
                    ("append", name) => (BlockMode::Append, name),
                    ("prepend", name) => (BlockMode::Prepend, name),
                    _ => (BlockMode::Replace, rest),
                };
                return self.parse_block(mode, name, number, indent).map(Some);
            }
            "append" => return self.parse_block(BlockMode::Append, rest, number, indent).map(Some),
            "prepend" => {
                return self.parse_block(BlockMode::Prepend, rest, number, indent).map(Some);
            }
            w if w.starts_with("include:") => {
                return Err(self.err(number, "unsupported pug syntax: include filters"));
            }
            w if UNSUPPORTED_KEYWORDS.contains(&w) => {
                return Err(self.err(number, format!("unsupported pug syntax: {w}")));
            }
            _ => {}
        }

        if content.starts_with('-') || content.starts_with('=') || content.starts_with("!=") {
            return Err(self.err(number, "unsupported pug syntax: code"));
        }
        if content.starts_with('+') {
            return Err(self.err(number, "unsupported pug syntax: mixin call"));
        }
        if content.starts_with(':') {
            return Err(self.err(number, "unsupported pug syntax: filters"));
        }

        let element = self.parse_tag_line(content, number, indent)?;
        Ok(Some(Node::Element(element)))
    }

    fn parse_block(
        &mut self,
        mode: BlockMode,
        name: &str,
        number: usize,
        indent: usize,
    ) -> Result<Node, PugError> {
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(self.err(number, format!("invalid block name {name:?}")));
        }
        let children = self.parse_children(Some(indent))?;
        Ok(Node::Block {
            name: name.to_string(),
            mode,
            children,
            line: number,
        })
    }

    /// Parse a tag line, including attribute lists spanning several lines,
    /// inline text, block expansion and everything nested under it.
    fn parse_tag_line(
        &mut self,
        content: &str,
        number: usize,
        indent: usize,
    ) -> Result<Element, PugError> {
        let source = self.join_attr_continuations(content, number)?;
        let (mut element, rest) = self.parse_tag_head(&source, number)?;

        match rest {
            TagRest::None => {
                element.children = self.parse_children(Some(indent))?;
            }
            TagRest::Text(text) => {
                element.children.push(Node::Text(self.parse_inline(text, number)?));
                element.children.extend(self.parse_children(Some(indent))?);
            }
            TagRest::TextBlock => {
                let body = self.take_raw_block(indent);
                if !body.is_empty() {
                    element
                        .children
                        .push(Node::Text(vec![Inline::Text(body.join("\n"))]));
                }
            }
            TagRest::Expansion(inner) => {
                let child = self.parse_tag_line(inner, number, indent)?;
                element.children.push(Node::Element(child));
            }
        }

        if element.is_void() && !element.children.is_empty() {
            return Err(self.err(
                number,
                format!("self-closing element <{}> cannot have content", element.name),
            ));
        }

        Ok(element)
    }

    /// If the attribute list opened on this line is not closed, pull in the
    /// following lines until it is.
    fn join_attr_continuations(&mut self, content: &str, number: usize) -> Result<String, PugError> {
        let head_end = TAG_HEAD.find(content).map_or(0, |m| m.end());
        let after_head = &content[head_end..];
        if !after_head.starts_with('(') || find_closing(after_head, '(', ')').is_some() {
            return Ok(content.to_string());
        }

        let lines = self.lines;
        let mut joined = content.to_string();
        while self.pos < lines.len() {
            let next = &lines[self.pos];
            self.pos += 1;
            joined.push(' ');
            joined.push_str(&next.content);
            if find_closing(&joined[head_end..], '(', ')').is_some() {
                return Ok(joined);
            }
        }

        Err(self.err(number, "unterminated attribute list"))
    }

    fn parse_tag_head<'s>(
        &self,
        source: &'s str,
        number: usize,
    ) -> Result<(Element, TagRest<'s>), PugError> {
        let caps = TAG_HEAD
            .captures(source)
            .ok_or_else(|| self.err(number, format!("unexpected text {source:?}")))?;
        let head_end = caps.get(0).map_or(0, |m| m.end());
        if head_end == 0 {
            return Err(self.err(number, format!("unexpected text {source:?}")));
        }

        let mut element = Element {
            name: caps
                .get(1)
                .map_or_else(|| "div".to_string(), |m| m.as_str().to_string()),
            ..Element::default()
        };

        let shorthand = caps.get(2).map_or("", |m| m.as_str());
        self.apply_shorthand(&mut element, shorthand, number)?;

        // Attribute lists and further shorthand may follow in any order:
        // `a(href='/').btn`, `div(a=1)(b=2)`.
        let mut rest = &source[head_end..];
        loop {
            if rest.starts_with('(') {
                let close = find_closing(rest, '(', ')')
                    .ok_or_else(|| self.err(number, "unterminated attribute list"))?;
                let attrs = self.parse_attrs(&rest[1..close], number)?;
                self.merge_attrs(&mut element, attrs);
                rest = &rest[close + 1..];
            } else if let Some(m) = SHORTHAND.find(rest) {
                self.apply_shorthand(&mut element, m.as_str(), number)?;
                rest = &rest[m.end()..];
            } else {
                break;
            }
        }
        if rest.starts_with("&attributes") {
            return Err(self.err(number, "unsupported pug syntax: &attributes"));
        }
        if let Some(r) = rest.strip_prefix('/') {
            element.self_closing = true;
            rest = r;
        }

        let tail = if rest.is_empty() {
            TagRest::None
        } else if rest == "." {
            TagRest::TextBlock
        } else if let Some(inner) = rest.strip_prefix(':') {
            let inner = inner.trim();
            if inner.is_empty() {
                return Err(self.err(number, "block expansion requires a nested tag"));
            }
            TagRest::Expansion(inner)
        } else if rest.starts_with('=') || rest.starts_with("!=") {
            return Err(self.err(number, "unsupported pug syntax: buffered code"));
        } else if let Some(text) = rest.strip_prefix(' ') {
            TagRest::Text(text)
        } else {
            return Err(self.err(number, format!("unexpected {rest:?} after tag")));
        };

        Ok((element, tail))
    }

    fn apply_shorthand(
        &self,
        element: &mut Element,
        shorthand: &str,
        number: usize,
    ) -> Result<(), PugError> {
        for (sigil, value) in split_shorthand(shorthand) {
            if sigil == '.' {
                element.classes.push(value.to_string());
            } else if element.id.is_some() {
                return Err(self.err(number, "element has more than one #id"));
            } else {
                element.id = Some(value.to_string());
            }
        }
        Ok(())
    }

    /// Fold `class` and `id` attributes into the shorthand fields.
    fn merge_attrs(&self, element: &mut Element, attrs: Vec<Attr>) {
        for attr in attrs {
            match (attr.name.as_str(), &attr.value) {
                ("class", AttrValue::Str { value, .. }) => {
                    element
                        .classes
                        .extend(value.split_whitespace().map(str::to_string));
                }
                ("id", AttrValue::Str { value, .. }) => element.id = Some(value.clone()),
                _ => element.attrs.push(attr),
            }
        }
    }

    fn parse_attrs(&self, inner: &str, number: usize) -> Result<Vec<Attr>, PugError> {
        let chars: Vec<char> = inner.chars().collect();
        let mut attrs = Vec::new();
        let mut i = 0;

        loop {
            while i < chars.len() && (chars[i].is_whitespace() || chars[i] == ',') {
                i += 1;
            }
            if i >= chars.len() {
                break;
            }

            let name = if is_quote(chars[i]) {
                self.read_quoted(&chars, &mut i, number)?
            } else {
                let start = i;
                while i < chars.len()
                    && !chars[i].is_whitespace()
                    && chars[i] != ','
                    && chars[i] != '='
                    && !(chars[i] == '!' && chars.get(i + 1) == Some(&'='))
                {
                    i += 1;
                }
                chars[start..i].iter().collect()
            };
            if name.is_empty() {
                return Err(self.err(number, "empty attribute name"));
            }

            skip_spaces(&chars, &mut i);
            let escape = if chars.get(i) == Some(&'!') && chars.get(i + 1) == Some(&'=') {
                i += 2;
                false
            } else if chars.get(i) == Some(&'=') {
                i += 1;
                true
            } else {
                attrs.push(Attr {
                    name,
                    value: AttrValue::Bool(true),
                });
                continue;
            };
            skip_spaces(&chars, &mut i);

            let value = match chars.get(i) {
                Some(&c) if is_quote(c) => {
                    if c == '`' && inner.contains("${") {
                        return Err(self.err(number, "unsupported pug syntax: template literal"));
                    }
                    AttrValue::Str {
                        value: self.read_quoted(&chars, &mut i, number)?,
                        escape,
                    }
                }
                Some(_) => {
                    let start = i;
                    while i < chars.len() && !chars[i].is_whitespace() && chars[i] != ',' {
                        i += 1;
                    }
                    let token: String = chars[start..i].iter().collect();
                    literal_attr_value(&token, escape).ok_or_else(|| {
                        self.err(
                            number,
                            format!("unsupported attribute expression for {name:?}: {token}"),
                        )
                    })?
                }
                None => {
                    return Err(self.err(number, format!("missing value for attribute {name:?}")));
                }
            };

            skip_spaces(&chars, &mut i);
            if chars.get(i) == Some(&'+') {
                return Err(self.err(
                    number,
                    format!("unsupported attribute expression for {name:?}"),
                ));
            }

            attrs.push(Attr { name, value });
        }

        Ok(attrs)
    }

    /// Read a quoted string starting at `chars[*i]`, leaving `i` after the closing quote.
    fn read_quoted(&self, chars: &[char], i: &mut usize, number: usize) -> Result<String, PugError> {
        let quote = chars[*i];
        *i += 1;
        let mut out = String::new();

        while *i < chars.len() {
            let c = chars[*i];
            *i += 1;
            if c == '\\' {
                match chars.get(*i) {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(&other) => out.push(other),
                    None => break,
                }
                *i += 1;
            } else if c == quote {
                return Ok(out);
            } else {
                out.push(c);
            }
        }

        Err(self.err(number, "unterminated string in attribute list"))
    }

    /// Split text into literal runs and `#[tag ...]` interpolations.
    fn parse_inline(&self, text: &str, number: usize) -> Result<Vec<Inline>, PugError> {
        let mut out = Vec::new();
        let mut buf = String::new();
        let mut rest = text;

        while let Some(pos) = rest.find('#') {
            let (before, after) = rest.split_at(pos);
            let after_hash = &after[1..];
            let interpolates = after_hash.starts_with('[') || after_hash.starts_with('{');

            if interpolates && before.ends_with('\\') {
                buf.push_str(&before[..before.len() - 1]);
                buf.push('#');
                rest = after_hash;
                continue;
            }

            buf.push_str(before);
            if after_hash.starts_with('[') {
                let close = find_closing(after_hash, '[', ']')
                    .ok_or_else(|| self.err(number, "unterminated #[ interpolation"))?;
                if !buf.is_empty() {
                    out.push(Inline::Text(std::mem::take(&mut buf)));
                }
                out.push(Inline::Tag(self.parse_inline_tag(&after_hash[1..close], number)?));
                rest = &after_hash[close + 1..];
            } else if after_hash.starts_with('{') {
                return Err(self.err(number, "unsupported pug syntax: #{} interpolation"));
            } else {
                buf.push('#');
                rest = after_hash;
            }
        }

        buf.push_str(rest);
        if !buf.is_empty() {
            out.push(Inline::Text(buf));
        }
        Ok(out)
    }

    fn parse_inline_tag(&self, source: &str, number: usize) -> Result<Element, PugError> {
        let (mut element, rest) = self.parse_tag_head(source.trim(), number)?;
        match rest {
            TagRest::None => {}
            TagRest::Text(text) => {
                element.children.push(Node::Text(self.parse_inline(text, number)?));
            }
            TagRest::Expansion(inner) => {
                element
                    .children
                    .push(Node::Element(self.parse_inline_tag(inner, number)?));
            }
            TagRest::TextBlock => {
                return Err(self.err(number, "text blocks are not allowed inside #[...]"));
            }
        }
        Ok(element)
    }

    /// Consume lines nested under `parent_indent` verbatim, dedented to their
    /// shallowest line. Trailing blank lines are left in place.
    fn take_raw_block(&mut self, parent_indent: usize) -> Vec<String> {
        let lines = self.lines;
        let start = self.pos;
        let mut end = start;
        while end < lines.len() && (lines[end].is_blank() || lines[end].indent > parent_indent) {
            end += 1;
        }
        while end > start && lines[end - 1].is_blank() {
            end -= 1;
        }
        self.pos = end;

        let block = &lines[start..end];
        let min_indent = block
            .iter()
            .filter(|l| !l.is_blank())
            .map(|l| l.indent)
            .min()
            .unwrap_or(0);

        block
            .iter()
            .map(|l| {
                if l.is_blank() {
                    String::new()
                } else {
                    l.raw.chars().skip(min_indent).collect::<String>().trim_end().to_string()
                }
            })
            .collect()
    }

    fn ensure_no_children(&self, parent_indent: usize, what: &str) -> Result<(), PugError> {
        let next = self.lines[self.pos..].iter().find(|l| !l.is_blank());
        match next {
            Some(line) if line.indent > parent_indent => Err(self.err(
                line.number,
                format!("{what} cannot have nested content"),
            )),
            _ => Ok(()),
        }
    }
}

/// Split `s` at the first whitespace into (word, trimmed rest).
fn split_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s, ""),
    }
}

/// Split `.a.b#c` into `[('.', "a"), ('.', "b"), ('#', "c")]`.
fn split_shorthand(s: &str) -> Vec<(char, &str)> {
    let mut parts = Vec::new();
    let mut start: Option<(char, usize)> = None;
    for (idx, c) in s.char_indices() {
        if c == '.' || c == '#' {
            if let Some((sigil, from)) = start {
                parts.push((sigil, &s[from..idx]));
            }
            start = Some((c, idx + 1));
        }
    }
    if let Some((sigil, from)) = start {
        parts.push((sigil, &s[from..]));
    }
    parts
}

/// Byte index of the bracket closing the one at the start of `s`.
///
/// Brackets inside quoted strings are ignored.
fn find_closing(s: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if is_quote(c) {
            quote = Some(c);
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\'' || c == '`'
}

fn skip_spaces(chars: &[char], i: &mut usize) {
    while *i < chars.len() && chars[*i].is_whitespace() {
        *i += 1;
    }
}

/// Unquoted attribute values that need no evaluation: booleans, null and numbers.
fn literal_attr_value(token: &str, escape: bool) -> Option<AttrValue> {
    match token {
        "true" => Some(AttrValue::Bool(true)),
        "false" | "null" | "undefined" => Some(AttrValue::Bool(false)),
        t if t.parse::<f64>().is_ok() => Some(AttrValue::Str {
            value: t.to_string(),
            escape,
        }),
        _ => None,
    }
}
