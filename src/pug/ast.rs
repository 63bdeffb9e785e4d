// src/pug/ast.rs

//! Template AST.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Doctype(String),
    Element(Element),
    /// Plain text, possibly with `#[tag ...]` interpolations.
    Text(Vec<Inline>),
    /// Buffered `//` comment; the string is everything after the slashes.
    Comment(String),
    Include {
        path: String,
        line: usize,
    },
    Extends {
        path: String,
        line: usize,
    },
    Block {
        name: String,
        mode: BlockMode,
        children: Vec<Node>,
        line: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Replace,
    Append,
    Prepend,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<Attr>,
    /// Written as `tag/` in the source.
    pub self_closing: bool,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Tag(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str { value: String, escape: bool },
    Bool(bool),
}

/// HTML void elements: never have content or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Phrasing elements that stay on the surrounding line in pretty output.
pub const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "br", "code", "em", "font", "i", "img", "ins", "kbd", "map",
    "samp", "small", "span", "strong", "sub", "sup",
];

impl Element {
    pub fn is_void(&self) -> bool {
        self.self_closing || VOID_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn is_inline(&self) -> bool {
        INLINE_ELEMENTS.contains(&self.name.as_str())
    }
}
