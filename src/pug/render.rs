// src/pug/render.rs

//! HTML printer for resolved templates.

use super::ast::{AttrValue, Element, Inline, Node};

/// Elements whose text content is whitespace-sensitive.
const PREFORMATTED: &[&str] = &["pre", "textarea"];

/// Render resolved nodes to HTML.
///
/// `Block` nodes are flattened into their children; `Include`/`Extends`
/// must already have been resolved and are skipped.
pub fn render(nodes: &[Node], pretty: bool) -> String {
    let terse = flatten(nodes).iter().any(|n| match n {
        Node::Doctype(value) => value.eq_ignore_ascii_case("html"),
        _ => false,
    });

    let mut renderer = Renderer {
        out: String::new(),
        pretty,
        terse,
    };
    renderer.nodes(nodes, 0);

    let mut html = renderer.out;
    if pretty {
        if html.starts_with('\n') {
            html.remove(0);
        }
        if !html.is_empty() {
            html.push('\n');
        }
    }
    html
}

struct Renderer {
    out: String,
    pretty: bool,
    terse: bool,
}

impl Renderer {
    fn line(&mut self, depth: usize, content: &str) {
        if self.pretty {
            self.newline(depth);
        }
        self.out.push_str(content);
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        self.out.push_str(&"  ".repeat(depth));
    }

    /// Inline-level elements continue the current line.
    fn start(&mut self, inline: bool, depth: usize, content: &str) {
        if inline {
            self.out.push_str(content);
        } else {
            self.line(depth, content);
        }
    }

    fn nodes(&mut self, nodes: &[Node], depth: usize) {
        let flat = flatten(nodes);
        let mut prev_text = false;
        for (idx, node) in flat.iter().enumerate() {
            match node {
                Node::Doctype(value) => {
                    let doctype = doctype(value);
                    self.line(depth, &doctype);
                    prev_text = false;
                }
                Node::Element(element) => {
                    self.element(element, depth);
                    prev_text = false;
                }
                Node::Text(inlines) => {
                    let text = self.inline(inlines);
                    if self.pretty {
                        // Runs of text lines each get their own line; a single
                        // line of text flows with its inline neighbours.
                        let next_text = matches!(flat.get(idx + 1), Some(Node::Text(_)));
                        if prev_text || next_text || text.contains('\n') {
                            for line in text.lines() {
                                self.line(depth, line);
                            }
                        } else {
                            self.out.push_str(&text);
                        }
                    } else {
                        if prev_text {
                            self.out.push('\n');
                        }
                        self.out.push_str(&text);
                    }
                    prev_text = true;
                }
                Node::Comment(text) => {
                    self.line(depth, &format!("<!--{text}-->"));
                    prev_text = false;
                }
                Node::Include { .. } | Node::Extends { .. } | Node::Block { .. } => {}
            }
        }
    }

    fn element(&mut self, element: &Element, depth: usize) {
        let inline = element.is_inline();
        let open = self.open_tag(element);
        if element.is_void() {
            let close = if self.terse && !element.self_closing {
                ">"
            } else {
                "/>"
            };
            self.start(inline, depth, &format!("{open}{close}"));
            return;
        }

        let close = format!("</{}>", element.name);
        if flatten(&element.children).is_empty() {
            self.start(inline, depth, &format!("{open}>{close}"));
            return;
        }

        if PREFORMATTED.contains(&element.name.as_str()) {
            let body = self.compact(&element.children);
            self.start(inline, depth, &format!("{open}>{body}{close}"));
            return;
        }

        self.start(inline, depth, &format!("{open}>"));
        self.nodes(&element.children, depth + 1);
        if self.pretty && !inline && !can_inline(&element.children) {
            self.newline(depth);
        }
        self.out.push_str(&close);
    }

    /// Render nodes without indentation, as inline content.
    fn compact(&self, nodes: &[Node]) -> String {
        let mut inner = Renderer {
            out: String::new(),
            pretty: false,
            terse: self.terse,
        };
        inner.nodes(nodes, 0);
        inner.out
    }

    fn inline(&self, inlines: &[Inline]) -> String {
        let mut text = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(t) => text.push_str(t),
                Inline::Tag(element) => {
                    let mut inner = Renderer {
                        out: String::new(),
                        pretty: false,
                        terse: self.terse,
                    };
                    inner.element(element, 0);
                    text.push_str(&inner.out);
                }
            }
        }
        text
    }

    /// `<name` plus attributes; id first, then classes, then the rest.
    fn open_tag(&self, element: &Element) -> String {
        let mut tag = format!("<{}", element.name);

        if let Some(id) = &element.id {
            tag.push_str(&format!(" id=\"{}\"", escape_attr(id)));
        }
        if !element.classes.is_empty() {
            tag.push_str(&format!(
                " class=\"{}\"",
                escape_attr(&element.classes.join(" "))
            ));
        }

        for attr in &element.attrs {
            match &attr.value {
                AttrValue::Bool(false) => {}
                AttrValue::Bool(true) if self.terse => {
                    tag.push(' ');
                    tag.push_str(&attr.name);
                }
                AttrValue::Bool(true) => {
                    tag.push_str(&format!(" {0}=\"{0}\"", attr.name));
                }
                AttrValue::Str { value, escape } => {
                    let value = if *escape {
                        escape_attr(value)
                    } else {
                        value.clone()
                    };
                    tag.push_str(&format!(" {}=\"{}\"", attr.name, value));
                }
            }
        }

        tag
    }
}

/// Whether `nodes` fit on the parent's line: single lines of text and
/// inline-level elements, with no two text nodes in a row.
fn can_inline(nodes: &[Node]) -> bool {
    let flat = flatten(nodes);
    flat.iter().all(|n| match n {
        Node::Text(inlines) => !inlines
            .iter()
            .any(|i| matches!(i, Inline::Text(t) if t.contains('\n'))),
        Node::Element(element) => element.is_inline(),
        _ => false,
    }) && !flat
        .windows(2)
        .any(|pair| matches!(pair, [Node::Text(_), Node::Text(_)]))
}

/// Top-level view of `nodes` with blocks replaced by their contents.
fn flatten(nodes: &[Node]) -> Vec<&Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Block { children, .. } => out.extend(flatten(children)),
            other => out.push(other),
        }
    }
    out
}

fn doctype(value: &str) -> String {
    match value.to_ascii_lowercase().as_str() {
        "html" => "<!DOCTYPE html>".to_string(),
        "xml" => r#"<?xml version="1.0" encoding="utf-8" ?>"#.to_string(),
        "transitional" => concat!(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "#,
            r#""http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#
        )
        .to_string(),
        "strict" => concat!(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "#,
            r#""http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#
        )
        .to_string(),
        _ => format!("<!DOCTYPE {value}>"),
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
