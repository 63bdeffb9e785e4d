// src/pug/resolve.rs

//! Expands `include` and applies `extends`/`block` inheritance.

use std::path::{Component, Path, PathBuf};

use super::ast::{BlockMode, Inline, Node};
use super::{parser, PugError};
use crate::fs::FileSystem;

pub struct Resolver<'a> {
    fs: &'a dyn FileSystem,
    basedir: PathBuf,
    /// Files currently being resolved, outermost first.
    stack: Vec<PathBuf>,
}

impl<'a> Resolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, basedir: &Path) -> Self {
        Self {
            fs,
            basedir: normalize(basedir),
            stack: Vec::new(),
        }
    }

    pub fn resolve_file(&mut self, path: &Path) -> Result<Vec<Node>, PugError> {
        let path = normalize(path);
        let source = self
            .fs
            .read_to_string(&path)
            .map_err(|e| PugError::new(&path, 0, format!("cannot read template: {e:#}")))?;
        self.resolve_source(&source, &path)
    }

    pub fn resolve_source(&mut self, source: &str, path: &Path) -> Result<Vec<Node>, PugError> {
        let path = normalize(path);
        self.stack.push(path.clone());
        let result = self.resolve_document(source, &path);
        self.stack.pop();
        result
    }

    fn resolve_document(&mut self, source: &str, path: &Path) -> Result<Vec<Node>, PugError> {
        let nodes = parser::parse(source, path)?;

        let Some((parent_ref, line)) = leading_extends(&nodes, path)? else {
            return self.expand_includes(nodes, path);
        };

        // Only top-level blocks of a child template contribute output.
        let mut overrides = Vec::new();
        for node in nodes {
            if let Node::Block {
                name,
                mode,
                children,
                line,
            } = node
            {
                overrides.push(Node::Block {
                    name,
                    mode,
                    children: self.expand_includes(children, path)?,
                    line,
                });
            }
        }

        let parent = self.reference(path, &parent_ref);
        let mut base = self.resolve_nested(&parent, path, line, "extends")?;

        for block in &overrides {
            if !apply_block(&mut base, block) {
                if let Node::Block { name, line, .. } = block {
                    return Err(PugError::new(
                        path,
                        *line,
                        format!("block {name:?} is not defined in {}", parent.display()),
                    ));
                }
            }
        }

        Ok(base)
    }

    /// Load and resolve a file referenced by `extends` or `include`.
    fn resolve_nested(
        &mut self,
        target: &Path,
        from: &Path,
        line: usize,
        what: &str,
    ) -> Result<Vec<Node>, PugError> {
        if self.stack.iter().any(|p| p == target) {
            let chain: Vec<String> = self
                .stack
                .iter()
                .chain(std::iter::once(&target.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            return Err(PugError::new(
                from,
                line,
                format!("{what} cycle: {}", chain.join(" -> ")),
            ));
        }

        let source = self.fs.read_to_string(target).map_err(|e| {
            PugError::new(
                from,
                line,
                format!("cannot {what} {}: {e:#}", target.display()),
            )
        })?;

        self.stack.push(target.to_path_buf());
        let result = self.resolve_document(&source, target);
        self.stack.pop();
        result
    }

    fn expand_includes(&mut self, nodes: Vec<Node>, path: &Path) -> Result<Vec<Node>, PugError> {
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Include { path: rel, line } => {
                    let target = self.reference(path, &rel);
                    if is_template(&target) {
                        out.extend(self.resolve_nested(&target, path, line, "include")?);
                    } else {
                        let raw = self.fs.read_to_string(&target).map_err(|e| {
                            PugError::new(
                                path,
                                line,
                                format!("cannot include {}: {e:#}", target.display()),
                            )
                        })?;
                        let raw = raw.trim_end_matches(['\n', '\r']);
                        out.push(Node::Text(vec![Inline::Text(raw.to_string())]));
                    }
                }
                Node::Extends { line, .. } => {
                    return Err(PugError::new(
                        path,
                        line,
                        "extends must be the first statement in a template",
                    ));
                }
                Node::Element(mut element) => {
                    element.children = self.expand_includes(element.children, path)?;
                    out.push(Node::Element(element));
                }
                Node::Block {
                    name,
                    mode,
                    children,
                    line,
                } => out.push(Node::Block {
                    name,
                    mode,
                    children: self.expand_includes(children, path)?,
                    line,
                }),
                other => out.push(other),
            }
        }

        Ok(out)
    }

    /// Path named by an `include`/`extends` in `from`.
    ///
    /// Leading `/` resolves against the base directory; anything else against
    /// the including file's directory. A missing extension means `.pug`.
    fn reference(&self, from: &Path, rel: &str) -> PathBuf {
        let mut target = match rel.strip_prefix('/') {
            Some(abs) => self.basedir.join(abs),
            None => from.parent().unwrap_or(Path::new("")).join(rel),
        };
        if target.extension().is_none() {
            target.set_extension("pug");
        }
        normalize(&target)
    }
}

/// The `extends` at the head of a template, if any.
///
/// Only comments may precede it.
fn leading_extends(nodes: &[Node], path: &Path) -> Result<Option<(String, usize)>, PugError> {
    let mut seen_content = false;
    let mut found = None;

    for node in nodes {
        match node {
            Node::Extends { path: parent, line } => {
                if seen_content || found.is_some() {
                    return Err(PugError::new(
                        path,
                        *line,
                        "extends must be the first statement in a template",
                    ));
                }
                found = Some((parent.clone(), *line));
            }
            Node::Comment(_) => {}
            _ => seen_content = true,
        }
    }

    Ok(found)
}

/// Merge an overriding block into every same-named block in `nodes`.
fn apply_block(nodes: &mut [Node], block: &Node) -> bool {
    let Node::Block {
        name: want,
        mode,
        children: new_children,
        ..
    } = block
    else {
        return false;
    };

    let mut applied = false;
    for node in nodes.iter_mut() {
        match node {
            Node::Block { name, children, .. } if *name == *want => {
                match mode {
                    BlockMode::Replace => *children = new_children.clone(),
                    BlockMode::Append => children.extend(new_children.iter().cloned()),
                    BlockMode::Prepend => {
                        let mut merged = new_children.clone();
                        merged.append(children);
                        *children = merged;
                    }
                }
                applied = true;
            }
            Node::Block { children, .. } => applied |= apply_block(children, block),
            Node::Element(element) => applied |= apply_block(&mut element.children, block),
            _ => {}
        }
    }
    applied
}

fn is_template(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "pug")
}

/// Lexically clean a path: drop `.` and fold `..` where possible.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}
