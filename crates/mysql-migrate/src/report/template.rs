//! Report template language.
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `{{key}}` | value of `key`, empty when absent |
//! | `{{#key}}` | number of items in `key` |
//! | `[[key]]...[[/key]]` | repeat for each item of a list, or once for a truthy value |
//! | `[[?key]]...[[/key]]` | render when `key` is truthy |
//! | `[[!key]]...[[/key]]` | render when `key` is absent or falsy |
//! | `[[?if\|expr]]...[[/if]]` | render when the expression holds |
//!
//! Inside a list block every item also sees `:#` (its 1-based position) and
//! `needsep` (1 for all items except the last). A block tag that stands
//! alone on its line swallows the line break after it.

use serde_json::{json, Value};

use super::expr::Expr;
use super::scope::{count, display, is_truthy, Scope};
use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Count(String),
    Section { name: String, body: Vec<Node> },
    Guard { name: String, body: Vec<Node> },
    Unless { name: String, body: Vec<Node> },
    If { expr: Expr, body: Vec<Node> },
}

#[derive(Debug)]
enum Opener {
    Section(String),
    Guard(String),
    Unless(String),
    If(Expr),
}

impl Opener {
    fn tag(&self) -> &str {
        match self {
            Opener::Section(name) | Opener::Guard(name) | Opener::Unless(name) => name,
            Opener::If(_) => "if",
        }
    }

    fn close(self, body: Vec<Node>) -> Node {
        match self {
            Opener::Section(name) => Node::Section { name, body },
            Opener::Guard(name) => Node::Guard { name, body },
            Opener::Unless(name) => Node::Unless { name, body },
            Opener::If(expr) => Node::If { expr, body },
        }
    }
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut stack: Vec<(Opener, Vec<Node>)> = Vec::new();
        let mut current: Vec<Node> = Vec::new();
        let mut pos = 0;

        while let Some(start) = next_tag(source, pos) {
            if start > pos {
                current.push(Node::Text(source[pos..start].to_string()));
            }

            let (close, is_block) = if source[start..].starts_with("{{") {
                ("}}", false)
            } else {
                ("]]", true)
            };
            let inner_start = start + 2;
            let Some(len) = source[inner_start..].find(close) else {
                return Err(TemplateError::Syntax {
                    position: start,
                    message: format!("missing '{}'", close),
                });
            };
            let inner = source[inner_start..inner_start + len].trim();
            pos = inner_start + len + 2;

            if inner.is_empty() {
                return Err(TemplateError::Syntax {
                    position: start,
                    message: "empty tag".into(),
                });
            }

            if !is_block {
                current.push(match inner.strip_prefix('#') {
                    Some(path) => Node::Count(path.trim().to_string()),
                    None => Node::Var(inner.to_string()),
                });
                continue;
            }

            if standalone(source, start, pos) {
                pos += 1;
            }

            if let Some(name) = inner.strip_prefix('/') {
                let name = name.trim();
                let Some((opener, body)) = stack.pop() else {
                    return Err(TemplateError::Unbalanced { tag: name.to_string() });
                };
                if opener.tag() != name {
                    return Err(TemplateError::Unbalanced {
                        tag: opener.tag().to_string(),
                    });
                }
                let node = opener.close(std::mem::replace(&mut current, body));
                current.push(node);
                continue;
            }

            let opener = if let Some(condition) = inner.strip_prefix("?if|") {
                Opener::If(Expr::parse(condition)?)
            } else if let Some(name) = inner.strip_prefix('?') {
                Opener::Guard(block_name(name, start)?)
            } else if let Some(name) = inner.strip_prefix('!') {
                Opener::Unless(block_name(name, start)?)
            } else {
                Opener::Section(block_name(inner, start)?)
            };
            stack.push((opener, std::mem::take(&mut current)));
        }

        if pos < source.len() {
            current.push(Node::Text(source[pos..].to_string()));
        }
        if let Some((opener, _)) = stack.pop() {
            return Err(TemplateError::Unbalanced {
                tag: opener.tag().to_string(),
            });
        }
        Ok(Self { nodes: current })
    }

    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, &Scope::root(data), &mut out)?;
        Ok(out)
    }
}

fn next_tag(source: &str, from: usize) -> Option<usize> {
    let rest = &source[from..];
    match (rest.find("{{"), rest.find("[[")) {
        (Some(a), Some(b)) => Some(from + a.min(b)),
        (Some(a), None) | (None, Some(a)) => Some(from + a),
        (None, None) => None,
    }
}

fn standalone(source: &str, start: usize, end: usize) -> bool {
    let line_start = start == 0 || source[..start].ends_with('\n');
    line_start && source[end..].starts_with('\n')
}

fn block_name(name: &str, position: usize) -> Result<String, TemplateError> {
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(TemplateError::Syntax {
            position,
            message: format!("invalid block name '{}'", name),
        });
    }
    Ok(name.to_string())
}

fn render_nodes(nodes: &[Node], scope: &Scope<'_>, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => {
                if let Some(value) = scope.lookup(path) {
                    out.push_str(&display(value));
                }
            }
            Node::Count(path) => out.push_str(&count(scope.lookup(path)).to_string()),
            Node::Section { name, body } => match scope.lookup(name) {
                Some(Value::Array(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        let meta = json!({
                            ":#": i + 1,
                            "needsep": usize::from(i + 1 < items.len()),
                        });
                        let item_scope = scope.child(name, item);
                        let meta_scope = item_scope.child(name, &meta);
                        render_nodes(body, &meta_scope, out)?;
                    }
                }
                Some(value) if is_truthy(value) => {
                    render_nodes(body, &scope.child(name, value), out)?;
                }
                _ => {}
            },
            Node::Guard { name, body } => {
                if scope.lookup(name).is_some_and(is_truthy) {
                    render_nodes(body, scope, out)?;
                }
            }
            Node::Unless { name, body } => {
                if !scope.lookup(name).is_some_and(is_truthy) {
                    render_nodes(body, scope, out)?;
                }
            }
            Node::If { expr, body } => {
                if expr.test(scope)? {
                    render_nodes(body, scope, out)?;
                }
            }
        }
    }
    Ok(())
}
