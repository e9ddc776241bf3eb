//! Key-lookup family (§4.1): `find_key_top`, `find_key`, `find_key_full`,
//! `find_first_key`, `is_node_ref`. All fail soft — a miss is `None`, never
//! an error.

use super::merge::node_alias;
use super::node::{NodeId, NodeKind, SyntaxTree};

const FIND_FIRST_KEY_DEPTH_CAP: usize = 40;

fn key_matches(tree: &SyntaxTree, key: NodeId, target: &str) -> bool {
  tree.get(key).kind == NodeKind::Scalar && tree.get(key).value.eq_ignore_ascii_case(target)
}

/// Linear scan over `children` at even indices (key positions); returns the
/// key node and the value immediately following it, with alias/merge
/// resolution applied to the value. Case-insensitive. Never recurses.
pub fn find_key_top(tree: &mut SyntaxTree, key: &str, children: &[NodeId]) -> Option<(NodeId, NodeId)> {
  let mut i = 0;
  while i + 1 < children.len() {
    let candidate_key = children[i];
    if key_matches(tree, candidate_key, key) {
      let value = node_alias(tree, children[i + 1]);
      return Some((candidate_key, value));
    }
    i += 2;
  }
  None
}

/// Like [`find_key_top`] but, on a top-level miss, descends one level into
/// mapping and sequence children before giving up.
pub fn find_key(tree: &mut SyntaxTree, key: &str, children: &[NodeId]) -> Option<(NodeId, NodeId)> {
  if let Some(found) = find_key_top(tree, key, children) {
    return Some(found);
  }
  for &child in children {
    let child = node_alias(tree, child);
    match tree.get(child).kind {
      NodeKind::Mapping | NodeKind::Sequence => {
        let nested = tree.get(child).children.clone();
        if let Some(found) = find_key_top(tree, key, &nested) {
          return Some(found);
        }
      }
      _ => {}
    }
  }
  None
}

/// Like [`find_key`] but also returns the parent key node — the key whose
/// value contained the match — needed when a caller must emit both a key
/// anchor and a value location in a `NodeReference`. For a direct top-level
/// match, `parent_key` is `None`.
pub fn find_key_full(tree: &mut SyntaxTree, key: &str, children: &[NodeId]) -> Option<(Option<NodeId>, NodeId, NodeId)> {
  if let Some((k, v)) = find_key_top(tree, key, children) {
    return Some((None, k, v));
  }
  for &child in children {
    let child = node_alias(tree, child);
    match tree.get(child).kind {
      NodeKind::Mapping | NodeKind::Sequence => {
        let nested = tree.get(child).children.clone();
        if let Some((k, v)) = find_key_top(tree, key, &nested) {
          return Some((Some(child), k, v));
        }
      }
      _ => {}
    }
  }
  None
}

/// Unbounded recursive search with a hard depth cap of 40 — used only for
/// diagnostics, never on the hot extraction path. Returns `None` once the
/// cap is reached without a match.
pub fn find_first_key(tree: &mut SyntaxTree, key: &str, children: &[NodeId], depth: usize) -> Option<(NodeId, NodeId)> {
  if depth >= FIND_FIRST_KEY_DEPTH_CAP {
    return None;
  }
  if let Some(found) = find_key_top(tree, key, children) {
    return Some(found);
  }
  for &child in children {
    let child = node_alias(tree, child);
    match tree.get(child).kind {
      NodeKind::Mapping | NodeKind::Sequence => {
        let nested = tree.get(child).children.clone();
        if let Some(found) = find_first_key(tree, key, &nested, depth + 1) {
          return Some(found);
        }
      }
      _ => {}
    }
  }
  None
}

/// Read-only alias dereference used during (parallel) extraction. By the
/// time extraction runs, the whole-document walk performed while building
/// the [`crate::index::Index`] has already forced `node_alias`/merge
/// expansion along every mapping-value and sequence-element edge reachable
/// from the root (§9 "Merge-key expansion"), so a read-only variant only
/// ever needs to follow an already-resolved `alias_target` — it must never
/// itself call `check_for_merge_nodes`, which requires `&mut`.
pub fn dealias_ro(tree: &SyntaxTree, node: NodeId) -> NodeId {
  match tree.get(node).kind {
    NodeKind::Alias => tree.get(node).alias_target.unwrap_or(node),
    _ => node,
  }
}

/// Read-only counterpart to [`find_key_top`] — usable from concurrently
/// running extraction tasks that only hold `&SyntaxTree` (§5 "Shared
/// resources").
pub fn find_key_top_ro(tree: &SyntaxTree, key: &str, children: &[NodeId]) -> Option<(NodeId, NodeId)> {
  let mut i = 0;
  while i + 1 < children.len() {
    let candidate_key = children[i];
    if key_matches(tree, candidate_key, key) {
      let value = dealias_ro(tree, children[i + 1]);
      return Some((candidate_key, value));
    }
    i += 2;
  }
  None
}

/// Read-only counterpart to [`find_key`].
pub fn find_key_ro(tree: &SyntaxTree, key: &str, children: &[NodeId]) -> Option<(NodeId, NodeId)> {
  if let Some(found) = find_key_top_ro(tree, key, children) {
    return Some(found);
  }
  for &child in children {
    let child = dealias_ro(tree, child);
    match tree.get(child).kind {
      NodeKind::Mapping | NodeKind::Sequence => {
        if let Some(found) = find_key_top_ro(tree, key, &tree.get(child).children) {
          return Some(found);
        }
      }
      _ => {}
    }
  }
  None
}

/// Read-only counterpart to [`find_key_full`].
pub fn find_key_full_ro(tree: &SyntaxTree, key: &str, children: &[NodeId]) -> Option<(Option<NodeId>, NodeId, NodeId)> {
  if let Some((k, v)) = find_key_top_ro(tree, key, children) {
    return Some((None, k, v));
  }
  for &child in children {
    let child = dealias_ro(tree, child);
    match tree.get(child).kind {
      NodeKind::Mapping | NodeKind::Sequence => {
        if let Some((k, v)) = find_key_top_ro(tree, key, &tree.get(child).children) {
          return Some((Some(child), k, v));
        }
      }
      _ => {}
    }
  }
  None
}

/// Returns `(has_ref, key_node, ref_string)` if any even-indexed child of a
/// mapping has key value `$ref`.
pub fn is_node_ref(tree: &SyntaxTree, node: NodeId) -> Option<(NodeId, String)> {
  if tree.get(node).kind != NodeKind::Mapping {
    return None;
  }
  let children = &tree.get(node).children;
  let mut i = 0;
  while i + 1 < children.len() {
    let key = children[i];
    if tree.get(key).kind == NodeKind::Scalar && tree.get(key).value == "$ref" {
      let value = children[i + 1];
      if tree.get(value).kind == NodeKind::Scalar {
        return Some((key, tree.get(value).value.clone()));
      }
    }
    i += 2;
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::loader::parse_document;

  #[test]
  fn find_key_top_is_case_insensitive_and_non_recursive() {
    let mut tree = parse_document(b"Swagger: \"2.0\"\nnested:\n  swagger: \"nope\"\n").expect("parses");
    let root = tree.root().unwrap();
    let children = tree.get(root).children.clone();
    let (_, value) = find_key_top(&mut tree, "swagger", &children).expect("found");
    assert_eq!(tree.get(value).value, "2.0");
  }

  #[test]
  fn find_key_descends_one_level() {
    let mut tree = parse_document(b"info:\n  title: Pet Store\n").expect("parses");
    let root = tree.root().unwrap();
    let children = tree.get(root).children.clone();
    let (_, value) = find_key(&mut tree, "title", &children).expect("found one level down");
    assert_eq!(tree.get(value).value, "Pet Store");
  }

  #[test]
  fn find_first_key_respects_depth_cap() {
    // Build a deeply nested document programmatically: 45 levels of `a: {a: ...}}`.
    let mut yaml = String::new();
    for i in 0..45 {
      yaml.push_str(&"  ".repeat(i));
      yaml.push_str("a:\n");
    }
    yaml.push_str(&"  ".repeat(45));
    yaml.push_str("needle: found\n");
    let mut tree = parse_document(yaml.as_bytes()).expect("parses");
    let root = tree.root().unwrap();
    let children = tree.get(root).children.clone();
    assert!(find_first_key(&mut tree, "needle", &children, 0).is_none());
  }

  #[test]
  fn is_node_ref_detects_ref_key() {
    let tree = parse_document(b"$ref: \"#/definitions/Pet\"\n").expect("parses");
    let root = tree.root().unwrap();
    let (_, value) = is_node_ref(&tree, root).expect("has ref");
    assert_eq!(value, "#/definitions/Pet");
  }
}
