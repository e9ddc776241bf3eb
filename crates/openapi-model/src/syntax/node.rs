//! The generic tagged tree §3 calls the "syntax node": an owned, arena-backed
//! projection of a parsed YAML/JSON document that keeps every key position,
//! value position, anchor and line/column alongside the decoded scalars.

use std::fmt;

/// Index into [`SyntaxTree::nodes`]. Cheap to copy, `Send + Sync`, and stable
/// for the lifetime of the tree: nodes are appended during parsing and never
/// removed, so a `NodeId` handed out once stays valid even after `resolve()`
/// splices a reference site's children in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
  pub(crate) fn new(index: usize) -> Self {
    Self(u32::try_from(index).expect("syntax tree exceeds u32::MAX nodes"))
  }

  pub(crate) fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "node#{}", self.0)
  }
}

/// The structural shape of a node, mirroring §3's `{scalar, mapping, sequence, alias}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
  Scalar,
  Mapping,
  Sequence,
  Alias,
}

/// Scalar tag classification, §3's `{str, int, float, bool, null, map, seq, merge}`.
///
/// `Merge` marks the YAML `<<` key itself, not its value; `check_for_merge_nodes`
/// (§4.1) looks for a key child tagged `Merge` to find splice points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
  Str,
  Int,
  Float,
  Bool,
  Null,
  Map,
  Seq,
  Merge,
}

impl Tag {
  /// Classifies a scalar's YAML tag string (`tag:yaml.org,2002:str`, `!!int`, ...)
  /// plus its literal text, following the resolution rules a plain (untagged)
  /// YAML 1.1 scalar is resolved under: untagged `true`/`false` become bools,
  /// untagged integers/floats become numbers, `~`/`null`/empty become null,
  /// everything else is a string.
  pub(crate) fn classify(explicit_tag: Option<&str>, value: &str) -> Self {
    if let Some(tag) = explicit_tag {
      let suffix = tag.rsplit(':').next().unwrap_or(tag);
      return match suffix {
        "str" => Tag::Str,
        "int" => Tag::Int,
        "float" => Tag::Float,
        "bool" => Tag::Bool,
        "null" => Tag::Null,
        "map" => Tag::Map,
        "seq" => Tag::Seq,
        "merge" => Tag::Merge,
        _ => Tag::Str,
      };
    }
    if value == "<<" {
      return Tag::Merge;
    }
    Self::classify_plain_scalar(value)
  }

  fn classify_plain_scalar(value: &str) -> Self {
    match value {
      "~" | "null" | "Null" | "NULL" | "" => Tag::Null,
      "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => Tag::Bool,
      _ => {
        if value.parse::<i64>().is_ok() {
          Tag::Int
        } else if value.parse::<f64>().is_ok() {
          Tag::Float
        } else {
          Tag::Str
        }
      }
    }
  }
}

/// A single node's payload. Mapping children alternate key, value, key, value,
/// ...; sequence children are elements in order; scalar/alias nodes have no
/// children (an alias's target lives in `alias_target`).
#[derive(Debug, Clone)]
pub struct NodeData {
  pub kind: NodeKind,
  pub tag: Tag,
  pub value: String,
  pub children: Vec<NodeId>,
  pub anchor: Option<String>,
  pub alias_target: Option<NodeId>,
  pub line: usize,
  pub column: usize,
}

impl NodeData {
  pub(crate) fn scalar(tag: Tag, value: String, line: usize, column: usize) -> Self {
    Self {
      kind: NodeKind::Scalar,
      tag,
      value,
      children: Vec::new(),
      anchor: None,
      alias_target: None,
      line,
      column,
    }
  }
}

/// Owns every node produced while parsing a single document. The document
/// (not individual entities) owns this tree; `NodeId`s are the "pointers into
/// the syntax tree" that §3's `NodeReference` carries.
#[derive(Debug, Default)]
pub struct SyntaxTree {
  nodes: Vec<NodeData>,
  pub(crate) root: Option<NodeId>,
}

impl SyntaxTree {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn push(&mut self, node: NodeData) -> NodeId {
    let id = NodeId::new(self.nodes.len());
    self.nodes.push(node);
    id
  }

  #[must_use]
  pub fn get(&self, id: NodeId) -> &NodeData {
    &self.nodes[id.index()]
  }

  pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
    &mut self.nodes[id.index()]
  }

  #[must_use]
  pub fn root(&self) -> Option<NodeId> {
    self.root
  }

  /// Splices `target`'s current children into `site`'s child list. Used by
  /// the resolver (§4.4) to rewrite a `$ref` site in place; requires
  /// exclusive access to the tree, which is why resolution always runs
  /// before the tree is shared (read-only, via `Arc`) across extraction tasks.
  pub(crate) fn splice_children(&mut self, site: NodeId, target: NodeId) {
    let target_children = self.nodes[target.index()].children.clone();
    self.nodes[site.index()].children = target_children;
  }

  /// Appends `extra` to the end of `site`'s children, used by merge-key
  /// expansion (§4.1 `check_for_merge_nodes`).
  pub(crate) fn extend_children(&mut self, site: NodeId, extra: &[NodeId]) {
    self.nodes[site.index()].children.extend_from_slice(extra);
  }

  /// Copies `node`'s subtree out of `other` into `self`, returning the new
  /// root's id in `self`. Used by the resolver (§4.2/§4.4) to graft a fetched
  /// external document's fragment into the document tree being resolved —
  /// `NodeId`s only index into the arena they were produced by, so an
  /// external reference's target can't be spliced in directly the way an
  /// in-document one can. Memoized by source id so a node reachable through
  /// more than one path (an anchor aliased twice) is only copied once.
  pub(crate) fn graft(&mut self, other: &SyntaxTree, node: NodeId) -> NodeId {
    let mut memo = std::collections::HashMap::new();
    self.graft_rec(other, node, &mut memo)
  }

  fn graft_rec(&mut self, other: &SyntaxTree, node: NodeId, memo: &mut std::collections::HashMap<NodeId, NodeId>) -> NodeId {
    if let Some(&mapped) = memo.get(&node) {
      return mapped;
    }
    let data = other.get(node).clone();
    let children: Vec<NodeId> = data.children.iter().map(|&child| self.graft_rec(other, child, memo)).collect();
    let alias_target = data.alias_target.map(|target| self.graft_rec(other, target, memo));
    let new_id = self.push(NodeData {
      kind: data.kind,
      tag: data.tag,
      value: data.value,
      children,
      anchor: data.anchor,
      alias_target,
      line: data.line,
      column: data.column,
    });
    memo.insert(node, new_id);
    new_id
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tag_classifies_untagged_scalars() {
    assert_eq!(Tag::classify(None, "42"), Tag::Int);
    assert_eq!(Tag::classify(None, "4.2"), Tag::Float);
    assert_eq!(Tag::classify(None, "true"), Tag::Bool);
    assert_eq!(Tag::classify(None, "~"), Tag::Null);
    assert_eq!(Tag::classify(None, "hello"), Tag::Str);
    assert_eq!(Tag::classify(None, "<<"), Tag::Merge);
  }

  #[test]
  fn tag_prefers_explicit_tag_over_literal_shape() {
    assert_eq!(Tag::classify(Some("tag:yaml.org,2002:str"), "42"), Tag::Str);
    assert_eq!(Tag::classify(Some("!!int"), "42"), Tag::Int);
  }
}
