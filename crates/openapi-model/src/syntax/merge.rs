//! `node_alias` and `check_for_merge_nodes` (§4.1): alias dereferencing and
//! YAML merge-key (`<<`) expansion. Both run as a single destructive pass at
//! entry points rather than on every lookup — safe because the tree is never
//! re-parsed (§9 "Merge-key expansion").

use super::node::{NodeId, NodeKind, SyntaxTree, Tag};

/// If `node` is an alias, returns its anchor target; in every case first
/// ensures the node's mapping children have merge keys expanded. Merge keys
/// never nest in well-formed documents, so a single substitution pass
/// suffices — no cycle guard beyond that.
pub fn node_alias(tree: &mut SyntaxTree, node: NodeId) -> NodeId {
  let resolved = match tree.get(node).kind {
    NodeKind::Alias => tree.get(node).alias_target.unwrap_or(node),
    _ => node,
  };
  check_for_merge_nodes(tree, resolved);
  resolved
}

/// Destructively flattens `<<` merge keys: for every mapping child pair whose
/// key is tagged [`Tag::Merge`], appends the merge source's children to the
/// end of the mapping's own children. Safe to call multiple times — merged
/// children carry their own tags, never `Tag::Merge`, so a second pass is a
/// no-op.
pub fn check_for_merge_nodes(tree: &mut SyntaxTree, node: NodeId) {
  if tree.get(node).kind != NodeKind::Mapping {
    return;
  }

  let children = tree.get(node).children.clone();
  let mut merge_sources: Vec<NodeId> = Vec::new();

  let mut i = 0;
  while i + 1 < children.len() {
    let key = children[i];
    let value = children[i + 1];
    if tree.get(key).tag == Tag::Merge {
      collect_merge_source(tree, value, &mut merge_sources);
    }
    i += 2;
  }

  if merge_sources.is_empty() {
    return;
  }

  // Dereference each merge source (it may itself be an alias) and splice its
  // key/value pairs onto the end of this mapping's children, in order.
  let mut extra = Vec::new();
  for source in merge_sources {
    let dereferenced = node_alias(tree, source);
    if tree.get(dereferenced).kind == NodeKind::Mapping {
      extra.extend_from_slice(&tree.get(dereferenced).children.clone());
    }
  }
  tree.extend_children(node, &extra);
}

/// A merge value is either a single mapping (alias or inline) or a sequence
/// of mappings (`<<: [*a, *b]`); collects each source mapping node.
fn collect_merge_source(tree: &SyntaxTree, value: NodeId, out: &mut Vec<NodeId>) {
  match tree.get(value).kind {
    NodeKind::Sequence => {
      for child in tree.get(value).children.clone() {
        out.push(child);
      }
    }
    _ => out.push(value),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::loader::parse_document;

  #[test]
  fn merge_key_splices_anchor_pairs_onto_mapping() {
    let mut tree = parse_document(
      b"defaults: &defaults\n  timeout: 30\n  retries: 3\nservice:\n  <<: *defaults\n  name: widgets\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    // children: [defaults, {..}, service, {..}]
    let service_value = tree.get(root).children[3];
    check_for_merge_nodes(&mut tree, service_value);
    let service = tree.get(service_value);
    // original pairs (<<, *defaults, name, widgets) plus merged (timeout, 30, retries, 3)
    assert_eq!(service.children.len(), 8);
  }

  #[test]
  fn merge_expansion_is_idempotent() {
    let mut tree = parse_document(b"base: &base\n  a: 1\nchild:\n  <<: *base\n  b: 2\n").expect("parses");
    let root = tree.root().unwrap();
    let child_value = tree.get(root).children[3];
    check_for_merge_nodes(&mut tree, child_value);
    let first_len = tree.get(child_value).children.len();
    check_for_merge_nodes(&mut tree, child_value);
    assert_eq!(tree.get(child_value).children.len(), first_len);
  }
}
