//! The Index (§4.3): a pre-pass that walks the syntax tree once and
//! catalogues every `$ref`, every schema position, every path item and
//! operation. Read-only after construction.

use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;

use crate::syntax::{self, NodeId, NodeKind, SyntaxTree};

/// One *occurrence* of a `$ref` in the document — one entry per site, in
/// discovery order (§4.3 "sequenced references list"). Several sites may
/// name the same `definition`; every one of them gets spliced independently
/// when `resolve()` runs, since each is a distinct node in the tree.
#[derive(Debug, Clone)]
pub struct RefSite {
  pub definition: String,
  pub ref_node: NodeId,
}

/// The canonical, deduplicated entry for one `definition` string (§4.3
/// "Reference record") — the DFS-visitable unit the Resolver walks. `seen`,
/// `circular` and `resolved` are interior-mutable atomics rather than
/// `Cell`s: the Resolver (§4.4) mutates them during its single-threaded pass,
/// which always completes before the tree/index are shared — but that
/// sharing happens via `Arc<Index>` across the extractor's concurrent tasks
/// (§5), so the Index as a whole must be `Sync`, which a `Cell` field would
/// rule out even though no two threads ever touch these flags at once.
#[derive(Debug)]
pub struct Reference {
  pub definition: String,
  pub target_node: Option<NodeId>,
  /// True when `definition` names a location outside this document (a file
  /// path or URL before the `#`). Splicing/missing-reference diagnostics
  /// don't apply to these — resolving them is the fetcher's job (§4.2),
  /// which is out of scope for the core Index/Resolver (§1 non-goals).
  pub external: bool,
  pub seen: AtomicBool,
  pub circular: AtomicBool,
  pub resolved: AtomicBool,
}

impl Reference {
  fn new(definition: String, target_node: Option<NodeId>) -> Self {
    let external = !definition.starts_with('#');
    Self {
      definition,
      target_node,
      external,
      seen: AtomicBool::new(false),
      circular: AtomicBool::new(false),
      resolved: AtomicBool::new(false),
    }
  }
}

/// Thin accessor trait so call sites read `reference.is_seen()` rather than
/// spelling out `Ordering::Relaxed` at every use — the flags are only ever
/// mutated by the single-threaded Resolver pass, so relaxed ordering is
/// sufficient everywhere they're touched.
impl Reference {
  #[must_use]
  pub fn is_seen(&self) -> bool {
    self.seen.load(Ordering::Relaxed)
  }

  pub fn set_seen(&self, value: bool) {
    self.seen.store(value, Ordering::Relaxed);
  }

  #[must_use]
  pub fn is_circular(&self) -> bool {
    self.circular.load(Ordering::Relaxed)
  }

  pub fn set_circular(&self, value: bool) {
    self.circular.store(value, Ordering::Relaxed);
  }

  #[must_use]
  pub fn is_resolved(&self) -> bool {
    self.resolved.load(Ordering::Relaxed)
  }

  pub fn set_resolved(&self, value: bool) {
    self.resolved.store(value, Ordering::Relaxed);
  }
}

/// Per-kind counters surfaced for downstream sizing and analytics (§4.3
/// step 3).
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexCounts {
  pub path_items: usize,
  pub operations: usize,
  pub parameters: usize,
  pub responses: usize,
  pub security_schemes: usize,
}

/// The read-only catalogue built in one walk over the root mapping (§4.3).
#[derive(Debug)]
pub struct Index {
  pub mapped_references: IndexMap<String, Reference>,
  pub sequenced_references: Vec<RefSite>,
  pub all_schemas: IndexMap<String, NodeId>,
  pub root_node: NodeId,
  pub counts: IndexCounts,
}

const OPERATION_VERBS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

impl Index {
  /// Looks up the canonical (deduplicated) reference record by definition string.
  #[must_use]
  pub fn lookup(&self, definition: &str) -> Option<&Reference> {
    self.mapped_references.get(definition)
  }
}

/// Builds an [`Index`] by walking `root` once. Requires `&mut SyntaxTree`
/// only because key-lookup helpers dereference aliases/merge keys lazily as
/// they walk (§4.1) — the index itself does not otherwise mutate node data.
#[must_use]
pub fn build_index(tree: &mut SyntaxTree, root: NodeId) -> Index {
  let mut mapped_references: IndexMap<String, Reference> = IndexMap::new();
  let mut sequenced_references: Vec<RefSite> = Vec::new();
  let mut all_schemas: IndexMap<String, NodeId> = IndexMap::new();
  let mut counts = IndexCounts::default();

  walk_for_references(tree, root, root, &mut mapped_references, &mut sequenced_references);
  walk_for_schemas(tree, root, "#", &mapped_references, &mut all_schemas);
  count_document_shape(tree, root, &mut counts);

  Index {
    mapped_references,
    sequenced_references,
    all_schemas,
    root_node: root,
    counts,
  }
}

/// Resolves an in-document pointer (`#/definitions/Pet`) to the node it
/// names by walking mapping/sequence children from `root`. External
/// references (files, URLs) resolve to `None` here — fetching and indexing
/// another document's tree is the fetcher's job, not the core Index's
/// (§4.2 non-goal boundary); see `DESIGN.md`.
pub(crate) fn resolve_pointer(tree: &mut SyntaxTree, root: NodeId, pointer: &str) -> Option<NodeId> {
  if !pointer.starts_with('#') {
    return None;
  }
  let segments = syntax::pointer_segments(pointer);
  let mut current = syntax::node_alias(tree, root);
  for segment in segments {
    match tree.get(current).kind {
      NodeKind::Mapping => {
        let children = tree.get(current).children.clone();
        let (_, value) = syntax::find_key_top(tree, &segment, &children)?;
        current = value;
      }
      NodeKind::Sequence => {
        let idx: usize = segment.parse().ok()?;
        let children = tree.get(current).children.clone();
        current = syntax::node_alias(tree, *children.get(idx)?);
      }
      _ => return None,
    }
  }
  Some(current)
}

fn walk_for_references(
  tree: &mut SyntaxTree,
  root: NodeId,
  node: NodeId,
  mapped: &mut IndexMap<String, Reference>,
  sequenced: &mut Vec<RefSite>,
) {
  let node = syntax::node_alias(tree, node);
  let kind = tree.get(node).kind;
  if kind != NodeKind::Mapping && kind != NodeKind::Sequence {
    return;
  }

  let children = tree.get(node).children.clone();

  if kind == NodeKind::Mapping
    && let Some((_, definition)) = syntax::is_node_ref(tree, node)
  {
    mapped
      .entry(definition.clone())
      .or_insert_with(|| Reference::new(definition.clone(), resolve_pointer(tree, root, &definition)));
    sequenced.push(RefSite { definition, ref_node: node });
  }

  match kind {
    NodeKind::Mapping => {
      let mut i = 1;
      while i < children.len() {
        walk_for_references(tree, root, children[i], mapped, sequenced);
        i += 2;
      }
    }
    NodeKind::Sequence => {
      for child in children {
        walk_for_references(tree, root, child, mapped, sequenced);
      }
    }
    _ => {}
  }
}

/// Catalogs every schema position: under `definitions` and under any nested
/// `schema:` key. A position already captured in `mapped_references`
/// (because it's itself a `$ref`) is not duplicated here (§4.3 step 2).
fn walk_for_schemas(
  tree: &mut SyntaxTree,
  node: NodeId,
  path: &str,
  mapped: &IndexMap<String, Reference>,
  out: &mut IndexMap<String, NodeId>,
) {
  let node = syntax::node_alias(tree, node);
  if tree.get(node).kind != NodeKind::Mapping {
    return;
  }
  let children = tree.get(node).children.clone();

  if path == "#"
    && let Some((_, root_value)) = syntax::find_key_top(tree, "definitions", &children)
  {
    let root_value = syntax::node_alias(tree, root_value);
    if tree.get(root_value).kind == NodeKind::Mapping {
      let defs = tree.get(root_value).children.clone();
      let mut i = 0;
      while i + 1 < defs.len() {
        let key = tree.get(defs[i]).value.clone();
        let definition = format!("#/definitions/{key}");
        if !mapped.contains_key(&definition) {
          out.insert(definition, defs[i + 1]);
        }
        i += 2;
      }
    }
  }

  let mut i = 1;
  while i < children.len() {
    let key_idx = i - 1;
    let key_name = tree.get(children[key_idx]).value.clone();
    let child_path = format!("{path}/{key_name}");
    if key_name == "schema" {
      let value = syntax::node_alias(tree, children[i]);
      let already_ref = syntax::is_node_ref(tree, value).is_some();
      if !already_ref {
        out.entry(child_path.clone()).or_insert(value);
      }
    }
    walk_for_schemas(tree, children[i], &child_path, mapped, out);
    i += 2;
  }
}

fn count_document_shape(tree: &mut SyntaxTree, root: NodeId, counts: &mut IndexCounts) {
  let root = syntax::node_alias(tree, root);
  let children = tree.get(root).children.clone();

  if let Some((_, paths_value)) = syntax::find_key_top(tree, "paths", &children) {
    let paths_value = syntax::node_alias(tree, paths_value);
    if tree.get(paths_value).kind == NodeKind::Mapping {
      let path_entries = tree.get(paths_value).children.clone();
      let mut i = 0;
      while i + 1 < path_entries.len() {
        counts.path_items += 1;
        let item_value = syntax::node_alias(tree, path_entries[i + 1]);
        if tree.get(item_value).kind == NodeKind::Mapping {
          let item_children = tree.get(item_value).children.clone();
          let mut j = 0;
          while j + 1 < item_children.len() {
            let verb = tree.get(item_children[j]).value.to_ascii_lowercase();
            if OPERATION_VERBS.contains(&verb.as_str()) {
              counts.operations += 1;
            }
            j += 2;
          }
        }
        i += 2;
      }
    }
  }

  if let Some((_, params_value)) = syntax::find_key_top(tree, "parameters", &children) {
    let params_value = syntax::node_alias(tree, params_value);
    if tree.get(params_value).kind == NodeKind::Mapping {
      counts.parameters += tree.get(params_value).children.len() / 2;
    }
  }

  if let Some((_, responses_value)) = syntax::find_key_top(tree, "responses", &children) {
    let responses_value = syntax::node_alias(tree, responses_value);
    if tree.get(responses_value).kind == NodeKind::Mapping {
      counts.responses += tree.get(responses_value).children.len() / 2;
    }
  }

  if let Some((_, security_value)) = syntax::find_key_top(tree, "securityDefinitions", &children) {
    let security_value = syntax::node_alias(tree, security_value);
    if tree.get(security_value).kind == NodeKind::Mapping {
      counts.security_schemes += tree.get(security_value).children.len() / 2;
    }
  }
}

/// The journey/cycle-detection result (§3 `CircularReferenceResult`).
#[derive(Debug, Clone)]
pub struct CircularReferenceResult {
  pub journey: Vec<String>,
  pub start: String,
  pub loop_index: usize,
  pub loop_point: String,
  pub is_polymorphic: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::parse_document;

  #[test]
  fn mapped_references_resolve_target_node_by_pointer_equality() {
    let mut tree = parse_document(b"definitions:\n  Pet:\n    type: object\n  Dog:\n    $ref: \"#/definitions/Pet\"\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);

    let reference = index.lookup("#/definitions/Pet").expect("reference recorded");
    let target = reference.target_node.expect("target resolved");

    // (I1): the indexed target node is pointer-identical to the node at the
    // location `#/definitions/Pet` actually names.
    let direct = resolve_pointer(&mut tree, root, "#/definitions/Pet").unwrap();
    assert_eq!(target, direct);
  }

  #[test]
  fn schema_positions_already_referenced_are_not_duplicated() {
    let mut tree = parse_document(b"definitions:\n  Pet:\n    type: object\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    assert!(!index.all_schemas.contains_key("#/definitions/Pet"));
  }

  #[test]
  fn repeated_ref_sites_append_to_sequenced_references_but_share_one_mapped_entry() {
    let mut tree = parse_document(
      b"definitions:\n  Pet:\n    type: object\n  A:\n    $ref: \"#/definitions/Pet\"\n  B:\n    $ref: \"#/definitions/Pet\"\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    assert_eq!(index.mapped_references.len(), 1);
    assert_eq!(index.sequenced_references.len(), 2);
  }

  #[test]
  fn counts_path_items_and_operations() {
    let mut tree = parse_document(
      b"paths:\n  /pets:\n    get:\n      responses: {}\n    post:\n      responses: {}\n  /pets/{id}:\n    get:\n      responses: {}\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    assert_eq!(index.counts.path_items, 2);
    assert_eq!(index.counts.operations, 3);
  }
}
