//! The Resolver (§4.4): depth-first traversal over every mapped reference,
//! detecting circular references (direct and polymorphic `allOf`/`oneOf`/
//! `anyOf` loops) and, when asked to `resolve()`, splicing each non-circular
//! `$ref` site's children to match its target's children in place.

use crate::error::{ErrorKind, ResolvingError};
use crate::index::{CircularReferenceResult, Index};
use crate::syntax::{self, NodeId, NodeKind, SyntaxTree, convert_component_id_into_friendly_path_search};

const RELATIVES_DEPTH_CAP: usize = 100;

struct Relative {
  definition: String,
  is_polymorphic: bool,
}

/// Walks `Resolver::check_circular`/`resolve` over an [`Index`] built for a
/// single document. Borrows the index for the duration of a pass; the tree
/// is taken `&mut` only by `resolve()`, which needs exclusive access to
/// splice children in place (§5 "Shared resources").
pub struct Resolver<'a> {
  index: &'a Index,
}

/// Outcome of a single resolver pass.
#[derive(Debug, Default)]
pub struct ResolverReport {
  pub circular_references: Vec<CircularReferenceResult>,
  pub errors: Vec<ResolvingError>,
}

impl<'a> Resolver<'a> {
  #[must_use]
  pub fn new(index: &'a Index) -> Self {
    Self { index }
  }

  /// Non-destructive cycle-detection pass (§4.4).
  pub fn check_circular(&self, tree: &mut SyntaxTree) -> ResolverReport {
    self.run(tree, false)
  }

  /// Destructive pass: runs `check_circular` internally, then splices every
  /// non-circular reference site so its children equal its target's
  /// children. Polymorphic cycles are never spliced (§4.4, R2).
  ///
  /// Splicing itself runs in dependency (post-)order rather than the flat
  /// textual-discovery order `sequenced_references` happens to provide: a
  /// site's target may itself be another site that hasn't been spliced yet
  /// (a transitive chain, `A` -> `B` -> `C`), so a site is only spliced
  /// after its target is — memoized by node so a shared target is only
  /// copied once no matter how many sites point at it.
  pub fn resolve(&self, tree: &mut SyntaxTree) -> ResolverReport {
    let report = self.run(tree, true);

    let site_by_ref_node: std::collections::HashMap<NodeId, usize> =
      self.index.sequenced_references.iter().enumerate().map(|(i, site)| (site.ref_node, i)).collect();
    let mut spliced = std::collections::HashSet::new();
    let mut in_progress = std::collections::HashSet::new();

    for i in 0..self.index.sequenced_references.len() {
      self.splice_site(tree, i, &site_by_ref_node, &mut spliced, &mut in_progress);
    }
    report
  }

  /// Splices `sequenced_references[i]` after first splicing its target, if
  /// the target is itself an unspliced site. `in_progress` guards against a
  /// cycle that slipped past circularity marking (defensive — `run` should
  /// already have flagged every cycle as circular, so this loop would end
  /// on the first repeated node rather than recursing forever).
  fn splice_site(
    &self,
    tree: &mut SyntaxTree,
    i: usize,
    site_by_ref_node: &std::collections::HashMap<NodeId, usize>,
    spliced: &mut std::collections::HashSet<NodeId>,
    in_progress: &mut std::collections::HashSet<NodeId>,
  ) {
    let site = &self.index.sequenced_references[i];
    let ref_node = site.ref_node;
    if spliced.contains(&ref_node) || in_progress.contains(&ref_node) {
      return;
    }
    let Some(reference) = self.index.lookup(&site.definition) else { return };
    if reference.is_circular() {
      return;
    }
    let Some(target) = reference.target_node else { return };

    in_progress.insert(ref_node);
    if let Some(&target_site) = site_by_ref_node.get(&target) {
      self.splice_site(tree, target_site, site_by_ref_node, spliced, in_progress);
    }
    tree.splice_children(ref_node, target);
    spliced.insert(ref_node);
    in_progress.remove(&ref_node);
  }

  fn run(&self, tree: &mut SyntaxTree, do_resolve: bool) -> ResolverReport {
    let mut report = ResolverReport::default();
    let definitions: Vec<String> = self.index.mapped_references.keys().cloned().collect();
    for definition in definitions {
      let mut journey = Vec::new();
      self.visit_reference(tree, &definition, &mut journey, do_resolve, &mut report);
    }
    report
  }

  /// §4.4's `visit_reference(ref, seen, journey, do_resolve)`. `journey` is
  /// always a value copy on recursion (taken as `&mut` here but cloned
  /// before each recursive call) so each explored path is isolated — cycle
  /// detection only ever looks at the *current* path.
  fn visit_reference(&self, tree: &mut SyntaxTree, definition: &str, journey: &mut Vec<String>, do_resolve: bool, report: &mut ResolverReport) {
    let Some(reference) = self.index.lookup(definition) else {
      return;
    };
    if reference.is_resolved() || reference.is_seen() {
      return;
    }

    journey.push(definition.to_string());

    let Some(target) = reference.target_node else {
      // An external reference (file/URL) is legitimately unresolved within
      // this document's tree — fetching it is the fetcher's job (§4.2), not
      // a defect to report. Only an in-document pointer that fails to
      // resolve is a REFERENCE_MISSING error.
      if !reference.external {
        report.errors.push(ResolvingError {
          kind: ErrorKind::ReferenceMissing,
          message: format!("cannot resolve reference '{definition}', it's missing"),
          node: None,
          path: convert_component_id_into_friendly_path_search(definition),
          circular_reference: None,
        });
      }
      reference.set_seen(true);
      reference.set_resolved(true);
      return;
    };

    let relatives = extract_relatives(tree, target, 0);
    // Re-initialized per visit, scoped to this level's relatives only —
    // distinct from the per-definition `seen`/`resolved` bits above.
    let mut seen_here = std::collections::HashSet::new();
    seen_here.insert(definition.to_string());

    for relative in relatives {
      if !seen_here.insert(relative.definition.clone()) {
        continue;
      }

      if let Some(loop_index) = journey.iter().position(|d| d == &relative.definition) {
        if let Some(rel_ref) = self.index.lookup(&relative.definition) {
          rel_ref.set_circular(true);
          rel_ref.set_seen(true);
        }
        let mut cycle_journey = journey.clone();
        cycle_journey.push(relative.definition.clone());
        report.circular_references.push(CircularReferenceResult {
          journey: cycle_journey,
          start: journey[loop_index].clone(),
          loop_index,
          loop_point: relative.definition.clone(),
          is_polymorphic: relative.is_polymorphic,
        });
        continue;
      }

      let mut sub_journey = journey.clone();
      self.visit_reference(tree, &relative.definition, &mut sub_journey, do_resolve, report);
    }

    reference.set_resolved(true);
    reference.set_seen(true);
  }
}

/// §4.4.1: the set of references directly contained inside `node`'s subtree.
/// Hard depth cap of 100 to stop runaway descent on pathological documents;
/// beyond the cap, extraction simply stops (no error — the cap exists to
/// bound cost, not to validate documents).
fn extract_relatives(tree: &mut SyntaxTree, node: NodeId, depth: usize) -> Vec<Relative> {
  if depth >= RELATIVES_DEPTH_CAP {
    return Vec::new();
  }
  let node = syntax::node_alias(tree, node);
  let kind = tree.get(node).kind;
  let mut out = Vec::new();

  match kind {
    NodeKind::Mapping => {
      let children = tree.get(node).children.clone();
      let mut i = 0;
      while i + 1 < children.len() {
        let key = children[i];
        let value = children[i + 1];
        let key_name = tree.get(key).value.clone();

        if key_name == "$ref" {
          if let Some(refstr) = scalar_value(tree, value) {
            out.push(Relative { definition: refstr, is_polymorphic: false });
          }
        } else if matches!(key_name.as_str(), "allOf" | "oneOf" | "anyOf") {
          out.extend(extract_polymorphic_relatives(tree, value));
        } else if matches!(tree.get(syntax::node_alias(tree, value)).kind, NodeKind::Mapping | NodeKind::Sequence) {
          out.extend(extract_relatives(tree, value, depth + 1));
        }
        i += 2;
      }
    }
    NodeKind::Sequence => {
      let children = tree.get(node).children.clone();
      for child in children {
        out.extend(extract_relatives(tree, child, depth + 1));
      }
    }
    _ => {}
  }

  out
}

fn scalar_value(tree: &SyntaxTree, node: NodeId) -> Option<String> {
  (tree.get(node).kind == NodeKind::Scalar).then(|| tree.get(node).value.clone())
}

/// A mapping containing `items: { $ref: … }`, or a sequence whose elements
/// are mappings containing `$ref` directly (§4.4.1).
fn extract_polymorphic_relatives(tree: &mut SyntaxTree, value: NodeId) -> Vec<Relative> {
  let value = syntax::node_alias(tree, value);
  let mut out = Vec::new();
  match tree.get(value).kind {
    NodeKind::Mapping => {
      let children = tree.get(value).children.clone();
      if let Some((_, items_value)) = syntax::find_key_top(tree, "items", &children)
        && let Some((_, refstr)) = syntax::is_node_ref(tree, items_value)
      {
        out.push(Relative { definition: refstr, is_polymorphic: true });
      } else if let Some((_, refstr)) = syntax::is_node_ref(tree, value) {
        out.push(Relative { definition: refstr, is_polymorphic: true });
      }
    }
    NodeKind::Sequence => {
      let children = tree.get(value).children.clone();
      for element in children {
        let element = syntax::node_alias(tree, element);
        if let Some((_, refstr)) = syntax::is_node_ref(tree, element) {
          out.push(Relative { definition: refstr, is_polymorphic: true });
        }
      }
    }
    _ => {}
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::build_index;
  use crate::syntax::parse_document;

  #[test]
  fn detects_direct_circular_reference() {
    let mut tree =
      parse_document(b"definitions:\n  A:\n    $ref: \"#/definitions/B\"\n  B:\n    $ref: \"#/definitions/A\"\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let resolver = Resolver::new(&index);
    let report = resolver.check_circular(&mut tree);

    assert_eq!(report.circular_references.len(), 1);
    let result = &report.circular_references[0];
    assert!(!result.is_polymorphic);
    assert_eq!(result.loop_index, 0);
  }

  #[test]
  fn detects_polymorphic_circular_reference_via_all_of() {
    let mut tree = parse_document(
      b"definitions:\n  A:\n    allOf:\n      - $ref: \"#/definitions/B\"\n  B:\n    allOf:\n      - $ref: \"#/definitions/A\"\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let resolver = Resolver::new(&index);
    let report = resolver.check_circular(&mut tree);

    assert_eq!(report.circular_references.len(), 1);
    assert!(report.circular_references[0].is_polymorphic);
  }

  #[test]
  fn resolve_splices_ref_site_children_to_match_target() {
    let mut tree = parse_document(b"definitions:\n  Pet:\n    type: object\n  Dog:\n    $ref: \"#/definitions/Pet\"\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let pet_target = index.lookup("#/definitions/Pet").unwrap().target_node.unwrap();
    let resolver = Resolver::new(&index);
    resolver.resolve(&mut tree);

    let dog_ref_node = index.sequenced_references[0].ref_node;
    assert_eq!(tree.get(dog_ref_node).children, tree.get(pet_target).children);
  }

  #[test]
  fn resolve_splices_through_a_transitive_reference_chain() {
    let mut tree = parse_document(
      b"definitions:\n  Pet:\n    type: object\n    properties:\n      name:\n        type: string\n  Dog:\n    $ref: \"#/definitions/Pet\"\n  Puppy:\n    $ref: \"#/definitions/Dog\"\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let pet_target = index.lookup("#/definitions/Pet").unwrap().target_node.unwrap();
    let resolver = Resolver::new(&index);
    resolver.resolve(&mut tree);

    // Puppy's $ref site discovers Dog's definition textually before Dog's own
    // $ref site discovers Pet's — so Puppy must still end up with Pet's
    // actual children (R2), not a copy of Dog's pre-splice `$ref` pointer.
    let puppy_ref_node = index.sequenced_references.iter().find(|s| s.definition == "#/definitions/Dog").unwrap().ref_node;
    let dog_ref_node = index.sequenced_references.iter().find(|s| s.definition == "#/definitions/Pet").unwrap().ref_node;
    assert_eq!(tree.get(dog_ref_node).children, tree.get(pet_target).children);
    assert_eq!(tree.get(puppy_ref_node).children, tree.get(pet_target).children);
  }

  #[test]
  fn missing_reference_is_recorded_but_does_not_abort() {
    let mut tree = parse_document(b"definitions:\n  Dog:\n    $ref: \"#/definitions/Nope\"\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let resolver = Resolver::new(&index);
    let report = resolver.check_circular(&mut tree);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::ReferenceMissing);
  }

  #[test]
  fn external_reference_is_not_reported_as_missing() {
    let mut tree = parse_document(b"definitions:\n  Dog:\n    $ref: \"./common.yaml#/definitions/Dog\"\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    assert!(index.lookup("./common.yaml#/definitions/Dog").unwrap().external);
    let resolver = Resolver::new(&index);
    let report = resolver.check_circular(&mut tree);
    assert!(report.errors.is_empty());
  }

  #[test]
  fn relatives_extraction_stops_at_depth_cap() {
    let mut tree = parse_document(b"a: {b: 1}\n").expect("parses");
    let root = tree.root().unwrap();
    assert!(extract_relatives(&mut tree, root, RELATIVES_DEPTH_CAP).is_empty());
  }
}
