//! The `NodeReference` model (§3, §4.5): an entity-field wrapper carrying a
//! decoded value alongside the key/value positions it came from, plus the
//! two companion shapes `KeyReference`/`ValueReference` and the order-
//! preserving map every entity uses for its mapping-shaped fields.

use indexmap::IndexMap;

use crate::syntax::NodeId;

/// Wraps a typed value together with its key-node and value-node positions
/// in the syntax tree (§3). At least one of `key_node`/`value_node` is
/// `Some` for any non-default `NodeReference` — a value built from nothing
/// (a synthetic default) carries neither.
#[derive(Debug, Clone)]
pub struct NodeReference<T> {
  pub value: T,
  pub key_node: Option<NodeId>,
  pub value_node: Option<NodeId>,
  pub reference: Option<String>,
}

impl<T> NodeReference<T> {
  #[must_use]
  pub fn new(value: T, key_node: Option<NodeId>, value_node: Option<NodeId>) -> Self {
    Self {
      value,
      key_node,
      value_node,
      reference: None,
    }
  }

  /// Constructs a `NodeReference` materialized by following a `$ref`; per
  /// §3's invariant, `reference` must be set to the source `$ref` string.
  #[must_use]
  pub fn from_reference(value: T, key_node: Option<NodeId>, value_node: Option<NodeId>, reference: String) -> Self {
    Self {
      value,
      key_node,
      value_node,
      reference: Some(reference),
    }
  }

  #[must_use]
  pub fn synthetic(value: T) -> Self {
    Self {
      value,
      key_node: None,
      value_node: None,
      reference: None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NodeReference<U> {
    NodeReference {
      value: f(self.value),
      key_node: self.key_node,
      value_node: self.value_node,
      reference: self.reference,
    }
  }

  #[must_use]
  pub fn is_well_formed(&self) -> bool {
    self.key_node.is_some() || self.value_node.is_some() || self.reference.is_none()
  }
}

impl<T: Default> Default for NodeReference<T> {
  fn default() -> Self {
    Self::synthetic(T::default())
  }
}

/// A key plus its key-node position — the "k" half of a `NodeReference` pair,
/// used as the key type of [`OrderedMap`].
#[derive(Debug, Clone)]
pub struct KeyReference<T> {
  pub value: T,
  pub key_node: Option<NodeId>,
}

impl<T> KeyReference<T> {
  #[must_use]
  pub fn new(value: T, key_node: Option<NodeId>) -> Self {
    Self { value, key_node }
  }
}

impl<T: PartialEq> PartialEq for KeyReference<T> {
  fn eq(&self, other: &Self) -> bool {
    self.value == other.value
  }
}
impl<T: Eq> Eq for KeyReference<T> {}
impl<T: std::hash::Hash> std::hash::Hash for KeyReference<T> {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.value.hash(state);
  }
}

/// A value plus its value-node position — the "v" half of a `NodeReference`
/// pair.
#[derive(Debug, Clone)]
pub struct ValueReference<T> {
  pub value: T,
  pub value_node: Option<NodeId>,
}

impl<T> ValueReference<T> {
  #[must_use]
  pub fn new(value: T, value_node: Option<NodeId>) -> Self {
    Self { value, value_node }
  }
}

/// An insertion-order-preserving map from `KeyReference<String>` to
/// `ValueReference<V>` (§3). Iteration order equals the textual order in the
/// document (§3 invariant), even though entries may have been built
/// concurrently — the extractor re-inserts each result under its original
/// key in textual order after the join (§4.5 "Ordering guarantee").
pub type OrderedMap<V> = IndexMap<KeyReference<String>, ValueReference<V>>;

/// Convenience constructor mirroring how the extractor assembles these maps:
/// build every entry first (any order — concurrent tasks may finish in any
/// order), then insert in textual order.
#[must_use]
pub fn ordered_map_from_entries<V>(entries: Vec<(KeyReference<String>, ValueReference<V>)>) -> OrderedMap<V> {
  entries.into_iter().collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ordered_map_preserves_textual_insertion_order() {
    let entries = vec![
      (KeyReference::new("b".to_string(), None), ValueReference::new(2, None)),
      (KeyReference::new("a".to_string(), None), ValueReference::new(1, None)),
    ];
    let map = ordered_map_from_entries(entries);
    let keys: Vec<&str> = map.keys().map(|k| k.value.as_str()).collect();
    assert_eq!(keys, vec!["b", "a"]);
  }

  #[test]
  fn synthetic_node_reference_has_no_positions() {
    let nr: NodeReference<i32> = NodeReference::synthetic(5);
    assert!(nr.key_node.is_none());
    assert!(nr.value_node.is_none());
    assert!(nr.is_well_formed());
  }
}
