//! Content-addressed hashing (§4.7): every entity exposes a 32-byte SHA-256
//! digest computed from a fixed, per-type field order so the digest is
//! stable under source reordering — top-level key order, extension key
//! order, `allOf`/`security` scheme order never change the hash (§8 H1).
//!
//! The shape mirrors the teacher's `converter/hashing.rs` normalize-then-hash
//! pipeline (serialize, sort the order-insensitive pieces, hash the
//! canonical string) but the canonicalization is field-order-explicit per
//! entity here rather than a generic `serde_json::Value` walk, and the
//! algorithm is SHA-256 (`sha2`) rather than the teacher's `blake3` — the
//! digest algorithm is pinned by name in the rules this module implements.
//!
//! Each field contributes at most one fragment to the entity's fragment
//! list, in the type's declaration order; empty/default fields contribute
//! nothing (rule 2). Map- and array-valued fields are rendered per rules 3
//! and 4 into a single comma-joined fragment before taking their place in
//! the outer `|`-joined list (rule 5), so every field — scalar, nested
//! entity, map, or array — occupies exactly one slot in a type's fixed
//! field order.

use sha2::{Digest, Sha256};

use crate::model::{
  AdditionalProperties, AnyValue, Contact, DefinitionsMap, Examples, ExternalDoc, Extensions, Header, Info, Items, ItemsShape, License,
  NodeReference, Operation, OrderedMap, Parameter, PathItem, Paths, Response, Responses, Schema, SchemaProxy, Scopes, SecurityRequirement,
  SecurityScheme, SingleOrArray, Swagger, Tag, Xml,
};

/// An entity that can render itself as a fixed-order fragment list for
/// content hashing (§4.7 rule 1).
pub trait ContentHash {
  fn hash_fragments(&self) -> Vec<String>;

  #[must_use]
  fn content_hash(&self) -> [u8; 32] {
    let joined = self.hash_fragments().join("|");
    Sha256::digest(joined.as_bytes()).into()
  }

  #[must_use]
  fn content_hash_hex(&self) -> String {
    to_hex(&self.content_hash())
  }
}

impl<T: ContentHash> ContentHash for NodeReference<T> {
  fn hash_fragments(&self) -> Vec<String> {
    self.value.hash_fragments()
  }
}

impl<T: ContentHash> ContentHash for Box<T> {
  fn hash_fragments(&self) -> Vec<String> {
    (**self).hash_fragments()
  }
}

fn to_hex(bytes: &[u8]) -> String {
  use std::fmt::Write;
  let mut out = String::with_capacity(bytes.len() * 2);
  for byte in bytes {
    let _ = write!(out, "{byte:02x}");
  }
  out
}

/// Recursively renders a JSON value with object keys sorted, so two values
/// that differ only in source key order produce the same string (§8 H1).
fn canonical_json_string(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::Object(map) => {
      let mut entries: Vec<(&String, &serde_json::Value)> = map.iter().collect();
      entries.sort_by(|a, b| a.0.cmp(b.0));
      let body = entries
        .into_iter()
        .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap_or_default(), canonical_json_string(v)))
        .collect::<Vec<_>>()
        .join(",");
      format!("{{{body}}}")
    }
    serde_json::Value::Array(items) => {
      let body = items.iter().map(canonical_json_string).collect::<Vec<_>>().join(",");
      format!("[{body}]")
    }
    other => other.to_string(),
  }
}

fn hash_any_value(value: &AnyValue) -> String {
  to_hex(&Sha256::digest(canonical_json_string(&value.0).as_bytes()))
}

fn frag_string(value: &str) -> Option<String> {
  if value.is_empty() { None } else { Some(value.to_string()) }
}

fn frag_opt_string(value: &Option<NodeReference<String>>) -> Option<String> {
  value.as_ref().and_then(|v| frag_string(&v.value))
}

fn frag_required_string(value: &NodeReference<String>) -> Option<String> {
  frag_string(&value.value)
}

fn frag_bool(value: bool) -> Option<String> {
  value.then(|| "true".to_string())
}

fn frag_opt_bool(value: &Option<NodeReference<bool>>) -> Option<String> {
  value.as_ref().and_then(|v| frag_bool(v.value))
}

fn frag_i64(value: &Option<NodeReference<i64>>) -> Option<String> {
  value.as_ref().and_then(|v| if v.value == 0 { None } else { Some(v.value.to_string()) })
}

fn frag_f64(value: &Option<NodeReference<f64>>) -> Option<String> {
  value.as_ref().and_then(|v| if v.value == 0.0 { None } else { Some(format!("{}", v.value)) })
}

fn frag_sorted_strings(items: &[String]) -> Option<String> {
  if items.is_empty() {
    return None;
  }
  let mut sorted = items.to_vec();
  sorted.sort();
  Some(sorted.join(","))
}

fn frag_string_list(value: &Option<NodeReference<Vec<String>>>) -> Option<String> {
  value.as_ref().and_then(|v| frag_sorted_strings(&v.value))
}

fn frag_hash<T: ContentHash>(value: &Option<T>) -> Option<String> {
  value.as_ref().map(ContentHash::content_hash_hex)
}

fn frag_hash_required<T: ContentHash>(value: &T) -> Option<String> {
  Some(value.content_hash_hex())
}

fn frag_array<T: ContentHash>(items: &[T]) -> Option<String> {
  if items.is_empty() {
    return None;
  }
  let mut hashes: Vec<String> = items.iter().map(ContentHash::content_hash_hex).collect();
  hashes.sort();
  Some(hashes.join(","))
}

fn frag_opt_array<T: ContentHash>(items: &Option<Vec<T>>) -> Option<String> {
  items.as_ref().and_then(|v| frag_array(v))
}

fn frag_map<V: ContentHash>(map: &OrderedMap<V>) -> Option<String> {
  if map.is_empty() {
    return None;
  }
  let mut entries: Vec<(&str, String)> = map.iter().map(|(k, v)| (k.value.as_str(), v.value.content_hash_hex())).collect();
  entries.sort_by(|a, b| a.0.cmp(b.0));
  Some(entries.into_iter().map(|(k, h)| format!("{k}-{h}")).collect::<Vec<_>>().join(","))
}

fn frag_opt_map<V: ContentHash>(map: &Option<OrderedMap<V>>) -> Option<String> {
  map.as_ref().and_then(frag_map)
}

fn frag_string_map(map: &OrderedMap<String>) -> Option<String> {
  if map.is_empty() {
    return None;
  }
  let mut entries: Vec<(&str, String)> = map.iter().map(|(k, v)| (k.value.as_str(), to_hex(&Sha256::digest(v.value.as_bytes())))).collect();
  entries.sort_by(|a, b| a.0.cmp(b.0));
  Some(entries.into_iter().map(|(k, h)| format!("{k}-{h}")).collect::<Vec<_>>().join(","))
}

fn frag_string_list_map(map: &OrderedMap<Vec<String>>) -> Option<String> {
  if map.is_empty() {
    return None;
  }
  let mut entries: Vec<(&str, String)> = map
    .iter()
    .map(|(k, v)| {
      let mut sorted = v.value.clone();
      sorted.sort();
      (k.value.as_str(), to_hex(&Sha256::digest(sorted.join(",").as_bytes())))
    })
    .collect();
  entries.sort_by(|a, b| a.0.cmp(b.0));
  Some(entries.into_iter().map(|(k, h)| format!("{k}-{h}")).collect::<Vec<_>>().join(","))
}

fn frag_examples(value: &Option<NodeReference<Examples>>) -> Option<String> {
  value.as_ref().and_then(|v| {
    if v.value.is_empty() {
      return None;
    }
    let mut entries: Vec<(&str, String)> = v.value.iter().map(|(k, val)| (k.value.as_str(), hash_any_value(&val.value))).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    Some(entries.into_iter().map(|(k, h)| format!("{k}-{h}")).collect::<Vec<_>>().join(","))
  })
}

fn frag_extensions(extensions: &Extensions) -> Option<String> {
  if extensions.is_empty() {
    return None;
  }
  let mut entries: Vec<(&str, String)> = extensions.iter().map(|(k, v)| (k.as_str(), hash_any_value(&v.value))).collect();
  entries.sort_by(|a, b| a.0.cmp(b.0));
  Some(entries.into_iter().map(|(k, h)| format!("{k}-{h}")).collect::<Vec<_>>().join(","))
}

fn frag_any(value: &Option<NodeReference<AnyValue>>) -> Option<String> {
  value.as_ref().and_then(|v| if v.value.is_null() { None } else { Some(hash_any_value(&v.value)) })
}

fn frag_any_list(value: &Option<NodeReference<Vec<AnyValue>>>) -> Option<String> {
  value.as_ref().and_then(|v| {
    if v.value.is_empty() {
      return None;
    }
    let mut hashes: Vec<String> = v.value.iter().map(hash_any_value).collect();
    hashes.sort();
    Some(hashes.join(","))
  })
}

fn frag_type(value: &Option<NodeReference<SingleOrArray<String>>>) -> Option<String> {
  value.as_ref().and_then(|v| match &v.value {
    SingleOrArray::Single(s) => frag_string(s),
    SingleOrArray::Multi(items) => frag_sorted_strings(items),
  })
}

fn frag_items_field(value: &Option<NodeReference<SingleOrArray<SchemaProxy>>>) -> Option<String> {
  value.as_ref().and_then(|v| match &v.value {
    SingleOrArray::Single(s) => Some(s.content_hash_hex()),
    SingleOrArray::Multi(items) => frag_array(items),
  })
}

impl ContentHash for Swagger {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_required_string(&self.swagger),
      frag_hash_required(&self.info),
      frag_opt_string(&self.host),
      frag_opt_string(&self.base_path),
      frag_string_list(&self.schemes),
      frag_string_list(&self.consumes),
      frag_string_list(&self.produces),
      frag_hash_required(&self.paths),
      frag_hash(&self.definitions),
      frag_hash(&self.parameters),
      frag_hash(&self.responses),
      frag_hash(&self.security_definitions),
      frag_opt_array(&self.security),
      frag_opt_array(&self.tags),
      frag_hash(&self.external_docs),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for Info {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_required_string(&self.title),
      frag_opt_string(&self.description),
      frag_opt_string(&self.terms_of_service),
      frag_hash(&self.contact),
      frag_hash(&self.license),
      frag_required_string(&self.version),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for Contact {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_opt_string(&self.name),
      frag_opt_string(&self.url),
      frag_opt_string(&self.email),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for License {
  fn hash_fragments(&self) -> Vec<String> {
    vec![frag_required_string(&self.name), frag_opt_string(&self.url), frag_extensions(&self.extensions)]
      .into_iter()
      .flatten()
      .collect()
  }
}

impl ContentHash for Tag {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_required_string(&self.name),
      frag_opt_string(&self.description),
      frag_hash(&self.external_docs),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for ExternalDoc {
  fn hash_fragments(&self) -> Vec<String> {
    vec![frag_opt_string(&self.description), frag_required_string(&self.url), frag_extensions(&self.extensions)]
      .into_iter()
      .flatten()
      .collect()
  }
}

impl ContentHash for Paths {
  fn hash_fragments(&self) -> Vec<String> {
    vec![frag_map(&self.paths), frag_extensions(&self.extensions)].into_iter().flatten().collect()
  }
}

impl ContentHash for PathItem {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_opt_string(&self.ref_),
      frag_hash(&self.get),
      frag_hash(&self.put),
      frag_hash(&self.post),
      frag_hash(&self.delete),
      frag_hash(&self.options),
      frag_hash(&self.head),
      frag_hash(&self.patch),
      frag_opt_array(&self.parameters),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for Operation {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_string_list(&self.tags),
      frag_opt_string(&self.summary),
      frag_opt_string(&self.description),
      frag_hash(&self.external_docs),
      frag_opt_string(&self.operation_id),
      frag_string_list(&self.consumes),
      frag_string_list(&self.produces),
      frag_array(&self.parameters),
      frag_hash_required(&self.responses),
      frag_string_list(&self.schemes),
      frag_bool(self.deprecated),
      frag_opt_array(&self.security),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for ItemsShape {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_opt_string(&self.type_),
      frag_opt_string(&self.format),
      frag_hash(&self.nested_items),
      frag_opt_string(&self.collection_format),
      frag_any(&self.default),
      frag_f64(&self.maximum),
      frag_opt_bool(&self.exclusive_maximum),
      frag_f64(&self.minimum),
      frag_opt_bool(&self.exclusive_minimum),
      frag_i64(&self.max_length),
      frag_i64(&self.min_length),
      frag_opt_string(&self.pattern),
      frag_i64(&self.max_items),
      frag_i64(&self.min_items),
      frag_opt_bool(&self.unique_items),
      frag_any_list(&self.enum_values),
      frag_f64(&self.multiple_of),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for Parameter {
  fn hash_fragments(&self) -> Vec<String> {
    let mut fragments = vec![
      frag_required_string(&self.name),
      frag_required_string(&self.location),
      frag_opt_string(&self.description),
      frag_bool(self.required),
      frag_hash(&self.schema),
      frag_opt_bool(&self.allow_empty_value),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();
    fragments.extend(self.items.hash_fragments());
    fragments.extend(frag_extensions(&self.extensions));
    fragments
  }
}

impl ContentHash for Items {
  fn hash_fragments(&self) -> Vec<String> {
    let mut fragments = self.shape.hash_fragments();
    fragments.extend(frag_extensions(&self.extensions));
    fragments
  }
}

impl ContentHash for Header {
  fn hash_fragments(&self) -> Vec<String> {
    let mut fragments: Vec<String> = frag_opt_string(&self.description).into_iter().collect();
    fragments.extend(self.shape.hash_fragments());
    fragments.extend(frag_extensions(&self.extensions));
    fragments
  }
}

impl ContentHash for Response {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_required_string(&self.description),
      frag_hash(&self.schema),
      frag_opt_map(&self.headers),
      frag_examples(&self.examples),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
  }
}

impl ContentHash for Responses {
  fn hash_fragments(&self) -> Vec<String> {
    vec![frag_hash(&self.default), frag_map(&self.codes), frag_extensions(&self.extensions)]
      .into_iter()
      .flatten()
      .collect()
  }
}

impl<T: ContentHash> ContentHash for DefinitionsMap<T> {
  fn hash_fragments(&self) -> Vec<String> {
    vec![frag_map(&self.entries), frag_extensions(&self.extensions)].into_iter().flatten().collect()
  }
}

impl ContentHash for SecurityScheme {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_required_string(&self.type_),
      frag_opt_string(&self.description),
      frag_opt_string(&self.name),
      frag_opt_string(&self.location),
      frag_opt_string(&self.flow),
      frag_opt_string(&self.authorization_url),
      frag_opt_string(&self.token_url),
      frag_hash(&self.scopes),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for Scopes {
  fn hash_fragments(&self) -> Vec<String> {
    vec![frag_string_map(&self.entries), frag_extensions(&self.extensions)].into_iter().flatten().collect()
  }
}

impl ContentHash for SecurityRequirement {
  fn hash_fragments(&self) -> Vec<String> {
    frag_string_list_map(&self.requirements).into_iter().collect()
  }
}

impl ContentHash for SchemaProxy {
  fn hash_fragments(&self) -> Vec<String> {
    self.0.value.hash_fragments()
  }
}

impl ContentHash for Schema {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_opt_string(&self.format),
      frag_opt_string(&self.title),
      frag_opt_string(&self.description),
      frag_any(&self.default),
      frag_f64(&self.multiple_of),
      frag_f64(&self.maximum),
      frag_opt_bool(&self.exclusive_maximum),
      frag_f64(&self.minimum),
      frag_opt_bool(&self.exclusive_minimum),
      frag_i64(&self.max_length),
      frag_i64(&self.min_length),
      frag_opt_string(&self.pattern),
      frag_i64(&self.max_items),
      frag_i64(&self.min_items),
      frag_opt_bool(&self.unique_items),
      frag_i64(&self.max_properties),
      frag_i64(&self.min_properties),
      frag_string_list(&self.required),
      frag_any_list(&self.enum_values),
      frag_type(&self.type_),
      frag_items_field(&self.items),
      frag_opt_array(&self.all_of),
      frag_opt_array(&self.one_of),
      frag_opt_array(&self.any_of),
      frag_hash(&self.not),
      frag_opt_map(&self.properties),
      frag_hash(&self.additional_properties),
      frag_opt_string(&self.discriminator),
      frag_opt_bool(&self.read_only),
      frag_hash(&self.xml),
      frag_hash(&self.external_docs),
      frag_any(&self.example),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

impl ContentHash for AdditionalProperties {
  fn hash_fragments(&self) -> Vec<String> {
    match self {
      Self::Allowed(allowed) => vec![format!("bool:{allowed}")],
      Self::Schema(schema) => vec![format!("schema:{}", schema.content_hash_hex())],
    }
  }
}

impl ContentHash for Xml {
  fn hash_fragments(&self) -> Vec<String> {
    vec![
      frag_opt_string(&self.name),
      frag_opt_string(&self.namespace),
      frag_opt_string(&self.prefix),
      frag_opt_bool(&self.attribute),
      frag_opt_bool(&self.wrapped),
      frag_extensions(&self.extensions),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::extract::Build as _;
  use crate::index::build_index;
  use crate::syntax::parse_document;

  fn build_schema(bytes: &[u8]) -> Schema {
    let mut tree = parse_document(bytes).expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    Schema::build(&tree, root, &index).expect("builds")
  }

  #[test]
  fn hash_is_stable_under_top_level_key_reorder() {
    let a = build_schema(b"type: object\nrequired: [name]\nproperties:\n  name:\n    type: string\n");
    let b = build_schema(b"properties:\n  name:\n    type: string\nrequired: [name]\ntype: object\n");
    assert_eq!(a.content_hash_hex(), b.content_hash_hex());
  }

  #[test]
  fn hash_is_stable_under_extension_key_reorder() {
    let a = build_schema(b"type: string\nx-a: 1\nx-b: 2\n");
    let b = build_schema(b"x-b: 2\nx-a: 1\ntype: string\n");
    assert_eq!(a.content_hash_hex(), b.content_hash_hex());
  }

  #[test]
  fn hash_is_stable_under_all_of_reorder() {
    let a = build_schema(b"allOf:\n  - type: string\n  - type: integer\n");
    let b = build_schema(b"allOf:\n  - type: integer\n  - type: string\n");
    assert_eq!(a.content_hash_hex(), b.content_hash_hex());
  }

  #[test]
  fn distinct_schemas_hash_differently() {
    let a = build_schema(b"type: string\n");
    let b = build_schema(b"type: integer\n");
    assert_ne!(a.content_hash_hex(), b.content_hash_hex());
  }

  #[test]
  fn canonical_json_string_sorts_object_keys() {
    let reordered = serde_json::json!({"b": 1, "a": 2});
    let sorted = serde_json::json!({"a": 2, "b": 1});
    assert_eq!(canonical_json_string(&reordered), canonical_json_string(&sorted));
  }
}
