//! `Schema`, `SchemaProxy`, `AdditionalProperties`, `Xml` (§3 "Polymorphic
//! schema values", §4.5 "extract_object"). A schema position's own `$ref`
//! handling is tracked on the inner [`SchemaProxy`]'s `NodeReference<Schema>`
//! wherever the surrounding field isn't itself already `NodeReference<T>`
//! (`properties`, `allOf`/`oneOf`/`anyOf`, `not`, `items`,
//! `additionalProperties`) — `extract_object`/`extract_array` would otherwise
//! record the `$ref` on a wrapper this entity doesn't have.

use super::{
  Build, collect_extensions, extract_any_field, extract_any_seq_field, extract_bool_field, extract_f64_field, extract_i64_field, extract_object,
  extract_string_field, extract_string_seq_field, ref_site, scalar_bool, scalar_string,
};
use crate::error::BuildError;
use crate::index::Index;
use crate::model::{AdditionalProperties, ExternalDoc, KeyReference, NodeReference, OrderedMap, Schema, SchemaProxy, SingleOrArray, ValueReference, Xml};
use crate::syntax::{self, NodeId, NodeKind, SyntaxTree, Tag};

/// Builds one schema position, recording a `$ref` (if any) on the
/// `SchemaProxy`'s own `NodeReference<Schema>` rather than on an outer
/// wrapper this call site doesn't have.
fn build_schema_proxy(tree: &SyntaxTree, key_node: Option<NodeId>, value_node: NodeId, index: &Index) -> Result<SchemaProxy, BuildError> {
  if let Some((refstr, target)) = ref_site(tree, value_node, index)? {
    let schema = Schema::build(tree, target, index)?;
    return Ok(SchemaProxy(NodeReference::from_reference(schema, key_node, Some(value_node), refstr)));
  }
  let schema = Schema::build(tree, value_node, index)?;
  Ok(SchemaProxy(NodeReference::new(schema, key_node, Some(value_node))))
}

fn extract_schema_proxy_array(tree: &SyntaxTree, children: &[NodeId], key: &str, index: &Index) -> Result<Option<Vec<SchemaProxy>>, BuildError> {
  let Some((key_node, value_node)) = syntax::find_key_top_ro(tree, key, children) else {
    return Ok(None);
  };
  let elements = tree.get(value_node).children.clone();
  let mut out = Vec::with_capacity(elements.len());
  for element in elements {
    out.push(build_schema_proxy(tree, Some(key_node), element, index)?);
  }
  Ok(Some(out))
}

fn extract_schema_proxy_map(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<OrderedMap<SchemaProxy>, BuildError> {
  let node = syntax::dealias_ro(tree, node);
  let mut out = OrderedMap::new();
  if tree.get(node).kind != NodeKind::Mapping {
    return Ok(out);
  }
  let children = tree.get(node).children.clone();
  let mut i = 0;
  while i + 1 < children.len() {
    let key_node = children[i];
    let value_node = children[i + 1];
    let key_name = tree.get(key_node).value.clone();
    let proxy = build_schema_proxy(tree, Some(key_node), value_node, index)?;
    out.insert(KeyReference::new(key_name, Some(key_node)), ValueReference::new(proxy, Some(value_node)));
    i += 2;
  }
  Ok(out)
}

fn extract_type_field(tree: &SyntaxTree, children: &[NodeId]) -> Option<NodeReference<SingleOrArray<String>>> {
  let (k, v) = syntax::find_key_top_ro(tree, "type", children)?;
  let value = match tree.get(v).kind {
    NodeKind::Sequence => SingleOrArray::Multi(tree.get(v).children.iter().map(|&c| scalar_string(tree, syntax::dealias_ro(tree, c))).collect()),
    _ => SingleOrArray::Single(scalar_string(tree, v)),
  };
  Some(NodeReference::new(value, Some(k), Some(v)))
}

fn extract_items_field(tree: &SyntaxTree, children: &[NodeId], index: &Index) -> Result<Option<NodeReference<SingleOrArray<SchemaProxy>>>, BuildError> {
  let Some((parent_key, key_node, value_node)) = syntax::find_key_full_ro(tree, "items", children) else {
    return Ok(None);
  };
  let key_node = parent_key.unwrap_or(key_node);
  let value = match tree.get(value_node).kind {
    NodeKind::Sequence => {
      let elements = tree.get(value_node).children.clone();
      let mut out = Vec::with_capacity(elements.len());
      for element in elements {
        out.push(build_schema_proxy(tree, Some(key_node), element, index)?);
      }
      SingleOrArray::Multi(out)
    }
    _ => SingleOrArray::Single(build_schema_proxy(tree, Some(key_node), value_node, index)?),
  };
  Ok(Some(NodeReference::new(value, Some(key_node), Some(value_node))))
}

fn extract_additional_properties(tree: &SyntaxTree, children: &[NodeId], index: &Index) -> Result<Option<NodeReference<AdditionalProperties>>, BuildError> {
  let Some((parent_key, key_node, value_node)) = syntax::find_key_full_ro(tree, "additionalProperties", children) else {
    return Ok(None);
  };
  let key_node = parent_key.unwrap_or(key_node);
  let value = if tree.get(value_node).kind == NodeKind::Scalar && tree.get(value_node).tag == Tag::Bool {
    AdditionalProperties::Allowed(scalar_bool(tree, value_node))
  } else {
    AdditionalProperties::Schema(Box::new(build_schema_proxy(tree, Some(key_node), value_node, index)?))
  };
  Ok(Some(NodeReference::new(value, Some(key_node), Some(value_node))))
}

impl Build for Schema {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();

    let not = match syntax::find_key_full_ro(tree, "not", &children) {
      Some((parent_key, key_node, value_node)) => Some(Box::new(build_schema_proxy(tree, Some(parent_key.unwrap_or(key_node)), value_node, index)?)),
      None => None,
    };
    let properties = match syntax::find_key_top_ro(tree, "properties", &children) {
      Some((_, v)) => Some(extract_schema_proxy_map(tree, v, index)?),
      None => None,
    };

    Ok(Self {
      format: extract_string_field(tree, &children, "format"),
      title: extract_string_field(tree, &children, "title"),
      description: extract_string_field(tree, &children, "description"),
      default: extract_any_field(tree, &children, "default"),
      multiple_of: extract_f64_field(tree, &children, "multipleOf"),
      maximum: extract_f64_field(tree, &children, "maximum"),
      exclusive_maximum: extract_bool_field(tree, &children, "exclusiveMaximum"),
      minimum: extract_f64_field(tree, &children, "minimum"),
      exclusive_minimum: extract_bool_field(tree, &children, "exclusiveMinimum"),
      max_length: extract_i64_field(tree, &children, "maxLength"),
      min_length: extract_i64_field(tree, &children, "minLength"),
      pattern: extract_string_field(tree, &children, "pattern"),
      max_items: extract_i64_field(tree, &children, "maxItems"),
      min_items: extract_i64_field(tree, &children, "minItems"),
      unique_items: extract_bool_field(tree, &children, "uniqueItems"),
      max_properties: extract_i64_field(tree, &children, "maxProperties"),
      min_properties: extract_i64_field(tree, &children, "minProperties"),
      required: extract_string_seq_field(tree, &children, "required"),
      enum_values: extract_any_seq_field(tree, &children, "enum"),
      type_: extract_type_field(tree, &children),
      items: extract_items_field(tree, &children, index)?,
      all_of: extract_schema_proxy_array(tree, &children, "allOf", index)?,
      one_of: extract_schema_proxy_array(tree, &children, "oneOf", index)?,
      any_of: extract_schema_proxy_array(tree, &children, "anyOf", index)?,
      not,
      properties,
      additional_properties: extract_additional_properties(tree, &children, index)?,
      discriminator: extract_string_field(tree, &children, "discriminator"),
      read_only: extract_bool_field(tree, &children, "readOnly"),
      xml: extract_object::<Xml>(tree, &children, "xml", index)?,
      external_docs: extract_object::<ExternalDoc>(tree, &children, "externalDocs", index)?,
      example: extract_any_field(tree, &children, "example"),
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for SchemaProxy {
  /// Used only when `extract_object`/`extract_array` drives this generically
  /// (`Parameter.schema`, `Response.schema`) — `$ref` following for those
  /// positions already happened one level up in `build_possibly_ref`, so this
  /// just wraps `node`'s own position.
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let schema = Schema::build(tree, node, index)?;
    Ok(Self(NodeReference::new(schema, None, Some(node))))
  }
}

impl Build for Xml {
  fn build(tree: &SyntaxTree, node: NodeId, _index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      name: extract_string_field(tree, &children, "name"),
      namespace: extract_string_field(tree, &children, "namespace"),
      prefix: extract_string_field(tree, &children, "prefix"),
      attribute: extract_bool_field(tree, &children, "attribute"),
      wrapped: extract_bool_field(tree, &children, "wrapped"),
      extensions: collect_extensions(tree, &children),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::build_index;
  use crate::syntax::parse_document;

  #[test]
  fn schema_builds_nested_properties_and_required() {
    let mut tree = parse_document(b"type: object\nrequired: [name]\nproperties:\n  name:\n    type: string\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let schema = Schema::build(&tree, root, &index).expect("builds");
    assert_eq!(schema.required.unwrap().value, vec!["name".to_string()]);
    let props = schema.properties.expect("has properties");
    assert_eq!(props.len(), 1);
  }

  #[test]
  fn ref_valued_property_carries_reference_string() {
    let mut tree = parse_document(
      b"definitions:\n  Pet:\n    type: object\n  Dog:\n    type: object\n    properties:\n      owner:\n        $ref: \"#/definitions/Pet\"\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let dog_node = index.all_schemas.get("#/definitions/Dog").copied();
    let dog_node = dog_node.unwrap_or_else(|| {
      let children = tree.get(root).children.clone();
      let (_, defs) = syntax::find_key_top_ro(&tree, "definitions", &children).unwrap();
      let defs_children = tree.get(defs).children.clone();
      syntax::find_key_top_ro(&tree, "Dog", &defs_children).unwrap().1
    });
    let schema = Schema::build(&tree, dog_node, &index).expect("builds");
    let properties = schema.properties.unwrap();
    let (_, owner) = properties.get_index(0).expect("has one property");
    assert_eq!(owner.value.0.reference.as_deref(), Some("#/definitions/Pet"));
  }

  #[test]
  fn additional_properties_bool_and_schema_variants() {
    let mut tree = parse_document(b"type: object\nadditionalProperties: false\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let schema = Schema::build(&tree, root, &index).expect("builds");
    match schema.additional_properties.unwrap().value {
      AdditionalProperties::Allowed(allowed) => assert!(!allowed),
      AdditionalProperties::Schema(_) => panic!("expected bool variant"),
    }
  }
}
