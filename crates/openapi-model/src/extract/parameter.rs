//! `Parameter`, `Items`, `Header` (§4.5 "Parameter / Items / Header"): all
//! three share the fourteen-field [`ItemsShape`], built once by
//! `build_items_shape` and embedded rather than repeated.

use super::{
  Build, collect_extensions, extract_any_field, extract_any_seq_field, extract_bool_field, extract_f64_field, extract_i64_field, extract_object,
  extract_string_field, require_string_field, scalar_bool_field_or,
};
use crate::error::BuildError;
use crate::index::Index;
use crate::model::{Header, Items, ItemsShape, Parameter, SchemaProxy};
use crate::syntax::{self, NodeId, SyntaxTree};

fn build_items_shape(tree: &SyntaxTree, children: &[NodeId], index: &Index) -> Result<ItemsShape, BuildError> {
  Ok(ItemsShape {
    type_: extract_string_field(tree, children, "type"),
    format: extract_string_field(tree, children, "format"),
    nested_items: extract_object::<Items>(tree, children, "items", index)?.map(Box::new),
    collection_format: extract_string_field(tree, children, "collectionFormat"),
    default: extract_any_field(tree, children, "default"),
    maximum: extract_f64_field(tree, children, "maximum"),
    exclusive_maximum: extract_bool_field(tree, children, "exclusiveMaximum"),
    minimum: extract_f64_field(tree, children, "minimum"),
    exclusive_minimum: extract_bool_field(tree, children, "exclusiveMinimum"),
    max_length: extract_i64_field(tree, children, "maxLength"),
    min_length: extract_i64_field(tree, children, "minLength"),
    pattern: extract_string_field(tree, children, "pattern"),
    max_items: extract_i64_field(tree, children, "maxItems"),
    min_items: extract_i64_field(tree, children, "minItems"),
    unique_items: extract_bool_field(tree, children, "uniqueItems"),
    enum_values: extract_any_seq_field(tree, children, "enum"),
    multiple_of: extract_f64_field(tree, children, "multipleOf"),
  })
}

impl Build for Parameter {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      name: require_string_field(tree, &children, "name", node)?,
      location: require_string_field(tree, &children, "in", node)?,
      description: extract_string_field(tree, &children, "description"),
      required: scalar_bool_field_or(tree, &children, "required", false),
      schema: extract_object::<SchemaProxy>(tree, &children, "schema", index)?,
      allow_empty_value: extract_bool_field(tree, &children, "allowEmptyValue"),
      items: build_items_shape(tree, &children, index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for Items {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      shape: build_items_shape(tree, &children, index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for Header {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      description: extract_string_field(tree, &children, "description"),
      shape: build_items_shape(tree, &children, index)?,
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
  fn non_body_parameter_reads_items_shape() {
    let mut tree = parse_document(b"name: limit\nin: query\ntype: integer\nrequired: true\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let param = Parameter::build(&tree, root, &index).expect("builds");
    assert_eq!(param.name.value, "limit");
    assert_eq!(param.location.value, "query");
    assert!(param.required);
    assert_eq!(param.items.type_.unwrap().value, "integer");
  }

  #[test]
  fn parameter_required_defaults_false() {
    let mut tree = parse_document(b"name: q\nin: query\ntype: string\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let param = Parameter::build(&tree, root, &index).expect("builds");
    assert!(!param.required);
  }

  #[test]
  fn body_parameter_reads_schema() {
    let mut tree = parse_document(b"name: body\nin: body\nschema:\n  type: object\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let param = Parameter::build(&tree, root, &index).expect("builds");
    assert!(param.schema.is_some());
  }
}
