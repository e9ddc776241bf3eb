//! `Response`, `Responses` (§4.5 "Responses special case"): a key literally
//! named `default` inside a `responses:` mapping is lifted into the
//! `default` field and removed from the per-code map.

use super::{Build, build_possibly_ref, collect_extensions, decode_any_value, extract_map, extract_object, require_string_field};
use crate::error::BuildError;
use crate::index::Index;
use crate::model::{Examples, Header, KeyReference, NodeReference, OrderedMap, Response, Responses, SchemaProxy, ValueReference};
use crate::syntax::{self, NodeId, SyntaxTree};

fn extract_examples_field(tree: &SyntaxTree, children: &[NodeId], key: &str) -> Option<NodeReference<Examples>> {
  let (k, v) = syntax::find_key_top_ro(tree, key, children)?;
  let mut map = Examples::new();
  let entry_children = tree.get(v).children.clone();
  let mut i = 0;
  while i + 1 < entry_children.len() {
    let key_node = entry_children[i];
    let value_node = entry_children[i + 1];
    let key_name = tree.get(key_node).value.clone();
    map.insert(
      KeyReference::new(key_name, Some(key_node)),
      ValueReference::new(decode_any_value(tree, value_node), Some(value_node)),
    );
    i += 2;
  }
  Some(NodeReference::new(map, Some(k), Some(v)))
}

impl Build for Response {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    let headers = match syntax::find_key_top_ro(tree, "headers", &children) {
      Some((_, v)) => Some(extract_map::<Header>(tree, v, index)?),
      None => None,
    };
    Ok(Self {
      description: require_string_field(tree, &children, "description", node)?,
      schema: extract_object::<SchemaProxy>(tree, &children, "schema", index)?,
      headers,
      examples: extract_examples_field(tree, &children, "examples"),
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for Responses {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();

    let mut default = None;
    let mut codes: OrderedMap<Response> = OrderedMap::new();
    let mut i = 0;
    while i + 1 < children.len() {
      let key_node = children[i];
      let value_node = children[i + 1];
      let key_name = tree.get(key_node).value.clone();
      if key_name.starts_with("x-") {
        i += 2;
        continue;
      }
      let built = build_possibly_ref::<Response>(tree, key_node, value_node, index)?;
      if key_name == "default" {
        default = Some(built);
      } else {
        codes.insert(KeyReference::new(key_name, Some(key_node)), ValueReference::new(built.value, built.value_node));
      }
      i += 2;
    }

    Ok(Self {
      default,
      codes,
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
  fn default_key_is_lifted_out_of_the_code_map() {
    let mut tree = parse_document(b"200:\n  description: ok\ndefault:\n  description: error\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let responses = Responses::build(&tree, root, &index).expect("builds");
    assert!(responses.default.is_some());
    assert_eq!(responses.default.unwrap().value.description.value, "error");
    assert!(!responses.codes.keys().any(|k| k.value == "default"));
    assert_eq!(responses.codes.len(), 1);
  }

  #[test]
  fn response_requires_description() {
    let mut tree = parse_document(b"schema:\n  type: string\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    assert!(Response::build(&tree, root, &index).is_err());
  }
}
