//! `SecurityScheme`, `Scopes`, `SecurityRequirement` (§3).

use super::{Build, collect_extensions, extract_object, extract_string_field, extract_string_list_map, require_string_field, scalar_string};
use crate::error::BuildError;
use crate::index::Index;
use crate::model::{KeyReference, OrderedMap, Scopes, SecurityRequirement, SecurityScheme, ValueReference};
use crate::syntax::{self, NodeId, NodeKind, SyntaxTree};

impl Build for SecurityScheme {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      type_: require_string_field(tree, &children, "type", node)?,
      description: extract_string_field(tree, &children, "description"),
      name: extract_string_field(tree, &children, "name"),
      location: extract_string_field(tree, &children, "in"),
      flow: extract_string_field(tree, &children, "flow"),
      authorization_url: extract_string_field(tree, &children, "authorizationUrl"),
      token_url: extract_string_field(tree, &children, "tokenUrl"),
      scopes: extract_object::<Scopes>(tree, &children, "scopes", index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for Scopes {
  fn build(tree: &SyntaxTree, node: NodeId, _index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    let mut entries: OrderedMap<String> = OrderedMap::new();
    let mut i = 0;
    while i + 1 < children.len() {
      let key_node = children[i];
      let value_node = children[i + 1];
      let key_name = tree.get(key_node).value.clone();
      if !key_name.starts_with("x-") && tree.get(value_node).kind == NodeKind::Scalar {
        entries.insert(
          KeyReference::new(key_name, Some(key_node)),
          ValueReference::new(scalar_string(tree, value_node), Some(value_node)),
        );
      }
      i += 2;
    }
    Ok(Self {
      entries,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for SecurityRequirement {
  fn build(tree: &SyntaxTree, node: NodeId, _index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    Ok(Self {
      requirements: extract_string_list_map(tree, node),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::build_index;
  use crate::syntax::parse_document;

  #[test]
  fn security_scheme_reads_oauth_flow_and_scopes() {
    let mut tree = parse_document(
      b"type: oauth2\nflow: implicit\nauthorizationUrl: https://example.com/auth\nscopes:\n  read:pets: read access\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let scheme = SecurityScheme::build(&tree, root, &index).expect("builds");
    assert_eq!(scheme.type_.value, "oauth2");
    assert_eq!(scheme.scopes.unwrap().value.entries.len(), 1);
  }

  #[test]
  fn security_requirement_maps_scheme_to_scope_list() {
    let mut tree = parse_document(b"petstore_auth:\n  - write:pets\n  - read:pets\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let requirement = SecurityRequirement::build(&tree, root, &index).expect("builds");
    let (key, scopes) = requirement.requirements.get_index(0).unwrap();
    assert_eq!(key.value, "petstore_auth");
    assert_eq!(scopes.value, vec!["write:pets".to_string(), "read:pets".to_string()]);
  }
}
