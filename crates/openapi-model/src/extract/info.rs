//! The small descriptive entities (§3): `Info`, `Contact`, `License`, `Tag`,
//! `ExternalDoc`. None of these hold nested entity-valued collections, so
//! each `build()` is a flat field-by-field read.

use super::{Build, collect_extensions, extract_object, extract_string_field, require_string_field};
use crate::error::BuildError;
use crate::index::Index;
use crate::model::{Contact, ExternalDoc, Info, License, Tag};
use crate::syntax::{self, NodeId, SyntaxTree};

impl Build for Info {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      title: require_string_field(tree, &children, "title", node)?,
      description: extract_string_field(tree, &children, "description"),
      terms_of_service: extract_string_field(tree, &children, "termsOfService"),
      contact: extract_object::<Contact>(tree, &children, "contact", index)?,
      license: extract_object::<License>(tree, &children, "license", index)?,
      version: require_string_field(tree, &children, "version", node)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for Contact {
  fn build(tree: &SyntaxTree, node: NodeId, _index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      name: extract_string_field(tree, &children, "name"),
      url: extract_string_field(tree, &children, "url"),
      email: extract_string_field(tree, &children, "email"),
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for License {
  fn build(tree: &SyntaxTree, node: NodeId, _index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      name: require_string_field(tree, &children, "name", node)?,
      url: extract_string_field(tree, &children, "url"),
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for Tag {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      name: require_string_field(tree, &children, "name", node)?,
      description: extract_string_field(tree, &children, "description"),
      external_docs: extract_object::<ExternalDoc>(tree, &children, "externalDocs", index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for ExternalDoc {
  fn build(tree: &SyntaxTree, node: NodeId, _index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      description: extract_string_field(tree, &children, "description"),
      url: require_string_field(tree, &children, "url", node)?,
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
  fn info_builds_nested_contact_and_license() {
    let mut tree = parse_document(
      b"title: Pet Store\nversion: \"1.0\"\ncontact:\n  name: Erik\nlicense:\n  name: MIT\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let info = Info::build(&tree, root, &index).expect("builds");
    assert_eq!(info.title.value, "Pet Store");
    assert_eq!(info.contact.unwrap().value.name.unwrap().value, "Erik");
    assert_eq!(info.license.unwrap().value.name.value, "MIT");
  }

  #[test]
  fn info_missing_title_is_a_build_error() {
    let mut tree = parse_document(b"version: \"1.0\"\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    assert!(Info::build(&tree, root, &index).is_err());
  }
}
