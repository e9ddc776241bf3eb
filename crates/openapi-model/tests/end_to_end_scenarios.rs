//! Integration tests for the six literal end-to-end scenarios and the core
//! testable invariants: reorder-invariant hashing, circular-reference
//! detection (direct and polymorphic), missing-reference reporting, the
//! parallel path-item short-circuit, and default-value polymorphism.

use openapi_model::extract::Build;
use openapi_model::index::build_index;
use openapi_model::model::{Items, KeyReference, Parameter};
use openapi_model::resolver::Resolver;
use openapi_model::syntax::parse_document;
use openapi_model::{Config, ContentHash, ErrorKind, create_document};

#[test]
fn reordering_items_keys_does_not_change_its_hash() {
  let mut tree_a = parse_document(b"type: string\nformat: uuid\npattern: \"^[0-9]+$\"\n").expect("parses");
  let root_a = tree_a.root().unwrap();
  let index_a = build_index(&mut tree_a, root_a);
  let items_a = Items::build(&tree_a, root_a, &index_a).expect("builds");

  let mut tree_b = parse_document(b"pattern: \"^[0-9]+$\"\ntype: string\nformat: uuid\n").expect("parses");
  let root_b = tree_b.root().unwrap();
  let index_b = build_index(&mut tree_b, root_b);
  let items_b = Items::build(&tree_b, root_b, &index_b).expect("builds");

  assert_eq!(items_a.content_hash(), items_b.content_hash());
}

#[tokio::test]
async fn direct_circular_reference_produces_one_non_polymorphic_result() {
  let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  A:\n    $ref: \"#/definitions/B\"\n  B:\n    $ref: \"#/definitions/A\"\n";
  let (document, _errors) = create_document(doc, Config::default()).await;

  let report = document.resolver_report();
  assert_eq!(report.len(), 1);
  assert!(!report[0].is_polymorphic);
  assert_eq!(report[0].loop_index, 0);
}

#[tokio::test]
async fn polymorphic_circular_reference_via_all_of_produces_one_result() {
  let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  A:\n    allOf:\n      - $ref: \"#/definitions/B\"\n  B:\n    allOf:\n      - $ref: \"#/definitions/A\"\n";
  let (document, _errors) = create_document(doc, Config::default()).await;

  let report = document.resolver_report();
  assert_eq!(report.len(), 1);
  assert!(report[0].is_polymorphic);
}

#[tokio::test]
async fn missing_reference_surfaces_exactly_one_reference_missing_error() {
  let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  Dog:\n    $ref: \"#/definitions/Nope\"\n";
  let (_document, errors) = create_document(doc, Config::default()).await;

  assert_eq!(errors.len(), 1);
  assert_eq!(errors[0].kind, ErrorKind::ReferenceMissing);
  assert_eq!(errors[0].path, "$.definitions['Nope']");
}

#[tokio::test]
async fn a_thousand_broken_path_item_parameters_produce_exactly_one_error() {
  let mut doc = String::from("swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths:\n");
  for i in 0..1000 {
    doc.push_str(&format!("  /p{i}:\n    parameters:\n      $ref: break\n"));
  }

  let (document, errors) = create_document(doc.as_bytes(), Config::default()).await;

  assert_eq!(errors.len(), 1);
  assert_eq!(errors[0].kind, ErrorKind::BuildFailed);
  assert_eq!(document.swagger().swagger.value, "2.0");
}

#[tokio::test]
async fn default_value_decodes_as_sequence_mapping_or_string() {
  let mut tree = parse_document(b"name: q\nin: query\ntype: array\ndefault: [x, y, z]\n").expect("parses");
  let root = tree.root().unwrap();
  let index = build_index(&mut tree, root);
  let param = Parameter::build(&tree, root, &index).expect("builds");
  let default = param.items.default.expect("default present").value.0;
  assert_eq!(default.as_array().expect("is array").len(), 3);

  let mut tree = parse_document(b"name: q\nin: query\ntype: object\ndefault: {a: b}\n").expect("parses");
  let root = tree.root().unwrap();
  let index = build_index(&mut tree, root);
  let param = Parameter::build(&tree, root, &index).expect("builds");
  let default = param.items.default.expect("default present").value.0;
  assert_eq!(default.as_object().expect("is object").len(), 1);

  let mut tree = parse_document(b"name: q\nin: query\ntype: string\ndefault: \"shut that door!\"\n").expect("parses");
  let root = tree.root().unwrap();
  let index = build_index(&mut tree, root);
  let param = Parameter::build(&tree, root, &index).expect("builds");
  let default = param.items.default.expect("default present").value.0;
  assert_eq!(default.as_str(), Some("shut that door!"));
}

#[test]
fn resolve_splices_through_a_three_level_reference_chain_from_the_public_api() {
  let mut tree = parse_document(
    b"definitions:\n  Pet:\n    type: object\n    properties:\n      name:\n        type: string\n  Dog:\n    $ref: \"#/definitions/Pet\"\n  Puppy:\n    $ref: \"#/definitions/Dog\"\n",
  )
  .expect("parses");
  let root = tree.root().unwrap();
  let index = build_index(&mut tree, root);
  let pet_target = index.lookup("#/definitions/Pet").unwrap().target_node.unwrap();
  let resolver = Resolver::new(&index);
  resolver.resolve(&mut tree);

  let puppy_ref_node = index.sequenced_references.iter().find(|s| s.definition == "#/definitions/Dog").unwrap().ref_node;
  assert_eq!(tree.get(puppy_ref_node).children, tree.get(pet_target).children);
}

#[tokio::test]
async fn create_document_builds_a_minimal_document_with_no_errors() {
  let doc = b"swagger: \"2.0\"\ninfo:\n  title: Example\n  version: \"1.0.0\"\npaths:\n  /pets:\n    get:\n      responses:\n        200:\n          description: ok\n";
  let (document, errors) = create_document(doc, Config::default()).await;

  assert!(errors.is_empty());
  assert_eq!(document.swagger().info.value.title.value, "Example");
  let pets = document.swagger().paths.value.paths.get(&KeyReference::new("/pets".to_string(), None)).expect("path present");
  assert!(pets.value.get.is_some());
}
