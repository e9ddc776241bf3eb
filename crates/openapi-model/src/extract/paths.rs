//! `Paths`, `PathItem`, `Operation` (§4.5 "PathItem special cases"): a `$ref`
//! on a path item suppresses operation extraction entirely; otherwise each of
//! the seven verb slots is built independently. The plain [`Build`] impls
//! below are the sequential baseline; [`build_paths_concurrent`] is what the
//! document assembler actually calls, fanning path items — and, within each,
//! operations — out across `tokio::task::JoinSet`s (§4.5 "Parallel
//! extraction", §5).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::{
  Build, collect_extensions, extract_array, extract_map, extract_object, extract_string_field, extract_string_seq_field, node_location, scalar_bool_field_or,
  scalar_string,
};
use crate::error::BuildError;
use crate::index::Index;
use crate::model::{ExternalDoc, KeyReference, NodeReference, Operation, Parameter, OrderedMap, PathItem, Paths, Responses, SecurityRequirement, ValueReference};
use crate::syntax::{self, NodeId, NodeKind, SyntaxTree};

const VERBS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

impl Build for Operation {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    let parameters = extract_array::<Parameter>(tree, &children, "parameters", index)?.unwrap_or_default();
    let responses = extract_object::<Responses>(tree, &children, "responses", index)?.ok_or_else(|| BuildError::MissingField {
      field: "responses".to_string(),
      path: node_location(tree, node),
    })?;
    Ok(Self {
      tags: extract_string_seq_field(tree, &children, "tags"),
      summary: extract_string_field(tree, &children, "summary"),
      description: extract_string_field(tree, &children, "description"),
      external_docs: extract_object::<ExternalDoc>(tree, &children, "externalDocs", index)?,
      operation_id: extract_string_field(tree, &children, "operationId"),
      consumes: extract_string_seq_field(tree, &children, "consumes"),
      produces: extract_string_seq_field(tree, &children, "produces"),
      parameters,
      responses,
      schemes: extract_string_seq_field(tree, &children, "schemes"),
      deprecated: scalar_bool_field_or(tree, &children, "deprecated", false),
      security: extract_array::<SecurityRequirement>(tree, &children, "security", index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for PathItem {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    if let Some((key_node, value_node)) = syntax::find_key_top_ro(tree, "$ref", &children) {
      return Ok(Self {
        ref_: Some(NodeReference::new(scalar_string(tree, value_node), Some(key_node), Some(value_node))),
        ..Default::default()
      });
    }
    Ok(Self {
      ref_: None,
      get: extract_object::<Operation>(tree, &children, "get", index)?,
      put: extract_object::<Operation>(tree, &children, "put", index)?,
      post: extract_object::<Operation>(tree, &children, "post", index)?,
      delete: extract_object::<Operation>(tree, &children, "delete", index)?,
      options: extract_object::<Operation>(tree, &children, "options", index)?,
      head: extract_object::<Operation>(tree, &children, "head", index)?,
      patch: extract_object::<Operation>(tree, &children, "patch", index)?,
      parameters: extract_array::<Parameter>(tree, &children, "parameters", index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

impl Build for Paths {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      paths: extract_map::<PathItem>(tree, node, index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

/// Finds `paths:` under the document root and builds it with real
/// concurrency: one task per path template, each of which spawns one further
/// task per present verb (§4.5).
pub(crate) async fn build_paths_concurrent(tree: Arc<SyntaxTree>, parent_children: Vec<NodeId>, index: Arc<Index>) -> Result<Option<NodeReference<Paths>>, BuildError> {
  let Some((key_node, value_node)) = syntax::find_key_top_ro(&tree, "paths", &parent_children) else {
    return Ok(None);
  };
  let paths = build_paths_entries_concurrent(tree.clone(), value_node, index).await?;
  Ok(Some(NodeReference::new(paths, Some(key_node), Some(value_node))))
}

async fn build_paths_entries_concurrent(tree: Arc<SyntaxTree>, node: NodeId, index: Arc<Index>) -> Result<Paths, BuildError> {
  let node = syntax::dealias_ro(&tree, node);
  let children = tree.get(node).children.clone();
  let extensions = collect_extensions(&tree, &children);

  if tree.get(node).kind != NodeKind::Mapping {
    return Ok(Paths { paths: OrderedMap::new(), extensions });
  }

  let mut tasks: JoinSet<(NodeId, Result<PathItem, BuildError>)> = JoinSet::new();
  let mut order: Vec<(String, NodeId, NodeId)> = Vec::new();
  let mut i = 0;
  while i + 1 < children.len() {
    let key_node = children[i];
    let value_node = children[i + 1];
    let key_name = tree.get(key_node).value.clone();
    if key_name.starts_with("x-") {
      i += 2;
      continue;
    }
    order.push((key_name, key_node, value_node));

    let tree = tree.clone();
    let index = index.clone();
    tasks.spawn(async move {
      let result = build_path_item_concurrent(tree, value_node, index).await;
      (key_node, result)
    });
    i += 2;
  }

  let mut results: HashMap<NodeId, Result<PathItem, BuildError>> = HashMap::new();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok((key_node, result)) => {
        results.insert(key_node, result);
      }
      Err(join_error) => {
        tracing::error!("path item task panicked: {join_error}");
      }
    }
  }

  let mut paths = OrderedMap::new();
  for (key_name, key_node, value_node) in order {
    if let Some(result) = results.remove(&key_node) {
      let item = result?;
      paths.insert(KeyReference::new(key_name, Some(key_node)), ValueReference::new(item, Some(value_node)));
    }
  }
  Ok(Paths { paths, extensions })
}

async fn build_path_item_concurrent(tree: Arc<SyntaxTree>, node: NodeId, index: Arc<Index>) -> Result<PathItem, BuildError> {
  let node = syntax::dealias_ro(&tree, node);
  let children = tree.get(node).children.clone();

  if let Some((key_node, value_node)) = syntax::find_key_top_ro(&tree, "$ref", &children) {
    return Ok(PathItem {
      ref_: Some(NodeReference::new(scalar_string(&tree, value_node), Some(key_node), Some(value_node))),
      ..Default::default()
    });
  }

  let parameters = extract_array::<Parameter>(&tree, &children, "parameters", &index)?;

  let mut tasks: JoinSet<(&'static str, Result<Option<NodeReference<Operation>>, BuildError>)> = JoinSet::new();
  for verb in VERBS {
    let tree = tree.clone();
    let children = children.clone();
    let index = index.clone();
    tasks.spawn(async move {
      let result = extract_object::<Operation>(tree.as_ref(), &children, verb, index.as_ref());
      (verb, result)
    });
  }

  let mut built: HashMap<&'static str, Result<Option<NodeReference<Operation>>, BuildError>> = HashMap::new();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok((verb, result)) => {
        built.insert(verb, result);
      }
      Err(join_error) => {
        tracing::error!("operation task panicked: {join_error}");
      }
    }
  }

  let mut item = PathItem {
    ref_: None,
    parameters,
    extensions: collect_extensions(&tree, &children),
    ..Default::default()
  };
  for verb in VERBS {
    let result = built.remove(verb).unwrap_or(Ok(None))?;
    match verb {
      "get" => item.get = result,
      "put" => item.put = result,
      "post" => item.post = result,
      "delete" => item.delete = result,
      "options" => item.options = result,
      "head" => item.head = result,
      "patch" => item.patch = result,
      _ => unreachable!("VERBS is a fixed seven-element array"),
    }
  }
  Ok(item)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::build_index;
  use crate::syntax::parse_document;

  #[test]
  fn path_item_with_ref_suppresses_operations() {
    let mut tree = parse_document(b"$ref: \"#/definitions/Shared\"\nget:\n  responses: {}\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let item = PathItem::build(&tree, root, &index).expect("builds");
    assert!(item.ref_.is_some());
    assert!(item.get.is_none());
  }

  #[test]
  fn path_item_builds_present_verbs() {
    let mut tree = parse_document(b"get:\n  responses:\n    200:\n      description: ok\npost:\n  responses:\n    201:\n      description: created\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let item = PathItem::build(&tree, root, &index).expect("builds");
    assert!(item.get.is_some());
    assert!(item.post.is_some());
    assert!(item.delete.is_none());
  }

  #[tokio::test]
  async fn build_paths_concurrent_preserves_textual_order() {
    let mut tree = parse_document(
      b"paths:\n  /zebras:\n    get:\n      responses:\n        200:\n          description: ok\n  /apples:\n    get:\n      responses:\n        200:\n          description: ok\n",
    )
    .expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let tree = Arc::new(tree);
    let index = Arc::new(index);
    let children = tree.get(root).children.clone();

    let result = build_paths_concurrent(tree, children, index).await.expect("builds").expect("present");
    let templates: Vec<&str> = result.value.paths.keys().map(|k| k.value.as_str()).collect();
    assert_eq!(templates, vec!["/zebras", "/apples"]);
  }
}
