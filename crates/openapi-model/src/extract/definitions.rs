//! `DefinitionsMap<T>` (§3, §4.5 "worker-per-entry pattern"): the shape
//! shared by `Definitions`/`ParameterDefinitions`/`ResponsesDefinitions`/
//! `SecurityDefinitions`. The plain [`Build`] impl below is sequential and
//! used wherever a `DefinitionsMap` shows up nested (none currently, but it
//! keeps the type generically constructible); the real top-level extraction
//! goes through [`build_definitions_map_concurrent`], which spawns one
//! `tokio::task` per named entry and rejoins them under their original key
//! (§4.5 "Ordering guarantee"), mirroring the fan-out + join idiom used for
//! the document's top-level fields (`document.rs`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::{Build, build_possibly_ref, collect_extensions, extract_map};
use crate::error::BuildError;
use crate::index::Index;
use crate::model::{DefinitionsMap, KeyReference, NodeReference, OrderedMap, ValueReference};
use crate::syntax::{self, NodeId, NodeKind, SyntaxTree};

impl<T: Build> Build for DefinitionsMap<T> {
  fn build(tree: &SyntaxTree, node: NodeId, index: &Index) -> Result<Self, BuildError> {
    let node = syntax::dealias_ro(tree, node);
    let children = tree.get(node).children.clone();
    Ok(Self {
      entries: extract_map::<T>(tree, node, index)?,
      extensions: collect_extensions(tree, &children),
    })
  }
}

/// Finds `key` under `parent_children` and, if present, builds its mapping
/// value entry-by-entry across concurrent tasks.
pub(crate) async fn build_definitions_map_concurrent<T>(
  tree: Arc<SyntaxTree>,
  parent_children: Vec<NodeId>,
  key: &'static str,
  index: Arc<Index>,
) -> Result<Option<NodeReference<DefinitionsMap<T>>>, BuildError>
where
  T: Build + Send + 'static,
{
  let Some((key_node, value_node)) = syntax::find_key_top_ro(&tree, key, &parent_children) else {
    return Ok(None);
  };
  let map = build_entries_concurrent::<T>(tree.clone(), value_node, index).await?;
  Ok(Some(NodeReference::new(map, Some(key_node), Some(value_node))))
}

async fn build_entries_concurrent<T>(tree: Arc<SyntaxTree>, node: NodeId, index: Arc<Index>) -> Result<DefinitionsMap<T>, BuildError>
where
  T: Build + Send + 'static,
{
  let node = syntax::dealias_ro(&tree, node);
  let children = tree.get(node).children.clone();
  let extensions = collect_extensions(&tree, &children);

  if tree.get(node).kind != NodeKind::Mapping {
    return Ok(DefinitionsMap { entries: OrderedMap::new(), extensions });
  }

  let mut tasks: JoinSet<(NodeId, Result<NodeReference<T>, BuildError>)> = JoinSet::new();
  let mut order: Vec<(String, NodeId)> = Vec::new();
  let mut i = 0;
  while i + 1 < children.len() {
    let key_node = children[i];
    let value_node = children[i + 1];
    let key_name = tree.get(key_node).value.clone();
    if key_name.starts_with("x-") {
      i += 2;
      continue;
    }
    order.push((key_name, key_node));

    let tree = tree.clone();
    let index = index.clone();
    tasks.spawn(async move {
      let result = build_possibly_ref::<T>(tree.as_ref(), key_node, value_node, index.as_ref());
      (key_node, result)
    });
    i += 2;
  }

  let mut results: HashMap<NodeId, Result<NodeReference<T>, BuildError>> = HashMap::new();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok((key_node, result)) => {
        results.insert(key_node, result);
      }
      Err(join_error) => {
        tracing::error!("definitions entry task panicked: {join_error}");
      }
    }
  }

  let mut entries = OrderedMap::new();
  for (key_name, key_node) in order {
    if let Some(result) = results.remove(&key_node) {
      let built = result?;
      entries.insert(KeyReference::new(key_name, Some(key_node)), ValueReference::new(built.value, built.value_node));
    }
  }

  Ok(DefinitionsMap { entries, extensions })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::build_index;
  use crate::model::{Parameter, SchemaProxy};
  use crate::syntax::parse_document;

  #[tokio::test]
  async fn definitions_map_builds_entries_concurrently_in_textual_order() {
    let mut tree = parse_document(b"definitions:\n  Dog:\n    type: object\n  Cat:\n    type: object\n  Bird:\n    type: object\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let tree = Arc::new(tree);
    let index = Arc::new(index);
    let children = tree.get(root).children.clone();

    let built = build_definitions_map_concurrent::<SchemaProxy>(tree.clone(), children, "definitions", index)
      .await
      .expect("builds")
      .expect("present");

    let names: Vec<&str> = built.value.entries.keys().map(|k| k.value.as_str()).collect();
    assert_eq!(names, vec!["Dog", "Cat", "Bird"]);
  }

  #[tokio::test]
  async fn missing_definitions_key_yields_none() {
    let mut tree = parse_document(b"info:\n  title: x\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let tree = Arc::new(tree);
    let index = Arc::new(index);
    let children = tree.get(root).children.clone();
    let built = build_definitions_map_concurrent::<Parameter>(tree, children, "parameters", index).await.expect("no error");
    assert!(built.is_none());
  }
}
