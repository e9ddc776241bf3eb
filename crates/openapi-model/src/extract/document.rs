//! The document root (§4.5 "Parallel extraction", §5 "Shared resources"):
//! the crate's top-level entry point. Scalar/sequence fields build inline;
//! the nine larger objects — `info`, `paths`, the four `*Definitions`
//! families, `tags`, `security`, `externalDocs` — each get their own
//! `tokio::spawn`'d task so a document with a large `definitions:` block and
//! a large `paths:` block build side by side rather than one after another.

use std::sync::Arc;

use super::definitions::build_definitions_map_concurrent;
use super::paths::build_paths_concurrent;
use super::{Build, collect_extensions, extract_object, extract_string_field, extract_string_seq_field, node_location, require_string_field};
use crate::error::{BuildError, DocumentError};
use crate::index::Index;
use crate::model::{self, ExternalDoc, Info, NodeReference, SecurityRequirement};
use crate::syntax::{NodeId, SyntaxTree};

/// Builds the full [`Swagger`](model::Swagger) document, fanning the nine
/// heavier top-level fields out across concurrent tasks. Never aborts on a
/// build failure: every field that fails to build is left `None`/empty and
/// its error is appended to the returned list, so a caller always gets a
/// best-effort model alongside a full error report (§7).
pub async fn build_document(tree: Arc<SyntaxTree>, root: NodeId, index: Arc<Index>) -> (model::Swagger, Vec<DocumentError>) {
  let mut errors = Vec::new();
  let children = tree.get(root).children.clone();

  let swagger_version = match require_string_field(&tree, &children, "swagger", root) {
    Ok(version) => version,
    Err(err) => {
      errors.push(DocumentError::from_build(&err, node_path(&tree, root)));
      NodeReference::default()
    }
  };
  let host = extract_string_field(&tree, &children, "host");
  let base_path = extract_string_field(&tree, &children, "basePath");
  let schemes = extract_string_seq_field(&tree, &children, "schemes");
  let consumes = extract_string_seq_field(&tree, &children, "consumes");
  let produces = extract_string_seq_field(&tree, &children, "produces");
  let extensions = collect_extensions(&tree, &children);

  let info_task = tokio::spawn(run_object::<Info>(tree.clone(), children.clone(), "info", index.clone()));
  let external_docs_task = tokio::spawn(run_object::<ExternalDoc>(tree.clone(), children.clone(), "externalDocs", index.clone()));
  let tags_task = tokio::spawn(run_array::<model::Tag>(tree.clone(), children.clone(), "tags", index.clone()));
  let security_task = tokio::spawn(run_array::<SecurityRequirement>(tree.clone(), children.clone(), "security", index.clone()));
  let paths_task = tokio::spawn(build_paths_concurrent(tree.clone(), children.clone(), index.clone()));
  let definitions_task = tokio::spawn(build_definitions_map_concurrent::<model::SchemaProxy>(
    tree.clone(),
    children.clone(),
    "definitions",
    index.clone(),
  ));
  let parameters_task = tokio::spawn(build_definitions_map_concurrent::<model::Parameter>(
    tree.clone(),
    children.clone(),
    "parameters",
    index.clone(),
  ));
  let responses_task = tokio::spawn(build_definitions_map_concurrent::<model::Response>(
    tree.clone(),
    children.clone(),
    "responses",
    index.clone(),
  ));
  let security_definitions_task = tokio::spawn(build_definitions_map_concurrent::<model::SecurityScheme>(
    tree.clone(),
    children.clone(),
    "securityDefinitions",
    index.clone(),
  ));

  let info = join_required(info_task, &tree, root, &mut errors).await.unwrap_or_default();
  let external_docs = join_optional(external_docs_task, &tree, root, &mut errors).await;
  let tags = join_optional(tags_task, &tree, root, &mut errors).await;
  let security = join_optional(security_task, &tree, root, &mut errors).await;
  let paths = join_required(paths_task, &tree, root, &mut errors).await.unwrap_or_default();
  let definitions = join_optional(definitions_task, &tree, root, &mut errors).await;
  let parameters = join_optional(parameters_task, &tree, root, &mut errors).await;
  let responses = join_optional(responses_task, &tree, root, &mut errors).await;
  let security_definitions = join_optional(security_definitions_task, &tree, root, &mut errors).await;

  let swagger = model::Swagger {
    swagger: swagger_version,
    info,
    host,
    base_path,
    schemes,
    consumes,
    produces,
    paths,
    definitions,
    parameters,
    responses,
    security_definitions,
    security,
    tags,
    external_docs,
    extensions,
  };
  (swagger, errors)
}

fn node_path(tree: &SyntaxTree, node: NodeId) -> String {
  node_location(tree, node)
}

async fn run_object<T: Build + Send + 'static>(tree: Arc<SyntaxTree>, children: Vec<NodeId>, key: &'static str, index: Arc<Index>) -> Result<Option<NodeReference<T>>, BuildError> {
  extract_object::<T>(tree.as_ref(), &children, key, index.as_ref())
}

async fn run_array<T: Build + Send + 'static>(tree: Arc<SyntaxTree>, children: Vec<NodeId>, key: &'static str, index: Arc<Index>) -> Result<Option<Vec<NodeReference<T>>>, BuildError> {
  super::extract_array::<T>(tree.as_ref(), &children, key, index.as_ref())
}

async fn join_optional<T>(handle: tokio::task::JoinHandle<Result<Option<T>, BuildError>>, tree: &SyntaxTree, root: NodeId, errors: &mut Vec<DocumentError>) -> Option<T> {
  match handle.await {
    Ok(Ok(value)) => value,
    Ok(Err(err)) => {
      errors.push(DocumentError::from_build(&err, node_path(tree, root)));
      None
    }
    Err(join_error) => {
      tracing::error!("document field task panicked: {join_error}");
      None
    }
  }
}

async fn join_required<T>(handle: tokio::task::JoinHandle<Result<Option<NodeReference<T>>, BuildError>>, tree: &SyntaxTree, root: NodeId, errors: &mut Vec<DocumentError>) -> Option<NodeReference<T>> {
  join_optional(handle, tree, root, errors).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::build_index;
  use crate::syntax::parse_document;

  const DOC: &[u8] = b"swagger: \"2.0\"\ninfo:\n  title: Pet Store\n  version: \"1.0\"\npaths:\n  /pets:\n    get:\n      responses:\n        200:\n          description: ok\ndefinitions:\n  Pet:\n    type: object\n";

  #[tokio::test]
  async fn build_document_assembles_every_top_level_field() {
    let mut tree = parse_document(DOC).expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let tree = Arc::new(tree);
    let index = Arc::new(index);

    let (swagger, errors) = build_document(tree, root, index).await;
    assert!(errors.is_empty());
    assert_eq!(swagger.swagger.value, "2.0");
    assert_eq!(swagger.info.value.title.value, "Pet Store");
    assert_eq!(swagger.paths.value.paths.len(), 1);
    assert_eq!(swagger.definitions.unwrap().value.entries.len(), 1);
  }

  #[tokio::test]
  async fn build_document_reports_missing_swagger_field_without_aborting() {
    let mut tree = parse_document(b"info:\n  title: x\n  version: \"1\"\npaths:\n  /pets:\n    get:\n      responses:\n        200:\n          description: ok\n").expect("parses");
    let root = tree.root().unwrap();
    let index = build_index(&mut tree, root);
    let tree = Arc::new(tree);
    let index = Arc::new(index);

    let (swagger, errors) = build_document(tree, root, index).await;
    assert!(!errors.is_empty());
    assert_eq!(swagger.info.value.title.value, "x");
  }
}
