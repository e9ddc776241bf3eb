//! The top-level pipeline and public entry point (§6.1, §5 "Run order:
//! Index -> Resolver (optional) -> Extractor"). `create_document` is the
//! only async function most callers ever touch; everything else in the
//! crate is reachable from here for callers who need the lower-level
//! artifacts (linters, diff engines).

use std::path::PathBuf;
use std::sync::Arc;

use openapi_model_fetch::{CompositeFetcher, FetchError, Fetcher, FilesystemFetcher, RemoteUrlHandler};

use crate::error::{DocumentError, ErrorKind};
use crate::extract;
use crate::hash::ContentHash;
use crate::index::{self, CircularReferenceResult, Index};
use crate::model::{AnyValue, NodeReference, Swagger};
use crate::resolver::Resolver;
use crate::syntax::{self, NodeId, SyntaxTree};

/// A fetcher already wrapped for sharing across an async pipeline; `Config`
/// stores fetchers behind `Arc` rather than `Box` so the same handle can be
/// reused across repeated `create_document` calls without re-constructing
/// it (§6.2 `local_fs`/`remote_fs`).
type SharedFetcher = Arc<dyn Fetcher>;

/// Bridges an `Arc<dyn Fetcher>` into the `Box<dyn Fetcher>` shape
/// `CompositeFetcher` expects, without cloning the underlying fetcher.
struct ArcFetcher(SharedFetcher);

impl Fetcher for ArcFetcher {
  fn fetch_local(&self, path: &str) -> Result<Vec<u8>, FetchError> {
    self.0.fetch_local(path)
  }

  fn fetch_remote<'a>(&'a self, url: &'a str) -> openapi_model_fetch::BoxFuture<'a, Result<Vec<u8>, FetchError>> {
    self.0.fetch_remote(url)
  }
}

/// A fetcher that always refuses, used as the `local`/`remote` half of a
/// [`CompositeFetcher`] when that transport is disabled by configuration.
struct DisabledFetcher {
  remote: bool,
}

impl Fetcher for DisabledFetcher {
  fn fetch_local(&self, _path: &str) -> Result<Vec<u8>, FetchError> {
    Err(FetchError::FileDisabled)
  }

  fn fetch_remote<'a>(&'a self, _url: &'a str) -> openapi_model_fetch::BoxFuture<'a, Result<Vec<u8>, FetchError>> {
    Box::pin(async { Err(FetchError::RemoteDisabled) })
  }
}

/// Pipeline configuration (§6.2, exhaustive). Built via `Config::builder()`;
/// `Config::default()` is the zero-config case — no remote or file
/// references permitted, and no fetcher wired up at all.
#[derive(Clone, Default, bon::Builder)]
pub struct Config {
  pub base_url: Option<String>,
  pub base_path: Option<PathBuf>,
  #[builder(default)]
  pub allow_remote_references: bool,
  #[builder(default)]
  pub allow_file_references: bool,
  pub file_filter: Option<Vec<String>>,
  pub local_fs: Option<SharedFetcher>,
  pub remote_fs: Option<SharedFetcher>,
  pub remote_url_handler: Option<RemoteUrlHandler>,
}

impl Config {
  /// Assembles the `local`/`remote` pair `Resolver`/fetch call sites use,
  /// honoring the allow-flags and falling back to the real filesystem /
  /// `reqwest` defaults named in §4.2 when no fetcher was supplied.
  fn build_fetcher(&self) -> CompositeFetcher {
    let local: Box<dyn Fetcher> = if !self.allow_file_references {
      Box::new(DisabledFetcher { remote: false })
    } else if let Some(fetcher) = &self.local_fs {
      Box::new(ArcFetcher(fetcher.clone()))
    } else {
      let base = self.base_path.clone().unwrap_or_else(|| PathBuf::from("."));
      let mut fetcher = FilesystemFetcher::new(base);
      if let Some(filter) = &self.file_filter {
        fetcher = fetcher.with_file_filter(filter.clone());
      }
      Box::new(fetcher)
    };

    let remote: Box<dyn Fetcher> = if !self.allow_remote_references {
      Box::new(DisabledFetcher { remote: true })
    } else if let Some(fetcher) = &self.remote_fs {
      Box::new(ArcFetcher(fetcher.clone()))
    } else {
      #[cfg(feature = "remote-fetch")]
      {
        let mut fetcher = openapi_model_fetch::ReqwestFetcher::new();
        if let Some(handler) = &self.remote_url_handler {
          fetcher = fetcher.with_handler(handler.clone());
        }
        Box::new(fetcher)
      }
      #[cfg(not(feature = "remote-fetch"))]
      {
        Box::new(DisabledFetcher { remote: true })
      }
    };

    CompositeFetcher::new(local, remote)
  }
}

/// The result of running the full pipeline over one document (§6.1). Holds
/// the built [`Swagger`] tree alongside the lower-level artifacts a caller
/// may still need: the syntax tree and [`Index`] the model was built from,
/// and the resolver's circular-reference report.
pub struct Document {
  tree: Arc<SyntaxTree>,
  root: NodeId,
  index: Arc<Index>,
  swagger: Swagger,
  errors: Vec<DocumentError>,
  circular_references: Vec<CircularReferenceResult>,
}

impl Document {
  /// The root entity (§3 `Swagger`).
  #[must_use]
  pub fn swagger(&self) -> &Swagger {
    &self.swagger
  }

  /// Every error accumulated while building this document — parse, index,
  /// resolve, and build failures alike (§7). Always populated, even when
  /// the rest of the document built successfully.
  #[must_use]
  pub fn errors(&self) -> &[DocumentError] {
    &self.errors
  }

  /// The catalogue the extractor and resolver were built from (§4.3).
  #[must_use]
  pub fn index(&self) -> &Index {
    &self.index
  }

  /// Every circular reference the resolver detected, direct or
  /// polymorphic, regardless of whether it also produced a `DocumentError`.
  #[must_use]
  pub fn resolver_report(&self) -> &[CircularReferenceResult] {
    &self.circular_references
  }

  /// Looks up a top-level `x-*` extension by name (with or without the
  /// `x-` prefix already attached).
  #[must_use]
  pub fn find_extension(&self, name: &str) -> Option<&NodeReference<AnyValue>> {
    let key = if name.starts_with("x-") { name.to_string() } else { format!("x-{name}") };
    self.swagger.extensions.get(&key)
  }

  /// Resolves a friendly JSONPath-like expression (§4.1) to the syntax node
  /// it names, or `None` on a miss or timeout.
  #[must_use]
  pub fn find_path(&self, path: &str) -> Option<NodeId> {
    syntax::find_nodes(&self.tree, self.root, path).into_iter().next()
  }

  /// The document's content-address digest (§4.7).
  #[must_use]
  pub fn hash(&self) -> [u8; 32] {
    self.swagger.content_hash()
  }

  /// Hex-encoded form of [`Document::hash`].
  #[must_use]
  pub fn hash_hex(&self) -> String {
    self.swagger.content_hash_hex()
  }
}

/// Runs the full pipeline over `spec_bytes` (§5 "Run order"): parse into a
/// [`SyntaxTree`], build the [`Index`], run the [`Resolver`] (destructively
/// when `config.allow_file_references` or `config.allow_remote_references`
/// is set — external refs only make sense to resolve once fetched, and
/// fetching is wired through the same fetcher the Resolver would otherwise
/// leave untouched for `#/...`-only documents), then extract the typed
/// model concurrently. Never returns an error on its own: parse failures
/// are reported through the returned error list against an empty document
/// rather than as an `Err`, matching every other stage's best-effort
/// accumulation (§7).
pub async fn create_document(spec_bytes: &[u8], config: Config) -> (Document, Vec<DocumentError>) {
  let fetcher = config.build_fetcher();

  let mut tree = match syntax::parse_document(spec_bytes) {
    Ok(tree) => tree,
    Err(err) => {
      let error = DocumentError {
        kind: ErrorKind::YamlParse,
        message: err.to_string(),
        path: "$.".to_string(),
        circular_reference: None,
      };
      return (empty_document(), vec![error]);
    }
  };

  let Some(root) = tree.root() else {
    let error = DocumentError {
      kind: ErrorKind::YamlParse,
      message: "document is empty".to_string(),
      path: "$.".to_string(),
      circular_reference: None,
    };
    return (empty_document(), vec![error]);
  };

  let index = index::build_index(&mut tree, root);
  let resolver = Resolver::new(&index);
  let report = resolver.resolve(&mut tree);

  let mut errors: Vec<DocumentError> = report.errors.iter().cloned().map(DocumentError::from).collect();
  errors.extend(report.circular_references.iter().cloned().map(circular_reference_error));
  errors.extend(splice_external_references(&mut tree, &index, &fetcher, &config).await);

  let tree = Arc::new(tree);
  let index = Arc::new(index);
  let (swagger, build_errors) = extract::build_document(tree.clone(), root, index.clone()).await;
  errors.extend(build_errors);

  let document = Document {
    tree,
    root,
    index,
    swagger,
    errors: errors.clone(),
    circular_references: report.circular_references,
  };
  (document, errors)
}

/// Surfaces a detected cycle as a document-level error (§7 "Circular
/// references are errors at the document level but do not prevent the rest
/// of the model from being built", §6.4 `CIRCULAR_REFERENCE`/
/// `CIRCULAR_POLYMORPHIC`), alongside the existing [`Document::resolver_report`]
/// accessor that carries the full journey for callers that want it.
fn circular_reference_error(circular: CircularReferenceResult) -> DocumentError {
  let kind = if circular.is_polymorphic { ErrorKind::CircularPolymorphic } else { ErrorKind::CircularReference };
  let path = crate::syntax::convert_component_id_into_friendly_path_search(&circular.loop_point);
  let message = format!(
    "circular reference detected: {} (loop back to '{}')",
    circular.journey.join(" -> "),
    circular.loop_point
  );
  DocumentError {
    kind,
    message,
    path,
    circular_reference: Some(circular),
  }
}

/// Wires the configured [`CompositeFetcher`] into the resolve stage for
/// `reference.external` sites (§4.2's `allow_remote_references`/
/// `allow_file_references` are documented as behavior-affecting, not inert):
/// fetches each distinct external location at most once, parses it into its
/// own [`SyntaxTree`], resolves the requested fragment within that tree, and
/// grafts the fragment into `tree` so the site splices exactly like an
/// in-document `$ref` would. A location whose transport isn't permitted by
/// `config` (§6.2: `allow_remote_references`/`allow_file_references` govern
/// whether resolution is *permitted*, not just how it's performed) is left
/// untouched and produces no error, the same as today's behavior for a
/// fetcher-less pipeline; a location that's permitted but unreachable,
/// unparseable, or whose fragment doesn't resolve yields a `DocumentError`
/// for that site rather than aborting the rest of the document (§7).
async fn splice_external_references(tree: &mut SyntaxTree, index: &Index, fetcher: &CompositeFetcher, config: &Config) -> Vec<DocumentError> {
  let mut errors = Vec::new();
  let mut cache: std::collections::HashMap<String, Option<NodeId>> = std::collections::HashMap::new();

  for site in &index.sequenced_references {
    let Some(reference) = index.lookup(&site.definition) else { continue };
    if !reference.external || reference.is_circular() {
      continue;
    }
    let (location, _fragment) = split_external_reference(&site.definition);
    let is_remote = location.starts_with("http://") || location.starts_with("https://");
    if is_remote && !config.allow_remote_references {
      continue;
    }
    if !is_remote && !config.allow_file_references {
      continue;
    }
    if !cache.contains_key(&site.definition) {
      let grafted = fetch_external_target(tree, fetcher, &site.definition, &mut errors).await;
      cache.insert(site.definition.clone(), grafted);
    }
    if let Some(Some(grafted)) = cache.get(&site.definition) {
      tree.splice_children(site.ref_node, *grafted);
    }
  }

  errors
}

/// Fetches, parses, and locates the fragment named by one external reference
/// `definition` (e.g. `"./common.yaml#/definitions/Dog"`), grafting its
/// target node into `tree`. Pushes a `DocumentError` and returns `None` on
/// any failure along the way.
async fn fetch_external_target(tree: &mut SyntaxTree, fetcher: &CompositeFetcher, definition: &str, errors: &mut Vec<DocumentError>) -> Option<NodeId> {
  let (location, fragment) = split_external_reference(definition);
  let path = syntax::convert_component_id_into_friendly_path_search(&format!("#{fragment}"));
  let is_remote = location.starts_with("http://") || location.starts_with("https://");

  let fetch_result = if is_remote { fetcher.fetch_remote(location).await } else { fetcher.fetch_local(location) };
  let bytes = match fetch_result {
    Ok(bytes) => bytes,
    Err(err) => {
      errors.push(DocumentError::from_fetch(&err, path));
      return None;
    }
  };

  let mut external_tree = match syntax::parse_document(&bytes) {
    Ok(external_tree) => external_tree,
    Err(err) => {
      errors.push(DocumentError {
        kind: ErrorKind::YamlParse,
        message: format!("failed to parse '{location}': {err}"),
        path,
        circular_reference: None,
      });
      return None;
    }
  };

  let Some(external_root) = external_tree.root() else {
    errors.push(DocumentError {
      kind: ErrorKind::YamlParse,
      message: format!("fetched document '{location}' is empty"),
      path,
      circular_reference: None,
    });
    return None;
  };

  let pointer = format!("#{fragment}");
  let Some(target) = index::resolve_pointer(&mut external_tree, external_root, &pointer) else {
    errors.push(DocumentError {
      kind: ErrorKind::ReferenceMissing,
      message: format!("'{fragment}' not found in fetched document '{location}'"),
      path,
      circular_reference: None,
    });
    return None;
  };

  Some(tree.graft(&external_tree, target))
}

/// Splits `"./common.yaml#/definitions/Dog"` into `("./common.yaml",
/// "/definitions/Dog")`; a definition with no fragment (`"./common.yaml"`)
/// splits to an empty fragment, which resolves to the fetched document's root.
fn split_external_reference(definition: &str) -> (&str, &str) {
  match definition.split_once('#') {
    Some((location, fragment)) => (location, fragment),
    None => (definition, ""),
  }
}

fn empty_document() -> Document {
  let mut tree = SyntaxTree::default();
  let root = tree.push(crate::syntax::NodeData::scalar(crate::syntax::Tag::Null, String::new(), 0, 0));
  tree.root = Some(root);
  let index = index::build_index(&mut tree, root);
  Document {
    tree: Arc::new(tree),
    root,
    index: Arc::new(index),
    swagger: Swagger::default(),
    errors: Vec::new(),
    circular_references: Vec::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DOC: &[u8] = b"swagger: \"2.0\"\ninfo:\n  title: Pet Store\n  version: \"1.0\"\npaths:\n  /pets:\n    get:\n      responses:\n        200:\n          description: ok\n";

  #[tokio::test]
  async fn create_document_builds_a_swagger_entity_with_no_errors() {
    let (document, errors) = create_document(DOC, Config::default()).await;
    assert!(errors.is_empty());
    assert_eq!(document.swagger().swagger.value, "2.0");
    assert_eq!(document.errors().len(), 0);
  }

  #[tokio::test]
  async fn create_document_reports_yaml_parse_errors_against_an_empty_document() {
    let (document, errors) = create_document(b"swagger: [unterminated", Config::default()).await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::YamlParse);
    assert_eq!(document.swagger().swagger.value, "");
  }

  #[tokio::test]
  async fn create_document_reports_missing_reference_without_failing_the_whole_document() {
    let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths:\n  /pets:\n    get:\n      responses:\n        200:\n          description: ok\ndefinitions:\n  Dog:\n    $ref: \"#/definitions/Nope\"\n";
    let (document, errors) = create_document(doc, Config::default()).await;
    assert!(errors.iter().any(|e| e.kind == ErrorKind::ReferenceMissing));
    assert_eq!(document.swagger().swagger.value, "2.0");
  }

  #[tokio::test]
  async fn create_document_surfaces_a_direct_cycle_as_a_circular_reference_error() {
    let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  A:\n    $ref: \"#/definitions/B\"\n  B:\n    $ref: \"#/definitions/A\"\n";
    let (document, errors) = create_document(doc, Config::default()).await;
    assert_eq!(errors.iter().filter(|e| e.kind == ErrorKind::CircularReference).count(), 1);
    assert_eq!(document.resolver_report().len(), 1);
    assert!(!document.resolver_report()[0].is_polymorphic);
  }

  #[tokio::test]
  async fn create_document_surfaces_a_polymorphic_cycle_with_its_own_kind() {
    let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  A:\n    allOf:\n      - $ref: \"#/definitions/B\"\n  B:\n    allOf:\n      - $ref: \"#/definitions/A\"\n";
    let (_, errors) = create_document(doc, Config::default()).await;
    assert_eq!(errors.iter().filter(|e| e.kind == ErrorKind::CircularPolymorphic).count(), 1);
  }

  struct StubFetcher(Vec<u8>);

  impl Fetcher for StubFetcher {
    fn fetch_local(&self, _path: &str) -> Result<Vec<u8>, FetchError> {
      Ok(self.0.clone())
    }

    fn fetch_remote<'a>(&'a self, _url: &'a str) -> openapi_model_fetch::BoxFuture<'a, Result<Vec<u8>, FetchError>> {
      Box::pin(async { Err(FetchError::RemoteDisabled) })
    }
  }

  #[tokio::test]
  async fn create_document_splices_an_external_file_reference_when_allowed() {
    let common = b"definitions:\n  Dog:\n    type: object\n    properties:\n      bark:\n        type: boolean\n";
    let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  Pet:\n    $ref: \"./common.yaml#/definitions/Dog\"\n";
    let config = Config {
      allow_file_references: true,
      local_fs: Some(Arc::new(StubFetcher(common.to_vec()))),
      ..Config::default()
    };
    let (document, errors) = create_document(doc, config).await;
    assert!(errors.is_empty());

    let definitions = &document.swagger().definitions.as_ref().expect("definitions present").value;
    let pet = &definitions.entries.get(&crate::model::KeyReference::new("Pet".to_string(), None)).expect("Pet present").value.0.value;
    assert_eq!(pet.type_.as_ref().expect("type present").value.as_slice(), vec!["object".to_string()].as_slice());
    assert!(pet.properties.as_ref().expect("properties present").contains_key(&crate::model::KeyReference::new("bark".to_string(), None)));
  }

  #[tokio::test]
  async fn create_document_leaves_an_external_reference_untouched_when_file_references_are_not_allowed() {
    let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  Pet:\n    $ref: \"./common.yaml#/definitions/Dog\"\n";
    let (document, errors) = create_document(doc, Config::default()).await;
    assert!(errors.is_empty());

    let definitions = &document.swagger().definitions.as_ref().expect("definitions present").value;
    let pet = &definitions.entries.get(&crate::model::KeyReference::new("Pet".to_string(), None)).expect("Pet present").value.0.value;
    assert!(pet.type_.is_none());
  }

  struct FailingFetcher;

  impl Fetcher for FailingFetcher {
    fn fetch_local(&self, _path: &str) -> Result<Vec<u8>, FetchError> {
      Err(FetchError::Local { path: "common.yaml".to_string(), message: "no such file".to_string() })
    }

    fn fetch_remote<'a>(&'a self, _url: &'a str) -> openapi_model_fetch::BoxFuture<'a, Result<Vec<u8>, FetchError>> {
      Box::pin(async { Err(FetchError::RemoteDisabled) })
    }
  }

  #[tokio::test]
  async fn create_document_reports_a_fetch_failure_when_file_references_are_allowed_but_unreachable() {
    let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\ndefinitions:\n  Pet:\n    $ref: \"./common.yaml#/definitions/Dog\"\n";
    let config = Config { allow_file_references: true, local_fs: Some(Arc::new(FailingFetcher)), ..Config::default() };
    let (_, errors) = create_document(doc, config).await;
    assert!(errors.iter().any(|e| e.kind == ErrorKind::FileFetchFailed));
  }

  #[tokio::test]
  async fn find_extension_locates_a_top_level_x_key_with_or_without_its_prefix() {
    let doc = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\nx-internal-id: abc123\n";
    let (document, _) = create_document(doc, Config::default()).await;
    assert!(document.find_extension("internal-id").is_some());
    assert!(document.find_extension("x-internal-id").is_some());
    assert!(document.find_extension("nope").is_none());
  }

  #[tokio::test]
  async fn hash_is_stable_under_top_level_key_reordering() {
    let a = b"swagger: \"2.0\"\ninfo:\n  title: x\n  version: \"1\"\npaths: {}\n";
    let b = b"info:\n  title: x\n  version: \"1\"\nswagger: \"2.0\"\npaths: {}\n";
    let (doc_a, _) = create_document(a, Config::default()).await;
    let (doc_b, _) = create_document(b, Config::default()).await;
    assert_eq!(doc_a.hash(), doc_b.hash());
  }
}
