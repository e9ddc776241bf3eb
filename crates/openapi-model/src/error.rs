//! §6.4/§7: the error surface. Build and resolving errors never abort their
//! pipeline stage — they accumulate into [`MultiError`] so a caller gets a
//! best-effort model plus a full error list (§7).

use crate::index::CircularReferenceResult;
use crate::syntax::NodeId;

/// Error *kinds*, not names (§6.4) — a `#[non_exhaustive]` tag so callers can
/// `match` on the kind without a wildcard arm quietly swallowing new variants.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  YamlParse,
  ReferenceMissing,
  CircularReference,
  CircularPolymorphic,
  BuildFailed,
  RemoteFetchFailed,
  FileFetchFailed,
  PathInvalid,
  Timeout,
}

/// A single resolving error (§4.4.2): carries the underlying message, the
/// node it was raised at, a friendly JSONPath, and — for circular references
/// — the detected cycle.
#[derive(Debug, Clone)]
pub struct ResolvingError {
  pub kind: ErrorKind,
  pub message: String,
  pub node: Option<NodeId>,
  pub path: String,
  pub circular_reference: Option<CircularReferenceResult>,
}

impl std::fmt::Display for ResolvingError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.message, self.path)
  }
}

impl std::error::Error for ResolvingError {}

/// Build-time failures (§4.5, §4.6). Every `build()` implementation returns
/// `Result<(), BuildError>`; failures propagate unchanged to the caller,
/// which accumulates them rather than aborting the rest of the document.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
  #[error("missing required field '{field}' at {path}")]
  MissingField { field: String, path: String },

  #[error("field '{field}' at {path} has the wrong shape: {message}")]
  WrongShape { field: String, path: String, message: String },

  #[error(transparent)]
  JsonPath(#[from] crate::syntax::JsonPathError),
}

impl BuildError {
  #[must_use]
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::MissingField { .. } | Self::WrongShape { .. } => ErrorKind::BuildFailed,
      Self::JsonPath(err) => err.kind(),
    }
  }
}

/// Fetcher-surfaced failures (§4.2, §6.4), owned by `openapi-model-fetch`
/// since the fetcher trait lives there and the core crate must not depend
/// downward on its own capability crate for just an error type.
pub use openapi_model_fetch::FetchError;

fn fetch_error_kind(err: &FetchError) -> ErrorKind {
  match err {
    FetchError::Remote { .. } => ErrorKind::RemoteFetchFailed,
    FetchError::Local { .. } | FetchError::RemoteDisabled | FetchError::FileDisabled | FetchError::PathEscapesRoot { .. } | FetchError::FilteredFilename { .. } => {
      ErrorKind::FileFetchFailed
    }
  }
}

/// A single document-level error: whichever stage produced it (parse, index,
/// resolve, build), normalized to a kind + message + friendly path so
/// callers don't need to match on three separate error enums (§6.4).
#[derive(Debug, Clone)]
pub struct DocumentError {
  pub kind: ErrorKind,
  pub message: String,
  pub path: String,
  pub circular_reference: Option<CircularReferenceResult>,
}

impl std::fmt::Display for DocumentError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{:?}] {} ({})", self.kind, self.message, self.path)
  }
}

impl std::error::Error for DocumentError {}

impl From<ResolvingError> for DocumentError {
  fn from(err: ResolvingError) -> Self {
    Self {
      kind: err.kind,
      message: err.message,
      path: err.path,
      circular_reference: err.circular_reference,
    }
  }
}

impl DocumentError {
  #[must_use]
  pub fn from_build(err: &BuildError, path: String) -> Self {
    Self {
      kind: err.kind(),
      message: err.to_string(),
      path,
      circular_reference: None,
    }
  }

  #[must_use]
  pub fn from_fetch(err: &FetchError, path: String) -> Self {
    Self {
      kind: fetch_error_kind(err),
      message: err.to_string(),
      path,
      circular_reference: None,
    }
  }
}

/// Aggregates multiple errors (§4.6). Nesting is preserved on push but can be
/// flattened on demand via [`MultiError::unwrap_all`], recursively unwrapping
/// until no nested [`MultiError`] remains — mirroring the teacher corpus'
/// convention of a flat `Vec` as the ground truth for error reporting, with a
/// tree-shaped accumulator only while errors are still being collected.
#[derive(Debug, Clone, Default)]
pub struct MultiError {
  errors: Vec<MultiErrorEntry>,
}

#[derive(Debug, Clone)]
enum MultiErrorEntry {
  Leaf(DocumentError),
  Nested(MultiError),
}

impl MultiError {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, error: DocumentError) {
    self.errors.push(MultiErrorEntry::Leaf(error));
  }

  pub fn push_nested(&mut self, nested: MultiError) {
    if !nested.is_empty() {
      self.errors.push(MultiErrorEntry::Nested(nested));
    }
  }

  pub fn extend(&mut self, errors: impl IntoIterator<Item = DocumentError>) {
    self.errors.extend(errors.into_iter().map(MultiErrorEntry::Leaf));
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  /// Recursively unwraps nested `MultiError`s into one flat `Vec`.
  #[must_use]
  pub fn unwrap_all(&self) -> Vec<DocumentError> {
    let mut out = Vec::new();
    for entry in &self.errors {
      match entry {
        MultiErrorEntry::Leaf(err) => out.push(err.clone()),
        MultiErrorEntry::Nested(nested) => out.extend(nested.unwrap_all()),
      }
    }
    out
  }

  /// Filters the flattened error list by kind.
  #[must_use]
  pub fn filter_by_kind(&self, kind: ErrorKind) -> Vec<DocumentError> {
    self.unwrap_all().into_iter().filter(|e| e.kind == kind).collect()
  }

  /// Maps the flattened error list.
  pub fn map<T>(&self, f: impl Fn(&DocumentError) -> T) -> Vec<T> {
    self.unwrap_all().iter().map(f).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn leaf(message: &str) -> DocumentError {
    DocumentError {
      kind: ErrorKind::BuildFailed,
      message: message.to_string(),
      path: "$.".to_string(),
      circular_reference: None,
    }
  }

  #[test]
  fn unwrap_all_flattens_nested_multi_errors() {
    let mut inner = MultiError::new();
    inner.push(leaf("inner-1"));
    let mut outer = MultiError::new();
    outer.push(leaf("outer-1"));
    outer.push_nested(inner);
    let flat = outer.unwrap_all();
    assert_eq!(flat.len(), 2);
  }

  #[test]
  fn empty_nested_multi_error_is_not_appended() {
    let mut outer = MultiError::new();
    outer.push_nested(MultiError::new());
    assert!(outer.is_empty());
  }
}
