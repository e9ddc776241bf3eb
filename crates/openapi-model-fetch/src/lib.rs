//! The Fetcher Interface (§4.2): a pluggable surface for loading the raw
//! bytes an external `$ref` names, over a scoped local directory or a
//! remote URL. No caching contract is imposed here — the Index performs
//! its own deduplication by definition string (§4.2).

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, `Send` future — the shape an object-safe async trait method
/// must return since `async fn` in traits isn't itself object-safe yet.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetcher-surfaced failures (§4.2, §6.4).
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
  #[error("remote fetch of '{url}' failed: {message}")]
  Remote { url: String, message: String },

  #[error("local fetch of '{path}' failed: {message}")]
  Local { path: String, message: String },

  #[error("remote references are disabled by configuration")]
  RemoteDisabled,

  #[error("file references are disabled by configuration")]
  FileDisabled,

  #[error("path escapes the configured base directory: {path}")]
  PathEscapesRoot { path: String },

  #[error("file name '{name}' is not permitted by the configured file filter")]
  FilteredFilename { name: String },
}

/// The abstract surface a consumer plugs in (§4.2). `fetch_local` is plain
/// blocking I/O — local-disk reads are cheap and bounded, and the resource
/// model (§5) requires handles to be acquired and released within the scope
/// of a single call, which a synchronous `std::fs::read` already satisfies.
/// `fetch_remote` is async because network calls are not: its return type
/// is a boxed future so `Box<dyn Fetcher>` stays usable from `Config`.
pub trait Fetcher: Send + Sync {
  fn fetch_local(&self, path: &str) -> Result<Vec<u8>, FetchError>;

  fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// Injectable HTTP GET function (§6.2 `remote_url_handler`) — lets tests
/// supply a stub instead of performing a real network call.
pub type RemoteUrlHandler = Arc<dyn Fn(&str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> + Send + Sync>;

/// Default local-filesystem loader (§4.2), scoped to a `base_path` and an
/// optional allowlist of permitted filenames/suffixes (`file_filter`, §6.2).
/// Remote fetches through this fetcher are always disabled — pair it with
/// another `Fetcher` via [`CompositeFetcher`] when a document needs both
/// transports.
#[derive(Debug, Clone)]
pub struct FilesystemFetcher {
  base_path: PathBuf,
  file_filter: Option<Vec<String>>,
}

impl FilesystemFetcher {
  #[must_use]
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
      file_filter: None,
    }
  }

  #[must_use]
  pub fn with_file_filter(mut self, file_filter: Vec<String>) -> Self {
    self.file_filter = Some(file_filter);
    self
  }

  fn check_filter(&self, path: &str) -> Result<(), FetchError> {
    let Some(filter) = &self.file_filter else { return Ok(()) };
    let name = Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or(path);
    if filter.iter().any(|allowed| name == allowed || name.ends_with(allowed.as_str())) {
      Ok(())
    } else {
      Err(FetchError::FilteredFilename { name: name.to_string() })
    }
  }

  /// Rejects any relative path containing a `..` component — the scoped
  /// directory root must not be escapable via traversal (§4.2).
  fn resolve_within_root(&self, path: &str) -> Result<PathBuf, FetchError> {
    let requested = Path::new(path);
    if requested.components().any(|c| matches!(c, Component::ParentDir)) {
      return Err(FetchError::PathEscapesRoot { path: path.to_string() });
    }
    Ok(self.base_path.join(requested))
  }
}

impl Fetcher for FilesystemFetcher {
  fn fetch_local(&self, path: &str) -> Result<Vec<u8>, FetchError> {
    self.check_filter(path)?;
    let full_path = self.resolve_within_root(path)?;
    std::fs::read(&full_path).map_err(|err| FetchError::Local {
      path: full_path.display().to_string(),
      message: err.to_string(),
    })
  }

  fn fetch_remote<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
    Box::pin(async { Err(FetchError::RemoteDisabled) })
  }
}

/// Default remote-URL loader (§4.2), gated behind the `reqwest` feature —
/// the same feature-gating idiom the teacher uses for its own optional
/// HTTP transport. Wraps an injectable [`RemoteUrlHandler`] so tests can
/// supply a stub; falls back to a real `reqwest::Client::get` otherwise.
#[cfg(feature = "reqwest")]
pub struct ReqwestFetcher {
  client: reqwest::Client,
  handler: Option<RemoteUrlHandler>,
}

#[cfg(feature = "reqwest")]
impl ReqwestFetcher {
  #[must_use]
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
      handler: None,
    }
  }

  #[must_use]
  pub fn with_handler(mut self, handler: RemoteUrlHandler) -> Self {
    self.handler = Some(handler);
    self
  }
}

#[cfg(feature = "reqwest")]
impl Default for ReqwestFetcher {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(feature = "reqwest")]
impl Fetcher for ReqwestFetcher {
  fn fetch_local(&self, path: &str) -> Result<Vec<u8>, FetchError> {
    Err(FetchError::Local {
      path: path.to_string(),
      message: "ReqwestFetcher does not serve local paths".to_string(),
    })
  }

  fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
    if let Some(handler) = &self.handler {
      return handler(url);
    }
    let client = self.client.clone();
    let url = url.to_string();
    Box::pin(async move {
      let response = client.get(&url).send().await.map_err(|err| FetchError::Remote {
        url: url.clone(),
        message: err.to_string(),
      })?;
      let response = response.error_for_status().map_err(|err| FetchError::Remote {
        url: url.clone(),
        message: err.to_string(),
      })?;
      response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|err| FetchError::Remote { url, message: err.to_string() })
    })
  }
}

/// Pairs a local fetcher with a remote fetcher so a single [`Fetcher`]
/// handle can serve both transports — what `Config` hands to the Resolver
/// when a document mixes file and URL references.
pub struct CompositeFetcher {
  local: Box<dyn Fetcher>,
  remote: Box<dyn Fetcher>,
}

impl CompositeFetcher {
  #[must_use]
  pub fn new(local: Box<dyn Fetcher>, remote: Box<dyn Fetcher>) -> Self {
    Self { local, remote }
  }
}

impl Fetcher for CompositeFetcher {
  fn fetch_local(&self, path: &str) -> Result<Vec<u8>, FetchError> {
    self.local.fetch_local(path)
  }

  fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
    self.remote.fetch_remote(url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filesystem_fetcher_reads_within_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pet.yaml"), b"type: object\n").unwrap();
    let fetcher = FilesystemFetcher::new(dir.path());
    let bytes = fetcher.fetch_local("pet.yaml").expect("reads file");
    assert_eq!(bytes, b"type: object\n");
  }

  #[test]
  fn filesystem_fetcher_rejects_parent_dir_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = FilesystemFetcher::new(dir.path());
    let err = fetcher.fetch_local("../etc/passwd").unwrap_err();
    assert!(matches!(err, FetchError::PathEscapesRoot { .. }));
  }

  #[test]
  fn filesystem_fetcher_enforces_file_filter() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pet.json"), b"{}").unwrap();
    let fetcher = FilesystemFetcher::new(dir.path()).with_file_filter(vec![".yaml".to_string(), ".yml".to_string()]);
    let err = fetcher.fetch_local("pet.json").unwrap_err();
    assert!(matches!(err, FetchError::FilteredFilename { .. }));
  }

  #[tokio::test]
  async fn filesystem_fetcher_remote_is_always_disabled() {
    let fetcher = FilesystemFetcher::new(".");
    let err = fetcher.fetch_remote("https://example.com/pet.yaml").await.unwrap_err();
    assert!(matches!(err, FetchError::RemoteDisabled));
  }

  #[cfg(feature = "reqwest")]
  #[tokio::test]
  async fn injected_remote_url_handler_is_used_instead_of_a_real_request() {
    let handler: RemoteUrlHandler = Arc::new(|url: &str| {
      let url = url.to_string();
      Box::pin(async move { Ok(format!("stubbed:{url}").into_bytes()) })
    });
    let fetcher = ReqwestFetcher::new().with_handler(handler);
    let bytes = fetcher.fetch_remote("https://example.com/pet.yaml").await.unwrap();
    assert_eq!(bytes, b"stubbed:https://example.com/pet.yaml");
  }
}
