//! A faithful, node-preserving in-memory model of an OpenAPI/Swagger 2.0
//! document: a typed entity graph whose every field still carries the
//! syntax-tree position it was read from, built concurrently over a
//! reference index and a cycle-aware resolver, and content-addressed by a
//! reordering-stable SHA-256 digest.
//!
//! Tokenizing raw bytes into a grammar-neutral event stream, fetching
//! remote or on-disk `$ref` targets, and re-serializing back to YAML are
//! all out of scope here — `syntax::parse_document` covers the first, the
//! [`openapi_model_fetch::Fetcher`] trait is the pluggable seam for the
//! second, and there is no writer at all for the third. Start at
//! [`create_document`] for the common path, or reach for [`syntax`],
//! [`index`], [`resolver`], [`extract`] and [`hash`] directly when a
//! caller needs one of those lower-level stages on its own.

mod document;
pub mod error;
pub mod extract;
pub mod hash;
pub mod index;
pub mod model;
pub mod resolver;
pub mod syntax;

pub use document::{Config, Document, create_document};
pub use error::{BuildError, DocumentError, ErrorKind, MultiError, ResolvingError};
pub use hash::ContentHash;
pub use index::{CircularReferenceResult, Index};
