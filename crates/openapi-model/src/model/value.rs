//! Polymorphic schema values (§3): the `Schema.type` field (and analogously
//! `items`, `examples`) admits either a single scalar or an array. Modeled
//! as a tagged variant with explicit constructors, no dynamic dispatch (§9
//! "Polymorphic entity value").

use serde_json::Value as Json;

/// A value that may appear as a single `T` (OpenAPI 2.0's common case) or as
/// an array of `T` (the v3-style shape some documents carry forward).
#[derive(Debug, Clone, PartialEq)]
pub enum SingleOrArray<T> {
  Single(T),
  Multi(Vec<T>),
}

impl<T> SingleOrArray<T> {
  #[must_use]
  pub fn as_slice(&self) -> &[T] {
    match self {
      Self::Single(v) => std::slice::from_ref(v),
      Self::Multi(v) => v.as_slice(),
    }
  }

  #[must_use]
  pub fn len(&self) -> usize {
    match self {
      Self::Single(_) => 1,
      Self::Multi(v) => v.len(),
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Backs "default" and example values (§4.5 scalar coercion): attempt
/// mapping decode first, then sequence decode, then fall back to an untyped
/// container — the three-way fallback that captures Swagger 2.0's reality
/// that `default:`/`example:` may be any JSON value. Stored as a
/// [`serde_json::Value`] so the hasher can render it for content hashing
/// (§4.5 "Parameter / Items / Header 'default'").
#[derive(Debug, Clone, PartialEq)]
pub struct AnyValue(pub Json);

impl AnyValue {
  #[must_use]
  pub fn null() -> Self {
    Self(Json::Null)
  }

  #[must_use]
  pub fn is_null(&self) -> bool {
    self.0.is_null()
  }

  #[must_use]
  pub fn render(&self) -> String {
    serde_json::to_string(&self.0).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_or_array_slice_view() {
    let single: SingleOrArray<String> = SingleOrArray::Single("string".to_string());
    assert_eq!(single.as_slice(), &["string".to_string()]);

    let multi: SingleOrArray<String> = SingleOrArray::Multi(vec!["string".into(), "null".into()]);
    assert_eq!(multi.len(), 2);
  }

  #[test]
  fn any_value_renders_array_and_object_and_string() {
    assert_eq!(AnyValue(serde_json::json!(["x", "y", "z"])).render(), r#"["x","y","z"]"#);
    assert_eq!(AnyValue(serde_json::json!({"a": "b"})).render(), r#"{"a":"b"}"#);
    assert_eq!(AnyValue(serde_json::json!("shut that door!")).render(), r#""shut that door!""#);
  }
}
