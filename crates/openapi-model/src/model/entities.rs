//! The OpenAPI 2.0 / Swagger object set (§3 "v2 entities"). Every field is a
//! [`NodeReference`] (or `OrderedMap`/`Vec` of one) so a caller can recover
//! the exact source position of anything in the model; every object that
//! permits `x-*` keys carries an `extensions` map in discovery order.

use indexmap::IndexMap;

use super::node_ref::{NodeReference, OrderedMap};
use super::value::{AnyValue, SingleOrArray};

/// Extension fields (§4.5 step 6): every top-level key prefixed `x-`,
/// collected in textual discovery order.
pub type Extensions = IndexMap<String, NodeReference<AnyValue>>;

/// The Swagger/OpenAPI 2.0 root object.
#[derive(Debug, Clone, Default)]
pub struct Swagger {
  pub swagger: NodeReference<String>,
  pub info: NodeReference<Info>,
  pub host: Option<NodeReference<String>>,
  pub base_path: Option<NodeReference<String>>,
  pub schemes: Option<NodeReference<Vec<String>>>,
  pub consumes: Option<NodeReference<Vec<String>>>,
  pub produces: Option<NodeReference<Vec<String>>>,
  pub paths: NodeReference<Paths>,
  pub definitions: Option<NodeReference<Definitions>>,
  pub parameters: Option<NodeReference<ParameterDefinitions>>,
  pub responses: Option<NodeReference<ResponsesDefinitions>>,
  pub security_definitions: Option<NodeReference<SecurityDefinitions>>,
  pub security: Option<Vec<NodeReference<SecurityRequirement>>>,
  pub tags: Option<Vec<NodeReference<Tag>>>,
  pub external_docs: Option<NodeReference<ExternalDoc>>,
  pub extensions: Extensions,
}

#[derive(Debug, Clone, Default)]
pub struct Info {
  pub title: NodeReference<String>,
  pub description: Option<NodeReference<String>>,
  pub terms_of_service: Option<NodeReference<String>>,
  pub contact: Option<NodeReference<Contact>>,
  pub license: Option<NodeReference<License>>,
  pub version: NodeReference<String>,
  pub extensions: Extensions,
}

#[derive(Debug, Clone, Default)]
pub struct Contact {
  pub name: Option<NodeReference<String>>,
  pub url: Option<NodeReference<String>>,
  pub email: Option<NodeReference<String>>,
  pub extensions: Extensions,
}

#[derive(Debug, Clone, Default)]
pub struct License {
  pub name: NodeReference<String>,
  pub url: Option<NodeReference<String>>,
  pub extensions: Extensions,
}

#[derive(Debug, Clone, Default)]
pub struct Tag {
  pub name: NodeReference<String>,
  pub description: Option<NodeReference<String>>,
  pub external_docs: Option<NodeReference<ExternalDoc>>,
  pub extensions: Extensions,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalDoc {
  pub description: Option<NodeReference<String>>,
  pub url: NodeReference<String>,
  pub extensions: Extensions,
}

/// `paths:` — an ordered map from path template (`/pets/{id}`) to
/// [`PathItem`]. No `extensions` field of its own in practice (`x-*` siblings
/// of path templates are vanishingly rare), but the map preserves textual
/// order like every other entity-valued map (§3 invariant).
#[derive(Debug, Clone, Default)]
pub struct Paths {
  pub paths: OrderedMap<PathItem>,
  pub extensions: Extensions,
}

/// A single path template's item (§4.5 "PathItem special cases"): a `$ref`
/// suppresses operation extraction entirely; otherwise each verb key present
/// is built concurrently (§4.5 "Parallel extraction").
#[derive(Debug, Clone, Default)]
pub struct PathItem {
  pub ref_: Option<NodeReference<String>>,
  pub get: Option<NodeReference<Operation>>,
  pub put: Option<NodeReference<Operation>>,
  pub post: Option<NodeReference<Operation>>,
  pub delete: Option<NodeReference<Operation>>,
  pub options: Option<NodeReference<Operation>>,
  pub head: Option<NodeReference<Operation>>,
  pub patch: Option<NodeReference<Operation>>,
  pub parameters: Option<Vec<NodeReference<Parameter>>>,
  pub extensions: Extensions,
}

impl PathItem {
  /// The seven verb slots in the fixed order the Hasher and the parallel
  /// per-operation fan-out both iterate in.
  #[must_use]
  pub fn operations(&self) -> [(&'static str, Option<&NodeReference<Operation>>); 7] {
    [
      ("get", self.get.as_ref()),
      ("put", self.put.as_ref()),
      ("post", self.post.as_ref()),
      ("delete", self.delete.as_ref()),
      ("options", self.options.as_ref()),
      ("head", self.head.as_ref()),
      ("patch", self.patch.as_ref()),
    ]
  }
}

#[derive(Debug, Clone, Default)]
pub struct Operation {
  pub tags: Option<NodeReference<Vec<String>>>,
  pub summary: Option<NodeReference<String>>,
  pub description: Option<NodeReference<String>>,
  pub external_docs: Option<NodeReference<ExternalDoc>>,
  pub operation_id: Option<NodeReference<String>>,
  pub consumes: Option<NodeReference<Vec<String>>>,
  pub produces: Option<NodeReference<Vec<String>>>,
  pub parameters: Vec<NodeReference<Parameter>>,
  pub responses: NodeReference<Responses>,
  pub schemes: Option<NodeReference<Vec<String>>>,
  pub deprecated: bool,
  pub security: Option<Vec<NodeReference<SecurityRequirement>>>,
  pub extensions: Extensions,
}

/// A non-body parameter's shape is identical to [`Items`] (§4.5 "Parameter /
/// Items / Header 'default'"); a body parameter carries `schema` instead and
/// leaves the `Items`-shaped fields at their defaults.
#[derive(Debug, Clone, Default)]
pub struct Parameter {
  pub name: NodeReference<String>,
  pub location: NodeReference<String>,
  pub description: Option<NodeReference<String>>,
  pub required: bool,
  pub schema: Option<NodeReference<SchemaProxy>>,
  pub allow_empty_value: Option<NodeReference<bool>>,
  pub items: ItemsShape,
  pub extensions: Extensions,
}

/// The field set shared by [`Parameter`] (non-body), [`Items`], and
/// [`Header`] (§4.5). Broken out so all three can embed one copy instead of
/// repeating fourteen near-identical fields.
#[derive(Debug, Clone, Default)]
pub struct ItemsShape {
  pub type_: Option<NodeReference<String>>,
  pub format: Option<NodeReference<String>>,
  pub nested_items: Option<Box<NodeReference<Items>>>,
  pub collection_format: Option<NodeReference<String>>,
  pub default: Option<NodeReference<AnyValue>>,
  pub maximum: Option<NodeReference<f64>>,
  pub exclusive_maximum: Option<NodeReference<bool>>,
  pub minimum: Option<NodeReference<f64>>,
  pub exclusive_minimum: Option<NodeReference<bool>>,
  pub max_length: Option<NodeReference<i64>>,
  pub min_length: Option<NodeReference<i64>>,
  pub pattern: Option<NodeReference<String>>,
  pub max_items: Option<NodeReference<i64>>,
  pub min_items: Option<NodeReference<i64>>,
  pub unique_items: Option<NodeReference<bool>>,
  pub enum_values: Option<NodeReference<Vec<AnyValue>>>,
  pub multiple_of: Option<NodeReference<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct Items {
  pub shape: ItemsShape,
  pub extensions: Extensions,
}

impl Items {
  /// §9 "Open questions": `GetMinItems()` returning `&MaxItems` in the
  /// source is a bug, not intended behavior — this accessor returns the
  /// min-items reference, per the corrected semantics this crate implements.
  #[must_use]
  pub fn min_items(&self) -> Option<&NodeReference<i64>> {
    self.shape.min_items.as_ref()
  }

  #[must_use]
  pub fn max_items(&self) -> Option<&NodeReference<i64>> {
    self.shape.max_items.as_ref()
  }
}

#[derive(Debug, Clone, Default)]
pub struct Header {
  pub description: Option<NodeReference<String>>,
  pub shape: ItemsShape,
  pub extensions: Extensions,
}

#[derive(Debug, Clone, Default)]
pub struct Response {
  pub description: NodeReference<String>,
  pub schema: Option<NodeReference<SchemaProxy>>,
  pub headers: Option<OrderedMap<Header>>,
  pub examples: Option<NodeReference<super::Examples>>,
  pub extensions: Extensions,
}

/// `responses:` under an operation. §4.5 "Responses special case": a key
/// literally named `default` is lifted into the `default` field and removed
/// from `codes` — this is the authoritative behavior per §9's open
/// question, not merely one of two historically-observed variants.
#[derive(Debug, Clone, Default)]
pub struct Responses {
  pub default: Option<NodeReference<Response>>,
  pub codes: OrderedMap<Response>,
  pub extensions: Extensions,
}

pub type Definitions = DefinitionsMap<SchemaProxy>;
pub type ParameterDefinitions = DefinitionsMap<Parameter>;
pub type ResponsesDefinitions = DefinitionsMap<Response>;
pub type SecurityDefinitions = DefinitionsMap<SecurityScheme>;

/// The four top-level `#/definitions`-shaped maps (§2 "Extractor / Builder")
/// share one shape: a name -> entity ordered map plus extensions, built one
/// worker task per entry (§4.5 "worker-per-entry pattern").
#[derive(Debug, Clone, Default)]
pub struct DefinitionsMap<T> {
  pub entries: OrderedMap<T>,
  pub extensions: Extensions,
}

#[derive(Debug, Clone, Default)]
pub struct SecurityScheme {
  pub type_: NodeReference<String>,
  pub description: Option<NodeReference<String>>,
  pub name: Option<NodeReference<String>>,
  pub location: Option<NodeReference<String>>,
  pub flow: Option<NodeReference<String>>,
  pub authorization_url: Option<NodeReference<String>>,
  pub token_url: Option<NodeReference<String>>,
  pub scopes: Option<NodeReference<Scopes>>,
  pub extensions: Extensions,
}

/// Scope name -> human-readable description.
#[derive(Debug, Clone, Default)]
pub struct Scopes {
  pub entries: OrderedMap<String>,
  pub extensions: Extensions,
}

/// Security scheme name -> required scope-name list (§3).
#[derive(Debug, Clone, Default)]
pub struct SecurityRequirement {
  pub requirements: OrderedMap<Vec<String>>,
}

/// A schema position in the tree (§4.5 "extract_object"): either a `$ref` to
/// a named definition, recorded via `NodeReference::reference`, or an inline
/// [`Schema`]. Kept as a distinct wrapper type per §3's explicit
/// `Schema, SchemaProxy` entity list, rather than folding into a bare
/// `NodeReference<Schema>` alias, so call sites read as "a schema position"
/// rather than "some node-referenced value that happens to be a schema".
#[derive(Debug, Clone)]
pub struct SchemaProxy(pub NodeReference<Schema>);

impl std::ops::Deref for SchemaProxy {
  type Target = NodeReference<Schema>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl Default for SchemaProxy {
  fn default() -> Self {
    Self(NodeReference::synthetic(Schema::default()))
  }
}

/// The JSON-Schema-draft-4-derived object OpenAPI 2.0 calls `Schema`,
/// carrying the v2-specific `discriminator`/`readOnly`/`xml`/`example`
/// additions (§3 "Polymorphic schema values").
#[derive(Debug, Clone, Default)]
pub struct Schema {
  pub format: Option<NodeReference<String>>,
  pub title: Option<NodeReference<String>>,
  pub description: Option<NodeReference<String>>,
  pub default: Option<NodeReference<AnyValue>>,
  pub multiple_of: Option<NodeReference<f64>>,
  pub maximum: Option<NodeReference<f64>>,
  pub exclusive_maximum: Option<NodeReference<bool>>,
  pub minimum: Option<NodeReference<f64>>,
  pub exclusive_minimum: Option<NodeReference<bool>>,
  pub max_length: Option<NodeReference<i64>>,
  pub min_length: Option<NodeReference<i64>>,
  pub pattern: Option<NodeReference<String>>,
  pub max_items: Option<NodeReference<i64>>,
  pub min_items: Option<NodeReference<i64>>,
  pub unique_items: Option<NodeReference<bool>>,
  pub max_properties: Option<NodeReference<i64>>,
  pub min_properties: Option<NodeReference<i64>>,
  pub required: Option<NodeReference<Vec<String>>>,
  pub enum_values: Option<NodeReference<Vec<AnyValue>>>,
  pub type_: Option<NodeReference<SingleOrArray<String>>>,
  pub items: Option<NodeReference<SingleOrArray<SchemaProxy>>>,
  pub all_of: Option<Vec<SchemaProxy>>,
  pub one_of: Option<Vec<SchemaProxy>>,
  pub any_of: Option<Vec<SchemaProxy>>,
  pub not: Option<Box<SchemaProxy>>,
  pub properties: Option<OrderedMap<SchemaProxy>>,
  pub additional_properties: Option<NodeReference<AdditionalProperties>>,
  pub discriminator: Option<NodeReference<String>>,
  pub read_only: Option<NodeReference<bool>>,
  pub xml: Option<NodeReference<Xml>>,
  pub external_docs: Option<NodeReference<ExternalDoc>>,
  pub example: Option<NodeReference<AnyValue>>,
  pub extensions: Extensions,
}

/// `additionalProperties` is either a boolean gate or a nested schema.
#[derive(Debug, Clone)]
pub enum AdditionalProperties {
  Allowed(bool),
  Schema(Box<SchemaProxy>),
}

impl Default for AdditionalProperties {
  fn default() -> Self {
    Self::Allowed(true)
  }
}

#[derive(Debug, Clone, Default)]
pub struct Xml {
  pub name: Option<NodeReference<String>>,
  pub namespace: Option<NodeReference<String>>,
  pub prefix: Option<NodeReference<String>>,
  pub attribute: Option<NodeReference<bool>>,
  pub wrapped: Option<NodeReference<bool>>,
  pub extensions: Extensions,
}
