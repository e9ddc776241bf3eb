//! The typed v2 projection (§3 "v2 entities"): every OpenAPI 2.0 object,
//! each field wrapped in [`NodeReference`] (or one of its companion
//! shapes) so the model stays faithful to the source tree.

mod entities;
mod node_ref;
mod value;

pub use entities::{
  AdditionalProperties, Contact, DefinitionsMap, Definitions, Extensions, ExternalDoc, Header, Info, Items, ItemsShape, License, Operation,
  Parameter, ParameterDefinitions, PathItem, Paths, Response, Responses, ResponsesDefinitions, Schema, SchemaProxy, Scopes,
  SecurityDefinitions, SecurityRequirement, SecurityScheme, Swagger, Tag, Xml,
};
pub use node_ref::{KeyReference, NodeReference, OrderedMap, ValueReference, ordered_map_from_entries};
pub use value::{AnyValue, SingleOrArray};

/// Mimetype -> example value (§3 "Examples"). A thin alias over the same
/// `AnyValue` carrier §4.5 specifies for `default`/`example`.
pub type Examples = node_ref::OrderedMap<AnyValue>;
