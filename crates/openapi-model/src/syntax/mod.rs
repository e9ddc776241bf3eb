//! SyntaxTree Utilities (§4.1): the bridge between the raw parsed node tree
//! and the rest of the system. Every lookup here fails soft — a miss is
//! `None`, never an error.

mod jsonpath;
mod loader;
mod lookup;
mod merge;
mod node;
mod pointer;

pub use jsonpath::{CompiledPath, JsonPathError, compile as compile_jsonpath, find_nodes, find_nodes_in};
pub use loader::{Grammar, ParseError, detect_grammar, parse_document};
pub use lookup::{dealias_ro, find_first_key, find_key, find_key_full, find_key_full_ro, find_key_ro, find_key_top, find_key_top_ro, is_node_ref};
pub use merge::{check_for_merge_nodes, node_alias};
pub use node::{NodeData, NodeId, NodeKind, SyntaxTree, Tag};
pub use pointer::{
  convert_component_id_into_friendly_path_search, convert_path_into_component_id, decode_pointer_segment, encode_pointer_segment,
  pointer_segments,
};
