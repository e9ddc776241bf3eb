//! Builds a [`SyntaxTree`] from raw bytes. JSON is a syntactic subset of
//! YAML 1.2, so both grammars named in §6.3 flow through the same
//! `yaml-rust2` event stream; `detect_grammar` below is purely a
//! documentation aid for callers, never a behavioral fork.

use yaml_rust2::{
  Event,
  parser::{MarkedEventReceiver, Parser},
  scanner::{Marker, TScalarStyle, TokenType},
};

use super::node::{NodeData, NodeId, NodeKind, SyntaxTree, Tag};
use crate::error::ErrorKind;

/// Grammar hint returned by [`detect_grammar`]; informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
  Json,
  Yaml,
}

/// Sniffs the first non-whitespace byte. `{`/`[` reads as JSON, anything
/// else as YAML — both are parsed identically afterwards.
#[must_use]
pub fn detect_grammar(bytes: &[u8]) -> Grammar {
  match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
    Some(b'{' | b'[') => Grammar::Json,
    _ => Grammar::Yaml,
  }
}

#[derive(Debug, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
  pub message: String,
  pub line: usize,
  pub column: usize,
}

impl ParseError {
  #[must_use]
  pub fn kind(&self) -> ErrorKind {
    ErrorKind::YamlParse
  }
}

/// Parses `bytes` into an owned [`SyntaxTree`]. Only the first document in a
/// multi-document stream is kept; OpenAPI/Swagger documents are single-document.
pub fn parse_document(bytes: &[u8]) -> Result<SyntaxTree, ParseError> {
  let text = std::str::from_utf8(bytes).map_err(|err| ParseError {
    message: format!("input is not valid UTF-8: {err}"),
    line: 0,
    column: 0,
  })?;

  let mut builder = TreeBuilder::new();
  let mut parser = Parser::new_from_str(text);
  parser.load(&mut builder, false).map_err(|err| ParseError {
    message: err.to_string(),
    line: 0,
    column: 0,
  })?;

  builder.finish()
}

/// Implements `yaml-rust2`'s event-receiver protocol, mirroring how
/// `YamlLoader` itself is built in that crate: consume a flat SAX-style
/// event stream and materialize an explicit tree, tracking anchors so
/// aliases can be dereferenced later (§4.1 `node_alias`).
struct TreeBuilder {
  tree: SyntaxTree,
  anchors: std::collections::HashMap<usize, NodeId>,
  // Stack of (node id being built, pending key node for the current mapping slot).
  stack: Vec<Frame>,
  last_error: Option<ParseError>,
}

enum Frame {
  Mapping { id: NodeId, children: Vec<NodeId> },
  Sequence { id: NodeId, children: Vec<NodeId> },
}

impl TreeBuilder {
  fn new() -> Self {
    Self {
      tree: SyntaxTree::new(),
      anchors: std::collections::HashMap::new(),
      stack: Vec::new(),
      last_error: None,
    }
  }

  fn finish(mut self) -> Result<SyntaxTree, ParseError> {
    if let Some(err) = self.last_error.take() {
      return Err(err);
    }
    Ok(self.tree)
  }

  fn register_anchor(&mut self, anchor_id: usize, node: NodeId) {
    if anchor_id != 0 {
      self.anchors.insert(anchor_id, node);
    }
  }

  fn push_child(&mut self, child: NodeId) {
    match self.stack.last_mut() {
      Some(Frame::Mapping { children, .. } | Frame::Sequence { children, .. }) => children.push(child),
      None => self.tree.root = Some(child),
    }
  }

  fn tag_suffix(tag: &Option<TokenType>) -> Option<String> {
    match tag {
      Some(TokenType::Tag(handle, suffix)) => Some(format!("{handle}{suffix}")),
      _ => None,
    }
  }
}

impl MarkedEventReceiver for TreeBuilder {
  fn on_event(&mut self, event: Event, mark: Marker) {
    if self.last_error.is_some() {
      return;
    }
    match event {
      Event::StreamStart | Event::StreamEnd | Event::DocumentStart | Event::DocumentEnd => {}
      Event::Nothing => {}
      Event::Alias(anchor_id) => {
        let target = self.anchors.get(&anchor_id).copied();
        let id = self.tree.push(NodeData {
          kind: NodeKind::Alias,
          tag: Tag::Str,
          value: String::new(),
          children: Vec::new(),
          anchor: None,
          alias_target: target,
          line: mark.line(),
          column: mark.col(),
        });
        if target.is_none() {
          self.last_error = Some(ParseError {
            message: format!("unresolved alias reference (anchor id {anchor_id})"),
            line: mark.line(),
            column: mark.col(),
          });
        }
        self.push_child(id);
      }
      Event::Scalar(value, style, anchor_id, tag) => {
        // Quoted scalars are always strings regardless of what they look like;
        // an explicit !!tag wins over both; plain scalars fall through to
        // shape-based classification in `Tag::classify`.
        let explicit_tag = if matches!(style, TScalarStyle::SingleQuoted | TScalarStyle::DoubleQuoted) {
          Some("tag:yaml.org,2002:str".to_string())
        } else {
          Self::tag_suffix(&Some(tag))
        };
        let classified = Tag::classify(explicit_tag.as_deref(), &value);
        let id = self.tree.push(NodeData {
          kind: NodeKind::Scalar,
          tag: classified,
          value,
          children: Vec::new(),
          anchor: None,
          alias_target: None,
          line: mark.line(),
          column: mark.col(),
        });
        self.register_anchor(anchor_id, id);
        self.push_child(id);
      }
      Event::SequenceStart(anchor_id, _tag) => {
        let id = self.tree.push(NodeData {
          kind: NodeKind::Sequence,
          tag: Tag::Seq,
          value: String::new(),
          children: Vec::new(),
          anchor: None,
          alias_target: None,
          line: mark.line(),
          column: mark.col(),
        });
        self.register_anchor(anchor_id, id);
        self.stack.push(Frame::Sequence { id, children: Vec::new() });
      }
      Event::SequenceEnd => {
        if let Some(Frame::Sequence { id, children }) = self.stack.pop() {
          self.tree.get_mut(id).children = children;
          self.push_child(id);
        }
      }
      Event::MappingStart(anchor_id, _tag) => {
        let id = self.tree.push(NodeData {
          kind: NodeKind::Mapping,
          tag: Tag::Map,
          value: String::new(),
          children: Vec::new(),
          anchor: None,
          alias_target: None,
          line: mark.line(),
          column: mark.col(),
        });
        self.register_anchor(anchor_id, id);
        self.stack.push(Frame::Mapping { id, children: Vec::new() });
      }
      Event::MappingEnd => {
        if let Some(Frame::Mapping { id, children }) = self.stack.pop() {
          self.tree.get_mut(id).children = children;
          self.push_child(id);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detects_json_vs_yaml_by_leading_byte() {
    assert_eq!(detect_grammar(b"  { \"a\": 1 }"), Grammar::Json);
    assert_eq!(detect_grammar(b"a: 1\n"), Grammar::Yaml);
  }

  #[test]
  fn parses_flat_mapping() {
    let tree = parse_document(b"swagger: \"2.0\"\nhost: example.com\n").expect("parses");
    let root = tree.root().expect("root present");
    let node = tree.get(root);
    assert_eq!(node.kind, NodeKind::Mapping);
    assert_eq!(node.children.len(), 4);
  }

  #[test]
  fn parses_anchors_and_aliases() {
    let tree = parse_document(b"a: &anchor\n  x: 1\nb: *anchor\n").expect("parses");
    let root = tree.root().unwrap();
    let node = tree.get(root);
    // children: [a, {x:1}, b, *anchor]
    let alias_value = tree.get(node.children[3]);
    assert_eq!(alias_value.kind, NodeKind::Alias);
    assert!(alias_value.alias_target.is_some());
  }
}
