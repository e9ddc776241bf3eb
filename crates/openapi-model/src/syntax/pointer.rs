//! JSON Pointer <-> friendly-path translation (§4.1
//! `convert_component_id_into_friendly_path_search`, §6.3 reference string
//! grammar, §8 round-trip law).

/// Decodes a single JSON Pointer segment: `~1` -> `/`, `~0` -> `~`, then
/// percent-decodes the result (§6.3).
#[must_use]
pub fn decode_pointer_segment(segment: &str) -> String {
  let tilde_decoded = segment.replace("~1", "/").replace("~0", "~");
  percent_encoding::percent_decode_str(&tilde_decoded)
    .decode_utf8()
    .map(std::borrow::Cow::into_owned)
    .unwrap_or(tilde_decoded)
}

/// Encodes a single raw segment back into JSON Pointer form: `~` -> `~0`,
/// `/` -> `~1` (order matters — `~` must be escaped first).
#[must_use]
pub fn encode_pointer_segment(segment: &str) -> String {
  segment.replace('~', "~0").replace('/', "~1")
}

/// Splits a JSON Pointer (`#/definitions/Pet`, `#/a/b~1c/0`) into its decoded
/// segments, dropping the leading `#` and empty root segment.
#[must_use]
pub fn pointer_segments(pointer: &str) -> Vec<String> {
  let trimmed = pointer.strip_prefix('#').unwrap_or(pointer);
  let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
  if trimmed.is_empty() {
    return Vec::new();
  }
  trimmed.split('/').map(decode_pointer_segment).collect()
}

const SPECIAL_CHARS: &[char] = &['%', '=', ';', '~', '.'];

fn is_pure_integer(segment: &str) -> bool {
  !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn needs_brackets(segment: &str, previous: Option<&str>) -> bool {
  if segment.contains(['#']) {
    return true;
  }
  if segment.chars().any(|c| SPECIAL_CHARS.contains(&c)) {
    return true;
  }
  if segment.chars().next().is_some_and(|c| c.is_ascii_digit()) && !is_pure_integer(segment) {
    return true;
  }
  if previous.is_some_and(|p| p.ends_with('s')) {
    return true;
  }
  false
}

/// Translates a JSON Pointer (`definition string`) into a JSONPath-like
/// selector following §4.1's rules:
/// - Segments containing `#` keep it, wrapped in brackets.
/// - Segments containing `% = ; ~ .` (after pointer-decoding) are bracketed.
/// - Pure integers `<= 99` render as `[N]`, `> 99` as `['N']`.
/// - Segments that start with a digit but aren't pure integers (`403_forbidden`)
///   are bracketed.
/// - A segment whose *previous* segment ends in `s` (a plural parent, e.g.
///   `definitions`) is bracketed.
/// - Backslashes are stripped from non-special segments when the input
///   contained `#`.
/// - The result always starts with `$.` or `$[`.
#[must_use]
pub fn convert_component_id_into_friendly_path_search(id: &str) -> String {
  let had_hash = id.contains('#');
  let segments = pointer_segments(id);

  if segments.is_empty() {
    return "$.".to_string();
  }

  // `previous` tracks the original (pointer-decoded, pre-bracket-escaping)
  // segment text, since the "plural parent" rule (§4.1) looks at the raw
  // segment name rather than its rendered form.
  let mut out = String::from("$");
  let mut prev_segment: Option<&str> = None;
  for raw in &segments {
    let rendered = if had_hash && !needs_brackets(raw, prev_segment) {
      raw.replace('\\', "")
    } else {
      raw.clone()
    };
    if is_pure_integer(&rendered) {
      let n: u64 = rendered.parse().unwrap_or(u64::MAX);
      // A plural parent (§4.1) forces quoted brackets even for small integers.
      if n <= 99 && !prev_segment.is_some_and(|p| p.ends_with('s')) {
        out.push_str(&format!("[{n}]"));
      } else {
        out.push_str(&format!("['{n}']"));
      }
    } else if needs_brackets(&rendered, prev_segment) {
      out.push_str(&format!("['{rendered}']"));
    } else {
      out.push('.');
      out.push_str(&rendered);
    }
    prev_segment = Some(raw.as_str());
  }
  out
}

/// Inverse of [`convert_component_id_into_friendly_path_search`] for the
/// common case (no escaping ambiguity): turns a dotted/bracketed path back
/// into a JSON Pointer `definition string`.
#[must_use]
pub fn convert_path_into_component_id(path: &str) -> String {
  let mut result = String::from("#");
  let mut chars = path.trim_start_matches('$').chars().peekable();
  let mut buf = String::new();

  let flush = |buf: &mut String, result: &mut String| {
    if !buf.is_empty() {
      result.push('/');
      result.push_str(&encode_pointer_segment(buf));
      buf.clear();
    }
  };

  while let Some(c) = chars.next() {
    match c {
      '.' => {
        flush(&mut buf, &mut result);
      }
      '[' => {
        flush(&mut buf, &mut result);
        let mut token = String::new();
        for inner in chars.by_ref() {
          if inner == ']' {
            break;
          }
          token.push(inner);
        }
        let cleaned = token.trim_matches('\'').trim_matches('"');
        result.push('/');
        result.push_str(&encode_pointer_segment(cleaned));
      }
      other => buf.push(other),
    }
  }
  flush(&mut buf, &mut result);
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_pointer_becomes_dotted_path() {
    assert_eq!(convert_component_id_into_friendly_path_search("#/info/title"), "$.info.title");
  }

  #[test]
  fn plural_parent_forces_brackets() {
    // "definitions" ends in 's', so the following segment is bracketed.
    assert_eq!(
      convert_component_id_into_friendly_path_search("#/definitions/Pet"),
      "$.definitions['Pet']"
    );
  }

  #[test]
  fn small_integers_use_plain_brackets_large_use_quoted() {
    assert_eq!(convert_component_id_into_friendly_path_search("#/paths/0"), "$.paths['0']");
    assert_eq!(convert_component_id_into_friendly_path_search("#/a/99"), "$.a[99]");
    assert_eq!(convert_component_id_into_friendly_path_search("#/a/100"), "$.a['100']");
  }

  #[test]
  fn digit_leading_non_integer_segment_is_bracketed() {
    assert_eq!(
      convert_component_id_into_friendly_path_search("#/responses/403_forbidden"),
      "$.responses['403_forbidden']"
    );
  }

  #[test]
  fn hash_only_input_returns_root_selector() {
    assert_eq!(convert_component_id_into_friendly_path_search("#"), "$.");
    assert_eq!(convert_component_id_into_friendly_path_search("/"), "$.");
  }

  #[test]
  fn result_always_starts_with_dollar() {
    let out = convert_component_id_into_friendly_path_search("#/paths/~1pets~1{id}/get");
    assert!(out.starts_with("$."));
  }
}
