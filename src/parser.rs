//! Parsing of pipeline descriptions and stage option strings.
//!
//! A description is a `->`-separated list of steps, each a name with an optional
//! parenthesised option payload:
//!
//! ```text
//! pipeline  := step ("->" step)*
//! step      := name ["(" options ")"]
//! name      := letter (letter | digit | "_")*
//! options   := one or more printable characters except "(" and ")"
//! ```
//!
//! Parsing is exact. Joining the parsed steps again reproduces the input byte for
//! byte, which is what lets `Pipeline::can_be_built_from` compare lengths to catch
//! descriptions that only resemble valid ones.
//!
//! Option payloads are interpreted by each stage with [`unordered_parse_by`]. Values
//! that must contain separator characters (file paths, nested lists) are wrapped in
//! `<verbatim>...</verbatim>` and are never split.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::PipelineError;

pub const STEP_SEPARATOR: &str = "->";
pub const OPTION_SEPARATOR: &str = ",";
pub const KEY_VALUE_SEPARATOR: &str = "=";
pub const VERBATIM_OPEN: &str = "<verbatim>";
pub const VERBATIM_CLOSE: &str = "</verbatim>";

/// One `(name, options)` step of a pipeline description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepDescriptor {
    pub name: String,
    pub options: String,
}

impl StepDescriptor {
    pub fn new(name: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: options.into(),
        }
    }

    /// Length of this step once re-serialized.
    pub fn serialized_len(&self) -> usize {
        if self.options.is_empty() {
            self.name.len()
        } else {
            self.name.len() + 2 + self.options.len()
        }
    }
}

impl fmt::Display for StepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.options.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}({})", self.name, self.options)
        }
    }
}

fn parse_error(input: &str, position: usize, reason: &str) -> PipelineError {
    PipelineError::Parse {
        input: input.to_string(),
        position,
        reason: reason.to_string(),
    }
}

fn is_option_char(c: char) -> bool {
    !c.is_control() && c != '(' && c != ')'
}

/// Parses `description` into its ordered steps. An empty description has no steps.
pub fn parse_by(description: &str, sep: &str) -> Result<Vec<StepDescriptor>, PipelineError> {
    let mut steps = Vec::new();
    if description.is_empty() {
        return Ok(steps);
    }

    let bytes = description.as_bytes();
    let mut pos = 0;
    loop {
        let name_start = pos;
        match bytes.get(pos) {
            Some(b) if b.is_ascii_alphabetic() => pos += 1,
            _ => return Err(parse_error(description, pos, "expected a stage name")),
        }
        while let Some(b) = bytes.get(pos) {
            if b.is_ascii_alphanumeric() || *b == b'_' {
                pos += 1;
            } else {
                break;
            }
        }
        let name = &description[name_start..pos];

        let mut options = "";
        if bytes.get(pos) == Some(&b'(') {
            let opts_start = pos + 1;
            let rest = &description[opts_start..];
            let opts_len = rest
                .char_indices()
                .find(|(_, c)| !is_option_char(*c))
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            if opts_len == 0 {
                return Err(parse_error(description, opts_start, "empty option list"));
            }
            let close = opts_start + opts_len;
            if bytes.get(close) != Some(&b')') {
                return Err(parse_error(description, close, "unterminated option list"));
            }
            options = &description[opts_start..close];
            pos = close + 1;
        }
        steps.push(StepDescriptor::new(name, options));

        if pos == bytes.len() {
            break;
        }
        if !description[pos..].starts_with(sep) {
            return Err(parse_error(description, pos, "expected a step separator"));
        }
        pos += sep.len();
        if pos == bytes.len() {
            return Err(parse_error(description, pos, "trailing step separator"));
        }
    }
    Ok(steps)
}

/// Re-serializes steps into a description.
pub fn join_steps(steps: &[StepDescriptor], sep: &str) -> String {
    steps
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Splits `text` on `sep`, leaving separators inside verbatim regions alone.
/// An empty text yields no pieces.
pub fn split_string_by<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    if text.is_empty() {
        return pieces;
    }
    if sep.is_empty() {
        pieces.push(text);
        return pieces;
    }

    let mut in_verbatim = false;
    let mut piece_start = 0;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if !in_verbatim && rest.starts_with(VERBATIM_OPEN) {
            in_verbatim = true;
            i += VERBATIM_OPEN.len();
        } else if in_verbatim && rest.starts_with(VERBATIM_CLOSE) {
            in_verbatim = false;
            i += VERBATIM_CLOSE.len();
        } else if !in_verbatim && rest.starts_with(sep) {
            pieces.push(&text[piece_start..i]);
            i += sep.len();
            piece_start = i;
        } else {
            i += rest.chars().next().map(char::len_utf8).unwrap_or(1);
        }
    }
    pieces.push(&text[piece_start..]);
    pieces
}

/// Drops verbatim delimiters from an option value.
pub fn strip_verbatim(value: &str) -> String {
    value.replace(VERBATIM_OPEN, "").replace(VERBATIM_CLOSE, "")
}

/// Builds a key/value map from a flat option string such as `accel=8,level=3`.
///
/// A bare key maps to an empty value. A pair holding more than one unquoted
/// `kv_sep` is ambiguous and skipped with a warning.
pub fn unordered_parse_by(text: &str, pair_sep: &str, kv_sep: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for item in split_string_by(text, pair_sep) {
        if item.is_empty() {
            continue;
        }
        let kv = split_string_by(item, kv_sep);
        match kv.as_slice() {
            [key] => {
                map.insert(key.to_string(), String::new());
            }
            [key, value] => {
                map.insert(key.to_string(), strip_verbatim(value));
            }
            _ => log::warn!("ignoring ambiguous option '{}'", item),
        }
    }
    map
}

/// `unordered_parse_by` with the default `,` and `=` separators.
pub fn parse_options(text: &str) -> BTreeMap<String, String> {
    unordered_parse_by(text, OPTION_SEPARATOR, KEY_VALUE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_annotated_steps() {
        let steps = parse_by("bitswap1->lz4(accel=8,blocksize_kb=64)", STEP_SEPARATOR).unwrap();
        assert_eq!(
            steps,
            vec![
                StepDescriptor::new("bitswap1", ""),
                StepDescriptor::new("lz4", "accel=8,blocksize_kb=64"),
            ]
        );
    }

    #[test]
    fn test_grammar_roundtrip_is_exact() {
        for description in [
            "lz4",
            "delta(order=2)->bitswap4->zstd(level=9)->xor_delta",
            "a_1(x=/tmp/some file.tif)->b2",
            "step(flag)->other(k=v,k2=<verbatim>1,2,3</verbatim>)",
        ] {
            let steps = parse_by(description, STEP_SEPARATOR).unwrap();
            assert_eq!(join_steps(&steps, STEP_SEPARATOR), description);
            let rebuilt: usize = steps.iter().map(|s| s.serialized_len()).sum::<usize>()
                + STEP_SEPARATOR.len() * (steps.len() - 1);
            assert_eq!(rebuilt, description.len());
        }
    }

    #[test]
    fn test_empty_description_has_no_steps() {
        assert!(parse_by("", STEP_SEPARATOR).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_descriptions_are_rejected() {
        for bad in [
            "1abc",
            "lz4->",
            "->lz4",
            "lz4()",
            "lz4(accel=1",
            "lz4(a(b))",
            "lz4 ->zstd",
            "lz4-zstd",
        ] {
            assert!(
                matches!(parse_by(bad, STEP_SEPARATOR), Err(PipelineError::Parse { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_split_skips_verbatim_regions() {
        let text = "path=<verbatim>/data/a->b,c</verbatim>,level=3";
        assert_eq!(
            split_string_by(text, ","),
            vec!["path=<verbatim>/data/a->b,c</verbatim>", "level=3"]
        );
        assert_eq!(split_string_by("a->b", "->"), vec!["a", "b"]);
        assert_eq!(split_string_by("a->", "->"), vec!["a", ""]);
        assert!(split_string_by("", "->").is_empty());
    }

    #[test]
    fn test_unordered_parse_by() {
        let map = unordered_parse_by("accel=8,fast,path=<verbatim>a=b,c</verbatim>", ",", "=");
        assert_eq!(map.get("accel").map(String::as_str), Some("8"));
        assert_eq!(map.get("fast").map(String::as_str), Some(""));
        assert_eq!(map.get("path").map(String::as_str), Some("a=b,c"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_unordered_parse_by_skips_ambiguous_pairs() {
        let map = parse_options("a=1=2,b=3");
        assert!(!map.contains_key("a"));
        assert_eq!(map.get("b").map(String::as_str), Some("3"));
    }
}
