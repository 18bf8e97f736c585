use std::path::Path;

use serde::Serialize;

use crate::errors::{PlugcheckError, Result, StructuralError};
use crate::tokenizer::{leading_docstring, Token};

/// Maximum plugin source size accepted by [`read_file_checked`] (1 MiB).
const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Opening and closing delimiters of a metadata block.
const BLOCK_OPEN: &str = "\"\"\"\n";
const BLOCK_CLOSE: &str = "\n\"\"\"";

/// One `$key value` line of a metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
    /// 1-based line number in the plugin source.
    pub position: usize,
}

/// Read a source file, rejecting non-files and oversized files.
///
/// Line endings are normalized to `\n`.
///
/// # Errors
///
/// Returns [`PlugcheckError::Read`] when the path is not a regular file or is
/// larger than 1 MiB, and [`PlugcheckError::Io`] when reading fails.
pub fn read_file_checked(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path).map_err(|e| PlugcheckError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if !meta.is_file() {
        return Err(PlugcheckError::Read {
            path: path.to_path_buf(),
            message: "not a regular file".into(),
        });
    }
    if meta.len() > MAX_FILE_SIZE {
        return Err(PlugcheckError::Read {
            path: path.to_path_buf(),
            message: format!("file exceeds {MAX_FILE_SIZE} bytes"),
        });
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content.replace("\r\n", "\n"))
}

/// Split a `$key value` line.
///
/// Grammar: `$`, one or more word characters, exactly one space, then a value
/// of at least two characters whose first character is not whitespace.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('$')?;
    let key_end = rest
        .char_indices()
        .find(|&(_, c)| !(c == '_' || c.is_alphanumeric()))
        .map_or(rest.len(), |(i, _)| i);
    if key_end == 0 {
        return None;
    }
    let (key, rest) = rest.split_at(key_end);
    let value = rest.strip_prefix(' ')?;
    is_free_text(value).then_some((key, value))
}

/// Returns `true` if `s` has at least two characters and does not start with
/// whitespace.
pub(crate) fn is_free_text(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| !c.is_whitespace()) && chars.next().is_some()
}

/// Parse the content of a metadata block.
///
/// `first_line` is the source line holding the first `$key value` entry.
///
/// # Errors
///
/// Returns [`StructuralError::MalformedLine`] for the first line that does not
/// follow the `$key value` grammar.
pub fn parse_block_body(
    body: &str,
    first_line: usize,
) -> std::result::Result<Vec<MetadataEntry>, StructuralError> {
    body.split('\n')
        .enumerate()
        .map(|(i, line)| {
            let position = first_line + i;
            parse_line(line)
                .map(|(key, value)| MetadataEntry {
                    key: key.to_string(),
                    value: value.to_string(),
                    position,
                })
                .ok_or_else(|| StructuralError::MalformedLine {
                    position,
                    text: line.to_string(),
                })
        })
        .collect()
}

/// Parse the metadata block held by a leading docstring token.
///
/// The token must be exactly `"""\n<body>\n"""` with a non-empty body.
///
/// # Errors
///
/// Returns [`StructuralError::MalformedBlock`] when the literal has another
/// shape, or [`StructuralError::MalformedLine`] for a bad line.
pub fn parse_block(token: &Token) -> std::result::Result<Vec<MetadataEntry>, StructuralError> {
    let body = token
        .text
        .strip_prefix(BLOCK_OPEN)
        .and_then(|rest| rest.strip_suffix(BLOCK_CLOSE))
        .filter(|body| !body.is_empty())
        .ok_or(StructuralError::MalformedBlock)?;
    parse_block_body(body, token.line + 1)
}

/// Tokenize plugin source text and parse its metadata block.
///
/// # Errors
///
/// Returns the first [`StructuralError`] raised by the tokenizer or parser.
pub fn parse_source(source: &str) -> std::result::Result<Vec<MetadataEntry>, StructuralError> {
    let token = leading_docstring(source)?;
    parse_block(&token)
}

/// Serialize entries back into a metadata block literal.
#[must_use]
pub fn to_block(entries: &[MetadataEntry]) -> String {
    let mut out = String::from(BLOCK_OPEN);
    for entry in entries {
        out.push('$');
        out.push_str(&entry.key);
        out.push(' ');
        out.push_str(&entry.value);
        out.push('\n');
    }
    out.push_str("\"\"\"");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SOURCE: &str = "\"\"\"\n\
$description Global live-streaming platform.\n\
$url example.com\n\
$url www.example.com/live\n\
$type live\n\
$metadata id one\n\
\"\"\"\n\
\n\
import re\n";

    fn pairs(entries: &[MetadataEntry]) -> Vec<(&str, &str)> {
        entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
            .collect()
    }

    #[test]
    fn parses_entries_in_order() {
        let entries = parse_source(SOURCE).unwrap();
        assert_eq!(
            pairs(&entries),
            [
                ("description", "Global live-streaming platform."),
                ("url", "example.com"),
                ("url", "www.example.com/live"),
                ("type", "live"),
                ("metadata", "id one"),
            ]
        );
    }

    #[test]
    fn positions_are_source_lines() {
        let entries = parse_source(SOURCE).unwrap();
        let positions: Vec<_> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, [2, 3, 4, 5, 6]);
    }

    #[test]
    fn duplicates_are_kept() {
        let entries = parse_source("\"\"\"\n$notes a\n$notes a\n\"\"\"").unwrap();
        assert_eq!(pairs(&entries), [("notes", "a"), ("notes", "a")]);
    }

    #[test]
    fn values_may_contain_dollar_signs() {
        let entries = parse_source("\"\"\"\n$notes costs $5 $per view\n\"\"\"").unwrap();
        assert_eq!(pairs(&entries), [("notes", "costs $5 $per view")]);
    }

    #[test]
    fn reparse_of_serialized_block_is_identical() {
        let entries = parse_source(SOURCE).unwrap();
        let block = to_block(&entries);
        assert_eq!(parse_source(&block).unwrap(), entries);
    }

    #[test]
    fn rejects_single_line_docstring() {
        assert_eq!(
            parse_source("\"\"\"$type live\"\"\""),
            Err(StructuralError::MalformedBlock)
        );
    }

    #[test]
    fn rejects_prose_and_other_quotes() {
        for source in [
            "\"\"\"Plugin for example.com\n$type live\n\"\"\"",
            "'''\n$type live\n'''",
            "r\"\"\"\n$type live\n\"\"\"",
            "\"\"\"\n\n\"\"\"",
            "\"single line\"",
        ] {
            assert_eq!(
                parse_source(source),
                Err(StructuralError::MalformedBlock),
                "{source:?}"
            );
        }
    }

    #[test]
    fn rejects_trailing_blank_line_in_body() {
        let err = parse_source("\"\"\"\n$type live\n\n\"\"\"").unwrap_err();
        assert_eq!(
            err,
            StructuralError::MalformedLine {
                position: 3,
                text: String::new()
            }
        );
    }

    #[test]
    fn line_grammar() {
        assert_eq!(parse_line("$type live"), Some(("type", "live")));
        assert_eq!(parse_line("$web_browser ab"), Some(("web_browser", "ab")));
        assert_eq!(parse_line("type live"), None);
        assert_eq!(parse_line("$ live"), None);
        assert_eq!(parse_line("$type"), None);
        assert_eq!(parse_line("$type  live"), None);
        assert_eq!(parse_line("$type\tlive"), None);
        assert_eq!(parse_line("$type x"), None);
        assert_eq!(parse_line("$type-x live"), None);
        assert_eq!(parse_line("$type live "), Some(("type", "live ")));
    }

    #[test]
    fn non_string_first_token_is_structural() {
        assert!(matches!(
            parse_source("# comment\n\"\"\"\n$type live\n\"\"\""),
            Err(StructuralError::NotStringLiteral { kind: "comment", .. })
        ));
    }

    #[test]
    fn read_file_checked_normalizes_crlf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plugin.py");
        fs::write(&path, "\"\"\"\r\n$type live\r\n\"\"\"\r\n").unwrap();
        let content = read_file_checked(&path).unwrap();
        assert_eq!(content, "\"\"\"\n$type live\n\"\"\"\n");
    }

    #[test]
    fn read_file_checked_rejects_directory() {
        let dir = tempdir().unwrap();
        let err = read_file_checked(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn read_file_checked_rejects_large_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.py");
        fs::write(&path, vec![b'#'; (MAX_FILE_SIZE + 1) as usize]).unwrap();
        assert!(read_file_checked(&path).is_err());
    }
}
