use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostics::{
    Diagnostic, Severity, M001, M002, M003, M004, M005, M006, M007, M008, M009, M010,
};
use crate::parser::{is_free_text, parse_source, MetadataEntry};
use crate::schema::KeySchema;

/// Regex for URI scheme prefixes that `$url` values must not carry.
static URL_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("URL scheme regex must compile"));

/// Validate plugin source text: parse its metadata block and check all rules.
///
/// A structural failure (no docstring, malformed block or line) yields a
/// single diagnostic; otherwise every schema rule is evaluated.
///
/// Returns a list of diagnostics (empty = valid).
#[must_use]
pub fn validate_source(source: &str, schema: &KeySchema) -> Vec<Diagnostic> {
    match parse_source(source) {
        Ok(entries) => validate_metadata(&entries, schema),
        Err(e) => vec![e.into()],
    }
}

/// Validate parsed metadata entries against a key schema.
///
/// Every rule runs independently; one failure never hides another.
///
/// Returns a list of diagnostics (empty = valid).
#[must_use]
pub fn validate_metadata(entries: &[MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    let known: Vec<&MetadataEntry> = entries.iter().filter(|e| schema.is_known(&e.key)).collect();

    let mut diags = Vec::new();
    diags.extend(check_unknown(entries, schema));
    diags.extend(check_required(entries, schema));
    diags.extend(check_order(&known, schema));
    diags.extend(check_contiguous(&known, schema));
    diags.extend(check_repeat_unique(&known, schema));
    diags.extend(check_no_repeat(&known, schema));
    diags.extend(check_url(entries));
    diags.extend(check_type(entries, schema));
    diags.extend(check_metadata_values(entries, schema));
    diags
}

fn check_unknown(entries: &[MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    entries
        .iter()
        .filter(|e| !schema.is_known(&e.key))
        .map(|e| {
            Diagnostic::new(
                Severity::Error,
                M001,
                format!("unknown metadata key `${}`", e.key),
            )
            .with_key(&e.key)
            .with_position(e.position)
            .with_suggestion(format!("Use one of: {}", schema.all_keys.join(", ")))
        })
        .collect()
}

fn check_required(entries: &[MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    schema
        .required_keys
        .iter()
        .filter(|key| !entries.iter().any(|e| e.key == **key))
        .map(|key| {
            Diagnostic::new(
                Severity::Error,
                M002,
                format!("missing required metadata key `${key}`"),
            )
            .with_key(*key)
        })
        .collect()
}

/// First occurrences of known keys must follow the canonical order.
fn check_order(known: &[&MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    let firsts: Vec<&MetadataEntry> = known
        .iter()
        .copied()
        .filter(|e| seen.insert(e.key.as_str()))
        .collect();

    let mut expected = firsts.clone();
    expected.sort_by_key(|e| schema.index_of(&e.key));

    let Some(i) = firsts
        .iter()
        .zip(&expected)
        .position(|(actual, wanted)| actual.key != wanted.key)
    else {
        return Vec::new();
    };

    let list = |entries: &[&MetadataEntry]| {
        entries
            .iter()
            .map(|e| e.key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    vec![Diagnostic::new(
        Severity::Error,
        M003,
        format!(
            "metadata keys are not defined in order: `{}` appears before `{}`",
            firsts[i].key, expected[i].key
        ),
    )
    .with_key(&firsts[i].key)
    .with_position(firsts[i].position)
    .with_suggestion(format!("Reorder keys as: {}", list(&expected)))]
}

/// Each repeatable key must form a single run of adjacent lines.
fn check_contiguous(known: &[&MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    let mut closed: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    let mut diags = Vec::new();

    for (i, entry) in known.iter().enumerate() {
        let key = entry.key.as_str();
        let starts_run = i == 0 || known[i - 1].key != key;
        if !starts_run {
            continue;
        }
        if i > 0 {
            closed.insert(known[i - 1].key.as_str());
        }
        if schema.is_repeatable(key) && closed.contains(key) && reported.insert(key) {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    M004,
                    format!("repeatable metadata key `${key}` is split by other keys"),
                )
                .with_key(key)
                .with_position(entry.position)
                .with_suggestion(format!("Keep all `${key}` lines together")),
            );
        }
    }
    diags
}

/// Values under a repeatable key must be distinct.
fn check_repeat_unique(known: &[&MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut diags = Vec::new();
    for entry in known.iter().filter(|e| schema.is_repeatable(&e.key)) {
        let values = seen.entry(entry.key.as_str()).or_default();
        if !values.insert(entry.value.as_str()) {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    M005,
                    format!(
                        "repeatable metadata key `${}` has duplicate value \"{}\"",
                        entry.key, entry.value
                    ),
                )
                .with_key(&entry.key)
                .with_value(&entry.value)
                .with_position(entry.position),
            );
        }
    }
    diags
}

/// Non-repeatable keys may be set at most once.
fn check_no_repeat(known: &[&MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    known
        .iter()
        .copied()
        .filter(|e| !schema.is_repeatable(&e.key))
        .filter(|e| !seen.insert(e.key.as_str()))
        .map(|e| {
            Diagnostic::new(
                Severity::Error,
                M006,
                format!("metadata key `${}` must be set at most once", e.key),
            )
            .with_key(&e.key)
            .with_value(&e.value)
            .with_position(e.position)
        })
        .collect()
}

fn check_url(entries: &[MetadataEntry]) -> Vec<Diagnostic> {
    entries
        .iter()
        .filter(|e| e.key == "url" && URL_SCHEME_RE.is_match(&e.value))
        .map(|e| {
            let stripped = URL_SCHEME_RE.replace(&e.value, "");
            Diagnostic::new(
                Severity::Error,
                M007,
                "`$url` value must not start with http:// or https://",
            )
            .with_key("url")
            .with_value(&e.value)
            .with_position(e.position)
            .with_suggestion(format!("Use: '{stripped}'"))
        })
        .collect()
}

/// Only the first `$type` is checked; repeats are reported by M006.
fn check_type(entries: &[MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    match entries.iter().find(|e| e.key == "type") {
        Some(e) if !schema.types.contains(&e.value.as_str()) => vec![Diagnostic::new(
            Severity::Error,
            M008,
            format!("`$type` value \"{}\" is not a valid plugin type", e.value),
        )
        .with_key("type")
        .with_value(&e.value)
        .with_position(e.position)
        .with_suggestion(format!(
            "Use one of: {}",
            schema
                .types
                .iter()
                .map(|t| format!("\"{t}\""))
                .collect::<Vec<_>>()
                .join(", ")
        ))],
        _ => Vec::new(),
    }
}

/// `$metadata` values are `<tag> <text>`, with tags in canonical order.
fn check_metadata_values(entries: &[MetadataEntry], schema: &KeySchema) -> Vec<Diagnostic> {
    let tags = &schema.sub_metadata;
    let mut diags = Vec::new();
    let mut highest: Option<(usize, &str)> = None;

    for entry in entries.iter().filter(|e| e.key == "metadata") {
        let parsed = entry
            .value
            .split_once(' ')
            .filter(|(_, text)| is_free_text(text))
            .and_then(|(tag, _)| tags.index_of(tag).map(|index| (index, tag)));

        let Some((index, tag)) = parsed else {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    M009,
                    format!("`$metadata` value \"{}\" is malformed", entry.value),
                )
                .with_key("metadata")
                .with_value(&entry.value)
                .with_position(entry.position)
                .with_suggestion(format!(
                    "Start the value with one of: {}",
                    tags.tags.join(", ")
                )),
            );
            continue;
        };

        match highest {
            Some((max, max_tag)) if index < max => diags.push(
                Diagnostic::new(
                    Severity::Error,
                    M010,
                    format!("`$metadata {tag}` must come before `$metadata {max_tag}`"),
                )
                .with_key("metadata")
                .with_value(&entry.value)
                .with_position(entry.position),
            ),
            _ => highest = Some((index, tag)),
        }
    }
    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{T001, T004, T005};
    use crate::schema::STANDARD_SCHEMA;

    fn entries(pairs: &[(&str, &str)]) -> Vec<MetadataEntry> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (key, value))| MetadataEntry {
                key: (*key).to_string(),
                value: (*value).to_string(),
                position: i + 2,
            })
            .collect()
    }

    fn codes(pairs: &[(&str, &str)]) -> Vec<&'static str> {
        validate_metadata(&entries(pairs), &STANDARD_SCHEMA)
            .iter()
            .map(|d| d.code)
            .collect()
    }

    const BASE: &[(&str, &str)] = &[
        ("description", "Example streaming site"),
        ("url", "example.com"),
        ("type", "live"),
    ];

    #[test]
    fn minimal_block_is_valid() {
        assert!(codes(BASE).is_empty());
    }

    #[test]
    fn full_block_is_valid() {
        let pairs = [
            ("description", "Example streaming site"),
            ("url", "example.com"),
            ("url", "live.example.com"),
            ("type", "live, vod"),
            ("webbrowser", "Required"),
            ("metadata", "id one"),
            ("metadata", "author two"),
            ("metadata", "category three"),
            ("metadata", "title four"),
            ("region", "Europe"),
            ("account", "Some streams require an account"),
            ("notes", "a note"),
            ("notes", "another note"),
        ];
        let diags = validate_metadata(&entries(&pairs), &STANDARD_SCHEMA);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn unknown_key() {
        let diags = validate_metadata(
            &entries(&[
                ("description", "Example"),
                ("url", "example.com"),
                ("type", "live"),
                ("homepage", "example.com"),
            ]),
            &STANDARD_SCHEMA,
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, M001);
        assert_eq!(diags[0].key.as_deref(), Some("homepage"));
        assert_eq!(diags[0].position, Some(5));
    }

    #[test]
    fn missing_required_keys_each_reported() {
        let codes = codes(&[("description", "Example")]);
        assert_eq!(codes, [M002, M002]);
    }

    #[test]
    fn keys_out_of_order() {
        let diags = validate_metadata(
            &entries(&[
                ("url", "example.com"),
                ("description", "Example"),
                ("type", "live"),
            ]),
            &STANDARD_SCHEMA,
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, M003);
        assert_eq!(diags[0].key.as_deref(), Some("url"));
        assert!(diags[0]
            .suggestion
            .as_deref()
            .unwrap()
            .contains("description, url, type"));
    }

    #[test]
    fn repeatable_key_split_by_other_key() {
        let codes = codes(&[
            ("description", "Example"),
            ("url", "example.com"),
            ("type", "live"),
            ("url", "other.example.com"),
        ]);
        assert_eq!(codes, [M004]);
    }

    #[test]
    fn interleaved_runs_fail_even_when_first_and_last_occurrences_are_ordered() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("metadata", "id one"),
            ("notes", "a"),
            ("metadata", "title two"),
            ("notes", "b"),
        ]);
        assert_eq!(codes(&pairs), [M004, M004]);
    }

    #[test]
    fn contiguous_repeatable_run_passes_order_checks() {
        let codes = codes(&[
            ("description", "Example"),
            ("url", "a.example.com"),
            ("url", "b.example.com"),
            ("url", "c.example.com"),
            ("type", "live"),
        ]);
        assert!(codes.is_empty(), "{codes:?}");
    }

    #[test]
    fn repeatable_duplicate_values() {
        let mut pairs = BASE.to_vec();
        pairs.extend([("notes", "a"), ("notes", "b"), ("notes", "a")]);
        let diags = validate_metadata(&entries(&pairs), &STANDARD_SCHEMA);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, M005);
        assert_eq!(diags[0].value.as_deref(), Some("a"));
    }

    #[test]
    fn repeatable_distinct_values() {
        let mut pairs = BASE.to_vec();
        pairs.extend([("notes", "a"), ("notes", "b")]);
        assert!(codes(&pairs).is_empty());
    }

    #[test]
    fn non_repeatable_key_set_twice() {
        let mut pairs = BASE.to_vec();
        pairs.extend([("region", "Europe"), ("region", "Asia")]);
        assert_eq!(codes(&pairs), [M006]);
    }

    #[test]
    fn url_with_scheme() {
        let codes = codes(&[
            ("description", "Example"),
            ("url", "http://example.com/x"),
            ("type", "live"),
        ]);
        assert_eq!(codes, [M007]);
    }

    #[test]
    fn url_with_https_scheme_suggests_stripped_value() {
        let diags = validate_metadata(
            &entries(&[
                ("description", "Example"),
                ("url", "https://example.com/x"),
                ("type", "live"),
            ]),
            &STANDARD_SCHEMA,
        );
        assert_eq!(diags[0].suggestion.as_deref(), Some("Use: 'example.com/x'"));
    }

    #[test]
    fn url_without_scheme() {
        let codes = codes(&[
            ("description", "Example"),
            ("url", "example.com/x"),
            ("type", "live"),
        ]);
        assert!(codes.is_empty());
    }

    #[test]
    fn type_values() {
        for (value, valid) in [
            ("live", true),
            ("vod", true),
            ("live, vod", true),
            ("vod, live", false),
            ("livestream", false),
        ] {
            let codes = codes(&[
                ("description", "Example"),
                ("url", "example.com"),
                ("type", value),
            ]);
            assert_eq!(codes.is_empty(), valid, "{value}: {codes:?}");
            if !valid {
                assert_eq!(codes, [M008]);
            }
        }
    }

    #[test]
    fn only_first_type_is_checked() {
        let codes = codes(&[
            ("description", "Example"),
            ("url", "example.com"),
            ("type", "live"),
            ("type", "bogus"),
        ]);
        assert_eq!(codes, [M006]);
    }

    #[test]
    fn missing_type_reports_only_required() {
        let codes = codes(&[("description", "Example"), ("url", "example.com")]);
        assert_eq!(codes, [M002]);
    }

    #[test]
    fn metadata_tags_in_order() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("metadata", "id one"),
            ("metadata", "author two"),
            ("metadata", "category three"),
            ("metadata", "title four"),
        ]);
        assert!(codes(&pairs).is_empty());
    }

    #[test]
    fn metadata_repeated_tag_allowed() {
        let mut pairs = BASE.to_vec();
        pairs.extend([("metadata", "author one"), ("metadata", "author two")]);
        assert!(codes(&pairs).is_empty());
    }

    #[test]
    fn metadata_tags_swapped() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("metadata", "author two"),
            ("metadata", "id one"),
            ("metadata", "category three"),
            ("metadata", "title four"),
        ]);
        let diags = validate_metadata(&entries(&pairs), &STANDARD_SCHEMA);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, M010);
        assert_eq!(diags[0].value.as_deref(), Some("id one"));
    }

    #[test]
    fn metadata_value_malformed() {
        for value in ["name one", "id", "id  one", "id x", "idone"] {
            let mut pairs = BASE.to_vec();
            pairs.push(("metadata", value));
            assert_eq!(codes(&pairs), [M009], "{value}");
        }
    }

    #[test]
    fn all_failures_reported_together() {
        let codes = codes(&[
            ("url", "https://example.com"),
            ("homepage", "example.com"),
            ("type", "stream"),
            ("notes", "a"),
            ("notes", "a"),
        ]);
        for code in [M001, M002, M007, M008, M005] {
            assert!(codes.contains(&code), "missing {code} in {codes:?}");
        }
    }

    #[test]
    fn validate_source_reports_structural_failures() {
        let diags = validate_source("", &STANDARD_SCHEMA);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, T001);

        let diags = validate_source("\"\"\"Example plugin\"\"\"", &STANDARD_SCHEMA);
        assert_eq!(diags[0].code, T004);

        let diags = validate_source("\"\"\"\n$type live\nprose\n\"\"\"", &STANDARD_SCHEMA);
        assert_eq!(diags[0].code, T005);
        assert_eq!(diags[0].position, Some(3));
    }

    #[test]
    fn validate_source_valid_plugin() {
        let source = "\"\"\"\n$description Example\n$url example.com\n$type vod\n\"\"\"\n\nimport re\n";
        assert!(validate_source(source, &STANDARD_SCHEMA).is_empty());
    }
}
