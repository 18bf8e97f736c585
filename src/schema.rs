//! Fixed schemas for plugin metadata blocks.
//!
//! Both schemas are immutable process-wide constants. Validators receive them
//! by reference rather than reaching for globals.

/// Metadata keys in canonical order.
pub const METADATA_KEYS: &[&str] = &[
    "description",
    "url",
    "type",
    "webbrowser",
    "metadata",
    "region",
    "account",
    "notes",
];

/// Keys every metadata block must set.
pub const REQUIRED_KEYS: &[&str] = &["description", "url", "type"];

/// Keys that may appear more than once, each time with a distinct value.
pub const REPEATABLE_KEYS: &[&str] = &["url", "metadata", "notes"];

/// Allowed `$type` values.
pub const PLUGIN_TYPES: &[&str] = &["live", "vod", "live, vod"];

/// `$metadata` category tags in canonical order.
pub const METADATA_TAGS: &[&str] = &["id", "author", "category", "title"];

/// Key rules for a metadata block.
#[derive(Debug, Clone, Copy)]
pub struct KeySchema {
    /// Every allowed key, in canonical order.
    pub all_keys: &'static [&'static str],
    /// Keys that must be present.
    pub required_keys: &'static [&'static str],
    /// Keys allowed to repeat.
    pub repeatable_keys: &'static [&'static str],
    /// Allowed values of the `type` key.
    pub types: &'static [&'static str],
    /// Sub-schema for values of the `metadata` key.
    pub sub_metadata: SubMetadataSchema,
}

/// Tag rules for values of the repeatable `metadata` key.
#[derive(Debug, Clone, Copy)]
pub struct SubMetadataSchema {
    /// Tags in canonical order.
    pub tags: &'static [&'static str],
}

/// The schema used for every plugin in the catalog.
pub const STANDARD_SCHEMA: KeySchema = KeySchema {
    all_keys: METADATA_KEYS,
    required_keys: REQUIRED_KEYS,
    repeatable_keys: REPEATABLE_KEYS,
    types: PLUGIN_TYPES,
    sub_metadata: SubMetadataSchema {
        tags: METADATA_TAGS,
    },
};

impl Default for KeySchema {
    fn default() -> Self {
        STANDARD_SCHEMA
    }
}

impl KeySchema {
    /// Position of `key` in the canonical order, if known.
    #[must_use]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.all_keys.iter().position(|k| *k == key)
    }

    #[must_use]
    pub fn is_known(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    #[must_use]
    pub fn is_repeatable(&self, key: &str) -> bool {
        self.repeatable_keys.contains(&key)
    }

    /// Known keys that may be set at most once, in canonical order.
    pub fn non_repeatable_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.all_keys
            .iter()
            .copied()
            .filter(|k| !self.repeatable_keys.contains(k))
    }
}

impl SubMetadataSchema {
    /// Position of `tag` in the canonical order, if known.
    #[must_use]
    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| *t == tag)
    }
}
