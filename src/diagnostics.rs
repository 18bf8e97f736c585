//! Structured diagnostics for catalog conformance checks.
//!
//! Every finding carries a stable code, a severity, the category it belongs
//! to, and whatever context is needed to localize it (metadata key, value,
//! source line).

use std::fmt;

use serde::Serialize;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A contract violation that makes the plugin non-conformant.
    Error,
    /// A potential issue that does not cause failure.
    Warning,
}

/// Report category a diagnostic is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Source or exports lack the expected shape.
    Structural,
    /// Shape is fine but a metadata or class rule is violated.
    Schema,
    /// Plugins and test modules do not pair up.
    CrossReference,
}

impl Category {
    /// Derive the category from a diagnostic code prefix.
    #[must_use]
    pub fn of(code: &str) -> Self {
        match code.as_bytes().first() {
            Some(b'M' | b'K') => Category::Schema,
            Some(b'X' | b'W') => Category::CrossReference,
            _ => Category::Structural,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Structural => write!(f, "structural"),
            Category::Schema => write!(f, "schema"),
            Category::CrossReference => write!(f, "cross-reference"),
        }
    }
}

/// A structured diagnostic message from a conformance check.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Stable error code (e.g., `"M003"`, `"K002"`).
    pub code: &'static str,
    /// Report category.
    pub category: Category,
    /// Human-readable message.
    pub message: String,
    /// Metadata key or class attribute the diagnostic is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Offending value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// 1-based source line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Suggested fix (actionable text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic; the category follows from the code.
    #[must_use]
    pub fn new(severity: Severity, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            category: Category::of(code),
            message: message.into(),
            key: None,
            value: None,
            position: None,
            suggestion: None,
        }
    }

    /// Set the key or attribute this diagnostic is about.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the offending value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the source line.
    #[must_use]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Set a suggested fix for this diagnostic.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Returns `true` if this diagnostic is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns `true` if this diagnostic is a warning.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Errors display as `"[code] message"`, warnings as `"warning: [code] message"`.
/// A known source line is appended as `(line N)`.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.severity == Severity::Warning {
            write!(f, "warning: ")?;
        }
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(line) = self.position {
            write!(f, " (line {line})")?;
        }
        Ok(())
    }
}

// ── Error code constants ────────────────────────────────────────────────

// Infrastructure errors (E000)

/// Infrastructure error (file missing, unreadable, too large).
pub const E000: &str = "E000";

// Structural errors (T001–T006)

/// Source contains no token.
pub const T001: &str = "T001";
/// First token is not a string literal.
pub const T002: &str = "T002";
/// First string literal is unterminated.
pub const T003: &str = "T003";
/// Leading string is not a properly formatted metadata block.
pub const T004: &str = "T004";
/// Metadata line does not follow `$key value`.
pub const T005: &str = "T005";
/// Module does not export a plugin class.
pub const T006: &str = "T006";

// Metadata schema errors (M001–M010)

/// Unknown metadata key.
pub const M001: &str = "M001";
/// Missing required metadata key.
pub const M002: &str = "M002";
/// Metadata keys out of canonical order.
pub const M003: &str = "M003";
/// Metadata key split into several runs.
pub const M004: &str = "M004";
/// Duplicate value under a repeatable key.
pub const M005: &str = "M005";
/// Non-repeatable key set more than once.
pub const M006: &str = "M006";
/// `$url` value starts with a URI scheme.
pub const M007: &str = "M007";
/// `$type` value is not an allowed plugin type.
pub const M008: &str = "M008";
/// `$metadata` value is malformed.
pub const M009: &str = "M009";
/// `$metadata` values out of tag order.
pub const M010: &str = "M010";

// Class contract errors (K001–K010)

/// Exported class does not derive from the plugin base class.
pub const K001: &str = "K001";
/// Class name does not start with an uppercase letter.
pub const K002: &str = "K002";
/// Class name contains underscores.
pub const K003: &str = "K003";
/// Constructor signature is not extensible.
pub const K004: &str = "K004";
/// `matchers` is missing or not a list.
pub const K005: &str = "K005";
/// `matchers` list is empty.
pub const K006: &str = "K006";
/// `matchers` contains a non-matcher value.
pub const K007: &str = "K007";
/// Deprecated `can_handle_url` hook present.
pub const K008: &str = "K008";
/// Deprecated `priority` hook present.
pub const K009: &str = "K009";
/// Stream-resolution entry point missing or not callable.
pub const K010: &str = "K010";

// Cross-reference codes (X001–X002, W001)

/// Plugin has no test module.
pub const X001: &str = "X001";
/// Test module has no plugin.
pub const X002: &str = "X002";
/// Ignore-list entry names neither a plugin nor a test module.
pub const W001: &str = "W001";
