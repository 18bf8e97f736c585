//! Structural contract checks for a plugin's exported class.
//!
//! The host loader executes plugin modules and hands over an exports
//! snapshot: for each module, the values bound to its public names. The
//! checks here only read that snapshot, through [`ClassIntrospection`], and
//! compare it against a [`Capability`] descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{
    Diagnostic, Severity, K001, K002, K003, K004, K005, K006, K007, K008, K009, K010,
};
use crate::errors::StructuralError;

/// Kind of a Python parameter, as reported by `inspect.signature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

/// One constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
}

impl Parameter {
    fn render(&self) -> String {
        match self.kind {
            ParamKind::VarPositional => format!("*{}", self.name),
            ParamKind::VarKeyword => format!("**{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// A class constructor: either the base class's own, or an override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constructor {
    /// Identical to the base class constructor.
    #[default]
    Inherited,
    /// Overridden with the given parameters (including `self`).
    Signature(Vec<Parameter>),
}

impl Constructor {
    fn render(&self) -> String {
        match self {
            Constructor::Inherited => "(inherited)".to_string(),
            Constructor::Signature(params) => format!(
                "({})",
                params
                    .iter()
                    .map(Parameter::render)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Type of a plain value, with its method resolution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInfo {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub mro: Vec<String>,
}

impl ValueInfo {
    /// Returns `true` if the value is an instance of `class` or a subclass.
    #[must_use]
    pub fn is_instance_of(&self, class: &str) -> bool {
        self.type_name == class || self.mro.iter().any(|c| c == class)
    }
}

/// A class attribute, as seen from the class object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attribute {
    /// Function, method, or other callable.
    Callable,
    /// A `list` instance.
    List {
        #[serde(default)]
        items: Vec<ValueInfo>,
    },
    /// Any other value.
    Value {
        #[serde(rename = "type")]
        type_name: String,
    },
}

/// Attribute kinds a capability can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Callable,
    List,
}

impl AttributeKind {
    fn matches(self, attribute: &Attribute) -> bool {
        matches!(
            (self, attribute),
            (AttributeKind::Callable, Attribute::Callable)
                | (AttributeKind::List, Attribute::List { .. })
        )
    }

    fn describe(self) -> &'static str {
        match self {
            AttributeKind::Callable => "callable",
            AttributeKind::List => "list",
        }
    }
}

/// An exported class, as captured by the host loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    /// Method resolution order, starting with the class itself.
    #[serde(default)]
    pub mro: Vec<String>,
    #[serde(default)]
    pub init: Constructor,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

/// A value bound to a module-level name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportedValue {
    Class(ClassInfo),
    Object {
        #[serde(default)]
        class: String,
    },
}

/// Module-level names of one plugin module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleExports(pub BTreeMap<String, ExportedValue>);

impl ModuleExports {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExportedValue> {
        self.0.get(name)
    }
}

/// Read access to a class object.
///
/// [`ClassInfo`] implements this for snapshots; hosts that can introspect
/// live objects implement it directly.
pub trait ClassIntrospection {
    /// The class's `__name__`.
    fn class_name(&self) -> &str;
    /// `issubclass(self, base)`.
    fn is_subclass_of(&self, base: &str) -> bool;
    /// The class constructor.
    fn constructor(&self) -> &Constructor;
    /// Look up an attribute on the class, including inherited ones.
    fn attribute(&self, name: &str) -> Option<&Attribute>;
}

impl ClassIntrospection for ClassInfo {
    fn class_name(&self) -> &str {
        &self.name
    }

    fn is_subclass_of(&self, base: &str) -> bool {
        self.name == base || self.mro.iter().any(|c| c == base)
    }

    fn constructor(&self) -> &Constructor {
        &self.init
    }

    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

/// An attribute the plugin class must expose.
#[derive(Debug, Clone, Copy)]
pub struct RequiredAttribute {
    pub name: &'static str,
    pub kind: AttributeKind,
    /// For lists: the class every element must be an instance of. Such lists
    /// must also be non-empty.
    pub element_class: Option<&'static str>,
    /// Code reported when the attribute is missing or of the wrong kind.
    pub code: &'static str,
}

/// A legacy hook whose presence marks an un-migrated plugin.
#[derive(Debug, Clone, Copy)]
pub struct DeprecatedHook {
    pub name: &'static str,
    pub code: &'static str,
    pub signature: &'static str,
}

/// What a plugin module must provide to be trusted by the host.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    /// Module-level name the plugin class is exported under.
    pub export_slot: &'static str,
    /// Base class every plugin derives from.
    pub base_class: &'static str,
    /// Accepted constructor override, as `(name, kind)` pairs.
    pub constructor: &'static [(&'static str, ParamKind)],
    pub required: &'static [RequiredAttribute],
    pub deprecated: &'static [DeprecatedHook],
}

/// The plugin capability of the host application.
pub const PLUGIN_CAPABILITY: Capability = Capability {
    export_slot: "__plugin__",
    base_class: "Plugin",
    constructor: &[
        ("self", ParamKind::PositionalOrKeyword),
        ("args", ParamKind::VarPositional),
        ("kwargs", ParamKind::VarKeyword),
    ],
    required: &[
        RequiredAttribute {
            name: "matchers",
            kind: AttributeKind::List,
            element_class: Some("Matcher"),
            code: K005,
        },
        RequiredAttribute {
            name: "_get_streams",
            kind: AttributeKind::Callable,
            element_class: None,
            code: K010,
        },
    ],
    deprecated: &[
        DeprecatedHook {
            name: "can_handle_url",
            code: K008,
            signature: "can_handle_url(url)",
        },
        DeprecatedHook {
            name: "priority",
            code: K009,
            signature: "priority(url)",
        },
    ],
};

impl Default for Capability {
    fn default() -> Self {
        PLUGIN_CAPABILITY
    }
}

/// Validate a module's exports against a capability.
///
/// A missing or non-class export is a structural failure and stops the
/// checks; otherwise every class rule is evaluated.
///
/// Returns a list of diagnostics (empty = valid).
#[must_use]
pub fn validate_exports(exports: &ModuleExports, capability: &Capability) -> Vec<Diagnostic> {
    match exports.get(capability.export_slot) {
        Some(ExportedValue::Class(class)) => validate_class(class, capability),
        _ => vec![StructuralError::MissingExport {
            slot: capability.export_slot.to_string(),
        }
        .into()],
    }
}

/// Validate an exported class against a capability.
///
/// Returns a list of diagnostics (empty = valid).
#[must_use]
pub fn validate_class(class: &dyn ClassIntrospection, capability: &Capability) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    if !class.is_subclass_of(capability.base_class) {
        diags.push(Diagnostic::new(
            Severity::Error,
            K001,
            format!(
                "`{}` is not a subclass of `{}`",
                class.class_name(),
                capability.base_class
            ),
        ));
    }

    diags.extend(check_class_name(class.class_name()));
    diags.extend(check_constructor(class.constructor(), capability));

    for required in capability.required {
        diags.extend(check_required_attribute(class, required));
    }

    for hook in capability.deprecated {
        if class.attribute(hook.name).is_some() {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    hook.code,
                    format!("implements deprecated `{}`", hook.signature),
                )
                .with_key(hook.name)
                .with_suggestion(format!("Remove `{}`", hook.name)),
            );
        }
    }

    diags
}

fn check_class_name(name: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let starts_upper = name.chars().next().is_some_and(|c| {
        let mut upper = c.to_uppercase();
        upper.next() == Some(c) && upper.next().is_none()
    });
    if !starts_upper {
        let mut chars = name.chars();
        let suggested: String = chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
        diags.push(
            Diagnostic::new(
                Severity::Error,
                K002,
                format!("class name `{name}` must start with an uppercase letter"),
            )
            .with_value(name)
            .with_suggestion(format!("Rename to `{suggested}`")),
        );
    }

    if name.contains('_') {
        diags.push(
            Diagnostic::new(
                Severity::Error,
                K003,
                format!("class name `{name}` must not contain underscores"),
            )
            .with_value(name)
            .with_suggestion(format!("Rename to `{}`", name.replace('_', ""))),
        );
    }

    diags
}

fn check_constructor(constructor: &Constructor, capability: &Capability) -> Option<Diagnostic> {
    let Constructor::Signature(params) = constructor else {
        return None;
    };
    let accepted = params.len() == capability.constructor.len()
        && params
            .iter()
            .zip(capability.constructor)
            .all(|(p, (name, kind))| p.name == *name && p.kind == *kind);
    if accepted {
        return None;
    }

    let expected = Constructor::Signature(
        capability
            .constructor
            .iter()
            .map(|(name, kind)| Parameter {
                name: (*name).to_string(),
                kind: *kind,
            })
            .collect(),
    )
    .render();
    Some(
        Diagnostic::new(
            Severity::Error,
            K004,
            format!("constructor must be inherited or have the signature {expected}"),
        )
        .with_key("__init__")
        .with_value(constructor.render()),
    )
}

fn check_required_attribute(
    class: &dyn ClassIntrospection,
    required: &RequiredAttribute,
) -> Vec<Diagnostic> {
    let name = required.name;
    let attribute = match class.attribute(name) {
        Some(a) if required.kind.matches(a) => a,
        found => {
            let message = match found {
                None => format!("does not implement `{name}`"),
                Some(_) => format!("`{name}` is not a {}", required.kind.describe()),
            };
            return vec![Diagnostic::new(Severity::Error, required.code, message).with_key(name)];
        }
    };

    let (Attribute::List { items }, Some(element_class)) = (attribute, required.element_class)
    else {
        return Vec::new();
    };

    if items.is_empty() {
        return vec![Diagnostic::new(
            Severity::Error,
            K006,
            format!("`{name}` must contain at least one {element_class}"),
        )
        .with_key(name)];
    }

    items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_instance_of(element_class))
        .map(|(i, item)| {
            Diagnostic::new(
                Severity::Error,
                K007,
                format!(
                    "`{name}[{i}]` is a {}, not a {element_class}",
                    item.type_name
                ),
            )
            .with_key(name)
            .with_value(&item.type_name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::T006;
    use serde_json::json;

    fn class(overrides: serde_json::Value) -> ClassInfo {
        let mut base = json!({
            "name": "Twitch",
            "mro": ["Twitch", "Plugin", "object"],
            "init": "inherited",
            "attributes": {
                "matchers": {"kind": "list", "items": [{"type": "Matcher"}]},
                "_get_streams": {"kind": "callable"}
            }
        });
        if let (Some(base), Some(overrides)) = (base.as_object_mut(), overrides.as_object()) {
            for (k, v) in overrides {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    fn codes(info: &ClassInfo) -> Vec<&'static str> {
        validate_class(info, &PLUGIN_CAPABILITY)
            .iter()
            .map(|d| d.code)
            .collect()
    }

    #[test]
    fn valid_class_passes() {
        assert!(codes(&class(json!({}))).is_empty());
    }

    #[test]
    fn not_a_plugin_subclass() {
        let info = class(json!({"mro": ["Twitch", "object"]}));
        assert_eq!(codes(&info), [K001]);
    }

    #[test]
    fn base_class_counts_as_subclass_of_itself() {
        let info = class(json!({"name": "Plugin", "mro": []}));
        assert!(info.is_subclass_of("Plugin"));
    }

    #[test]
    fn lowercase_class_name() {
        let info = class(json!({"name": "twitch", "mro": ["twitch", "Plugin"]}));
        let diags = validate_class(&info, &PLUGIN_CAPABILITY);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, K002);
        assert_eq!(diags[0].suggestion.as_deref(), Some("Rename to `Twitch`"));
    }

    #[test]
    fn underscore_class_name() {
        let info = class(json!({"name": "Old_Site", "mro": ["Old_Site", "Plugin"]}));
        assert_eq!(codes(&info), [K003]);
        let info = class(json!({"name": "OldSite", "mro": ["OldSite", "Plugin"]}));
        assert!(codes(&info).is_empty());
    }

    #[test]
    fn empty_and_digit_class_names() {
        assert_eq!(check_class_name("").len(), 1);
        assert!(check_class_name("9Gag").is_empty());
        assert_eq!(check_class_name("_Private").len(), 1);
    }

    #[test]
    fn extensible_constructor_passes() {
        let info = class(json!({"init": {"signature": [
            {"name": "self", "kind": "positional_or_keyword"},
            {"name": "args", "kind": "var_positional"},
            {"name": "kwargs", "kind": "var_keyword"}
        ]}}));
        assert!(codes(&info).is_empty());
    }

    #[test]
    fn constructor_with_extra_parameter_fails() {
        let info = class(json!({"init": {"signature": [
            {"name": "self", "kind": "positional_or_keyword"},
            {"name": "session", "kind": "positional_or_keyword"},
            {"name": "args", "kind": "var_positional"},
            {"name": "kwargs", "kind": "var_keyword"}
        ]}}));
        let diags = validate_class(&info, &PLUGIN_CAPABILITY);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, K004);
        assert_eq!(
            diags[0].value.as_deref(),
            Some("(self, session, *args, **kwargs)")
        );
        assert!(diags[0].message.contains("(self, *args, **kwargs)"));
    }

    #[test]
    fn constructor_without_kwargs_fails() {
        let info = class(json!({"init": {"signature": [
            {"name": "self", "kind": "positional_or_keyword"},
            {"name": "args", "kind": "var_positional"}
        ]}}));
        assert_eq!(codes(&info), [K004]);
    }

    #[test]
    fn empty_matchers() {
        let info = class(json!({"attributes": {
            "matchers": {"kind": "list", "items": []},
            "_get_streams": {"kind": "callable"}
        }}));
        assert_eq!(codes(&info), [K006]);
    }

    #[test]
    fn missing_or_non_list_matchers() {
        let info = class(json!({"attributes": {"_get_streams": {"kind": "callable"}}}));
        assert_eq!(codes(&info), [K005]);
        let info = class(json!({"attributes": {
            "matchers": {"kind": "value", "type": "tuple"},
            "_get_streams": {"kind": "callable"}
        }}));
        assert_eq!(codes(&info), [K005]);
    }

    #[test]
    fn invalid_matcher_elements_reported_individually() {
        let info = class(json!({"attributes": {
            "matchers": {"kind": "list", "items": [
                {"type": "Matcher"},
                {"type": "Pattern"},
                {"type": "NamedMatcher", "mro": ["NamedMatcher", "Matcher", "object"]},
                {"type": "str"}
            ]},
            "_get_streams": {"kind": "callable"}
        }}));
        let diags = validate_class(&info, &PLUGIN_CAPABILITY);
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "`matchers[1]` is a Pattern, not a Matcher",
                "`matchers[3]` is a str, not a Matcher"
            ]
        );
    }

    #[test]
    fn deprecated_hooks_present() {
        let info = class(json!({"attributes": {
            "matchers": {"kind": "list", "items": [{"type": "Matcher"}]},
            "_get_streams": {"kind": "callable"},
            "can_handle_url": {"kind": "callable"},
            "priority": {"kind": "callable"}
        }}));
        assert_eq!(codes(&info), [K008, K009]);
    }

    #[test]
    fn stream_entry_point_must_be_callable() {
        let info = class(json!({"attributes": {
            "matchers": {"kind": "list", "items": [{"type": "Matcher"}]},
            "_get_streams": {"kind": "value", "type": "NoneType"}
        }}));
        assert_eq!(codes(&info), [K010]);
        let info = class(json!({"attributes": {
            "matchers": {"kind": "list", "items": [{"type": "Matcher"}]}
        }}));
        assert_eq!(codes(&info), [K010]);
    }

    #[test]
    fn all_class_failures_reported_together() {
        let info = class(json!({
            "name": "old_site",
            "mro": ["old_site", "object"],
            "attributes": {"priority": {"kind": "callable"}}
        }));
        assert_eq!(codes(&info), [K001, K002, K003, K005, K010, K009]);
    }

    #[test]
    fn missing_export_is_structural() {
        let exports = ModuleExports::default();
        let diags = validate_exports(&exports, &PLUGIN_CAPABILITY);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, T006);
    }

    #[test]
    fn non_class_export_is_structural() {
        let exports: ModuleExports = serde_json::from_value(json!({
            "__plugin__": {"type": "object", "class": "function"}
        }))
        .unwrap();
        let diags = validate_exports(&exports, &PLUGIN_CAPABILITY);
        assert_eq!(diags[0].code, T006);
    }

    #[test]
    fn class_export_is_validated() {
        let exports: ModuleExports = serde_json::from_value(json!({
            "__plugin__": {
                "type": "class",
                "name": "twitch",
                "mro": ["twitch", "Plugin"],
                "attributes": {
                    "matchers": {"kind": "list", "items": [{"type": "Matcher"}]},
                    "_get_streams": {"kind": "callable"}
                }
            },
            "log": {"type": "object", "class": "Logger"}
        }))
        .unwrap();
        let codes: Vec<_> = validate_exports(&exports, &PLUGIN_CAPABILITY)
            .iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(codes, [K002]);
    }
}
