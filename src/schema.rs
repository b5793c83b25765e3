//! Attribute schemas for resources, data sources and the provider block.
//!
//! A schema is an ordered table of attributes. Validation covers what every
//! resource needs (presence, JSON kind, enum membership, regexes, mutually
//! exclusive fields). Anything more specific lives in the resource's own
//! `validate` hook.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::diag::Diagnostics;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    String,
    Bool,
    Int,
    List(Box<Kind>),
    Set(Box<Kind>),
    Object(IndexMap<String, Kind>),
}

impl Kind {
    pub fn list_of(kind: Kind) -> Self {
        Kind::List(Box::new(kind))
    }

    pub fn set_of(kind: Kind) -> Self {
        Kind::Set(Box::new(kind))
    }

    pub fn object(fields: &[(&str, Kind)]) -> Self {
        Kind::Object(fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Kind::String, Value::String(_)) => true,
            (Kind::Bool, Value::Bool(_)) => true,
            (Kind::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Kind::List(inner) | Kind::Set(inner), Value::Array(items)) => items.iter().all(|v| inner.matches(v)),
            (Kind::Object(fields), Value::Object(map)) => map
                .iter()
                .all(|(k, v)| fields.get(k).map(|kind| kind.matches(v)).unwrap_or(false)),
            _ => false,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Kind::String => "a string",
            Kind::Bool => "a bool",
            Kind::Int => "an integer",
            Kind::List(_) => "a list",
            Kind::Set(_) => "a set",
            Kind::Object(_) => "an object",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Validator {
    OneOf(&'static [&'static str]),
    Regex(&'static Regex, &'static str),
    IntBetween(i64, i64),
    LengthBetween(usize, usize),
    ConflictsWith(&'static [&'static str]),
    AlsoRequires(&'static [&'static str]),
}

impl Validator {
    fn check(&self, name: &str, value: &Value, object: &Map<String, Value>, diags: &mut Diagnostics) {
        let is_set = |other: &str| object.get(other).map(|v| !v.is_null()).unwrap_or(false);

        match self {
            Validator::OneOf(allowed) => {
                for s in strings(value) {
                    if !allowed.contains(&s) {
                        diags.attribute_error(
                            name,
                            "Invalid attribute value",
                            format!("{name} must be one of {}, got {s:?}", allowed.join(", ")),
                        );
                    }
                }
            }
            Validator::Regex(re, message) => {
                for s in strings(value) {
                    if !re.is_match(s) {
                        diags.attribute_error(name, "Invalid attribute value", format!("{name}: {message}, got {s:?}"));
                    }
                }
            }
            Validator::IntBetween(min, max) => {
                if let Some(n) = value.as_i64() {
                    if n < *min || n > *max {
                        diags.attribute_error(
                            name,
                            "Invalid attribute value",
                            format!("{name} must be between {min} and {max}, got {n}"),
                        );
                    }
                }
            }
            Validator::LengthBetween(min, max) => {
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    _ => return,
                };
                if len < *min || len > *max {
                    diags.attribute_error(
                        name,
                        "Invalid attribute length",
                        format!("{name} must have length between {min} and {max}, got {len}"),
                    );
                }
            }
            Validator::ConflictsWith(others) => {
                for other in others.iter().filter(|o| is_set(o)) {
                    diags.attribute_error(
                        name,
                        "Conflicting attributes",
                        format!("{name} cannot be set together with {other}"),
                    );
                }
            }
            Validator::AlsoRequires(others) => {
                for other in others.iter().filter(|o| !is_set(o)) {
                    diags.attribute_error(name, "Missing attribute", format!("{name} requires {other} to be set"));
                }
            }
        }
    }
}

fn strings(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub kind: Kind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub requires_replace: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip)]
    pub validators: Vec<Validator>,
}

impl Attribute {
    fn new(kind: Kind) -> Self {
        Attribute {
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            default: None,
            description: String::new(),
            validators: Vec::new(),
        }
    }

    pub fn required(kind: Kind) -> Self {
        Attribute {
            required: true,
            ..Self::new(kind)
        }
    }

    pub fn optional(kind: Kind) -> Self {
        Attribute {
            optional: true,
            ..Self::new(kind)
        }
    }

    pub fn computed(kind: Kind) -> Self {
        Attribute {
            computed: true,
            ..Self::new(kind)
        }
    }

    pub fn required_string() -> Self {
        Self::required(Kind::String)
    }

    pub fn optional_string() -> Self {
        Self::optional(Kind::String)
    }

    pub fn computed_string() -> Self {
        Self::computed(Kind::String)
    }

    pub fn optional_bool() -> Self {
        Self::optional(Kind::Bool)
    }

    pub fn also_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Attributes that are only ever set by the provider.
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub version: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub attributes: IndexMap<String, Attribute>,
}

impl Schema {
    pub fn new(description: &str) -> Self {
        Schema {
            version: 0,
            description: description.to_string(),
            attributes: IndexMap::new(),
        }
    }

    pub fn attr(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Validates user configuration. Read-only attributes may not be set.
    pub fn validate_config(&self, value: &Value) -> Diagnostics {
        self.check(value, true)
    }

    /// Validates a planned or prior state, where computed values are expected.
    pub fn validate_state(&self, value: &Value) -> Diagnostics {
        self.check(value, false)
    }

    fn check(&self, value: &Value, reject_read_only: bool) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let Some(object) = value.as_object() else {
            diags.push(crate::diag::Diagnostic::error(
                "Invalid configuration",
                "expected an object of attributes",
            ));
            return diags;
        };

        for key in object.keys() {
            if !self.attributes.contains_key(key) {
                diags.attribute_error(key, "Unsupported attribute", format!("An attribute named {key:?} is not expected here"));
            }
        }

        for (name, attribute) in &self.attributes {
            let value = object.get(name).unwrap_or(&Value::Null);

            if value.is_null() {
                if attribute.required {
                    diags.attribute_error(
                        name,
                        "Missing required attribute",
                        format!("The attribute {name:?} is required, but no definition was found"),
                    );
                }
                continue;
            }

            if reject_read_only && attribute.is_read_only() {
                diags.attribute_error(
                    name,
                    "Invalid configuration",
                    format!("{name} is computed by the provider and cannot be set"),
                );
                continue;
            }

            if !attribute.kind.matches(value) {
                diags.attribute_error(
                    name,
                    "Incorrect attribute value type",
                    format!("{name} must be {}", attribute.kind.describe()),
                );
                continue;
            }

            for validator in &attribute.validators {
                validator.check(name, value, object, &mut diags);
            }
        }

        diags
    }

    /// Fills defaults for optional attributes left null.
    pub fn apply_defaults(&self, value: &mut Value) {
        let Some(object) = value.as_object_mut() else {
            return;
        };
        for (name, attribute) in &self.attributes {
            let Some(default) = &attribute.default else {
                continue;
            };
            let slot = object.entry(name.clone()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = default.clone();
            }
        }
    }

    pub fn requires_replace(&self, name: &str) -> bool {
        self.attributes.get(name).map(|a| a.requires_replace).unwrap_or(false)
    }

    pub fn computed_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.computed)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use serde_json::json;

    lazy_static! {
        static ref NAME: Regex = Regex::new("^[a-z]+$").unwrap();
    }

    fn schema() -> Schema {
        Schema::new("test")
            .attr("name", Attribute::required_string().validate(Validator::Regex(&NAME, "must be lowercase")))
            .attr(
                "visibility",
                Attribute::optional_string()
                    .default("private")
                    .validate(Validator::OneOf(&["public", "private"])),
            )
            .attr("plaintext", Attribute::optional_string().validate(Validator::ConflictsWith(&["encrypted"])))
            .attr("encrypted", Attribute::optional_string())
            .attr("timer", Attribute::optional(Kind::Int).validate(Validator::IntBetween(0, 10)))
            .attr("tags", Attribute::optional(Kind::set_of(Kind::String)).validate(Validator::LengthBetween(1, 2)))
            .attr("etag", Attribute::computed_string())
    }

    #[test]
    fn accepts_valid_config() {
        let diags = schema().validate_config(&json!({ "name": "widgets", "visibility": "public", "timer": 3 }));
        assert!(!diags.has_error(), "{diags:?}");
    }

    #[test]
    fn reports_missing_and_unknown() {
        let diags = schema().validate_config(&json!({ "colour": "red" }));
        let attrs: Vec<_> = diags.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert!(attrs.contains(&"colour"));
        assert!(attrs.contains(&"name"));
    }

    #[test]
    fn enum_regex_and_range() {
        let diags = schema().validate_config(&json!({ "name": "Widgets", "visibility": "internal", "timer": 11 }));
        assert_eq!(diags.0.len(), 3);
    }

    #[test]
    fn conflicting_attributes() {
        let diags = schema().validate_config(&json!({ "name": "a", "plaintext": "x", "encrypted": "y" }));
        assert!(diags.has_error());
        assert_eq!(diags.0[0].attribute.as_deref(), Some("plaintext"));
    }

    #[test]
    fn read_only_only_rejected_in_config() {
        let value = json!({ "name": "a", "etag": "W/\"abc\"" });
        assert!(schema().validate_config(&value).has_error());
        assert!(!schema().validate_state(&value).has_error());
    }

    #[test]
    fn wrong_kind() {
        let diags = schema().validate_config(&json!({ "name": "a", "timer": "soon", "tags": ["a", "b", "c"] }));
        assert_eq!(diags.0.len(), 2);
    }

    #[test]
    fn defaults_fill_nulls_only() {
        let mut value = json!({ "name": "a", "visibility": null });
        schema().apply_defaults(&mut value);
        assert_eq!(value["visibility"], "private");

        let mut value = json!({ "name": "a", "visibility": "public" });
        schema().apply_defaults(&mut value);
        assert_eq!(value["visibility"], "public");
    }
}
