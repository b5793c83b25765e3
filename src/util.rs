use ron::ser::PrettyConfig;
use serde::Serialize;
use serde_json::Value;
use similar::TextDiff;

use crate::schema::Schema;

/// Renders both values as pretty RON and returns a unified line diff.
pub fn diff_ron_values<T: Serialize>(old: &T, new: &T) -> anyhow::Result<String> {
    let pretty = PrettyConfig::default().struct_names(true);
    let old = ron::ser::to_string_pretty(old, pretty.clone())?;
    let new = ron::ser::to_string_pretty(new, pretty)?;

    Ok(TextDiff::from_lines(&old, &new)
        .unified_diff()
        .context_radius(2)
        .header("current", "desired")
        .to_string())
}

/// Replaces the values of sensitive attributes so they never reach plan output or logs.
pub fn mask_sensitive(schema: &Schema, value: &Value) -> Value {
    let mut value = value.clone();
    if let Some(object) = value.as_object_mut() {
        for (name, attribute) in &schema.attributes {
            if !attribute.sensitive {
                continue;
            }
            if let Some(v) = object.get_mut(name) {
                if !v.is_null() {
                    *v = Value::String("(sensitive value)".into());
                }
            }
        }
    }
    value
}

/// Sorts and dedupes, so set-typed attributes compare by content.
pub fn normalize_set<T: Ord>(items: &mut Vec<T>) {
    items.sort();
    items.dedup();
}

pub fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    #[test]
    fn diff_shows_only_changed_lines_as_edits() {
        let diff = diff_ron_values(&json!({ "name": "a", "private": true }), &json!({ "name": "a", "private": false })).unwrap();
        assert!(diff.contains("-"));
        assert!(diff.contains("+"));
        assert!(diff.contains("false"));
    }

    #[test]
    fn sensitive_values_are_masked() {
        let schema = Schema::new("")
            .attr("plaintext_value", Attribute::optional_string().sensitive())
            .attr("secret_name", Attribute::required_string());
        let masked = mask_sensitive(&schema, &json!({ "plaintext_value": "hunter2", "secret_name": "TOKEN" }));
        assert_eq!(masked["plaintext_value"], "(sensitive value)");
        assert_eq!(masked["secret_name"], "TOKEN");

        let masked = mask_sensitive(&schema, &json!({ "plaintext_value": null, "secret_name": "TOKEN" }));
        assert!(masked["plaintext_value"].is_null());
    }

    #[test]
    fn sets_normalize() {
        let mut topics = vec!["rust".to_string(), "cli".to_string(), "rust".to_string()];
        normalize_set(&mut topics);
        assert_eq!(topics, vec!["cli", "rust"]);
    }
}
