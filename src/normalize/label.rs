use serde_json::Value;

/// Marker the graph store leaves in front of label and relationship type strings.
pub const LABEL_PREFIX: char = ':';

/// Strip exactly one leading prefix marker, leaving anything else untouched.
pub fn clean_label(label: &str) -> &str {
    label.strip_prefix(LABEL_PREFIX).unwrap_or(label)
}

/// Value-level variant: strings are cleaned, every other value passes through.
pub fn clean_label_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_label(s).to_string()),
        other => other.clone(),
    }
}

/// Clean every string label in a raw label list, dropping non-string entries.
pub fn clean_labels(labels: &[Value]) -> Vec<String> {
    labels
        .iter()
        .filter_map(Value::as_str)
        .map(|label| clean_label(label).to_string())
        .collect()
}
