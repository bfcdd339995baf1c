//! Deterministic structural fingerprints of wizard aggregates.
//!
//! Two wizards have the same fingerprint when they have the same shape: the
//! same settings, steps, option sets, options, dependency edges and flow
//! rules, compared by position rather than by identity. A clone therefore
//! fingerprints equal to its source even though every id is fresh.
//!
//! Hash is SHA-256 of canonicalized JSON with sorted keys.

use crate::model::Wizard;
use serde::Serialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// Fingerprint format version (for forward compatibility)
const FINGERPRINT_VERSION: u32 = 1;

/// Keys that carry identity or time rather than structure
const VOLATILE_KEYS: &[&str] = &["id", "created_at", "updated_at"];

/// Positional labels for every node id in a wizard
struct Labels(HashMap<Uuid, String>);

impl Labels {
    fn build(wizard: &Wizard) -> Self {
        let mut map = HashMap::new();
        for (si, step) in wizard.ordered_steps().into_iter().enumerate() {
            let step_label = format!("step[{si}]");
            for (ki, set) in step.ordered_option_sets().into_iter().enumerate() {
                let set_label = format!("{step_label}.set[{ki}]");
                for (oi, opt) in set.ordered_options().into_iter().enumerate() {
                    map.insert(opt.id, format!("{set_label}.option[{oi}]"));
                }
                map.insert(set.id, set_label);
            }
            map.insert(step.id, step_label);
        }
        Self(map)
    }

    fn of(&self, id: Uuid) -> Value {
        match self.0.get(&id) {
            Some(label) => Value::String(label.clone()),
            None => Value::String("dangling".to_string()),
        }
    }

    /// Replace every `option_set_id` inside a condition tree with its label
    fn relabel_condition(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if key == "option_set_id" {
                        if let Some(id) = child.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                            *child = self.of(id);
                        }
                    } else {
                        self.relabel_condition(child);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.relabel_condition(v)),
            _ => {}
        }
    }
}

/// Serialize `node` and drop identity/time keys plus the given child keys
fn shape<T: Serialize>(node: &T, children: &[&str]) -> Result<Map<String, Value>, serde_json::Error> {
    let mut map = match serde_json::to_value(node)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for key in VOLATILE_KEYS.iter().chain(children) {
        map.remove(*key);
    }
    Ok(map)
}

/// Compute the structural fingerprint of a wizard.
///
/// # Errors
/// Returns an error if serialization fails (should not happen for valid wizards).
pub fn structural_fingerprint(wizard: &Wizard) -> Result<String, serde_json::Error> {
    let labels = Labels::build(wizard);

    let mut steps = vec![];
    for step in wizard.ordered_steps() {
        let mut step_json = shape(step, &["option_sets"])?;
        let mut sets = vec![];
        for set in step.ordered_option_sets() {
            let mut set_json = shape(set, &["options"])?;
            let mut options = vec![];
            for opt in set.ordered_options() {
                let mut opt_json = shape(opt, &["dependencies"])?;
                let mut deps: Vec<String> = opt
                    .dependencies
                    .iter()
                    .map(|d| {
                        canonicalize_json(&json!({
                            "depends_on": labels.of(d.depends_on_option_id),
                            "type": d.dependency_type,
                        }))
                    })
                    .collect();
                deps.sort();
                opt_json.insert("dependencies".to_string(), json!(deps));
                options.push(Value::Object(opt_json));
            }
            set_json.insert("options".to_string(), Value::Array(options));
            sets.push(Value::Object(set_json));
        }
        step_json.insert("option_sets".to_string(), Value::Array(sets));
        steps.push(Value::Object(step_json));
    }

    let mut rules: Vec<_> = wizard.flow_rules.iter().collect();
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    let mut rules_json = vec![];
    for rule in rules {
        let mut rule_json = shape(rule, &[])?;
        rule_json.insert("from_step_id".to_string(), labels.of(rule.from_step_id));
        rule_json.insert("to_step_id".to_string(), labels.of(rule.to_step_id));
        if let Some(condition) = rule_json.get_mut("condition") {
            labels.relabel_condition(condition);
        }
        rules_json.push(Value::Object(rule_json));
    }

    let mut hasher = Sha256::new();
    hasher.update(format!("wizctl-fingerprint-v{FINGERPRINT_VERSION}\n").as_bytes());
    hasher.update(canonicalize_json(&serde_json::to_value(&wizard.settings)?).as_bytes());
    hasher.update(b"\n");
    hasher.update(canonicalize_json(&Value::Array(steps)).as_bytes());
    hasher.update(b"\n");
    hasher.update(canonicalize_json(&Value::Array(rules_json)).as_bytes());
    hasher.update(b"\n");

    let digest = hasher.finalize();
    Ok(hex_encode(&digest))
}

/// Short form for display
pub fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

// =============================================================================
// Canonical JSON serialization (deterministic)
// =============================================================================

/// Canonicalize a JSON value: object keys sorted recursively, arrays keep
/// their order, compact format.
fn canonicalize_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical_json(value, &mut out);
    out
}

fn write_canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(num) => out.push_str(&num.to_string()),
        Value::String(s) => {
            if let Ok(escaped) = serde_json::to_string(s) {
                out.push_str(&escaped);
            }
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_json(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if let Ok(escaped_key) = serde_json::to_string(*key) {
                    out.push_str(&escaped_key);
                }
                out.push(':');
                write_canonical_json(&map[*key], out);
            }
            out.push('}');
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wizard() -> Wizard {
        serde_json::from_value(json!({
            "name": "Trip planner",
            "steps": [{
                "name": "Where",
                "step_order": 1,
                "option_sets": [{
                    "name": "Region",
                    "selection_type": "single_select",
                    "options": [
                        { "label": "Europe", "value": "eu" },
                        { "label": "Asia", "value": "asia" }
                    ]
                }]
            }]
        }))
        .expect("test wizard should parse")
    }

    #[test]
    fn test_canonicalize_sorts_keys() {
        let json: Value =
            serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).expect("test JSON should parse");
        assert_eq!(canonicalize_json(&json), r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_fingerprint_ignores_identity() {
        let a = wizard();
        let mut b = a.clone();
        b.id = Uuid::new_v4();
        b.name = "Renamed".to_string();
        b.steps[0].id = Uuid::new_v4();
        b.steps[0].option_sets[0].options[1].id = Uuid::new_v4();

        assert_eq!(
            structural_fingerprint(&a).expect("fingerprint"),
            structural_fingerprint(&b).expect("fingerprint")
        );
    }

    #[test]
    fn test_fingerprint_detects_structure_change() {
        let a = wizard();
        let mut b = a.clone();
        b.steps[0].option_sets[0].options.pop();

        assert_ne!(
            structural_fingerprint(&a).expect("fingerprint"),
            structural_fingerprint(&b).expect("fingerprint")
        );
    }
}
