//! Flow rule conditions.
//!
//! Conditions are stored as JSON on the flow rule and evaluated by the client
//! player. Before a rule is accepted its condition must parse as
//!
//! ```text
//! Condition := {}                                  (always)
//!            | {"all": [Condition, ...]}
//!            | {"any": [Condition, ...]}
//!            | {"not": Condition}
//!            | {"option_set_id": UUID, "operator": Operator, "value"?: JSON}
//! ```
//!
//! and every comparison must make sense for the selection type of the option
//! set it refers to.

use crate::model::{OptionSet, SelectionType, Wizard};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    GreaterThan,
    LessThan,
    IsAnswered,
    IsEmpty,
}

impl Operator {
    fn is_presence(&self) -> bool {
        matches!(self, Self::IsAnswered | Self::IsEmpty)
    }

    fn is_membership(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    fn is_order(&self) -> bool {
        matches!(self, Self::GreaterThan | Self::LessThan)
    }
}

/// One comparison against the answer of an option set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub option_set_id: Uuid,
    pub operator: Operator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
    Not { not: Box<Condition> },
    Compare(Comparison),
    Always {},
}

impl Condition {
    /// Parse the stored JSON form, reporting the first problem with its path.
    pub fn parse(value: &Value) -> Result<Self, String> {
        parse_at(value, "$")
    }

    /// Parse and check every comparison against the wizard's option sets.
    pub fn parse_for(value: &Value, wizard: &Wizard) -> Result<Self, String> {
        let condition = Self::parse(value)?;
        condition.check(wizard, "$")?;
        Ok(condition)
    }

    /// Every option set this condition refers to
    pub fn option_set_ids(&self) -> Vec<Uuid> {
        let mut ids = vec![];
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, out: &mut Vec<Uuid>) {
        match self {
            Self::All { all: items } | Self::Any { any: items } => {
                items.iter().for_each(|c| c.collect_ids(out))
            }
            Self::Not { not } => not.collect_ids(out),
            Self::Compare(cmp) => out.push(cmp.option_set_id),
            Self::Always {} => {}
        }
    }

    fn check(&self, wizard: &Wizard, path: &str) -> Result<(), String> {
        match self {
            Self::All { all: items } => check_each(items, wizard, path, "all"),
            Self::Any { any: items } => check_each(items, wizard, path, "any"),
            Self::Not { not } => not.check(wizard, &format!("{path}.not")),
            Self::Compare(cmp) => {
                let set = wizard.option_set(cmp.option_set_id).ok_or_else(|| {
                    format!(
                        "at {path}: option set {} does not belong to wizard {}",
                        cmp.option_set_id, wizard.id
                    )
                })?;
                check_comparison(cmp, set).map_err(|e| format!("at {path}: {e}"))
            }
            Self::Always {} => Ok(()),
        }
    }
}

fn check_each(items: &[Condition], wizard: &Wizard, path: &str, key: &str) -> Result<(), String> {
    for (i, item) in items.iter().enumerate() {
        item.check(wizard, &format!("{path}.{key}[{i}]"))?;
    }
    Ok(())
}

fn parse_at(value: &Value, path: &str) -> Result<Condition, String> {
    let Value::Object(map) = value else {
        return Err(format!("at {path}: condition must be a JSON object"));
    };
    if map.is_empty() {
        return Ok(Condition::Always {});
    }

    let only = |key: &str| -> Result<(), String> {
        match map.keys().find(|k| k.as_str() != key) {
            Some(extra) => Err(format!("at {path}: unexpected key '{extra}' next to '{key}'")),
            None => Ok(()),
        }
    };

    if let Some(items) = map.get("all") {
        only("all")?;
        return Ok(Condition::All {
            all: parse_list(items, &format!("{path}.all"))?,
        });
    }
    if let Some(items) = map.get("any") {
        only("any")?;
        return Ok(Condition::Any {
            any: parse_list(items, &format!("{path}.any"))?,
        });
    }
    if let Some(inner) = map.get("not") {
        only("not")?;
        return Ok(Condition::Not {
            not: Box::new(parse_at(inner, &format!("{path}.not"))?),
        });
    }

    if let Some(extra) = map
        .keys()
        .find(|k| !matches!(k.as_str(), "option_set_id" | "operator" | "value"))
    {
        return Err(format!("at {path}: unknown key '{extra}'"));
    }
    let option_set_id = map
        .get("option_set_id")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("at {path}: missing 'option_set_id'"))?;
    let option_set_id = Uuid::parse_str(option_set_id)
        .map_err(|_| format!("at {path}: '{option_set_id}' is not a valid UUID"))?;
    let operator = map
        .get("operator")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("at {path}: missing 'operator'"))?;
    let operator = Operator::from_str(operator)
        .map_err(|_| format!("at {path}: unknown operator '{operator}'"))?;
    let value = match map.get("value") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.clone()),
    };

    Ok(Condition::Compare(Comparison {
        option_set_id,
        operator,
        value,
    }))
}

fn parse_list(value: &Value, path: &str) -> Result<Vec<Condition>, String> {
    let Value::Array(items) = value else {
        return Err(format!("at {path}: expected an array of conditions"));
    };
    if items.is_empty() {
        return Err(format!("at {path}: needs at least one condition"));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_at(item, &format!("{path}[{i}]")))
        .collect()
}

// =============================================================================
// Per selection type checks
// =============================================================================

fn check_comparison(cmp: &Comparison, set: &OptionSet) -> Result<(), String> {
    let kind = set.selection_type;
    let op = cmp.operator;

    if op.is_presence() {
        return match &cmp.value {
            None => Ok(()),
            Some(_) => Err(format!("operator '{}' takes no value", op.as_ref())),
        };
    }

    let allowed = match kind {
        SelectionType::FileUpload => false,
        SelectionType::SingleSelect => !op.is_order() && op != Operator::Contains,
        SelectionType::MultipleSelect => !op.is_order(),
        SelectionType::ColorPicker => !op.is_order() && op != Operator::Contains,
        k if k.is_numeric() || k.is_temporal() => op != Operator::Contains,
        _ => !op.is_order(),
    };
    if !allowed {
        return Err(format!(
            "operator '{}' is not supported for {} option set '{}'",
            op.as_ref(),
            kind.as_ref(),
            set.name
        ));
    }

    let value = cmp
        .value
        .as_ref()
        .ok_or_else(|| format!("operator '{}' requires a value", op.as_ref()))?;

    if op.is_membership() {
        let Value::Array(items) = value else {
            return Err(format!("operator '{}' takes an array value", op.as_ref()));
        };
        if items.is_empty() {
            return Err(format!("operator '{}' needs at least one value", op.as_ref()));
        }
        return items.iter().try_for_each(|item| check_scalar(item, set));
    }
    check_scalar(value, set)
}

fn check_scalar(value: &Value, set: &OptionSet) -> Result<(), String> {
    let kind = set.selection_type;
    if kind.is_choice() {
        let declared: Vec<&str> = set.options.iter().map(|o| o.value.as_str()).collect();
        let s = value
            .as_str()
            .ok_or_else(|| format!("{} expects an option value string", kind.as_ref()))?;
        if !declared.contains(&s) {
            return Err(format!(
                "'{s}' is not a declared value of option set '{}' (expected one of: {})",
                set.name,
                declared.join(", ")
            ));
        }
        return Ok(());
    }

    if kind.is_numeric() {
        let n = value
            .as_f64()
            .ok_or_else(|| format!("{} expects a number", kind.as_ref()))?;
        if set.min_value.is_some_and(|min| n < min) || set.max_value.is_some_and(|max| n > max) {
            return Err(format!(
                "{n} is outside the range of option set '{}' ({}..{})",
                set.name,
                set.min_value.map(|v| v.to_string()).unwrap_or_default(),
                set.max_value.map(|v| v.to_string()).unwrap_or_default()
            ));
        }
        return Ok(());
    }

    let s = value
        .as_str()
        .ok_or_else(|| format!("{} expects a string", kind.as_ref()))?;
    let ok = match kind {
        SelectionType::DateInput => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        SelectionType::TimeInput => {
            NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
                || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
        }
        SelectionType::DatetimeInput => {
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
        }
        SelectionType::ColorPicker => is_hex_color(s),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("'{s}' is not a valid {} value", kind.as_ref()))
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s.chars().skip(1).all(|c| c.is_ascii_hexdigit())
}

/// Rewrite every `option_set_id` in a stored condition through `map`.
///
/// Returns the first id with no mapping. Values that are not UUIDs are left
/// untouched.
pub fn remap_option_sets(value: &mut Value, map: &HashMap<Uuid, Uuid>) -> Result<(), Uuid> {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj.iter_mut() {
                if key == "option_set_id" {
                    let Some(old) = child.as_str().and_then(|s| Uuid::parse_str(s).ok()) else {
                        tracing::warn!(value = %child, "condition references a non-UUID option set");
                        continue;
                    };
                    let new = map.get(&old).ok_or(old)?;
                    *child = Value::String(new.to_string());
                } else {
                    remap_option_sets(child, map)?;
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter_mut().try_for_each(|v| remap_option_sets(v, map)),
        _ => Ok(()),
    }
}
