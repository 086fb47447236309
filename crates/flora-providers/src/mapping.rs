//! Field mapping engine.
//!
//! Stateless primitives shared by every provider adapter: alias chains,
//! list normalization, boolean coercion, unit extraction and kind-directed
//! coercion. [`RecordBuilder`] composes them into a [`SparseRecord`].

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use flora_core::record::integral;
use flora_core::schema::field_named;
use flora_core::{Error, FieldKind, FieldValue, Result, SparseRecord};

/// Delimiter for comma-separated provider lists. Matched exactly.
pub const LIST_DELIMITER: &str = ", ";

/// Key carrying the original free text in unit-extracted objects.
pub const TEXT_VALUE_KEY: &str = "text_value";

/// A number, an optional range tail, then a unit word: `10-15m`, `2.5 cm`.
static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(?:\s*-\s*\d+(?:\.\d+)?)?\s*([A-Za-z_]+)")
        .expect("quantity pattern is valid")
});

// =============================================================================
// ALIAS CHAINS
// =============================================================================

/// First present, non-null member of `source` among `keys`, in order.
pub fn first_present<'a>(source: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| source.get(key))
        .find(|value| !value.is_null())
}

/// First key of `table` present among `keys`, in order.
pub fn first_present_in<'a>(table: &'a BTreeMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| table.get(*key))
        .map(String::as_str)
}

/// Follow `path` through nested objects. Null leaves count as absent.
pub fn nested<'a>(source: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(source, |node, key| node.get(key))
        .filter(|value| !value.is_null())
}

// =============================================================================
// PRIMITIVES
// =============================================================================

/// Normalize a native list, comma-separated text, or scalar into JSON array text.
///
/// Text is split on `", "` exactly; irregular whitespace is kept.
pub fn normalize_list(value: &Value) -> Option<String> {
    let items = match value {
        Value::Null => return None,
        Value::Array(_) => return Some(value.to_string()),
        Value::String(text) => text
            .split(LIST_DELIMITER)
            .map(|item| Value::String(item.to_string()))
            .collect(),
        scalar => vec![scalar.clone()],
    };
    Some(Value::Array(items).to_string())
}

/// Native booleans keep their truth; text is true only when it equals
/// `"true"` ignoring case; anything else present is false.
pub fn coerce_bool(value: &Value) -> FieldValue {
    let on = match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    FieldValue::flag(on)
}

/// Spelled-out words accepted for each unit symbol.
const UNIT_WORDS: &[(&str, &[&str])] = &[
    ("m", &["meter", "meters", "metre", "metres"]),
    ("cm", &["centimeter", "centimeters", "centimetre", "centimetres"]),
];

/// Whether `word` names `unit`, by symbol or spelled out, ignoring case.
pub fn unit_matches(word: &str, unit: &str) -> bool {
    word.eq_ignore_ascii_case(unit)
        || UNIT_WORDS
            .iter()
            .filter(|(symbol, _)| symbol.eq_ignore_ascii_case(unit))
            .flat_map(|(_, words)| words.iter())
            .any(|w| w.eq_ignore_ascii_case(word))
}

/// First quantity in `text` whose unit word names `unit`.
pub fn estimate_from_text(text: &str, unit: &str) -> Option<f64> {
    QUANTITY
        .captures_iter(text)
        .find(|caps| unit_matches(&caps[2], unit))
        .and_then(|caps| caps[1].parse().ok())
}

/// Unit extraction into a JSON object payload.
///
/// `{"cm": 120}` yields `{"cm":120}` unchanged in meaning; free text yields
/// the original under `text_value` plus `<unit>_estimate` when a quantity in
/// `unit` could be parsed. An object without `unit` stays absent.
pub fn extract_unit(value: &Value, unit: &str) -> Option<FieldValue> {
    let payload = match value {
        Value::Null => return Some(FieldValue::Null),
        Value::Object(map) => {
            let amount = map.get(unit).filter(|v| !v.is_null())?;
            json!({ unit: amount })
        }
        Value::Number(_) => json!({ unit: value }),
        Value::String(text) => {
            let mut object = Map::new();
            object.insert(TEXT_VALUE_KEY.to_string(), Value::String(text.clone()));
            if let Some(estimate) = estimate_from_text(text, unit) {
                object.insert(format!("{}_estimate", unit), json!(estimate));
            }
            Value::Object(object)
        }
        _ => return None,
    };
    Some(FieldValue::Text(payload.to_string()))
}

/// Convert a provider value into a value of `kind`.
///
/// `None` means the value cannot be represented in that kind and the field
/// should stay absent. JSON null is an explicit empty and maps to `Null`.
pub fn coerce(kind: FieldKind, value: &Value) -> Option<FieldValue> {
    if value.is_null() {
        return Some(FieldValue::Null);
    }
    match kind {
        FieldKind::Int => match value {
            Value::Number(n) => n.as_i64().map(FieldValue::Int).or_else(|| {
                n.as_f64().and_then(integral).map(FieldValue::Int)
            }),
            Value::String(s) => s.trim().parse().ok().map(FieldValue::Int),
            _ => None,
        },
        FieldKind::Float => match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Float),
            Value::String(s) => s.trim().parse().ok().map(FieldValue::Float),
            _ => None,
        },
        FieldKind::Boolean => Some(coerce_bool(value)),
        FieldKind::Text => Some(FieldValue::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        FieldKind::JsonArray => normalize_list(value).map(FieldValue::Text),
        FieldKind::JsonObject => match value {
            Value::Object(_) | Value::Array(_) => Some(FieldValue::Text(value.to_string())),
            Value::String(text) => {
                Some(FieldValue::Text(json!({ TEXT_VALUE_KEY: text }).to_string()))
            }
            _ => None,
        },
    }
}

// =============================================================================
// RECORD BUILDER
// =============================================================================

/// Accumulates coerced values for one provider record.
///
/// Every setter takes an optional source value: `None` leaves the field
/// absent. Field names are checked against the registry and an unknown
/// name is returned as [`Error::UnknownField`].
#[derive(Debug, Default)]
pub struct RecordBuilder {
    record: SparseRecord,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` from `value`, coerced to the field's registry kind.
    pub fn value(&mut self, field: &str, value: Option<&Value>) -> Result<&mut Self> {
        let kind = field_named(field)
            .ok_or_else(|| Error::UnknownField(field.to_string()))?
            .kind;
        let Some(value) = value else {
            return Ok(self);
        };
        match coerce(kind, value) {
            Some(coerced) => self.record.insert(field, coerced)?,
            None => debug!(
                subsystem = "providers",
                component = "mapping",
                field = field,
                kind = %kind,
                raw = %value,
                "Value cannot be represented, field left absent"
            ),
        }
        Ok(self)
    }

    /// Set `field` from a lookup-table string.
    pub fn text(&mut self, field: &str, value: Option<&str>) -> Result<&mut Self> {
        let value = value.map(|s| Value::String(s.to_string()));
        self.value(field, value.as_ref())
    }

    /// Set a JSON object `field` through unit extraction on `unit`.
    pub fn unit(&mut self, field: &str, value: Option<&Value>, unit: &str) -> Result<&mut Self> {
        if !is_json_object(field) {
            return Err(Error::Mapping(format!(
                "unit extraction targets non-object field '{}'",
                field
            )));
        }
        if let Some(extracted) = value.and_then(|v| extract_unit(v, unit)) {
            self.record.insert(field, extracted)?;
        }
        Ok(self)
    }

    pub fn build(self) -> SparseRecord {
        self.record
    }
}

fn is_json_object(field: &str) -> bool {
    field_named(field).is_some_and(|f| f.kind == FieldKind::JsonObject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_chain_prefers_first_candidate() {
        let source = json!({"A": "first", "B": "second"});
        assert_eq!(first_present(&source, &["A", "B"]), Some(&json!("first")));
    }

    #[test]
    fn test_alias_chain_skips_null_and_missing() {
        let source = json!({"A": null, "C": 3});
        assert_eq!(first_present(&source, &["A", "B", "C"]), Some(&json!(3)));
        assert_eq!(first_present(&source, &["X", "Y"]), None);
    }

    #[test]
    fn test_alias_chain_over_lookup_table() {
        let table: BTreeMap<String, String> = [("Habit", "Shrub"), ("Growth habit", "Bush")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            first_present_in(&table, &["Growth habit", "Habit"]),
            Some("Bush")
        );
        assert_eq!(first_present_in(&table, &["Layer"]), None);
    }

    #[test]
    fn test_nested_path() {
        let source = json!({"family": {"name": "Rosaceae"}, "genus": null});
        assert_eq!(nested(&source, &["family", "name"]), Some(&json!("Rosaceae")));
        assert_eq!(nested(&source, &["genus", "name"]), None);
        assert_eq!(nested(&source, &["genus"]), None);
    }

    #[test]
    fn test_list_from_native_list_and_comma_text_agree() {
        let native = normalize_list(&json!(["red", "white"])).unwrap();
        let text = normalize_list(&json!("red, white")).unwrap();
        assert_eq!(native, text);
        let parsed: Vec<String> = serde_json::from_str(&native).unwrap();
        assert_eq!(parsed, vec!["red", "white"]);
    }

    #[test]
    fn test_list_split_is_exact_on_delimiter() {
        let text = normalize_list(&json!("red,white,  blue")).unwrap();
        assert_eq!(text, r#"["red,white"," blue"]"#);
        let text = normalize_list(&json!("red,white")).unwrap();
        assert_eq!(text, r#"["red,white"]"#);
    }

    #[test]
    fn test_list_from_scalar() {
        assert_eq!(normalize_list(&json!(7)).unwrap(), "[7]");
        assert_eq!(normalize_list(&Value::Null), None);
    }

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(coerce_bool(&json!("TRUE")), FieldValue::Int(1));
        assert_eq!(coerce_bool(&json!("false")), FieldValue::Int(0));
        assert_eq!(coerce_bool(&json!(true)), FieldValue::Int(1));
        assert_eq!(coerce_bool(&json!("yes")), FieldValue::Int(0));
    }

    #[test]
    fn test_absent_boolean_stays_absent() {
        let mut builder = RecordBuilder::new();
        builder.value("edible", None).unwrap();
        assert!(!builder.build().contains("edible"));
    }

    #[test]
    fn test_unit_extraction_from_free_text() {
        let value = extract_unit(&json!("10-15m"), "m").unwrap();
        let parsed: Value = serde_json::from_str(value.as_str().unwrap()).unwrap();
        assert_eq!(parsed["text_value"], json!("10-15m"));
        assert_eq!(parsed["m_estimate"], json!(10.0));
    }

    #[test]
    fn test_unit_extraction_from_structured_object() {
        let value = extract_unit(&json!({"cm": 120, "ft": 3.9}), "cm").unwrap();
        let parsed: Value = serde_json::from_str(value.as_str().unwrap()).unwrap();
        assert_eq!(parsed, json!({"cm": 120}));
    }

    #[test]
    fn test_unit_extraction_without_quantity_keeps_text_only() {
        let value = extract_unit(&json!("tall"), "m").unwrap();
        let parsed: Value = serde_json::from_str(value.as_str().unwrap()).unwrap();
        assert_eq!(parsed, json!({"text_value": "tall"}));
    }

    #[test]
    fn test_unit_extraction_ignores_other_units() {
        assert_eq!(estimate_from_text("30cm to 2m", "m"), Some(2.0));
        assert_eq!(estimate_from_text("2.5 M", "m"), Some(2.5));
        assert_eq!(estimate_from_text("about 40 cm", "m"), None);
        assert_eq!(estimate_from_text("5 mm", "m"), None);
    }

    #[test]
    fn test_unit_extraction_accepts_spelled_out_units() {
        assert_eq!(estimate_from_text("10 meters", "m"), Some(10.0));
        assert_eq!(estimate_from_text("1.5 Metres tall", "m"), Some(1.5));
        assert_eq!(estimate_from_text("2-3 m tall", "m"), Some(2.0));
        assert_eq!(estimate_from_text("10-15m", "m"), Some(10.0));
        assert_eq!(estimate_from_text("80 centimeters", "cm"), Some(80.0));
        assert_eq!(estimate_from_text("4 millimeters", "m"), None);
    }

    #[test]
    fn test_object_missing_unit_is_absent() {
        assert_eq!(extract_unit(&json!({"in": 4}), "cm"), None);
        assert_eq!(extract_unit(&json!({"cm": null}), "cm"), None);
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce(FieldKind::Int, &json!(7)), Some(FieldValue::Int(7)));
        assert_eq!(coerce(FieldKind::Int, &json!(7.0)), Some(FieldValue::Int(7)));
        assert_eq!(coerce(FieldKind::Int, &json!(" 8 ")), Some(FieldValue::Int(8)));
        assert_eq!(coerce(FieldKind::Int, &json!("Full sun")), None);
        assert_eq!(coerce(FieldKind::Int, &json!(7.5)), None);
        assert_eq!(coerce(FieldKind::Int, &json!(1e20)), None);
        assert_eq!(coerce(FieldKind::Int, &Value::Null), Some(FieldValue::Null));
    }

    #[test]
    fn test_coerce_float_and_text() {
        assert_eq!(
            coerce(FieldKind::Float, &json!("6.5")),
            Some(FieldValue::Float(6.5))
        );
        assert_eq!(
            coerce(FieldKind::Text, &json!(1753)),
            Some(FieldValue::Text("1753".into()))
        );
    }

    #[test]
    fn test_coerce_json_object_from_text() {
        let value = coerce(FieldKind::JsonObject, &json!("Europe")).unwrap();
        assert_eq!(value.as_str(), Some(r#"{"text_value":"Europe"}"#));
    }

    #[test]
    fn test_builder_rejects_unknown_field() {
        let mut builder = RecordBuilder::new();
        let err = builder.value("updated_at", Some(&json!("x"))).unwrap_err();
        assert!(matches!(err, Error::UnknownField(_)));
    }

    #[test]
    fn test_builder_unit_requires_object_field() {
        let mut builder = RecordBuilder::new();
        let err = builder
            .unit("common_name", Some(&json!({"cm": 1})), "cm")
            .unwrap_err();
        assert!(matches!(err, Error::Mapping(_)));
    }
}
