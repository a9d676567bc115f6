//! Vivify and stringify values of each value type.
//!
//! To vivify is to turn a raw value (often a string, as it arrives from a
//! form) into a live typed value: `"2014-01-21T16:34:02"` becomes a
//! timestamp. Vivify functions also accept their typed form, so a JSON
//! number is a fine numeric value. To stringify is the inverse, producing a
//! canonical string such as the JSON text of a collection.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::error::{WinnowError, WinnowResult};
use crate::fragment::Param;
use crate::operators::ValueType;
use crate::parser::parse_datetime;
use crate::relative_dates::RelativeDate;

/// A vivified value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Ids of the chosen elements
    Collection(Vec<ChoiceId>),
    /// An object with at least `id` and `name`
    Choice(Map<String, Json>),
    RelativeDate(RelativeDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Truthiness, as used by the nullable and bool builders.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// The id of a chosen element, kept with its JSON type so it binds against
/// text and integer columns alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ChoiceId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChoiceId::Int(n) => write!(f, "{}", n),
            ChoiceId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ChoiceId {
    fn from(v: &str) -> Self {
        ChoiceId::Text(v.to_string())
    }
}

impl From<i64> for ChoiceId {
    fn from(v: i64) -> Self {
        ChoiceId::Int(v)
    }
}

impl From<&ChoiceId> for Param {
    fn from(id: &ChoiceId) -> Self {
        match id {
            ChoiceId::Int(n) => Param::Int(*n),
            ChoiceId::Text(s) => Param::Text(s.clone()),
        }
    }
}

/// Vivify `raw` as `value_type`. `string_length` and `nullable` values are
/// numbers and booleans respectively.
pub fn vivify(value_type: ValueType, raw: &Json) -> WinnowResult<Value> {
    match value_type {
        ValueType::String => vivify_string(raw),
        ValueType::Collection => vivify_collection(raw),
        ValueType::Numeric | ValueType::StringLength => vivify_numeric(raw),
        ValueType::RelativeDate => vivify_relative_date(raw),
        ValueType::AbsoluteDate => vivify_absolute_date(raw),
        ValueType::Bool => vivify_bool(raw),
        ValueType::Nullable => vivify_nullable(raw),
        ValueType::SingleChoice => vivify_single_choice(raw),
    }
}

/// Canonical string for a vivified value.
pub fn stringify(value_type: ValueType, value: &Value) -> WinnowResult<String> {
    let mismatch = || WinnowError::invalid(value_type, format!("cannot stringify {:?}", value));

    match (value_type, value) {
        (ValueType::String, Value::Text(s)) => Ok(s.clone()),
        (ValueType::Collection, Value::Collection(ids)) => Ok(serde_json::to_string(ids)?),
        (ValueType::Numeric | ValueType::StringLength, Value::Int(n)) => Ok(n.to_string()),
        (ValueType::Numeric | ValueType::StringLength, Value::Float(n)) => Ok(format!("{:.10}", n)),
        (ValueType::RelativeDate, Value::RelativeDate(token)) => Ok(token.as_str().to_string()),
        (ValueType::AbsoluteDate, Value::Timestamp(ts)) => {
            Ok(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        (ValueType::Bool | ValueType::Nullable, Value::Bool(b)) => Ok(b.to_string()),
        (ValueType::SingleChoice, Value::Choice(choice)) => Ok(serde_json::to_string(choice)?),
        _ => Err(mismatch()),
    }
}

/// Vivify then stringify a raw value.
pub fn stringify_raw(value_type: ValueType, raw: &Json) -> WinnowResult<String> {
    stringify(value_type, &vivify(value_type, raw)?)
}

pub fn vivify_string(raw: &Json) -> WinnowResult<Value> {
    match raw {
        Json::String(s) => Ok(Value::Text(s.clone())),
        Json::Number(n) => Ok(Value::Text(n.to_string())),
        Json::Bool(b) => Ok(Value::Text(b.to_string())),
        other => Err(WinnowError::invalid(
            ValueType::String,
            format!("expected text, received {}", other),
        )),
    }
}

pub fn vivify_collection(raw: &Json) -> WinnowResult<Value> {
    let invalid = |message: &str| WinnowError::invalid(ValueType::Collection, message);

    let items = match raw {
        Json::Array(items) => items.clone(),
        Json::String(text) => match serde_json::from_str::<Json>(text) {
            Ok(Json::Array(items)) => items,
            Ok(_) => return Err(invalid("collection values must be lists")),
            Err(e) => return Err(invalid(&e.to_string())),
        },
        _ => return Err(invalid("collection values must be lists")),
    };

    let ids = items
        .iter()
        .map(|item| match item {
            Json::String(s) => Ok(ChoiceId::Text(s.clone())),
            Json::Object(choice) => match choice.get("id") {
                Some(Json::String(id)) => Ok(ChoiceId::Text(id.clone())),
                Some(Json::Number(id)) => id
                    .as_i64()
                    .map(ChoiceId::Int)
                    .ok_or_else(|| invalid("numeric choice ids must be integers")),
                _ => Err(invalid("choices in a collection must have an 'id'")),
            },
            _ => Err(invalid(
                "elements of collection must be choices (or strings, for backwards compat)",
            )),
        })
        .collect::<WinnowResult<Vec<_>>>()?;

    Ok(Value::Collection(ids))
}

pub fn vivify_single_choice(raw: &Json) -> WinnowResult<Value> {
    let invalid = |message: String| WinnowError::invalid(ValueType::SingleChoice, message);

    let choice = match raw {
        Json::Object(choice) => choice.clone(),
        Json::String(text) => match serde_json::from_str::<Json>(text) {
            Ok(Json::Object(choice)) => choice,
            Ok(_) => return Err(invalid("single choice values must be an object".into())),
            Err(e) => return Err(invalid(e.to_string())),
        },
        _ => return Err(invalid("single choice values must be an object".into())),
    };

    if !(choice.contains_key("id") && choice.contains_key("name")) {
        return Err(invalid("Choice must have keys for 'name' and 'id'".into()));
    }
    Ok(Value::Choice(choice))
}

pub fn vivify_numeric(raw: &Json) -> WinnowResult<Value> {
    let invalid = |message: String| WinnowError::invalid(ValueType::Numeric, message);

    match raw {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else {
                n.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| invalid(format!("number out of range: {}", n)))
            }
        }
        Json::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(Value::Int(0));
            }
            // integers first, they are the stricter parse
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Value::Int(i));
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                Ok(_) => Err(invalid(format!("not a finite number: '{}'", s))),
                Err(e) => Err(invalid(format!("could not convert '{}' to a number: {}", s, e))),
            }
        }
        other => Err(invalid(format!("expected a number, received {}", other))),
    }
}

pub fn vivify_relative_date(raw: &Json) -> WinnowResult<Value> {
    let token = raw.as_str().and_then(RelativeDate::parse);
    token.map(Value::RelativeDate).ok_or_else(|| {
        WinnowError::invalid(
            ValueType::RelativeDate,
            format!("Invalid relative date value: {}", raw),
        )
    })
}

pub fn vivify_absolute_date(raw: &Json) -> WinnowResult<Value> {
    let ts = raw.as_str().and_then(parse_datetime);
    ts.map(Value::Timestamp).ok_or_else(|| {
        WinnowError::invalid(
            ValueType::AbsoluteDate,
            format!("invalid literal for date range: {}", raw),
        )
    })
}

pub fn vivify_bool(raw: &Json) -> WinnowResult<Value> {
    truthiness(ValueType::Bool, raw)
}

/// `true` means the field is set.
pub fn vivify_nullable(raw: &Json) -> WinnowResult<Value> {
    truthiness(ValueType::Nullable, raw)
}

fn truthiness(value_type: ValueType, raw: &Json) -> WinnowResult<Value> {
    match raw {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Json::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        other => Err(WinnowError::invalid(
            value_type,
            format!("expected boolean or string. received {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn is_invalid(result: WinnowResult<Value>) -> bool {
        matches!(result, Err(WinnowError::InvalidValue { .. }))
    }

    #[test]
    fn test_vivify_numeric() {
        assert_eq!(vivify_numeric(&json!("")).unwrap(), Value::Int(0));
        assert_eq!(vivify_numeric(&json!("3.5")).unwrap(), Value::Float(3.5));
        assert_eq!(vivify_numeric(&json!("2")).unwrap(), Value::Int(2));
        assert_eq!(vivify_numeric(&json!(" 12 ")).unwrap(), Value::Int(12));
        assert_eq!(vivify_numeric(&json!(7)).unwrap(), Value::Int(7));
        assert_eq!(vivify_numeric(&json!(0.25)).unwrap(), Value::Float(0.25));
        assert!(is_invalid(vivify_numeric(&json!("abc"))));
        assert!(is_invalid(vivify_numeric(&json!("NaN"))));
        assert!(is_invalid(vivify_numeric(&json!(null))));
    }

    #[test]
    fn test_vivify_bool() {
        assert_eq!(vivify_bool(&json!("TRUE")).unwrap(), Value::Bool(true));
        assert_eq!(vivify_bool(&json!("false")).unwrap(), Value::Bool(false));
        assert_eq!(vivify_bool(&json!(true)).unwrap(), Value::Bool(true));
        assert!(is_invalid(vivify_bool(&json!("yes"))));
        assert!(is_invalid(vivify_bool(&json!(1))));
    }

    #[test]
    fn test_vivify_nullable_reports_its_type() {
        assert_eq!(vivify_nullable(&json!("true")).unwrap(), Value::Bool(true));
        assert!(matches!(
            vivify(ValueType::Nullable, &json!("maybe")),
            Err(WinnowError::InvalidValue { value_type: ValueType::Nullable, .. })
        ));
    }

    #[test]
    fn test_vivify_string() {
        assert_eq!(vivify_string(&json!("mint")).unwrap(), Value::Text("mint".into()));
        assert_eq!(vivify_string(&json!(42)).unwrap(), Value::Text("42".into()));
        assert!(is_invalid(vivify_string(&json!(["mint"]))));
    }

    #[test]
    fn test_vivify_collection() {
        assert_eq!(
            vivify_collection(&json!(["Strawberry", "Chocolate"])).unwrap(),
            Value::Collection(vec!["Strawberry".into(), "Chocolate".into()])
        );
        // JSON text and choice objects both work; ids keep their JSON type
        assert_eq!(
            vivify_collection(&json!(r#"[{"id": "s", "name": "Strawberry"}, {"id": 7, "name": "Mint"}]"#)).unwrap(),
            Value::Collection(vec!["s".into(), ChoiceId::Int(7)])
        );
        assert!(is_invalid(vivify_collection(&json!([{"id": 7.5, "name": "Half"}]))));
        assert_eq!(vivify_collection(&json!([])).unwrap(), Value::Collection(vec![]));
        assert!(is_invalid(vivify_collection(&json!("Strawberry"))));
        assert!(is_invalid(vivify_collection(&json!([1, 2]))));
        assert!(is_invalid(vivify_collection(&json!([{"name": "no id"}]))));
    }

    #[test]
    fn test_vivify_single_choice() {
        let choice = vivify_single_choice(&json!(r#"{"id": 3, "name": "Cone"}"#)).unwrap();
        match choice {
            Value::Choice(map) => assert_eq!(map.get("name"), Some(&json!("Cone"))),
            other => panic!("expected a choice, got {:?}", other),
        }
        assert!(is_invalid(vivify_single_choice(&json!({"id": 3}))));
        assert!(is_invalid(vivify_single_choice(&json!([1]))));
    }

    #[test]
    fn test_vivify_dates() {
        assert_eq!(
            vivify_relative_date(&json!("Last 7 Days")).unwrap(),
            Value::RelativeDate(RelativeDate::Last7Days)
        );
        assert!(is_invalid(vivify_relative_date(&json!("last fortnight"))));

        let expected = NaiveDate::from_ymd_opt(2014, 1, 21)
            .unwrap()
            .and_hms_opt(16, 34, 2)
            .unwrap();
        assert_eq!(
            vivify_absolute_date(&json!("2014-01-21T16:34:02")).unwrap(),
            Value::Timestamp(expected)
        );
        assert!(is_invalid(vivify_absolute_date(&json!("someday"))));
        assert!(is_invalid(vivify_absolute_date(&json!(20140121))));
    }

    #[test]
    fn test_vivify_dispatches_on_value_type() {
        assert_eq!(vivify(ValueType::StringLength, &json!("5")).unwrap(), Value::Int(5));
        assert_eq!(vivify(ValueType::Nullable, &json!("true")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(ValueType::Numeric, &Value::Int(2)).unwrap(), "2");
        assert_eq!(stringify(ValueType::Numeric, &Value::Float(3.5)).unwrap(), "3.5000000000");
        assert_eq!(
            stringify(ValueType::Collection, &Value::Collection(vec!["a".into(), ChoiceId::Int(3)])).unwrap(),
            r#"["a",3]"#
        );
        assert_eq!(
            stringify_raw(ValueType::AbsoluteDate, &json!("Jan 21, 2014")).unwrap(),
            "2014-01-21T00:00:00"
        );
        assert_eq!(
            stringify_raw(ValueType::RelativeDate, &json!("Current Month")).unwrap(),
            "current_month"
        );
        assert!(matches!(
            stringify(ValueType::Numeric, &Value::Text("2".into())),
            Err(WinnowError::InvalidValue { .. })
        ));
    }
}
