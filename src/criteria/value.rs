use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::{schema::AttributeType, SQLParamContainer};

/// A scalar operand of a criteria predicate.
///
/// JSON intake maps numbers to `Int`/`Float` and compound values to `Json`;
/// `Timestamp` is only constructible through the typed API since JSON has no
/// date representation.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Json(Value),
}

impl CriteriaValue {
    pub fn from_json(value: &Value) -> CriteriaValue {
        match value {
            Value::Null => CriteriaValue::Null,
            Value::Bool(b) => CriteriaValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CriteriaValue::Int(i),
                None => CriteriaValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => CriteriaValue::String(s.clone()),
            compound => CriteriaValue::Json(compound.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CriteriaValue::Null)
    }
}

impl From<i64> for CriteriaValue {
    fn from(value: i64) -> Self {
        CriteriaValue::Int(value)
    }
}

impl From<f64> for CriteriaValue {
    fn from(value: f64) -> Self {
        CriteriaValue::Float(value)
    }
}

impl From<bool> for CriteriaValue {
    fn from(value: bool) -> Self {
        CriteriaValue::Bool(value)
    }
}

impl From<&str> for CriteriaValue {
    fn from(value: &str) -> Self {
        CriteriaValue::String(value.to_string())
    }
}

impl From<String> for CriteriaValue {
    fn from(value: String) -> Self {
        CriteriaValue::String(value)
    }
}

impl From<DateTime<Utc>> for CriteriaValue {
    fn from(value: DateTime<Utc>) -> Self {
        CriteriaValue::Timestamp(value)
    }
}

/// Normalize a timestamp to the canonical `YYYY-MM-DD HH:MM:SS` UTC form the
/// supported engines all accept.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Prepare a JSON value for storage: arrays and objects become JSON text,
/// scalars bind as themselves.
pub fn prepare_value(value: &Value) -> SQLParamContainer {
    match value {
        Value::Null => SQLParamContainer::new(None::<String>),
        Value::Bool(b) => SQLParamContainer::new(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SQLParamContainer::new(i),
            None => SQLParamContainer::new(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SQLParamContainer::new(s.clone()),
        compound => SQLParamContainer::new(compound.to_string()),
    }
}

/// Prepare a whole record for an INSERT or UPDATE, in field order.
pub fn prepare_record(record: &Map<String, Value>) -> Vec<(String, SQLParamContainer)> {
    record
        .iter()
        .map(|(name, value)| (name.clone(), prepare_value(value)))
        .collect()
}

/// Cast a raw result value into the shape its declared attribute type
/// promises: integers and floats stored as strings become numbers, `'0'`/`'1'`
/// booleans become booleans, epoch-millisecond timestamps become formatted
/// strings, and JSON-serialized arrays/objects become structures again.
pub fn cast(typ: AttributeType, value: Value) -> Value {
    match (typ, value) {
        (AttributeType::Integer, Value::String(s)) => {
            if s.contains('.') {
                parse_float(s)
            } else {
                match s.parse::<i64>() {
                    Ok(i) => Value::Number(i.into()),
                    Err(_) => Value::String(s),
                }
            }
        }
        (AttributeType::Float | AttributeType::Double | AttributeType::Decimal, Value::String(s)) => {
            parse_float(s)
        }
        (AttributeType::Boolean, Value::String(s)) => match s.as_str() {
            "0" | "false" => Value::Bool(false),
            "1" | "true" => Value::Bool(true),
            _ => Value::String(s),
        },
        (AttributeType::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Value::Bool(false),
            Some(1) => Value::Bool(true),
            _ => Value::Number(n),
        },
        (
            AttributeType::Date | AttributeType::Time | AttributeType::DateTime,
            Value::Number(n),
        ) => match n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
            Some(ts) => Value::String(format_timestamp(&ts)),
            None => Value::Number(n),
        },
        (AttributeType::Json | AttributeType::Array, Value::String(s)) => {
            match serde_json::from_str(&s) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(s),
            }
        }
        (_, value) => value,
    }
}

fn parse_float(s: String) -> Value {
    match s
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        Some(n) => Value::Number(n),
        None => Value::String(s),
    }
}

/// Cast every field of a record, dropping fields that have no declared
/// attribute.
pub fn cast_record(fields: &[(String, AttributeType)], record: &Map<String, Value>) -> Map<String, Value> {
    let mut result = Map::new();
    for (name, typ) in fields {
        if let Some(value) = record.get(name) {
            result.insert(name.clone(), cast(*typ, value.clone()));
        }
    }
    result
}
