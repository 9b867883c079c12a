// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use serde_json::{Map, Number};

use crate::{resolve::resolve, value::Value};

pub use serde_json::Value as JsonValue;

/// Resolves a value and serializes the result as a JSON string.
pub fn stringify(value: &Value) -> Result<String, String> {
    resolve(value)
        .map_err(|err| format!("{}", err))
        .and_then(|value| to_json(&value))
        .and_then(|value| serde_json::to_string(&value).map_err(|err| format!("{}", err)))
        .map_err(|err| format!("JSON serialization failed: {}", err))
}

/// Converts an already-resolved value into JSON. Deferred values are rejected rather than
/// forced.
pub fn to_json(value: &Value) -> Result<JsonValue, String> {
    match value {
        Value::Nil => Ok(JsonValue::Null),
        Value::Boolean(value) => Ok(JsonValue::Bool(*value)),
        Value::Int(value) => Ok(JsonValue::Number(Number::from(*value))),
        Value::Float(number) => match Number::from_f64(*number) {
            Some(number) => Ok(JsonValue::Number(number)),
            None => Err(unserializable(value)),
        },
        Value::String(value) => Ok(JsonValue::String(String::from(&**value))),
        Value::List(items) => items
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        Value::Map(map) => map
            .iter()
            .map(|(key, item)| match key {
                Value::String(key) => to_json(item).map(|item| (String::from(&**key), item)),
                _ => Err(unserializable(value)),
            })
            .collect::<Result<Map<_, _>, _>>()
            .map(JsonValue::Object),
        Value::Function(_) | Value::Deferred(_) => Err(unserializable(value)),
    }
}

fn unserializable(value: &Value) -> String {
    format!("Unable to serialize value: {:?}", value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        env::Env,
        value::{MapValue, Value},
    };

    use super::{stringify, to_json};

    #[test]
    fn serialize_primitives() {
        assert_eq!(to_json(&Value::Nil), Ok(json!(null)));
        assert_eq!(to_json(&Value::Boolean(true)), Ok(json!(true)));
        assert_eq!(to_json(&Value::Int(3)), Ok(json!(3)));
        assert_eq!(to_json(&Value::Float(1.5)), Ok(json!(1.5)));
        assert_eq!(to_json(&Value::from("foo")), Ok(json!("foo")));
        assert!(to_json(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn serialize_containers() {
        let value = Value::Map(MapValue::from_entries(vec![(
            Value::from("items"),
            Value::list(vec![Value::Int(1), Value::Nil]),
        )]));
        assert_eq!(to_json(&value), Ok(json!({ "items": [1, null] })));
        let value = Value::Map(MapValue::from_entries(vec![(Value::Int(1), Value::Nil)]));
        assert!(to_json(&value).is_err());
    }

    #[test]
    fn deferred_values_are_not_forced() {
        let env = Env::new();
        env.write("x", Value::Int(1));
        assert_eq!(
            to_json(&Value::Deferred(env.symbol("x"))),
            Err(String::from("Unable to serialize value: `x"))
        );
        assert_eq!(
            stringify(&Value::Deferred(env.symbol("x") + 1)),
            Ok(String::from("2"))
        );
    }

    #[test]
    fn stringify_reports_resolution_errors() {
        let env = Env::new();
        assert_eq!(
            stringify(&Value::Deferred(env.symbol("missing"))),
            Err(String::from(
                "JSON serialization failed: NameNotBound: name 'missing' is not defined"
            ))
        );
    }
}
