use serde_json::{Map, Number};

use crate::bencoding::value::Value;

/// Renders strings as text (lossily when not UTF-8), so binary strings such as `pieces` lose
/// information. Meant for display only.
impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(bytes) => {
                serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            Value::Integer(integer) => serde_json::Value::Number(Number::from(*integer)),
            Value::List(values) => {
                serde_json::Value::Array(values.iter().map(serde_json::Value::from).collect())
            }
            Value::Dictionary(entries) => {
                let mut object = Map::new();
                for (key, value) in entries.iter() {
                    object.insert(String::from_utf8_lossy(key).into_owned(), value.into());
                }
                serde_json::Value::Object(object)
            }
        }
    }
}
