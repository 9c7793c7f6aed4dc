use serde::Serialize;
use serde_json::Value;

use crate::BatchError;

/// A single bindable SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Supplies, for one item, the values of the named statement parameters.
pub trait ItemSqlParameterSource<O> {
    /// Returns one value per name, in the order of `names`.
    fn values(&self, item: &O, names: &[String]) -> Result<Vec<SqlValue>, BatchError>;
}

/// Looks parameters up by property name on the item's serde representation.
///
/// The item must serialize to a map (a struct with named fields). Scalars
/// are supported; nested arrays and objects are rejected.
#[derive(Default, Debug, Clone, Copy)]
pub struct SerdeParameterSource;

impl<O: Serialize> ItemSqlParameterSource<O> for SerdeParameterSource {
    fn values(&self, item: &O, names: &[String]) -> Result<Vec<SqlValue>, BatchError> {
        let properties = match serde_json::to_value(item) {
            Ok(Value::Object(properties)) => properties,
            Ok(other) => {
                return Err(BatchError::ItemWriter(format!(
                    "item has no named properties: {}",
                    other
                )));
            }
            Err(error) => return Err(BatchError::ItemWriter(error.to_string())),
        };

        names
            .iter()
            .map(|name| match properties.get(name) {
                Some(value) => to_sql_value(name, value),
                None => Err(BatchError::ItemWriter(format!(
                    "item has no property named {}",
                    name
                ))),
            })
            .collect()
    }
}

fn to_sql_value(name: &str, value: &Value) -> Result<SqlValue, BatchError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(value) => Ok(SqlValue::Bool(*value)),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(integer), _) => Ok(SqlValue::Integer(integer)),
            (None, Some(real)) => Ok(SqlValue::Real(real)),
            (None, None) => Err(BatchError::ItemWriter(format!(
                "property {} is out of range: {}",
                name, number
            ))),
        },
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Err(BatchError::ItemWriter(format!(
            "property {} is not a scalar value",
            name
        ))),
    }
}
