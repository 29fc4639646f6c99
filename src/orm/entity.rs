//! The `Entity` trait: a structured record per table with explicit field accessors.

use crate::error::OrmError;
use crate::orm::schema::{EntitySchema, SchemaBuilder};
use crate::store::Row;
use serde::Serialize;
use serde_json::Value;

pub trait Entity: Default + Serialize + Send + Sync + 'static {
    /// Declare the table and its fields. Called once, by `ModelRegistry::register`.
    fn declare() -> SchemaBuilder;

    /// Current value of `field`; `None` when unset.
    fn get(&self, field: &str) -> Option<Value>;

    /// Assign `field`; `Value::Null` unsets it.
    fn set(&mut self, field: &str, value: Value) -> Result<(), OrmError>;

    /// Build a record from a result row, column by column.
    fn from_row(row: Row) -> Result<Self, OrmError> {
        let mut entity = Self::default();
        for (column, value) in row {
            entity.set(&column, value)?;
        }
        Ok(entity)
    }
}

/// Value of `field`, falling back to the declared default when unset.
/// A resolved default is written back so later reads see the same value.
pub fn value_or_default<E: Entity>(
    entity: &mut E,
    schema: &EntitySchema,
    field: &str,
) -> Result<Value, OrmError> {
    if let Some(v) = entity.get(field).filter(|v| !v.is_null()) {
        return Ok(v);
    }
    let Some(value) = schema.field(field)?.default().resolve() else {
        return Ok(Value::Null);
    };
    tracing::debug!(field, value = %value, "using default value");
    entity.set(field, value.clone())?;
    Ok(value)
}

/// Current value of `field` or `Value::Null`, without defaults.
pub fn value_of<E: Entity>(entity: &E, field: &str) -> Value {
    entity.get(field).unwrap_or(Value::Null)
}

/// Conversions used by `Entity::set` implementations. Null always maps to `None`.
pub mod convert {
    use super::*;

    fn invalid(field: &str, expected: &'static str) -> OrmError {
        OrmError::InvalidValue {
            field: field.to_string(),
            expected,
        }
    }

    pub fn string(field: &str, v: Value) -> Result<Option<String>, OrmError> {
        match v {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            _ => Err(invalid(field, "string")),
        }
    }

    /// MySQL reports `boolean` columns as TINYINT, so 0/1 are accepted.
    pub fn boolean(field: &str, v: Value) -> Result<Option<bool>, OrmError> {
        match v {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                _ => Err(invalid(field, "boolean")),
            },
            Value::String(s) => match s.as_str() {
                "0" | "false" => Ok(Some(false)),
                "1" | "true" => Ok(Some(true)),
                _ => Err(invalid(field, "boolean")),
            },
            _ => Err(invalid(field, "boolean")),
        }
    }

    pub fn integer(field: &str, v: Value) -> Result<Option<i64>, OrmError> {
        match v {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_i64().map(Some).ok_or_else(|| invalid(field, "integer")),
            Value::String(s) => s.trim().parse().map(Some).map_err(|_| invalid(field, "integer")),
            _ => Err(invalid(field, "integer")),
        }
    }

    pub fn float(field: &str, v: Value) -> Result<Option<f64>, OrmError> {
        match v {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| invalid(field, "float")),
            Value::String(s) => s.trim().parse().map(Some).map_err(|_| invalid(field, "float")),
            _ => Err(invalid(field, "float")),
        }
    }
}
