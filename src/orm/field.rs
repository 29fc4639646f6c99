//! Field descriptors: column name, SQL type, primary-key flag and default.

use serde_json::Value;
use std::fmt;

/// Zero-argument producer for late-bound defaults (ids, timestamps).
pub type DefaultFactory = fn() -> Value;

#[derive(Clone, Debug)]
pub enum FieldDefault {
    None,
    Value(Value),
    Factory(DefaultFactory),
}

impl FieldDefault {
    /// Produce the default, calling the factory if there is one.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Factory(f) => Some(f()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    Integer,
    Float,
    Text,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
        }
    }

    fn may_be_primary_key(&self) -> bool {
        matches!(self, FieldKind::String | FieldKind::Integer | FieldKind::Float)
    }
}

/// One column of an entity. Immutable once handed to a `SchemaBuilder`.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    kind: FieldKind,
    sql_type: String,
    primary_key: bool,
    default: FieldDefault,
}

impl Field {
    fn new(name: &str, kind: FieldKind, sql_type: &str, default: FieldDefault) -> Self {
        Field {
            name: name.to_string(),
            kind,
            sql_type: sql_type.to_string(),
            primary_key: false,
            default,
        }
    }

    /// `varchar(100)` unless overridden with [`Field::ddl`].
    pub fn string(name: &str) -> Self {
        Self::new(name, FieldKind::String, "varchar(100)", FieldDefault::None)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldKind::Boolean, "boolean", FieldDefault::Value(Value::Bool(false)))
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldKind::Integer, "bigint", FieldDefault::Value(Value::from(0)))
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, FieldKind::Float, "real", FieldDefault::Value(Value::from(0.0)))
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FieldKind::Text, "text", FieldDefault::None)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn ddl(mut self, sql_type: &str) -> Self {
        self.sql_type = sql_type.to_string();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn default_with(mut self, factory: DefaultFactory) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub(crate) fn check_primary_key(&self) -> Result<(), crate::error::SchemaError> {
        if self.primary_key && !self.kind.may_be_primary_key() {
            return Err(crate::error::SchemaError::InvalidPrimaryKey {
                field: self.name.clone(),
                kind: self.kind.as_str(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}:{}>", self.kind.as_str(), self.sql_type, self.name)
    }
}
