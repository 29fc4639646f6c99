//! Convert serde_json::Value to types that sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::mysql::{MySql, MySqlTypeInfo};
use sqlx::{Database, Type};

/// A value that can be bound to a MySQL statement. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum MySqlBindValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    Json(Value),
}

impl MySqlBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => MySqlBindValue::Null,
            Value::Bool(b) => MySqlBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MySqlBindValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    MySqlBindValue::U64(u)
                } else {
                    MySqlBindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => MySqlBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => MySqlBindValue::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, MySql> for MySqlBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <MySql as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            MySqlBindValue::Null => Ok(IsNull::Yes),
            MySqlBindValue::Bool(b) => <bool as Encode<MySql>>::encode_by_ref(b, buf),
            MySqlBindValue::I64(n) => <i64 as Encode<MySql>>::encode_by_ref(n, buf),
            MySqlBindValue::U64(n) => <u64 as Encode<MySql>>::encode_by_ref(n, buf),
            MySqlBindValue::F64(n) => <f64 as Encode<MySql>>::encode_by_ref(n, buf),
            MySqlBindValue::String(s) => <String as Encode<MySql>>::encode_by_ref(s, buf),
            MySqlBindValue::Json(v) => {
                let s = v.to_string();
                <String as Encode<MySql>>::encode_by_ref(&s, buf)
            }
        }
    }

    /// Each variant declares its own wire type so MySQL reads the bytes correctly.
    fn produces(&self) -> Option<MySqlTypeInfo> {
        Some(match self {
            MySqlBindValue::Null | MySqlBindValue::String(_) | MySqlBindValue::Json(_) => {
                <String as Type<MySql>>::type_info()
            }
            MySqlBindValue::Bool(_) => <bool as Type<MySql>>::type_info(),
            MySqlBindValue::I64(_) => <i64 as Type<MySql>>::type_info(),
            MySqlBindValue::U64(_) => <u64 as Type<MySql>>::type_info(),
            MySqlBindValue::F64(_) => <f64 as Type<MySql>>::type_info(),
        })
    }
}

impl Type<MySql> for MySqlBindValue {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<MySql>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_map_to_native_binds() {
        assert_eq!(MySqlBindValue::from_json(&json!(null)), MySqlBindValue::Null);
        assert_eq!(MySqlBindValue::from_json(&json!(true)), MySqlBindValue::Bool(true));
        assert_eq!(MySqlBindValue::from_json(&json!(-3)), MySqlBindValue::I64(-3));
        assert_eq!(MySqlBindValue::from_json(&json!(u64::MAX)), MySqlBindValue::U64(u64::MAX));
        assert_eq!(MySqlBindValue::from_json(&json!(1.5)), MySqlBindValue::F64(1.5));
        assert_eq!(MySqlBindValue::from_json(&json!("x")), MySqlBindValue::String("x".into()));
        assert_eq!(
            MySqlBindValue::from_json(&json!({"a": 1})),
            MySqlBindValue::Json(json!({"a": 1}))
        );
    }
}
