//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Entity declarations rejected at registration time.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("primary key not found for table `{table}`")]
    MissingPrimaryKey { table: String },
    #[error("duplicate primary key for table `{table}`: `{field}`")]
    DuplicatePrimaryKey { table: String, field: String },
    #[error("duplicate field `{field}` in table `{table}`")]
    DuplicateField { table: String, field: String },
    #[error("field `{field}` of kind {kind} cannot be a primary key")]
    InvalidPrimaryKey { field: String, kind: &'static str },
    #[error("table name must not be empty")]
    EmptyTableName,
}

#[derive(Error, Debug)]
pub enum OrmError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("entity type not registered: {0}")]
    Unregistered(&'static str),
    #[error("unknown field `{field}` on table `{table}`")]
    UnknownField { table: String, field: String },
    #[error("invalid value for `{field}`: expected {expected}")]
    InvalidValue { field: String, expected: &'static str },
    #[error("invalid limit value: {0}")]
    InvalidLimit(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// Domain error raised by handlers, reported to the client as `{error, data, message}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error}: {message}")]
pub struct ApiError {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, data: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            error: error.into(),
            data: data.into(),
            message: message.into(),
        }
    }

    /// Input field is missing or invalid.
    pub fn value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:invalid", field, message)
    }

    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:notfound", field, message)
    }

    pub fn permission() -> Self {
        Self::new("permission:forbidden", "permission", "")
    }

    pub fn payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("error".into(), Value::String(self.error.clone()));
        map.insert("data".into(), Value::String(self.data.clone()));
        map.insert("message".into(), Value::String(self.message.clone()));
        map
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Orm(#[from] OrmError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("template: {0}")]
    Template(#[from] minijinja::Error),
    #[error("serialize: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Orm(OrmError::Db(e))
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = match &self {
            AppError::Api(e) => {
                return (StatusCode::BAD_REQUEST, Json(Value::Object(e.payload()))).into_response();
            }
            AppError::Orm(OrmError::Db(_)) => "database_error",
            AppError::Orm(_) => "orm_error",
            AppError::Config(_) => "config_error",
            AppError::Template(_) => "template_error",
            AppError::Json(_) => "serialization_error",
        };
        tracing::error!(error = %self, "request failed");
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
