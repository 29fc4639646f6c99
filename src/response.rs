//! Handler return values and their coercion into HTTP responses.

use crate::error::AppError;
use crate::templating::Templates;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Mapping key naming the template to render the mapping with.
pub const TEMPLATE_KEY: &str = "__template__";
/// Prefix turning a string reply into a redirect.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// What a handler returns: a finished response, or a value for the coercion stage.
pub enum Reply {
    Raw(Response),
    Value(ReplyValue),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReplyValue {
    Bytes(Vec<u8>),
    Text(String),
    Map(Map<String, Value>),
    Status(i64),
    StatusMessage(i64, String),
    Other(String),
}

/// Marker carried on a response until the coercion stage renders it.
#[derive(Clone, Debug)]
pub struct Pending(pub ReplyValue);

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Value(ReplyValue::Text(s.into()))
    }

    pub fn redirect(to: &str) -> Self {
        Self::text(format!("{}{}", REDIRECT_PREFIX, to))
    }

    pub fn map(map: Map<String, Value>) -> Self {
        Reply::Value(ReplyValue::Map(map))
    }

    /// Render `template` with `ctx` (an object; other values are ignored).
    pub fn template(template: &str, ctx: Value) -> Self {
        let mut map = match ctx {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        map.insert(TEMPLATE_KEY.into(), Value::String(template.into()));
        Self::map(map)
    }

    /// Objects become JSON; any other serialized shape is sent as its JSON text.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, AppError> {
        Ok(match serde_json::to_value(value)? {
            Value::Object(m) => Self::map(m),
            other => Reply::Value(ReplyValue::Other(other.to_string())),
        })
    }

    pub fn status(code: i64) -> Self {
        Reply::Value(ReplyValue::Status(code))
    }

    pub fn status_message(code: i64, message: impl Into<String>) -> Self {
        Reply::Value(ReplyValue::StatusMessage(code, message.into()))
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Reply::Value(ReplyValue::Bytes(body))
    }
}

impl From<Response> for Reply {
    fn from(r: Response) -> Self {
        Reply::Raw(r)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Raw(r) => r,
            Reply::Value(v) => {
                let mut r = StatusCode::OK.into_response();
                r.extensions_mut().insert(Pending(v));
                r
            }
        }
    }
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(v) => (StatusCode::FOUND, [(header::LOCATION, v)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn valid_status(code: i64) -> Option<StatusCode> {
    if (100..600).contains(&code) {
        StatusCode::from_u16(code as u16).ok()
    } else {
        None
    }
}

fn with_type(body: impl Into<axum::body::Body>, content_type: &'static str) -> Response {
    let mut r = Response::new(body.into());
    r.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    r
}

/// Normalize a reply value into a protocol response.
pub fn coerce(value: ReplyValue, templates: &Templates) -> Response {
    match value {
        ReplyValue::Bytes(b) => with_type(b, "application/octet-stream"),
        ReplyValue::Text(s) => match s.strip_prefix(REDIRECT_PREFIX) {
            Some(to) => found(to),
            None => with_type(s, "text/html;charset=utf-8"),
        },
        ReplyValue::Map(map) => match map.get(TEMPLATE_KEY).and_then(Value::as_str) {
            None => match serde_json::to_vec(&map) {
                Ok(body) => with_type(body, "application/json;charset=utf-8"),
                Err(e) => AppError::Json(e).into_response(),
            },
            Some(name) => match templates.render(name, &map) {
                Ok(html) => with_type(html, "text/html;charset=utf-8"),
                Err(e) => AppError::Template(e).into_response(),
            },
        },
        ReplyValue::Status(code) => match valid_status(code) {
            Some(status) => status.into_response(),
            None => with_type(code.to_string(), "text/plain;charset=utf-8"),
        },
        ReplyValue::StatusMessage(code, message) => match valid_status(code) {
            Some(status) => {
                let mut r = with_type(message, "text/plain;charset=utf-8");
                *r.status_mut() = status;
                r
            }
            None => with_type(format!("({}, {})", code, message), "text/plain;charset=utf-8"),
        },
        ReplyValue::Other(s) => with_type(s, "text/plain;charset=utf-8"),
    }
}
