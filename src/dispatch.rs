//! Per-route request dispatch: binds query, body and path input to a handler's declared
//! parameters, then runs the handler.

use crate::error::{ApiError, AppError};
use crate::middleware::{content_type, parse_form, CurrentUser, ParsedBody};
use crate::models::User;
use crate::response::Reply;
use crate::state::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::{request::Parts, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
struct Param {
    name: String,
    /// `None` marks a required parameter.
    default: Option<Value>,
}

/// What a handler accepts: the request context, an open keyword bag, and named parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signature {
    request: bool,
    var_kw: bool,
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler receives the [`RequestContext`].
    pub fn request(mut self) -> Self {
        self.request = true;
        self
    }

    /// Handler receives every input key, not only the named ones.
    pub fn var_kw(mut self) -> Self {
        self.var_kw = true;
        self
    }

    pub fn required(mut self, name: &str) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            default: Some(default.into()),
        });
        self
    }

    pub fn has_request_arg(&self) -> bool {
        self.request
    }

    pub fn has_var_kw_arg(&self) -> bool {
        self.var_kw
    }

    pub fn has_named_kw_args(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn named_kw_args(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn required_kw_args(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.default.is_none())
            .map(|p| p.name.as_str())
    }

    /// Whether query or body input is parsed for this handler at all.
    fn wants_input(&self) -> bool {
        self.var_kw || self.has_named_kw_args()
    }
}

/// Input rejected before the handler runs; answered with 400.
#[derive(Error, Debug, PartialEq)]
pub enum BindError {
    #[error("Missing Content-Type")]
    MissingContentType,
    #[error("JSON body must be object")]
    JsonNotObject,
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("Unsupported Content-Type: {0}")]
    UnsupportedContentType(String),
    #[error("Invalid body: {0}")]
    Body(String),
    #[error("Missing argument: {0}")]
    MissingArgument(String),
}

impl IntoResponse for BindError {
    fn into_response(self) -> Response {
        tracing::info!(error = %self, "bad request");
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Keyword arguments bound for one call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Map<String, Value>);

impl Args {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Argument as text; numbers and booleans are rendered, null and absent are `None`.
    pub fn str(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Non-blank text argument, trimmed, or `value:invalid` for `name`.
    pub fn non_blank(&self, name: &str, message: &str) -> Result<String, ApiError> {
        self.str(name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::value(name, message))
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Args {
    fn from(m: Map<String, Value>) -> Self {
        Args(m)
    }
}

/// Request data handed to handlers that declare it.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub user: Option<User>,
    /// Body stashed by the parsing stage.
    pub data: Option<Value>,
}

impl RequestContext {
    fn from_parts(parts: &Parts) -> Self {
        RequestContext {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            user: parts
                .extensions
                .get::<CurrentUser>()
                .and_then(|u| u.0.clone()),
            data: parts.extensions.get::<ParsedBody>().map(|b| b.0.clone()),
        }
    }
}

pub struct Call {
    pub args: Args,
    pub request: Option<RequestContext>,
}

impl Call {
    pub fn user(&self) -> Option<&User> {
        self.request.as_ref().and_then(|r| r.user.as_ref())
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, AppError>> + Send>>;
type BoxedHandler = Arc<dyn Fn(AppState, Call) -> HandlerFuture + Send + Sync>;

/// Bind the parsed keyword bag and path parameters to `sig`.
///
/// Without a bag the path parameters are the arguments. With one, keys outside the named
/// parameters are dropped unless the handler takes a keyword bag; path parameters win
/// over same-named keys.
pub fn bind(sig: &Signature, kw: Option<Map<String, Value>>, path: Vec<(String, String)>) -> Result<Args, BindError> {
    let mut kw = match kw {
        None => path.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        Some(mut kw) => {
            if !sig.var_kw && sig.has_named_kw_args() {
                kw.retain(|k, _| sig.params.iter().any(|p| &p.name == k));
            }
            for (k, v) in path {
                if kw.contains_key(&k) {
                    tracing::warn!(name = %k, "duplicate arg name in named arg and kw args");
                }
                kw.insert(k, Value::String(v));
            }
            kw
        }
    };
    for p in &sig.params {
        match &p.default {
            None if !kw.contains_key(&p.name) => return Err(BindError::MissingArgument(p.name.clone())),
            None => {}
            Some(d) => {
                kw.entry(p.name.clone()).or_insert_with(|| d.clone());
            }
        }
    }
    Ok(Args(kw))
}

fn object(v: Value) -> Result<Map<String, Value>, BindError> {
    match v {
        Value::Object(m) => Ok(m),
        _ => Err(BindError::JsonNotObject),
    }
}

/// Adapter between a route and a handler function.
pub struct RequestHandler {
    name: &'static str,
    signature: Signature,
    func: BoxedHandler,
}

impl RequestHandler {
    pub fn new<F, Fut>(signature: Signature, f: F) -> Self
    where
        F: Fn(AppState, Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, AppError>> + Send + 'static,
    {
        RequestHandler {
            name: std::any::type_name::<F>(),
            signature,
            func: Arc::new(move |state: AppState, call: Call| -> HandlerFuture { Box::pin(f(state, call)) }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub async fn call(&self, state: AppState, req: Request) -> Response {
        let call = match self.prepare(&state, req).await {
            Ok(c) => c,
            Err(e) => return e.into_response(),
        };
        tracing::info!(handler = self.name, args = ?call.args, "call with args");
        match (self.func)(state, call).await {
            Ok(reply) => reply.into_response(),
            Err(AppError::Api(e)) => {
                tracing::info!(error = %e, handler = self.name, "api error");
                Reply::map(e.payload()).into_response()
            }
            Err(e) => e.into_response(),
        }
    }

    async fn prepare(&self, state: &AppState, req: Request) -> Result<Call, BindError> {
        let (mut parts, body) = req.into_parts();
        let path = Path::<Vec<(String, String)>>::from_request_parts(&mut parts, state)
            .await
            .map(|p| p.0)
            .unwrap_or_default();
        let kw = if self.signature.wants_input() {
            read_input(&parts, body, state.body_limit).await?
        } else {
            None
        };
        let args = bind(&self.signature, kw, path)?;
        let request = self
            .signature
            .has_request_arg()
            .then(|| RequestContext::from_parts(&parts));
        Ok(Call { args, request })
    }
}

/// Keyword bag from a POST body or a GET query string.
async fn read_input(parts: &Parts, body: Body, limit: usize) -> Result<Option<Map<String, Value>>, BindError> {
    if parts.method == Method::GET {
        return Ok(parts
            .uri
            .query()
            .filter(|q| !q.is_empty())
            .map(|q| parse_form(q.as_bytes())));
    }
    if parts.method != Method::POST {
        return Ok(None);
    }
    let ctype = content_type(&parts.headers).ok_or(BindError::MissingContentType)?;
    if let Some(ParsedBody(v)) = parts.extensions.get::<ParsedBody>() {
        return object(v.clone()).map(Some);
    }
    if ctype.starts_with("application/json") {
        let bytes = to_bytes(body, limit).await.map_err(|e| BindError::Body(e.to_string()))?;
        let v: Value = serde_json::from_slice(&bytes).map_err(|e| BindError::InvalidJson(e.to_string()))?;
        object(v).map(Some)
    } else if ctype.starts_with("application/x-www-form-urlencoded") {
        let bytes = to_bytes(body, limit).await.map_err(|e| BindError::Body(e.to_string()))?;
        Ok(Some(parse_form(&bytes)))
    } else if ctype.starts_with("multipart/form-data") {
        read_multipart(&parts.headers, body).await.map(Some)
    } else {
        Err(BindError::UnsupportedContentType(ctype))
    }
}

/// Text fields of a multipart body; file uploads are skipped.
async fn read_multipart(headers: &HeaderMap, body: Body) -> Result<Map<String, Value>, BindError> {
    let mut req = Request::new(body);
    *req.headers_mut() = headers.clone();
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| BindError::Body(e.body_text()))?;
    let mut map = Map::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| BindError::Body(e.body_text()))? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            continue;
        }
        let text = field.text().await.map_err(|e| BindError::Body(e.body_text()))?;
        map.entry(name).or_insert(Value::String(text));
    }
    Ok(map)
}
