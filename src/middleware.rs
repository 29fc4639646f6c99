//! Request pipeline stages, outermost first: logging, body parsing, authentication,
//! response coercion.

use crate::models::User;
use crate::response::{coerce, found, Pending};
use crate::session::{cookie2user, session_value};
use crate::state::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Body of a POST request parsed by [`parse_data`]: the JSON document, or an object of form fields.
#[derive(Clone, Debug)]
pub struct ParsedBody(pub Value);

/// User resolved from the session cookie, if any.
#[derive(Clone, Debug, Default)]
pub struct CurrentUser(pub Option<User>);

/// Lowercased `Content-Type` of a request, if present.
pub(crate) fn content_type(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
}

/// Decode an URL-encoded body or query string; the first value of a repeated key wins.
pub(crate) fn parse_form(bytes: &[u8]) -> serde_json::Map<String, Value> {
    let mut map = serde_json::Map::new();
    for (k, v) in form_urlencoded::parse(bytes) {
        map.entry(k.into_owned()).or_insert(Value::String(v.into_owned()));
    }
    map
}

pub async fn logger(req: Request, next: Next) -> Response {
    tracing::info!(method = %req.method(), path = %req.uri().path(), "request");
    next.run(req).await
}

pub async fn parse_data(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() != Method::POST {
        return next.run(req).await;
    }
    let ctype = content_type(req.headers()).unwrap_or_default();
    let is_json = ctype.starts_with("application/json");
    let is_form = ctype.starts_with("application/x-www-form-urlencoded");
    if !is_json && !is_form {
        return next.run(req).await;
    }
    let (mut parts, body) = req.into_parts();
    let bytes = match to_bytes(body, state.body_limit).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return (axum::http::StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };
    if is_json {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(v) => {
                tracing::info!(body = %v, "request json");
                parts.extensions.insert(ParsedBody(v));
            }
            Err(e) => tracing::warn!(error = %e, "request json did not parse"),
        }
    } else {
        let form = parse_form(&bytes);
        tracing::info!(body = ?form, "request form");
        parts.extensions.insert(ParsedBody(Value::Object(form)));
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Resolve the session user; `/manage/` pages require an admin.
pub async fn auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let user = match session_value(&state.session, req.headers()) {
        Some(cookie) => cookie2user(&state.orm, &state.session.secret, &cookie).await,
        None => None,
    };
    if let Some(u) = &user {
        tracing::info!(email = u.email.as_deref().unwrap_or_default(), "set current user");
    }
    if req.uri().path().starts_with("/manage/") && !user.as_ref().is_some_and(User::is_admin) {
        return found("/signin");
    }
    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

pub async fn coerce_response(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    match resp.extensions_mut().remove::<Pending>() {
        Some(Pending(value)) => coerce(value, &state.templates),
        None => resp,
    }
}
