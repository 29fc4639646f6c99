//! Signed session cookies and password hashing.
//!
//! Cookie value: `<user id>-<expiry epoch seconds>-<signature>`, where the signature is the
//! SHA-256 hex digest of `<user id>:<password hash>:<expiry>:<server secret>`.

use crate::config::SessionConfig;
use crate::models::User;
use crate::orm::Orm;
use axum::http::HeaderValue;
use biscotti::{Processor, ProcessorConfig, RemovalCookie, ResponseCookie, ResponseCookies};
use sha2::{Digest, Sha256};

fn sha256_hex(s: &str) -> String {
    format!("{:x}", Sha256::digest(s.as_bytes()))
}

/// Stored form of a password: the client already sends a SHA-1 hex digest, salted here by id.
pub fn hash_password(uid: &str, client_digest: &str) -> String {
    sha256_hex(&format!("{}:{}", uid, client_digest))
}

fn signature(uid: &str, passwd: &str, expires: i64, secret: &str) -> String {
    sha256_hex(&format!("{}:{}:{}:{}", uid, passwd, expires, secret))
}

/// Session cookie value for `user`, valid for `max_age` seconds from now.
pub fn user2cookie(user: &User, max_age: i64, secret: &str) -> String {
    let uid = user.id.as_deref().unwrap_or_default();
    let expires = chrono::Utc::now().timestamp().saturating_add(max_age);
    let sig = signature(uid, user.passwd.as_deref().unwrap_or_default(), expires, secret);
    format!("{}-{}-{}", uid, expires, sig)
}

/// Resolve a cookie value back to its user (password scrubbed). Any failure means `None`.
pub async fn cookie2user(orm: &Orm, secret: &str, cookie: &str) -> Option<User> {
    // expiry and signature never contain `-`; the id may
    let mut parts = cookie.rsplitn(3, '-');
    let (sig, expires, uid) = (parts.next()?, parts.next()?, parts.next()?);
    if uid.is_empty() {
        return None;
    }
    let expires: i64 = expires.parse().ok()?;
    if expires < chrono::Utc::now().timestamp() {
        return None;
    }
    let user: User = match orm.find(uid).await {
        Ok(found) => found?,
        Err(e) => {
            tracing::error!(error = %e, "failed to load session user");
            return None;
        }
    };
    let expected = signature(uid, user.passwd.as_deref().unwrap_or_default(), expires, secret);
    if sig != expected {
        tracing::info!("invalid session signature");
        return None;
    }
    Some(user.scrub())
}

fn processor() -> Processor {
    ProcessorConfig::default().into()
}

fn encode(jar: ResponseCookies<'_>) -> Vec<HeaderValue> {
    jar.header_values(&processor())
        .filter_map(|v| HeaderValue::from_str(&v).ok())
        .collect()
}

/// `Set-Cookie` values establishing a session for `user`.
pub fn session_cookie(config: &SessionConfig, user: &User) -> Vec<HeaderValue> {
    let value = user2cookie(user, config.max_age, &config.secret);
    let cookie = ResponseCookie::new(config.cookie_name.clone(), value)
        .set_http_only(true)
        .set_path("/")
        .set_max_age(biscotti::time::SignedDuration::from_secs(config.max_age));
    let mut jar = ResponseCookies::new();
    jar.insert(cookie);
    encode(jar)
}

/// `Set-Cookie` values clearing the session cookie.
pub fn removal_cookie(config: &SessionConfig) -> Vec<HeaderValue> {
    let mut jar = ResponseCookies::new();
    jar.insert(RemovalCookie::new(config.cookie_name.clone()).set_path("/"));
    encode(jar)
}

/// Value of the session cookie among the request's `Cookie` headers.
pub fn session_value(config: &SessionConfig, headers: &axum::http::HeaderMap) -> Option<String> {
    let processor = processor();
    let mut cookies = biscotti::RequestCookies::new();
    for header in headers.get_all(axum::http::header::COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        if let Err(e) = cookies.extend_from_header(header, &processor) {
            tracing::warn!(error = %e, "malformed cookie header");
        }
    }
    cookies
        .get(&config.cookie_name)
        .map(|c| c.value().to_string())
}
