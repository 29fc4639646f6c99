//! URL handlers and the helpers they share.

pub mod blogs;
pub mod comments;
pub mod pages;
pub mod users;

use crate::dispatch::Call;
use crate::error::{ApiError, AppError};
use crate::models::User;
use crate::orm::{Entity, Orm};
use crate::response::Reply;
use serde::Serialize;
use serde_json::{json, Value};

pub(crate) const EMAIL_PATTERN: &str = r"^[a-z0-9\-\._]+@[a-z0-9\-_]+(\.[a-z0-9\-_]+){1,4}$";
pub(crate) const SHA1_PATTERN: &str = r"^[0-9a-f]{40}$";

pub(crate) fn matches(pattern: &str, s: &str) -> bool {
    regex::Regex::new(pattern).map(|re| re.is_match(s)).unwrap_or(false)
}

/// The signed-in admin, or `permission:forbidden`.
pub(crate) fn check_admin(call: &Call) -> Result<&User, ApiError> {
    match call.user() {
        Some(u) if u.is_admin() => Ok(u),
        _ => Err(ApiError::permission()),
    }
}

/// Template reply; the signed-in user is exposed to templates as `__user__`.
pub(crate) fn view(call: &Call, template: &str, ctx: Value) -> Reply {
    let mut ctx = match ctx {
        Value::Object(m) => m,
        _ => serde_json::Map::new(),
    };
    ctx.insert("__user__".into(), json!(call.user()));
    Reply::template(template, Value::Object(ctx))
}

/// `count(id)` over `E`, optionally filtered.
pub(crate) async fn count<E: Entity>(orm: &Orm, where_clause: Option<&str>, args: &[Value]) -> Result<u64, AppError> {
    let n = orm.find_number::<E>("count(id)", where_clause, args).await?;
    Ok(n.and_then(|v| v.as_u64()).unwrap_or(0))
}

/// Escape `text` and wrap each non-blank line in `<p>`.
pub fn text2html(text: &str) -> String {
    text.split('\n')
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            format!(
                "<p>{}</p>",
                l.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
            )
        })
        .collect()
}

/// Render Markdown to HTML. Raw HTML in the source is escaped, not passed through.
pub fn markdown2html(text: &str) -> String {
    use pulldown_cmark::{html, Event, Options, Parser};

    let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Entity as a JSON object, with `html_content` set to `html`.
pub(crate) fn with_html<T: Serialize>(item: &T, html: String) -> Result<Value, serde_json::Error> {
    let mut v = serde_json::to_value(item)?;
    if let Value::Object(m) = &mut v {
        m.insert("html_content".into(), Value::String(html));
    }
    Ok(v)
}
