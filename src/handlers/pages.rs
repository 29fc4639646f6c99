//! HTML pages.

use crate::dispatch::Call;
use crate::error::AppError;
use crate::handlers::{count, markdown2html, text2html, view, with_html};
use crate::models::{Blog, Comment};
use crate::page::{get_page_index, Page};
use crate::response::{found, Reply};
use crate::session::removal_cookie;
use crate::sql::FindAll;
use crate::state::AppState;
use axum::http::header;
use serde_json::json;

pub async fn index(state: AppState, call: Call) -> Result<Reply, AppError> {
    let page_index = get_page_index(&call.args.str("page").unwrap_or_default());
    let num = count::<Blog>(&state.orm, None, &[]).await?;
    let page = Page::new(num, page_index, 10);
    let blogs: Vec<Blog> = if num == 0 {
        Vec::new()
    } else {
        state
            .orm
            .find_all(FindAll::new().order_by("created_at desc").limit((page.offset, page.limit)))
            .await?
    };
    Ok(view(&call, "blogs.html", json!({ "page": page, "blogs": blogs })))
}

pub async fn get_blog(state: AppState, call: Call) -> Result<Reply, AppError> {
    let id = call.args.str("id").unwrap_or_default();
    let Some(blog) = state.orm.find::<Blog>(id.as_str()).await? else {
        return Ok(Reply::status_message(404, "blog not found"));
    };
    let comments: Vec<Comment> = state
        .orm
        .find_all(FindAll::new().filter("`blog_id`=?", [id.as_str()]).order_by("created_at desc"))
        .await?;
    let comments = comments
        .iter()
        .map(|c| with_html(c, text2html(c.content.as_deref().unwrap_or_default())))
        .collect::<Result<Vec<_>, _>>()?;
    let blog = with_html(&blog, markdown2html(blog.content.as_deref().unwrap_or_default()))?;
    Ok(view(&call, "blog.html", json!({ "blog": blog, "comments": comments })))
}

pub async fn manage_blogs(_state: AppState, call: Call) -> Result<Reply, AppError> {
    let page_index = get_page_index(&call.args.str("page").unwrap_or_default());
    Ok(view(&call, "manage_blogs.html", json!({ "page_index": page_index })))
}

pub async fn manage_create_blog(_state: AppState, call: Call) -> Result<Reply, AppError> {
    Ok(view(&call, "manage_blog_edit.html", json!({ "id": "", "action": "/api/blogs" })))
}

pub async fn manage_edit_blog(_state: AppState, call: Call) -> Result<Reply, AppError> {
    let id = call.args.str("id").unwrap_or_default();
    let action = format!("/api/blogs/{}", id);
    Ok(view(&call, "manage_blog_edit.html", json!({ "id": id, "action": action })))
}

pub async fn register(_state: AppState, call: Call) -> Result<Reply, AppError> {
    Ok(view(&call, "register.html", json!({})))
}

pub async fn signin(_state: AppState, call: Call) -> Result<Reply, AppError> {
    Ok(view(&call, "signin.html", json!({})))
}

/// Clear the session cookie and go back where the user came from.
pub async fn signout(state: AppState, call: Call) -> Result<Reply, AppError> {
    let referer = call
        .request
        .as_ref()
        .and_then(|r| r.headers.get(header::REFERER))
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("/")
        .to_string();
    let mut resp = found(&referer);
    for v in removal_cookie(&state.session) {
        resp.headers_mut().append(header::SET_COOKIE, v);
    }
    tracing::info!("user signed out");
    Ok(Reply::Raw(resp))
}
