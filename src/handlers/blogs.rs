//! Blog JSON API.

use crate::dispatch::Call;
use crate::error::{ApiError, AppError};
use crate::handlers::{check_admin, count};
use crate::models::Blog;
use crate::page::{get_page_index, Page};
use crate::response::Reply;
use crate::sql::FindAll;
use crate::state::AppState;
use serde_json::json;

fn page_size(call: &Call) -> Result<u64, ApiError> {
    let raw = call.args.str("page_size").unwrap_or_default();
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::value("page_size", "page_size must be an integer"))?;
    Ok(if n > 1 { n as u64 } else { 1 })
}

/// Title, summary and body of a blog write; all three must be non-blank.
fn blog_fields(call: &Call) -> Result<(String, String, String), ApiError> {
    Ok((
        call.args.non_blank("name", "name cannot be empty.")?,
        call.args.non_blank("summary", "summary cannot be empty.")?,
        call.args.non_blank("content", "content cannot be empty.")?,
    ))
}

async fn find_blog(state: &AppState, id: &str) -> Result<Blog, AppError> {
    state
        .orm
        .find::<Blog>(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog", "blog not found").into())
}

pub async fn api_blogs(state: AppState, call: Call) -> Result<Reply, AppError> {
    let page_index = get_page_index(&call.args.str("page").unwrap_or_default());
    let num = count::<Blog>(&state.orm, None, &[]).await?;
    let page = Page::new(num, page_index, page_size(&call)?);
    if num == 0 {
        return Reply::json(&json!({ "page": page, "blogs": [] }));
    }
    let blogs: Vec<Blog> = state
        .orm
        .find_all(FindAll::new().order_by("created_at desc").limit((page.offset, page.limit)))
        .await?;
    Reply::json(&json!({ "page": page, "blogs": blogs }))
}

pub async fn api_get_blog(state: AppState, call: Call) -> Result<Reply, AppError> {
    let blog = find_blog(&state, &call.args.str("id").unwrap_or_default()).await?;
    Reply::json(&blog)
}

pub async fn api_create_blog(state: AppState, call: Call) -> Result<Reply, AppError> {
    let user = check_admin(&call)?;
    let (name, summary, content) = blog_fields(&call)?;
    let mut blog = Blog {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_image: user.image.clone(),
        name: Some(name),
        summary: Some(summary),
        content: Some(content),
        ..Blog::default()
    };
    state.orm.save(&mut blog).await?;
    Reply::json(&blog)
}

pub async fn api_update_blog(state: AppState, call: Call) -> Result<Reply, AppError> {
    check_admin(&call)?;
    let mut blog = find_blog(&state, &call.args.str("id").unwrap_or_default()).await?;
    let (name, summary, content) = blog_fields(&call)?;
    blog.name = Some(name);
    blog.summary = Some(summary);
    blog.content = Some(content);
    state.orm.update(&blog).await?;
    Reply::json(&blog)
}

pub async fn api_delete_blog(state: AppState, call: Call) -> Result<Reply, AppError> {
    check_admin(&call)?;
    let id = call.args.str("id").unwrap_or_default();
    let blog = find_blog(&state, &id).await?;
    state.orm.remove(&blog).await?;
    Reply::json(&json!({ "id": id }))
}
