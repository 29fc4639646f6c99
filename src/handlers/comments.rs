//! Comment JSON API.

use crate::dispatch::Call;
use crate::error::{ApiError, AppError};
use crate::handlers::count;
use crate::models::{Blog, Comment};
use crate::page::{get_page_index, Page};
use crate::response::Reply;
use crate::sql::FindAll;
use crate::state::AppState;
use serde_json::json;

pub async fn api_comments(state: AppState, call: Call) -> Result<Reply, AppError> {
    let page_index = get_page_index(&call.args.str("page").unwrap_or_default());
    let num = count::<Comment>(&state.orm, None, &[]).await?;
    let page = Page::new(num, page_index, 10);
    if num == 0 {
        return Reply::json(&json!({ "page": page, "comments": [] }));
    }
    let comments: Vec<Comment> = state
        .orm
        .find_all(FindAll::new().order_by("created_at desc").limit((page.offset, page.limit)))
        .await?;
    Reply::json(&json!({ "page": page, "comments": comments }))
}

pub async fn api_create_comment(state: AppState, call: Call) -> Result<Reply, AppError> {
    let Some(user) = call.user() else {
        return Err(ApiError {
            message: "Please signin first.".into(),
            ..ApiError::permission()
        }
        .into());
    };
    let content = call.args.non_blank("content", "content cannot be empty.")?;
    let id = call.args.str("id").unwrap_or_default();
    let Some(blog) = state.orm.find::<Blog>(id.as_str()).await? else {
        return Err(ApiError::not_found("Blog", "blog not found").into());
    };
    let mut comment = Comment {
        blog_id: blog.id,
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_image: user.image.clone(),
        content: Some(content),
        ..Comment::default()
    };
    state.orm.save(&mut comment).await?;
    Reply::json(&comment)
}
