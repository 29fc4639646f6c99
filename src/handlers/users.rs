//! Registration and sign-in.

use crate::dispatch::Call;
use crate::error::{ApiError, AppError};
use crate::handlers::{matches, EMAIL_PATTERN, SHA1_PATTERN};
use crate::models::{next_id, User};
use crate::response::Reply;
use crate::session::{hash_password, session_cookie};
use crate::sql::FindAll;
use crate::state::AppState;
use axum::{http::header, response::IntoResponse, Json};

/// JSON body of the scrubbed user, with the session cookie set.
fn signed_in(state: &AppState, user: User) -> Reply {
    let cookies = session_cookie(&state.session, &user);
    let mut resp = Json(user.scrub()).into_response();
    for v in cookies {
        resp.headers_mut().append(header::SET_COOKIE, v);
    }
    Reply::Raw(resp)
}

async fn users_by_email(state: &AppState, email: &str) -> Result<Vec<User>, AppError> {
    Ok(state.orm.find_all(FindAll::new().filter("`email`=?", [email])).await?)
}

pub async fn authenticate(state: AppState, call: Call) -> Result<Reply, AppError> {
    let email = call.args.str("email").unwrap_or_default();
    let passwd = call.args.str("passwd").unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::value("email", "Invalid email.").into());
    }
    if passwd.is_empty() {
        return Err(ApiError::value("passwd", "Invalid password.").into());
    }
    let Some(user) = users_by_email(&state, &email).await?.into_iter().next() else {
        return Err(ApiError::value("email", "Email not exist.").into());
    };
    let uid = user.id.as_deref().unwrap_or_default();
    if user.passwd.as_deref() != Some(hash_password(uid, &passwd).as_str()) {
        return Err(ApiError::value("passwd", "Invalid password.").into());
    }
    tracing::info!(email = %email, "user signed in");
    Ok(signed_in(&state, user))
}

pub async fn api_register_user(state: AppState, call: Call) -> Result<Reply, AppError> {
    let name = call.args.non_blank("name", "Invalid name.")?;
    let email = call.args.str("email").unwrap_or_default();
    if !matches(EMAIL_PATTERN, &email) {
        return Err(ApiError::value("email", "Invalid email.").into());
    }
    let passwd = call.args.str("passwd").unwrap_or_default();
    if !matches(SHA1_PATTERN, &passwd) {
        return Err(ApiError::value("passwd", "Invalid password.").into());
    }
    if !users_by_email(&state, &email).await?.is_empty() {
        return Err(ApiError::new("register:failed", "email", "Email is already in use.").into());
    }
    let uid = next_id();
    let mut user = User {
        passwd: Some(hash_password(&uid, &passwd)),
        id: Some(uid),
        name: Some(name),
        email: Some(email),
        image: Some(String::new()),
        admin: Some(false),
        ..User::default()
    };
    state.orm.save(&mut user).await?;
    Ok(signed_in(&state, user))
}
