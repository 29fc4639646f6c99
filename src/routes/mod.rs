//! Route table and router assembly.

pub mod common;
pub mod table;

pub use common::common_routes;
pub use table::{add_routes, add_static, axum_path, Route, RouteTable};

use crate::dispatch::Signature;
use crate::handlers::{blogs, comments, pages, users};
use crate::middleware::{auth, coerce_response, logger, parse_data};
use crate::state::AppState;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use std::path::Path;
use tower::ServiceBuilder;

/// Every blog page and API endpoint.
pub fn blog_routes() -> RouteTable {
    RouteTable::new()
        .get("/", Signature::new().request().optional("page", "1"), pages::index)
        .get("/blog/{id}", Signature::new().request(), pages::get_blog)
        .get("/register", Signature::new().request(), pages::register)
        .get("/signin", Signature::new().request(), pages::signin)
        .get("/signout", Signature::new().request(), pages::signout)
        .get("/manage/blogs", Signature::new().request().optional("page", "1"), pages::manage_blogs)
        .get("/manage/blogs/create", Signature::new().request(), pages::manage_create_blog)
        .get("/manage/blogs/edit/{id}", Signature::new().request(), pages::manage_edit_blog)
        .post(
            "/api/authenticate",
            Signature::new().required("email").required("passwd"),
            users::authenticate,
        )
        .post(
            "/api/users",
            Signature::new().required("email").required("name").required("passwd"),
            users::api_register_user,
        )
        .get(
            "/api/blogs",
            Signature::new().optional("page", "1").optional("page_size", "5"),
            blogs::api_blogs,
        )
        .get("/api/blogs/{id}", Signature::new().required("id"), blogs::api_get_blog)
        .post(
            "/api/blogs",
            Signature::new().request().required("name").required("summary").required("content"),
            blogs::api_create_blog,
        )
        .post(
            "/api/blogs/delete",
            Signature::new().request().required("id"),
            blogs::api_delete_blog,
        )
        .post(
            "/api/blogs/{id}",
            Signature::new()
                .request()
                .required("id")
                .required("name")
                .required("summary")
                .required("content"),
            blogs::api_update_blog,
        )
        .get("/api/comments", Signature::new().optional("page", "1"), comments::api_comments)
        .post(
            "/api/blogs/{id}/comments",
            Signature::new().request().required("id").required("content"),
            comments::api_create_comment,
        )
}

/// Full application: `table`, static files, operational routes, and the middleware chain
/// (logging, body parsing, authentication, response coercion; outermost first).
pub fn app(state: AppState, table: RouteTable, static_dir: &Path) -> Router {
    let router = add_routes(Router::new(), table);
    add_static(router, static_dir)
        .merge(common_routes())
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(logger))
                .layer(from_fn_with_state(state.clone(), parse_data))
                .layer(from_fn_with_state(state.clone(), auth))
                .layer(from_fn_with_state(state.clone(), coerce_response)),
        )
        .with_state(state)
}
