//! End-to-end requests through the full router, with a scripted database.

use async_trait::async_trait;
use awesome_blog::{
    app, blog_routes,
    config::SessionConfig,
    register_models,
    session::{hash_password, user2cookie},
    AppState, ModelRegistry, Orm, Row, SqlExecutor, Templates, User,
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Replays queued row sets for selects; every write affects one row.
#[derive(Default)]
struct Script {
    selects: Mutex<VecDeque<Vec<Row>>>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl Script {
    fn rows(self: &Arc<Self>, rows: Vec<Value>) -> Arc<Self> {
        let rows = rows.into_iter().filter_map(|v| v.as_object().cloned()).collect();
        self.selects.lock().unwrap().push_back(rows);
        self.clone()
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }

    /// Arguments of the first statement starting with `prefix`.
    fn args_of(&self, prefix: &str) -> Vec<Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .find(|(sql, _)| sql.starts_with(prefix))
            .map(|(_, args)| args.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SqlExecutor for Script {
    async fn select(&self, sql: &str, args: &[Value], _size: Option<usize>) -> Result<Vec<Row>, sqlx::Error> {
        self.log.lock().unwrap().push((sql.to_string(), args.to_vec()));
        Ok(self.selects.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, sqlx::Error> {
        self.log.lock().unwrap().push((sql.to_string(), args.to_vec()));
        Ok(1)
    }
}

fn router(script: Arc<Script>) -> Router {
    let mut models = ModelRegistry::new();
    register_models(&mut models).unwrap();
    let state = AppState::new(
        Orm::new(script, models),
        Templates::from_dir("templates"),
        SessionConfig::default(),
        1 << 20,
    );
    app(state, blog_routes(), Path::new("static"))
}

async fn body_text(resp: Response) -> String {
    String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin() -> User {
    User {
        id: Some("u-admin".into()),
        email: Some("admin@example.com".into()),
        passwd: Some("f".repeat(64)),
        admin: Some(true),
        name: Some("Admin".into()),
        image: Some(String::new()),
        created_at: Some(1_700_000_000.0),
    }
}

fn reader() -> User {
    User {
        id: Some("u-reader".into()),
        email: Some("reader@example.com".into()),
        passwd: Some(hash_password("u-reader", &"b".repeat(40))),
        admin: Some(false),
        name: Some("Reader".into()),
        image: Some(String::new()),
        created_at: Some(1_700_000_000.0),
    }
}

fn row(value: impl serde::Serialize) -> Value {
    serde_json::to_value(value).unwrap()
}

fn session_header(user: &User) -> String {
    format!("awesession={}", user2cookie(user, 3600, &SessionConfig::default().secret))
}

fn stored_blog() -> Value {
    json!({
        "id": "b1",
        "user_id": "u-admin",
        "user_name": "Admin",
        "user_image": "",
        "name": "Old",
        "summary": "old summary",
        "content": "old content",
        "created_at": 1_700_000_000.0
    })
}

fn signed_in_post(uri: &str, user: &User, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, session_header(user))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let resp = router(Arc::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn signin_page_renders_html() {
    let resp = router(Arc::default())
        .oneshot(Request::get("/signin").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/html;charset=utf-8");
    assert!(body_text(resp).await.contains("/api/authenticate"));
}

#[tokio::test]
async fn empty_blog_list_is_a_json_page() {
    let resp = router(Arc::default())
        .oneshot(Request::get("/api/blogs?page=0").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json;charset=utf-8");
    let body = body_json(resp).await;
    assert_eq!(body["blogs"], json!([]));
    assert_eq!(body["page"]["item_count"], 0);
    assert_eq!(body["page"]["page_index"], 1);
    assert_eq!(body["page"]["page_size"], 5);
}

#[tokio::test]
async fn blog_list_reads_the_requested_page() {
    let script = Arc::new(Script::default())
        .rows(vec![json!({"_num_": 7})])
        .rows(vec![json!({"id": "b1", "name": "First", "created_at": 1.0})]);
    let resp = router(script.clone())
        .oneshot(Request::get("/api/blogs?page=2&page_size=3").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["page"]["offset"], 3);
    assert_eq!(body["blogs"][0]["name"], "First");
    assert!(script.log()[1].ends_with("order by created_at desc limit ?, ?"));
}

#[tokio::test]
async fn post_without_content_type_is_bad_request() {
    let req = Request::post("/api/authenticate").body(Body::from("{}")).unwrap();
    let resp = router(Arc::default()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "Missing Content-Type");
}

#[tokio::test]
async fn missing_argument_is_named() {
    let resp = router(Arc::default())
        .oneshot(post_json("/api/authenticate", json!({"email": "a@example.com"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "Missing argument: passwd");
}

#[tokio::test]
async fn invalid_registration_is_a_structured_error() {
    let resp = router(Arc::default())
        .oneshot(post_json(
            "/api/users",
            json!({"email": "not-an-email", "name": "Ann", "passwd": "a".repeat(40)}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "value:invalid");
    assert_eq!(body["data"], "email");
}

#[tokio::test]
async fn registration_sets_session_cookie_and_scrubs_password() {
    let script = Arc::new(Script::default()).rows(vec![]);
    let resp = router(script.clone())
        .oneshot(post_json(
            "/api/users",
            json!({"email": "ann@example.com", "name": " Ann ", "passwd": "a".repeat(40)}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("awesession="));
    assert!(cookie.contains("HttpOnly"));
    let body = body_json(resp).await;
    assert_eq!(body["name"], "Ann");
    assert_eq!(body["passwd"], "******");
    assert!(script.log()[1].starts_with("insert into `users`"));
}

#[tokio::test]
async fn manage_pages_redirect_anonymous_users() {
    let resp = router(Arc::default())
        .oneshot(Request::get("/manage/blogs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/signin");
}

#[tokio::test]
async fn missing_blog_page_is_404() {
    let resp = router(Arc::default())
        .oneshot(Request::get("/blog/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(resp).await, "blog not found");
}

#[tokio::test]
async fn creating_a_blog_requires_an_admin() {
    let resp = router(Arc::default())
        .oneshot(post_json(
            "/api/blogs",
            json!({"name": "T", "summary": "S", "content": "C"}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["error"], "permission:forbidden");
}

#[tokio::test]
async fn admin_creates_a_blog() {
    let user = admin();
    let cookie = user2cookie(&user, 3600, &SessionConfig::default().secret);
    let script = Arc::new(Script::default()).rows(vec![serde_json::to_value(&user).unwrap()]);
    let req = Request::post("/api/blogs")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, format!("awesession={}", cookie))
        .body(Body::from("name=Hello&summary=Short&content=Body+text"))
        .unwrap();
    let resp = router(script.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["name"], "Hello");
    assert_eq!(body["user_name"], "Admin");
    assert_eq!(body["id"].as_str().unwrap().len(), 50);
    assert!(script.log().iter().any(|s| s.starts_with("insert into `blogs`")));
}

#[tokio::test]
async fn signout_clears_cookie_and_returns_to_referer() {
    let req = Request::get("/signout")
        .header(header::REFERER, "/blog/b1")
        .body(Body::empty())
        .unwrap();
    let resp = router(Arc::default()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/blog/b1");
    assert!(resp.headers()[header::SET_COOKIE].to_str().unwrap().starts_with("awesession="));
}

#[tokio::test]
async fn authenticate_sets_cookie_for_matching_password() {
    let script = Arc::new(Script::default()).rows(vec![row(reader())]);
    let resp = router(script.clone())
        .oneshot(post_json(
            "/api/authenticate",
            json!({"email": "reader@example.com", "passwd": "b".repeat(40)}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("awesession=u-reader-"));
    let body = body_json(resp).await;
    assert_eq!(body["email"], "reader@example.com");
    assert_eq!(body["passwd"], "******");
    assert_eq!(script.args_of("select"), vec![json!("reader@example.com")]);
}

#[tokio::test]
async fn authenticate_rejects_wrong_password() {
    let script = Arc::new(Script::default()).rows(vec![row(reader())]);
    let resp = router(script)
        .oneshot(post_json(
            "/api/authenticate",
            json!({"email": "reader@example.com", "passwd": "c".repeat(40)}),
        ))
        .await
        .unwrap();
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let body = body_json(resp).await;
    assert_eq!(body["error"], "value:invalid");
    assert_eq!(body["data"], "passwd");
}

#[tokio::test]
async fn authenticate_rejects_unknown_email() {
    let script = Arc::new(Script::default()).rows(vec![]);
    let resp = router(script)
        .oneshot(post_json(
            "/api/authenticate",
            json!({"email": "nobody@example.com", "passwd": "b".repeat(40)}),
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["error"], "value:invalid");
    assert_eq!(body["data"], "email");
    assert_eq!(body["message"], "Email not exist.");
}

#[tokio::test]
async fn admin_updates_a_blog_by_path_id() {
    let script = Arc::new(Script::default())
        .rows(vec![row(admin())])
        .rows(vec![stored_blog()]);
    let req = signed_in_post(
        "/api/blogs/b1",
        &admin(),
        json!({"id": "other", "name": " New ", "summary": "new summary", "content": "new content"}),
    );
    let resp = router(script.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["id"], "b1");
    assert_eq!(body["name"], "New");
    assert_eq!(body["user_name"], "Admin");

    let log = script.log();
    assert!(log[1].ends_with("from `blogs` where `id`=?"));
    let update = script.args_of("update `blogs`");
    assert_eq!(update.last(), Some(&json!("b1")));
    assert!(update.contains(&json!("New")));
}

#[tokio::test]
async fn admin_deletes_a_blog() {
    let script = Arc::new(Script::default())
        .rows(vec![row(admin())])
        .rows(vec![stored_blog()]);
    let req = signed_in_post("/api/blogs/delete", &admin(), json!({"id": "b1"}));
    let resp = router(script.clone()).oneshot(req).await.unwrap();
    assert_eq!(body_json(resp).await, json!({"id": "b1"}));
    assert_eq!(script.args_of("delete from `blogs`"), vec![json!("b1")]);
}

#[tokio::test]
async fn deleting_requires_an_admin() {
    let script = Arc::new(Script::default()).rows(vec![row(reader())]);
    let req = signed_in_post("/api/blogs/delete", &reader(), json!({"id": "b1"}));
    let resp = router(script.clone()).oneshot(req).await.unwrap();
    assert_eq!(body_json(resp).await["error"], "permission:forbidden");
    assert!(!script.log().iter().any(|s| s.starts_with("delete")));
}

#[tokio::test]
async fn signed_in_user_comments_on_a_blog() {
    let script = Arc::new(Script::default())
        .rows(vec![row(reader())])
        .rows(vec![stored_blog()]);
    let req = signed_in_post("/api/blogs/b1/comments", &reader(), json!({"content": "  Nice post  "}));
    let resp = router(script.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["blog_id"], "b1");
    assert_eq!(body["user_id"], "u-reader");
    assert_eq!(body["user_name"], "Reader");
    assert_eq!(body["content"], "Nice post");
    assert!(script.log().iter().any(|s| s.starts_with("insert into `comments`")));
}

#[tokio::test]
async fn anonymous_comment_is_forbidden() {
    let script = Arc::new(Script::default());
    let resp = router(script.clone())
        .oneshot(post_json("/api/blogs/b1/comments", json!({"content": "hi"})))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["error"], "permission:forbidden");
    assert_eq!(body["message"], "Please signin first.");
    assert!(script.log().is_empty());
}

#[tokio::test]
async fn comment_list_is_paged() {
    let script = Arc::new(Script::default())
        .rows(vec![json!({"_num_": 2})])
        .rows(vec![
            json!({"id": "c2", "blog_id": "b1", "content": "second", "created_at": 2.0}),
            json!({"id": "c1", "blog_id": "b1", "content": "first", "created_at": 1.0}),
        ]);
    let resp = router(script.clone())
        .oneshot(Request::get("/api/comments").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["page"]["item_count"], 2);
    assert_eq!(body["page"]["page_size"], 10);
    assert_eq!(body["comments"].as_array().unwrap().len(), 2);
    assert_eq!(body["comments"][0]["id"], "c2");
    assert_eq!(script.args_of("select `id`"), vec![json!(0), json!(10)]);
}

#[tokio::test]
async fn blog_page_renders_markdown_body_and_plain_comments() {
    let mut blog = stored_blog();
    blog["content"] = json!("## Heading\n\nSome **bold** text");
    let script = Arc::new(Script::default())
        .rows(vec![blog])
        .rows(vec![json!({"id": "c1", "blog_id": "b1", "user_name": "Reader", "content": "a *b*", "created_at": 1.0})]);
    let resp = router(script)
        .oneshot(Request::get("/blog/b1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("<h2>Heading</h2>"));
    assert!(html.contains("<strong>bold</strong>"));
    assert!(html.contains("<p>a *b*</p>"));
}
