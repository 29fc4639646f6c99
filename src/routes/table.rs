//! Route table: handlers with their method, path template and signature, mounted onto
//! an axum router at startup.

use crate::dispatch::{Call, RequestHandler, Signature};
use crate::error::AppError;
use crate::response::Reply;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::Method,
    routing::{MethodFilter, MethodRouter},
    Router,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

pub struct Route {
    pub method: Method,
    /// Path template with `{name}` placeholders.
    pub path: String,
    pub handler: Arc<RequestHandler>,
}

#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<F, Fut>(self, path: &str, signature: Signature, f: F) -> Self
    where
        F: Fn(AppState, Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, AppError>> + Send + 'static,
    {
        self.add(Method::GET, path, RequestHandler::new(signature, f))
    }

    pub fn post<F, Fut>(self, path: &str, signature: Signature, f: F) -> Self
    where
        F: Fn(AppState, Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, AppError>> + Send + 'static,
    {
        self.add(Method::POST, path, RequestHandler::new(signature, f))
    }

    fn add(mut self, method: Method, path: &str, handler: RequestHandler) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// `/blog/{id}` -> `/blog/:id`.
pub fn axum_path(template: &str) -> String {
    template
        .split('/')
        .map(|seg| match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => format!(":{}", name),
            None => seg.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method_filter(method: &Method) -> Option<MethodFilter> {
    match *method {
        Method::GET => Some(MethodFilter::GET),
        Method::POST => Some(MethodFilter::POST),
        Method::PUT => Some(MethodFilter::PUT),
        Method::PATCH => Some(MethodFilter::PATCH),
        Method::DELETE => Some(MethodFilter::DELETE),
        _ => None,
    }
}

/// Mount every route of `table`; routes sharing a path share one method router.
pub fn add_routes(router: Router<AppState>, table: RouteTable) -> Router<AppState> {
    let mut by_path: Vec<(String, Vec<Route>)> = Vec::new();
    for route in table.routes {
        let path = axum_path(&route.path);
        match by_path.iter_mut().find(|(p, _)| *p == path) {
            Some((_, routes)) => routes.push(route),
            None => by_path.push((path, vec![route])),
        }
    }
    by_path.into_iter().fold(router, |router, (path, routes)| {
        let mr = routes.into_iter().fold(MethodRouter::new(), method_route);
        router.route(&path, mr)
    })
}

fn method_route(mr: MethodRouter<AppState>, route: Route) -> MethodRouter<AppState> {
    let Some(filter) = method_filter(&route.method) else {
        tracing::warn!(method = %route.method, path = %route.path, "unsupported method, route skipped");
        return mr;
    };
    tracing::info!(
        method = %route.method,
        path = %route.path,
        handler = route.handler.name(),
        signature = ?route.handler.signature(),
        "add route"
    );
    let h = route.handler;
    mr.on(filter, move |State(state): State<AppState>, req: Request| {
        let h = h.clone();
        async move { h.call(state, req).await }
    })
}

/// Serve files under `dir` at `/static/`.
pub fn add_static(router: Router<AppState>, dir: &Path) -> Router<AppState> {
    tracing::info!(path = %dir.display(), "add static /static/");
    router.nest_service("/static", ServeDir::new(dir))
}
