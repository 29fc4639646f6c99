//! Awesome blog: a schema-driven MySQL entity mapper, a declarative request dispatcher,
//! and the blog application built on them.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod orm;
pub mod page;
pub mod response;
pub mod routes;
pub mod session;
pub mod sql;
pub mod state;
pub mod store;
pub mod templating;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use dispatch::{Args, Call, RequestContext, RequestHandler, Signature};
pub use error::{ApiError, AppError, ConfigError, OrmError, SchemaError};
pub use migration::apply_migrations;
pub use models::{register_models, Blog, Comment, User};
pub use orm::{Entity, EntitySchema, Field, ModelRegistry, Orm, SchemaBuilder};
pub use response::{Reply, ReplyValue};
pub use routes::{app, blog_routes, RouteTable};
pub use state::AppState;
pub use store::{create_pool, DbPool, MySqlExecutor, Row, SqlExecutor};
pub use templating::Templates;
