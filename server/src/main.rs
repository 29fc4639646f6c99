//! Blog server: reads configuration from the environment (and `.env`), bootstraps the
//! schema, and serves the blog on `BIND_ADDR`.

use awesome_blog::{
    app, apply_migrations, blog_routes, create_pool, register_models, AppConfig, AppState, ModelRegistry,
    MySqlExecutor, Orm, Templates,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("awesome_blog=info,blog_server=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database).await?;
    let mut models = ModelRegistry::new();
    register_models(&mut models)?;
    let orm = Orm::new(MySqlExecutor::new(pool).into_shared(), models);
    apply_migrations(&orm).await?;

    let templates = Templates::from_dir(&config.server.template_dir);
    let state = AppState::new(orm, templates, config.session.clone(), config.server.body_limit);
    let router = app(state, blog_routes(), &config.server.static_dir);

    let listener = TcpListener::bind(config.server.bind).await?;
    tracing::info!("server started at http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
