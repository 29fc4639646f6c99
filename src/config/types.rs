//! Process-startup configuration: database pool, session cookie, HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Full `mysql://` URL. When set it wins over the individual fields below.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Connection URL for the pool.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "mysql://{}:{}@{}:{}/{}?charset={}",
            self.user, self.password, self.host, self.port, self.database, self.charset
        )
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            host: "localhost".into(),
            port: 3306,
            user: "www-data".into(),
            password: String::new(),
            database: "awesome".into(),
            charset: "utf8mb4".into(),
            min_connections: 1,
            max_connections: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Server-side secret mixed into every cookie signature.
    pub secret: String,
    /// Cookie lifetime in seconds.
    pub max_age: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cookie_name: "awesession".into(),
            secret: "AwEsOmE".into(),
            max_age: 86400,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub template_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Largest accepted request body in bytes.
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            template_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            body_limit: 2 * 1024 * 1024,
        }
    }
}
