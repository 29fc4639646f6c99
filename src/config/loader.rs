//! Load configuration from environment variables (a `.env` file is honoured by the binary).

use crate::config::types::*;
use crate::error::ConfigError;
use std::str::FromStr;

/// Longest accepted session lifetime: ten years, in seconds.
pub const MAX_SESSION_AGE: i64 = 10 * 365 * 86400;

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            host: lookup("DB_HOST").unwrap_or(db_defaults.host),
            port: parse_or(&lookup, "DB_PORT", db_defaults.port)?,
            user: lookup("DB_USER").unwrap_or(db_defaults.user),
            password: lookup("DB_PASSWORD").unwrap_or(db_defaults.password),
            database: lookup("DB_NAME").unwrap_or(db_defaults.database),
            charset: lookup("DB_CHARSET").unwrap_or(db_defaults.charset),
            min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", db_defaults.min_connections)?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", db_defaults.max_connections)?,
        };
        if database.max_connections == 0 || database.min_connections > database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                reason: format!(
                    "pool size must satisfy 0 < min ({}) <= max ({})",
                    database.min_connections, database.max_connections
                ),
            });
        }

        let session_defaults = SessionConfig::default();
        let secret = match lookup("SESSION_SECRET").filter(|s| !s.is_empty()) {
            Some(s) => s,
            None => {
                tracing::warn!("SESSION_SECRET not set, using the built-in development secret");
                session_defaults.secret
            }
        };
        let session = SessionConfig {
            cookie_name: lookup("SESSION_COOKIE").unwrap_or(session_defaults.cookie_name),
            secret,
            max_age: parse_or(&lookup, "SESSION_MAX_AGE", session_defaults.max_age)?,
        };
        if session.max_age <= 0 || session.max_age > MAX_SESSION_AGE {
            return Err(ConfigError::Invalid {
                var: "SESSION_MAX_AGE",
                reason: format!("must be between 1 and {}", MAX_SESSION_AGE),
            });
        }

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind: parse_or(&lookup, "BIND_ADDR", server_defaults.bind)?,
            template_dir: lookup("TEMPLATE_DIR").map(Into::into).unwrap_or(server_defaults.template_dir),
            static_dir: lookup("STATIC_DIR").map(Into::into).unwrap_or(server_defaults.static_dir),
            body_limit: parse_or(&lookup, "BODY_LIMIT", server_defaults.body_limit)?,
        };

        Ok(AppConfig {
            database,
            session,
            server,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.database.port, 3306);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.session.max_age, 86400);
        assert_eq!(cfg.server.bind.port(), 9000);
        assert_eq!(
            cfg.database.connection_url(),
            "mysql://www-data:@localhost:3306/awesome?charset=utf8mb4"
        );
    }

    #[test]
    fn database_url_overrides_individual_fields() {
        let cfg = config_from(&[("DATABASE_URL", "mysql://root:pw@db/blog"), ("DB_HOST", "ignored")]).unwrap();
        assert_eq!(cfg.database.connection_url(), "mysql://root:pw@db/blog");
    }

    #[test]
    fn unparsable_port_is_rejected() {
        let err = config_from(&[("DB_PORT", "not-a-port")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DB_PORT", .. }));
    }

    #[test]
    fn session_max_age_is_bounded() {
        let err = config_from(&[("SESSION_MAX_AGE", &i64::MAX.to_string())]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SESSION_MAX_AGE", .. }));
        let err = config_from(&[("SESSION_MAX_AGE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SESSION_MAX_AGE", .. }));
        let cfg = config_from(&[("SESSION_MAX_AGE", &MAX_SESSION_AGE.to_string())]).unwrap();
        assert_eq!(cfg.session.max_age, MAX_SESSION_AGE);
    }

    #[test]
    fn min_pool_size_above_max_is_rejected() {
        let err = config_from(&[("DB_MIN_CONNECTIONS", "5"), ("DB_MAX_CONNECTIONS", "2")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DB_MAX_CONNECTIONS", .. }));
    }
}
