//! HTML templates (minijinja) and the filters they use.

use minijinja::Environment;
use serde::Serialize;
use std::path::Path;

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Load templates lazily from `dir`; `.html` templates are auto-escaped.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        tracing::info!(path = %dir.display(), "set template path");
        let mut env = Self::base();
        env.set_loader(minijinja::path_loader(dir));
        Templates { env }
    }

    /// No loader; templates are added with [`Templates::add_template`].
    pub fn empty() -> Self {
        Templates { env: Self::base() }
    }

    fn base() -> Environment<'static> {
        let mut env = Environment::new();
        env.add_filter("datetime", datetime_filter);
        env
    }

    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), minijinja::Error> {
        self.env.add_template_owned(name.to_string(), source.to_string())
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}

fn datetime_filter(ts: f64) -> String {
    relative_time(ts, chrono::Utc::now().timestamp() as f64)
}

/// Age of `ts` relative to `now`, both in epoch seconds.
pub fn relative_time(ts: f64, now: f64) -> String {
    let delta = (now - ts) as i64;
    match delta {
        d if d < 60 => "1 minute ago".to_string(),
        d if d < 3600 => format!("{} minutes ago", d / 60),
        d if d < 86400 => format!("{} hours ago", d / 3600),
        d if d < 604800 => format!("{} days ago", d / 86400),
        _ => chrono::DateTime::from_timestamp(ts as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}
