//! Shared application state for all routes. Immutable after startup.

use crate::config::SessionConfig;
use crate::orm::Orm;
use crate::templating::Templates;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orm: Orm,
    pub templates: Arc<Templates>,
    pub session: Arc<SessionConfig>,
    /// Upper bound for request bodies read by the parsing stage and the dispatcher.
    pub body_limit: usize,
}

impl AppState {
    pub fn new(orm: Orm, templates: Templates, session: SessionConfig, body_limit: usize) -> Self {
        AppState {
            orm,
            templates: Arc::new(templates),
            session: Arc::new(session),
            body_limit,
        }
    }
}
