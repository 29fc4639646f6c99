//! Test fixtures shared by unit tests.

use crate::config::SessionConfig;
use crate::models::register_models;
use crate::orm::{ModelRegistry, Orm};
use crate::state::AppState;
use crate::store::fake::ScriptedExecutor;
use crate::templating::Templates;
use std::sync::Arc;

pub fn state_with(exec: Arc<ScriptedExecutor>) -> AppState {
    let mut models = ModelRegistry::new();
    register_models(&mut models).unwrap();
    AppState::new(Orm::new(exec, models), Templates::empty(), SessionConfig::default(), 1 << 20)
}

pub fn state() -> AppState {
    state_with(ScriptedExecutor::new())
}
