use axum::extract::State;
use std::sync::Arc;

pub mod api;
pub mod app_env;
pub mod domain;
pub mod dto;
pub mod external_connections;
pub mod logging;
pub mod persistence;
pub mod routing_utils;
pub mod security;

/// State shared by every request handler: database connectivity and the token
/// authority backing the session boundary. There is deliberately no other
/// process-wide state.
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub tokens: security::TokenAuthority,
}

/// Extractor alias for the app's shared state
pub type AppState = State<Arc<SharedData>>;
