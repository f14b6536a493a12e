pub mod generation;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree (health plus the job surface).
///
/// Static artifact serving under `/generated` is mounted by the binary,
/// which owns the filesystem path.
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(health::router()).merge(generation::router())
}
