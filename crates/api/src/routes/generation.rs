//! Route definitions for the generation job surface.
//!
//! ```text
//! POST   /generate             submit_generation
//! GET    /generate             list_jobs
//! GET    /generate/{job_id}    get_job
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/generate",
            post(generation::submit_generation).get(generation::list_jobs),
        )
        .route("/generate/{job_id}", get(generation::get_job))
}
