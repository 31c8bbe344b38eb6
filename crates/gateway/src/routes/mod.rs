//! Route modules.

pub mod auth;
pub mod predict;
pub mod usage;

use axum::Router;

use crate::state::AppState;

/// All gateway routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(predict::routes())
        .merge(usage::routes())
}
