//! Usage status route.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::middleware::RequireIdentity;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/usage", get(usage))
}

/// Report the caller's quota state for today without consuming a unit.
async fn usage(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
) -> impl IntoResponse {
    let decision = state.usage_gate().check_and_consume(&identity, false).await;
    Json(decision)
}
