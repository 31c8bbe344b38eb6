//! Verification and logout routes.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::REFERER},
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::{auth_rate_limiter, clear_identity, set_identity};
use crate::services::auth::{AuthError, ResolveRequest};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/verify", post(verify).route_layer(auth_rate_limiter()))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    token: Option<String>,
    source: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    email: String,
    unlimited: bool,
}

/// Verify a one-time token and start a session.
///
/// The referral proof (Referer header or source tag) and the token are
/// checked by the auth gate; the upstream warm-up then has to complete
/// before the session is established, so a verified visitor always lands
/// on a working application.
async fn verify(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<VerifyRequest>,
) -> Result<impl IntoResponse> {
    let referrer = headers.get(REFERER).and_then(|v| v.to_str().ok());

    let identity = state
        .auth_gate()
        .resolve(ResolveRequest {
            token: body.token.as_deref(),
            source: body.source.as_deref(),
            referrer,
        })
        .await?;

    state
        .predict()
        .ensure_ready()
        .await
        .map_err(|e| AuthError::Initialization(e.to_string()))?;

    set_identity(&session, &identity).await?;

    Ok(Json(VerifyResponse {
        email: identity.email.to_string(),
        unlimited: identity.is_unlimited,
    }))
}

/// End the session.
async fn logout(session: Session) -> Result<impl IntoResponse> {
    clear_identity(&session).await?;
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}
