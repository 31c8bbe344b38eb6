//! Gated prediction routes.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use nextstep_core::QuotaDecision;

use crate::error::{AppError, Result};
use crate::middleware::RequireIdentity;
use crate::models::predict::{PredictRequest, PredictResponse};
use crate::services::usage::GateOutcome;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/options", get(options))
}

#[derive(Debug, Serialize)]
struct PredictBody {
    #[serde(flatten)]
    result: PredictResponse,
    usage: QuotaDecision,
}

/// Run a prediction through the usage gate.
///
/// A unit of quota is consumed only after the upstream call succeeds, so a
/// failed prediction costs the user nothing.
async fn predict(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Json(request): Json<PredictRequest>,
) -> Result<impl IntoResponse> {
    request.validate()?;

    let outcome = state
        .usage_gate()
        .run_gated(&identity, || state.predict().predict(&request))
        .await;

    match outcome {
        GateOutcome::Denied(decision) => Err(AppError::QuotaExceeded(decision)),
        GateOutcome::Completed { value, decision } => Ok(Json(PredictBody {
            result: value,
            usage: decision,
        })),
        GateOutcome::Failed(error) => Err(AppError::Upstream(error)),
    }
}

/// The upstream option lists for the front end's dropdowns.
async fn options(
    State(state): State<AppState>,
    RequireIdentity(_identity): RequireIdentity,
) -> Result<impl IntoResponse> {
    let options = state.predict().options().await?;
    Ok(Json(options))
}
