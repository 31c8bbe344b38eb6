//! Identity extractor for gated routes.
//!
//! The gateway is a JSON API, so there is no login redirect: a request
//! without a verified session identity is plain 401.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use nextstep_core::Identity;

use crate::models::session::keys;

/// Extractor that requires a verified session identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn gated_handler(
///     RequireIdentity(identity): RequireIdentity,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.email)
/// }
/// ```
pub struct RequireIdentity(pub Identity);

/// Rejection for requests without a verified identity.
pub struct IdentityRejection;

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Not authenticated" })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(IdentityRejection)?;

        let identity: Identity = session
            .get(keys::IDENTITY)
            .await
            .ok()
            .flatten()
            .ok_or(IdentityRejection)?;

        Ok(Self(identity))
    }
}

/// Persist the verified identity in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_identity(
    session: &Session,
    identity: &Identity,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::IDENTITY, identity).await
}

/// Clear the session identity (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_identity(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Identity>(keys::IDENTITY).await?;
    Ok(())
}
