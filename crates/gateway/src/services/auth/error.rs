//! Authorization gate error types.

use thiserror::Error;

use super::provider::ProviderError;

/// Errors that can occur while resolving an identity.
///
/// Every variant is fail-closed: the caller must treat the visitor as
/// unauthorized and must not create a session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Referrer origin not on the allowlist and no matching source tag.
    #[error("invalid referrer or source")]
    UntrustedReferral,

    /// No authentication token provided.
    #[error("no authentication token provided")]
    MissingToken,

    /// The auth provider rejected the token or was unreachable.
    #[error("token exchange failed: {0}")]
    Provider(#[from] ProviderError),

    /// The token exchange did not complete within the configured bound.
    #[error("token exchange timed out")]
    ExchangeTimeout,

    /// Post-auth application initialization failed or timed out.
    #[error("application initialization failed: {0}")]
    Initialization(String),
}
