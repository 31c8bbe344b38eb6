//! Token exchange against the external auth provider.
//!
//! The provider is consumed as an opaque capability: one-time token in,
//! authenticated subject out. The gateway never inspects token contents.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nextstep_core::{Email, SubjectId};

use crate::config::AuthConfig;

/// Errors that can occur when exchanging a token with the auth provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("provider rejected token: {status} - {message}")]
    Rejected {
        /// HTTP status the provider answered with.
        status: u16,
        /// Response body, for diagnostics.
        message: String,
    },

    /// Provider answered 200 but the payload did not describe a valid subject.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// The subject record a successful token exchange yields.
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject {
    /// Opaque stable key for the subject.
    pub subject_id: SubjectId,
    /// Verified email address.
    pub email: Email,
}

/// Exchanges a one-time token for an authenticated subject.
///
/// Behind a trait so the gate can be exercised in tests without a network.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange `token` for the subject it identifies.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on any transport, rejection, or payload
    /// failure. Callers treat every error identically (fail-closed).
    async fn exchange(&self, token: &str) -> Result<AuthenticatedSubject, ProviderError>;
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    subject_id: String,
    email: String,
}

/// HTTP implementation of [`TokenExchanger`].
#[derive(Clone)]
pub struct HttpTokenExchanger {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpTokenExchanger {
    /// Create a new exchanger from auth configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Malformed` if the API key cannot be used as a
    /// header value, and `ProviderError::Http` if the client fails to build.
    pub fn new(config: &AuthConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(config.provider_api_key.expose_secret())
            .map_err(|e| ProviderError::Malformed(format!("invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            verify_url: config.provider_url.clone(),
        })
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, token: &str) -> Result<AuthenticatedSubject, ProviderError> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&ExchangeRequest { token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let payload: ExchangeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let subject_id = SubjectId::parse(&payload.subject_id)
            .map_err(|e| ProviderError::Malformed(format!("subject_id: {e}")))?;
        let email = Email::parse(&payload.email)
            .map_err(|e| ProviderError::Malformed(format!("email: {e}")))?;

        Ok(AuthenticatedSubject { subject_id, email })
    }
}
