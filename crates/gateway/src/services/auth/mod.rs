//! Authorization gate.
//!
//! Resolves whether the current visitor is authorized: validates the
//! referring origin (or an alternate source-tag proof), exchanges the
//! one-time token with the external auth provider, and produces an
//! [`Identity`]. Every failure path is fail-closed.

mod error;
mod provider;

pub use error::AuthError;
pub use provider::{AuthenticatedSubject, HttpTokenExchanger, ProviderError, TokenExchanger};

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use nextstep_core::{Email, Identity};

use crate::config::{AuthConfig, UsageConfig};

/// The raw material of a verification attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveRequest<'a> {
    /// One-time token from the request body or a previously persisted session.
    pub token: Option<&'a str>,
    /// Source tag accepted as alternate proof of referral.
    pub source: Option<&'a str>,
    /// `Referer` header value, if any.
    pub referrer: Option<&'a str>,
}

/// Authorization gate with injected provider dependency.
///
/// Constructed once at startup and shared via [`crate::state::AppState`].
pub struct AuthGate {
    provider: Arc<dyn TokenExchanger>,
    allowed_origins: Vec<String>,
    trusted_source_tag: String,
    unlimited_emails: Vec<Email>,
    exchange_timeout: Duration,
}

impl AuthGate {
    /// Create a new authorization gate.
    #[must_use]
    pub fn new(provider: Arc<dyn TokenExchanger>, auth: &AuthConfig, usage: &UsageConfig) -> Self {
        Self {
            provider,
            allowed_origins: auth
                .allowed_origins
                .iter()
                .map(|o| o.trim_end_matches('/').to_owned())
                .collect(),
            trusted_source_tag: auth.trusted_source_tag.clone(),
            unlimited_emails: usage.unlimited_emails.clone(),
            exchange_timeout: auth.init_timeout,
        }
    }

    /// Resolve the visitor to a verified [`Identity`].
    ///
    /// The referral proof is checked before the token so that an untrusted
    /// caller never triggers a provider call.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on any failure; callers must treat all variants
    /// identically (unauthorized, no session).
    pub async fn resolve(&self, request: ResolveRequest<'_>) -> Result<Identity, AuthError> {
        if !self.referral_is_trusted(request.referrer, request.source) {
            tracing::warn!(
                referrer = request.referrer.unwrap_or("<none>"),
                source = request.source.unwrap_or("<none>"),
                "referral verification failed"
            );
            return Err(AuthError::UntrustedReferral);
        }

        let token = request
            .token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let subject = tokio::time::timeout(self.exchange_timeout, self.provider.exchange(token))
            .await
            .map_err(|_| AuthError::ExchangeTimeout)??;

        let identity = Identity::new(subject.subject_id, subject.email, &self.unlimited_emails);
        tracing::info!(
            subject = %identity.subject_id,
            unlimited = identity.is_unlimited,
            "identity verified"
        );

        Ok(identity)
    }

    /// A referral is trusted when the referrer origin is allowlisted or the
    /// source tag matches the configured one.
    fn referral_is_trusted(&self, referrer: Option<&str>, source: Option<&str>) -> bool {
        if source.is_some_and(|s| s == self.trusted_source_tag) {
            return true;
        }

        let Some(referrer) = referrer else {
            return false;
        };
        let Ok(url) = Url::parse(referrer) else {
            return false;
        };

        let origin = url.origin().ascii_serialization();
        self.allowed_origins.iter().any(|o| *o == origin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use secrecy::SecretString;

    use nextstep_core::SubjectId;

    /// Scriptable exchanger for gate tests.
    enum FakeExchanger {
        Accept { subject: &'static str, email: &'static str },
        Reject,
        Hang,
    }

    #[async_trait]
    impl TokenExchanger for FakeExchanger {
        async fn exchange(&self, _token: &str) -> Result<AuthenticatedSubject, ProviderError> {
            match self {
                Self::Accept { subject, email } => Ok(AuthenticatedSubject {
                    subject_id: SubjectId::parse(subject).unwrap(),
                    email: Email::parse(email).unwrap(),
                }),
                Self::Reject => Err(ProviderError::Rejected {
                    status: 401,
                    message: "invalid token".to_owned(),
                }),
                Self::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            provider_url: "https://auth.test/verify".to_owned(),
            provider_api_key: SecretString::from("k"),
            allowed_origins: vec![
                "https://nextstep.example".to_owned(),
                "http://localhost:3000".to_owned(),
            ],
            trusted_source_tag: "nextstep".to_owned(),
            init_timeout: Duration::from_secs(30),
        }
    }

    fn usage_config(unlimited: &[&str]) -> UsageConfig {
        UsageConfig {
            daily_limit: 5,
            unlimited_emails: unlimited.iter().map(|e| Email::parse(e).unwrap()).collect(),
        }
    }

    fn gate(exchanger: FakeExchanger) -> AuthGate {
        AuthGate::new(Arc::new(exchanger), &auth_config(), &usage_config(&[]))
    }

    #[tokio::test]
    async fn test_valid_token_and_allowed_referrer_resolves() {
        let gate = gate(FakeExchanger::Accept {
            subject: "u1",
            email: "user@example.com",
        });

        let identity = gate
            .resolve(ResolveRequest {
                token: Some("one-time"),
                source: None,
                referrer: Some("https://nextstep.example/launch?x=1"),
            })
            .await
            .unwrap();

        assert_eq!(identity.subject_id.as_str(), "u1");
        assert_eq!(identity.email.as_str(), "user@example.com");
        assert!(!identity.is_unlimited);
    }

    #[tokio::test]
    async fn test_mismatched_referrer_without_source_is_rejected() {
        let gate = gate(FakeExchanger::Accept {
            subject: "u1",
            email: "user@example.com",
        });

        let result = gate
            .resolve(ResolveRequest {
                token: Some("one-time"),
                source: None,
                referrer: Some("https://evil.example/"),
            })
            .await;

        assert!(matches!(result, Err(AuthError::UntrustedReferral)));
    }

    #[tokio::test]
    async fn test_matching_source_tag_is_alternate_proof() {
        let gate = gate(FakeExchanger::Accept {
            subject: "u1",
            email: "user@example.com",
        });

        let identity = gate
            .resolve(ResolveRequest {
                token: Some("one-time"),
                source: Some("nextstep"),
                referrer: None,
            })
            .await
            .unwrap();

        assert_eq!(identity.subject_id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected_after_referral_passes() {
        let gate = gate(FakeExchanger::Accept {
            subject: "u1",
            email: "user@example.com",
        });

        let result = gate
            .resolve(ResolveRequest {
                token: None,
                source: Some("nextstep"),
                referrer: None,
            })
            .await;
        assert!(matches!(result, Err(AuthError::MissingToken)));

        // An empty token is as good as none.
        let result = gate
            .resolve(ResolveRequest {
                token: Some(""),
                source: Some("nextstep"),
                referrer: None,
            })
            .await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_provider_rejection_fails_closed() {
        let gate = gate(FakeExchanger::Reject);

        let result = gate
            .resolve(ResolveRequest {
                token: Some("one-time"),
                source: Some("nextstep"),
                referrer: None,
            })
            .await;

        assert!(matches!(result, Err(AuthError::Provider(_))));
    }

    #[tokio::test]
    async fn test_exchange_timeout_fails_closed() {
        let mut gate = gate(FakeExchanger::Hang);
        gate.exchange_timeout = Duration::from_millis(10);

        let result = gate
            .resolve(ResolveRequest {
                token: Some("one-time"),
                source: Some("nextstep"),
                referrer: None,
            })
            .await;

        assert!(matches!(result, Err(AuthError::ExchangeTimeout)));
    }

    #[tokio::test]
    async fn test_unlimited_allowlist_marks_identity() {
        let gate = AuthGate::new(
            Arc::new(FakeExchanger::Accept {
                subject: "u1",
                email: "staff@nextstep.example",
            }),
            &auth_config(),
            &usage_config(&["staff@nextstep.example"]),
        );

        let identity = gate
            .resolve(ResolveRequest {
                token: Some("one-time"),
                source: Some("nextstep"),
                referrer: None,
            })
            .await
            .unwrap();

        assert!(identity.is_unlimited);
    }

    #[tokio::test]
    async fn test_unparseable_referrer_is_untrusted() {
        let gate = gate(FakeExchanger::Accept {
            subject: "u1",
            email: "user@example.com",
        });

        let result = gate
            .resolve(ResolveRequest {
                token: Some("one-time"),
                source: None,
                referrer: Some("not a url"),
            })
            .await;

        assert!(matches!(result, Err(AuthError::UntrustedReferral)));
    }
}
