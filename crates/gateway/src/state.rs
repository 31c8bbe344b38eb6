//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::GatewayConfig;
use crate::services::auth::{AuthGate, HttpTokenExchanger, ProviderError};
use crate::services::predict::PredictClient;
use crate::services::usage::{PostgresUsageStore, UsageGate};

/// Error constructing application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("auth provider client: {0}")]
    Provider(#[from] ProviderError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Both gates are built here with their
/// injected dependencies (HTTP token exchanger, Postgres usage store) and
/// live for the whole process.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GatewayConfig,
    pool: PgPool,
    auth_gate: AuthGate,
    usage_gate: UsageGate,
    predict: PredictClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth provider client cannot be built.
    pub fn new(config: GatewayConfig, pool: PgPool) -> Result<Self, StateError> {
        let exchanger = HttpTokenExchanger::new(&config.auth)?;
        let auth_gate = AuthGate::new(Arc::new(exchanger), &config.auth, &config.usage);

        let store = PostgresUsageStore::new(pool.clone());
        let usage_gate = UsageGate::new(Arc::new(store), &config.usage);

        let predict = PredictClient::new(&config.predict_api_url, config.auth.init_timeout);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth_gate,
                usage_gate,
                predict,
            }),
        })
    }

    /// Get a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the authorization gate.
    #[must_use]
    pub fn auth_gate(&self) -> &AuthGate {
        &self.inner.auth_gate
    }

    /// Get a reference to the usage gate.
    #[must_use]
    pub fn usage_gate(&self) -> &UsageGate {
        &self.inner.usage_gate
    }

    /// Get a reference to the prediction API client.
    #[must_use]
    pub fn predict(&self) -> &PredictClient {
        &self.inner.predict
    }
}
