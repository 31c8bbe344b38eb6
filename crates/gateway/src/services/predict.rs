//! Upstream prediction API client.
//!
//! The prediction API is consumed as an opaque JSON contract: preference
//! rows and plot data pass through untouched. The client also caches the
//! option lists (branches, categories, college types) that the front end
//! uses to populate its dropdowns, and its first successful options fetch
//! doubles as the post-auth "application ready" step.

use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::predict::{PredictRequest, PredictResponse};

/// How long cached option lists stay fresh.
const OPTIONS_TTL: Duration = Duration::from_secs(60 * 60);

/// Errors that can occur when talking to the prediction API.
#[derive(Debug, Error)]
pub enum PredictError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status the upstream answered with.
        status: u16,
        /// Response body, for diagnostics.
        message: String,
    },

    /// The warm-up did not complete within the configured bound.
    #[error("prediction API initialization timed out")]
    InitTimeout,
}

/// Option lists for the front end's dropdowns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictOptions {
    /// Available branch names.
    pub branches: Vec<String>,
    /// Admission categories.
    pub categories: Vec<String>,
    /// College types (IIT/NIT/...).
    pub college_types: Vec<String>,
}

#[derive(Deserialize)]
struct BranchesResponse {
    branches: Vec<String>,
}

#[derive(Deserialize)]
struct CategoriesResponse {
    categories: Vec<String>,
}

#[derive(Deserialize)]
struct CollegeTypesResponse {
    college_types: Vec<String>,
}

/// Client for the upstream prediction API.
#[derive(Clone)]
pub struct PredictClient {
    client: reqwest::Client,
    base_url: String,
    options: Cache<(), PredictOptions>,
    init_timeout: Duration,
}

impl PredictClient {
    /// Create a new prediction API client.
    #[must_use]
    pub fn new(base_url: &str, init_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            options: Cache::builder()
                .max_capacity(1)
                .time_to_live(OPTIONS_TTL)
                .build(),
            init_timeout,
        }
    }

    /// One-shot post-auth initialization: make sure the upstream is
    /// reachable and its option lists are cached, bounded by the init
    /// timeout. Subsequent calls are served from cache.
    ///
    /// # Errors
    ///
    /// Returns `PredictError::InitTimeout` if the bound elapses, or the
    /// underlying fetch error.
    pub async fn ensure_ready(&self) -> Result<(), PredictError> {
        tokio::time::timeout(self.init_timeout, self.options())
            .await
            .map_err(|_| PredictError::InitTimeout)??;
        Ok(())
    }

    /// The upstream option lists, cached for [`OPTIONS_TTL`].
    ///
    /// Concurrent cache misses may fetch more than once; the duplicate work
    /// is harmless and the last writer wins.
    ///
    /// # Errors
    ///
    /// Returns `PredictError` if any of the option endpoints fail.
    pub async fn options(&self) -> Result<PredictOptions, PredictError> {
        if let Some(cached) = self.options.get(&()).await {
            return Ok(cached);
        }

        let fetched = self.fetch_options().await?;
        self.options.insert((), fetched.clone()).await;
        tracing::info!(
            branches = fetched.branches.len(),
            "prediction option lists cached"
        );
        Ok(fetched)
    }

    /// Request predictions for the given inputs.
    ///
    /// # Errors
    ///
    /// Returns `PredictError` if the request fails or the upstream answers
    /// with a non-success status.
    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, PredictError> {
        let url = format!("{}/api/predict", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        Self::into_json(response).await
    }

    async fn fetch_options(&self) -> Result<PredictOptions, PredictError> {
        let branches: BranchesResponse = self.get_json("/api/branches").await?;
        let categories: CategoriesResponse = self.get_json("/api/categories").await?;
        let college_types: CollegeTypesResponse = self.get_json("/api/college-types").await?;

        Ok(PredictOptions {
            branches: branches.branches,
            categories: categories.categories,
            college_types: college_types.college_types,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, PredictError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await?;
        Self::into_json(response).await
    }

    async fn into_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PredictError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PredictError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}
