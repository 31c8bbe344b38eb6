//! Prediction request/response models.
//!
//! The response passes through from the upstream untouched (opaque
//! contract); the request is validated locally before any remote call is
//! made, so malformed input never costs a network round trip or a quota
//! check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed gated-action input, rejected locally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Rank must be a positive integer.
    #[error("jee_rank must be at least 1")]
    RankOutOfRange,

    /// A required selection is missing.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Probability cutoff outside the percentage range.
    #[error("min_probability must be between 0 and 100")]
    ProbabilityOutOfRange,
}

/// Inputs for a preference generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// JEE rank of the candidate.
    pub jee_rank: u32,
    /// Admission category (OPEN, OBC-NCL, ...).
    pub category: String,
    /// College type filter (IIT/NIT/All, ...).
    pub college_type: String,
    /// Seat quota (AI/HS/OS, ...).
    pub quota: String,
    /// Gender pool the seat is drawn from.
    pub gender: String,
    /// Preferred branch, or "All".
    pub preferred_branch: String,
    /// Counselling round.
    pub round_no: String,
    /// Minimum admission probability (percent) to include.
    #[serde(default)]
    pub min_probability: f64,
}

impl PredictRequest {
    /// Validate the request before any remote call.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jee_rank == 0 {
            return Err(ValidationError::RankOutOfRange);
        }

        for (name, value) in [
            ("category", &self.category),
            ("college_type", &self.college_type),
            ("quota", &self.quota),
            ("gender", &self.gender),
            ("preferred_branch", &self.preferred_branch),
            ("round_no", &self.round_no),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(name));
            }
        }

        if !(0.0..=100.0).contains(&self.min_probability) || self.min_probability.is_nan() {
            return Err(ValidationError::ProbabilityOutOfRange);
        }

        Ok(())
    }
}

/// Prediction results, passed through from the upstream as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Ranked preference rows.
    pub preferences: Vec<serde_json::Value>,
    /// Probability chart data, when the upstream provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_data: Option<serde_json::Value>,
}
