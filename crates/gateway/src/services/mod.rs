//! Gateway services.
//!
//! - [`auth`] - Authorization gate (referral proof + token exchange)
//! - [`usage`] - Usage gate (daily quota over the usage store)
//! - [`predict`] - Upstream prediction API client

pub mod auth;
pub mod predict;
pub mod usage;
