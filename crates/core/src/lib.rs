//! NextStep Core - Shared domain types.
//!
//! This crate provides the types shared across NextStep components:
//! - `gateway` - Access gateway fronting the preference prediction API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Identity, day-bucketing, and quota decision types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
