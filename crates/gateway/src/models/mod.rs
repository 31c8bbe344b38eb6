//! Request/response and session models.

pub mod predict;
pub mod session;
