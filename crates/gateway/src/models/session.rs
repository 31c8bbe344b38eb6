//! Session-stored authentication state.

/// Session keys for authentication data.
pub mod keys {
    /// Key for the verified identity of the current session.
    pub const IDENTITY: &str = "identity";
}
