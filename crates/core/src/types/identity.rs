//! Resolved, authenticated identity.

use serde::{Deserialize, Serialize};

use super::{Email, SubjectId};

/// The authenticated representation of the current visitor.
///
/// Created once per session on successful token exchange and immutable from
/// then on. `is_unlimited` is derived from allowlist membership at creation
/// time, so quota checks never have to consult configuration again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Opaque stable key assigned by the auth provider.
    pub subject_id: SubjectId,
    /// Verified email address.
    pub email: Email,
    /// Whether this identity bypasses daily usage limits.
    pub is_unlimited: bool,
}

impl Identity {
    /// Create an identity, deriving `is_unlimited` from allowlist membership.
    #[must_use]
    pub fn new(subject_id: SubjectId, email: Email, unlimited_emails: &[Email]) -> Self {
        let is_unlimited = unlimited_emails.contains(&email);
        Self {
            subject_id,
            email,
            is_unlimited,
        }
    }
}
