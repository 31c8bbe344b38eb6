//! Opaque subject identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SubjectId`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum SubjectIdError {
    /// The input string is empty.
    #[error("subject id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("subject id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace or control characters.
    #[error("subject id must not contain whitespace or control characters")]
    InvalidCharacter,
}

/// An opaque, stable key identifying an authenticated subject.
///
/// The value is assigned by the external auth provider and is treated as an
/// opaque token: the gateway never interprets its contents, only uses it to
/// key usage records and session state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Maximum length of a subject id.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `SubjectId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 128 characters,
    /// or contains whitespace or control characters.
    pub fn parse(s: &str) -> Result<Self, SubjectIdError> {
        if s.is_empty() {
            return Err(SubjectIdError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SubjectIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(SubjectIdError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the subject id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `SubjectId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SubjectId {
    type Err = SubjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
