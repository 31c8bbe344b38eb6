//! Quota decisions.

use core::fmt;

use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize, Serializer};

/// How many gated uses remain for the current day.
///
/// Serialized as a plain number, `"unlimited"`, or `"unknown"`, the shapes
/// the client already understands for its `remainingUses` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// A concrete number of uses left today.
    Exact(u32),
    /// The identity is not subject to daily limits.
    Unlimited,
    /// The usage store was unreachable; tracking is degraded.
    Unknown,
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::Unlimited => write!(f, "unlimited"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Exact(n) => serializer.serialize_u32(*n),
            Self::Unlimited => serializer.serialize_str("unlimited"),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Remaining {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RemainingVisitor;

        impl de::Visitor<'_> for RemainingVisitor {
            type Value = Remaining;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative number, \"unlimited\", or \"unknown\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Remaining, E> {
                u32::try_from(v)
                    .map(Remaining::Exact)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Remaining, E> {
                u32::try_from(v)
                    .map(Remaining::Exact)
                    .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Remaining, E> {
                match v {
                    "unlimited" => Ok(Remaining::Unlimited),
                    "unknown" => Ok(Remaining::Unknown),
                    other => Err(E::invalid_value(Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(RemainingVisitor)
    }
}

/// The outcome of a quota check.
///
/// Ephemeral: computed fresh on every check and never persisted. The message
/// is user-facing and safe to surface verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Whether the gated action may proceed.
    pub allowed: bool,
    /// Uses remaining today after this check.
    #[serde(rename = "remainingUses")]
    pub remaining: Remaining,
    /// User-facing explanation.
    pub message: String,
}

impl QuotaDecision {
    /// Decision for identities exempt from daily limits.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: Remaining::Unlimited,
            message: "Unlimited access".to_owned(),
        }
    }

    /// Decision for an allowed check with a concrete remaining count.
    #[must_use]
    pub fn granted(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining: Remaining::Exact(remaining),
            message: format!("You have {remaining} generations remaining today"),
        }
    }

    /// Decision for a check that hit the daily limit.
    #[must_use]
    pub fn denied(daily_limit: u32) -> Self {
        Self {
            allowed: false,
            remaining: Remaining::Exact(0),
            message: format!(
                "You have reached the daily limit of {daily_limit} generations. Please try again tomorrow."
            ),
        }
    }

    /// Fail-open decision used when the usage store is unreachable.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            allowed: true,
            remaining: Remaining::Unknown,
            message: "Usage tracking is currently unavailable".to_owned(),
        }
    }
}
