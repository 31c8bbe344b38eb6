//! Domain types for authorization and usage tracking.

mod day_key;
mod email;
mod identity;
mod quota;
mod subject;

pub use day_key::{DayKey, DayKeyError};
pub use email::{Email, EmailError};
pub use identity::Identity;
pub use quota::{QuotaDecision, Remaining};
pub use subject::{SubjectId, SubjectIdError};
