//! Friendship lifecycle and the messaging rules that depend on it.

pub mod error;
pub mod messaging;
pub mod relationships;

pub use error::SocialError;
pub use messaging::MessagingGateway;
pub use relationships::RelationshipEngine;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision storage keeps, so records read back compare equal.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
