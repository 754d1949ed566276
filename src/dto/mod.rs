use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Outbound actions.
pub mod action;
/// Identifiers and the call identity.
pub mod common;
/// Inbound snapshots.
pub mod snapshot;
/// Argument validators.
pub mod validation;

pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
