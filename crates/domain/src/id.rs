//! Call identifiers.

use uuid::Uuid;

/// Generates a time-ordered identifier for an outbound call.
///
/// UUID v7 sorts by creation time, so ids read in log order.
#[must_use]
pub fn generate_call_id() -> String {
    Uuid::now_v7().to_string()
}
