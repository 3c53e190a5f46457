//! Business call response types

mod api;
mod status;

pub use api::{ApiResponse, Envelope};
pub use status::StatusCode;
