//! Tokenguard Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus configuration loading and
//! tracing setup.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod serialization;
pub mod telemetry;

pub use adapters::{HttpAuthRemote, ReqwestApiTransport, SystemClock};
pub use config::{ConfigError, ConfigLoader};
pub use persistence::{FileKeyValueStore, InMemoryKeyValueStore};
pub use serialization::{
    SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
pub use telemetry::init_tracing;
