//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session engine and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod api_transport;
mod auth_remote;
mod clock;
mod key_value_store;

pub use api_transport::{ApiTransport, TransportError};
pub use auth_remote::{AuthRemote, RemoteError};
pub use clock::Clock;
pub use key_value_store::{KeyValueStore, StorageError};
