//! Adapters implementing application ports.

mod http_auth_remote;
mod reqwest_transport;
mod system_clock;

pub use http_auth_remote::HttpAuthRemote;
pub use reqwest_transport::ReqwestApiTransport;
pub use system_clock::SystemClock;
