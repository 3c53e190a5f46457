//! Outbound business call types

mod call;
mod method;

pub use call::ApiRequest;
pub use method::HttpMethod;
