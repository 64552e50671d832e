//! Upstream order service access.

pub mod http_gateway;
pub mod retry;

pub use http_gateway::HttpOrderGateway;
pub use retry::RetryPolicy;
