//! Request-pipeline middleware for saargate
//!
//! Every inbound request passes through the request-id layer and the
//! security gate before any handler runs.

pub mod rate_limit;
pub mod request_id;
pub mod security;

pub use rate_limit::{MemoryRateLimitStore, RateDecision, RateLimitStore, RateLimiter};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use security::{SecurityGate, security_middleware};
