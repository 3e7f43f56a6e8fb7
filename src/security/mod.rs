//! Security Module
//!
//! Response hardening for the HTTP surface. The service has no
//! authentication layer; chat is gated by event membership instead.

pub mod middleware;

pub use middleware::security_headers_middleware;
