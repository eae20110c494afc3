//! # Data Retrieval Module
//!
//! The network layer of the client. Every byte sent to or received from the
//! store goes through the [`Transport`] defined here, which owns the proxy
//! setup, the request pacing and the retry policy.
//!
//! ## Contained Modules:
//!
//! - **`store_http`**: The `Transport` executor built on `reqwest` and
//!   `reqwest-middleware`, attaching session and device headers.
//! - **`retry`**: Bounded exponential backoff and the transient/fatal
//!   classification of backend replies.
//! - **`throttle`**: Global minimum interval between outgoing requests.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Retry policy and strategy for idempotent calls.
pub mod retry;
/// Store HTTP executor.
pub mod store_http;
/// Request pacing.
pub mod throttle;

pub use store_http::{RetryMode, Transport};
pub use throttle::{Throttle, ThrottleMiddleware};
