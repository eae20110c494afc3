//! # Configuration Modules
//!
//! This module aggregates the configuration surface of the client: device
//! profile selection, account credentials, proxies, throttling, retry bounds,
//! timeouts and backend endpoints.

/// Store client configuration with file and environment layering.
pub mod config_store;

pub use config_store::{
    AccountConfig, EndpointConfig, ProxyConfig, RetryConfig, StoreConfig, ThrottleConfig,
    TimeoutConfig,
};
