//! # lib_playstore
//!
//! Protocol core of an unofficial Play Store client. It emulates a device,
//! authenticates it against the store backend, speaks the store's protobuf
//! query protocol and streams purchased APKs.
//!
//! Components, leaves first:
//!
//! - **`device`**: The emulated handset identity.
//! - **`configs`**: Layered configuration (defaults, JSON5 file, environment).
//! - **`codec`**: Request encoding and response decoding.
//! - **`retrieve`**: HTTP transport with proxies, throttling and retries.
//! - **`auth`**: Checkin, token exchange and injected tokens.
//! - **`query`**: Details, search, browse/list, similar, free-form and pagination.
//! - **`delivery`**: Purchase/delivery handshake and payload streaming.
//! - **`client`**: The caller-owned facade over all of the above.
//! - **`loggers`** (feature `loggers`): `tracing` subscriber bootstrap.

pub mod auth;
pub mod client;
pub mod codec;
pub mod configs;
pub mod delivery;
pub mod device;
pub mod error;
#[cfg(feature = "loggers")]
pub mod loggers;
pub mod query;
pub mod retrieve;

pub use client::PlayStoreClient;
pub use codec::{ContinuationMarker, Document, Request, ResponseEnvelope};
pub use configs::StoreConfig;
pub use device::DeviceProfile;
pub use error::{ErrorCategory, StoreError};
