//! # Store Wire Codec
//!
//! Everything that turns typed requests into bytes and bytes into typed
//! answers. Nothing here touches the network.
//!
//! ## Contained Modules:
//!
//! - **`proto`**: prost declarations of the store's protobuf messages.
//! - **`wire`**: Schema-less framing scanner separating truncation from corruption.
//! - **`request`**: Operation schemas, request encoding and its inverse.
//! - **`envelope`**: Response classification into one tagged variant.
//! - **`auth`**: Form bodies and `Key=Value` replies of the token exchange.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Token exchange form and reply codec.
pub mod auth;
/// Decoded response envelopes.
pub mod envelope;
/// Protobuf message declarations.
pub mod proto;
/// Request schemas and encoding.
pub mod request;
/// Protobuf framing scanner.
pub mod wire;

pub use envelope::{
    decode_response, Category, DecodedResponse, DeliveryDescriptor, DeliveryGrant, Document,
    ResponseEnvelope,
};
pub use request::{
    decode_request, ContinuationMarker, EncodedRequest, Endpoint, Operation, ParamValue, Request,
};
