//! # Delivery & Download
//!
//! Two-phase retrieval of a purchased APK:
//!
//! 1. **Request delivery**: a `purchase` call for an explicit version. It is
//!    sent exactly once; repeating it is not harmless.
//! 2. **Fetch payload**: a raw GET of the signed URL from the returned
//!    [`DeliveryDescriptor`], streamed back to the caller.
//!
//! The descriptor is used for one fetch and then dropped.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, COOKIE, USER_AGENT};

use crate::auth::Session;
use crate::codec::envelope::PURCHASE_STATUS_OK;
use crate::codec::{decode_response, DeliveryDescriptor, Operation, Request, ResponseEnvelope};
use crate::error::{Denial, DenialKind, DownloadError, TransportError};
use crate::retrieve::{RetryMode, Transport};

/// Offer type of a regular app acquisition.
const OFFER_TYPE_DEFAULT: i64 = 1;

/// Where a download currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Purchase call in flight.
    RequestDelivery,
    /// Payload GET in flight.
    FetchPayload,
    /// The payload stream was handed to the caller.
    Done,
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DownloadState::RequestDelivery => "REQUEST_DELIVERY",
            DownloadState::FetchPayload => "FETCH_PAYLOAD",
            DownloadState::Done => "DONE",
        })
    }
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Payload bytes as they arrive.
pub struct PayloadStream {
    size: Option<u64>,
    inner: ChunkStream,
}

impl PayloadStream {
    /// Wrap a chunk stream whose total length may be known up front.
    pub fn new<S>(size: Option<u64>, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            size,
            inner: Box::pin(stream),
        }
    }

    /// Size advertised by the descriptor or the payload host.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Next chunk, `None` at the end of the payload.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, DownloadError>> {
        self.inner
            .next()
            .await
            .map(|chunk| chunk.map_err(DownloadError::TransportFailure))
    }

    /// Buffer the whole payload.
    pub async fn collect(mut self) -> Result<Bytes, DownloadError> {
        let mut buf = BytesMut::with_capacity(self.size.unwrap_or_default().min(64 << 20) as usize);
        while let Some(chunk) = self.next_chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// The underlying chunk stream, for callers that want `StreamExt`.
    pub fn into_inner(self) -> ChunkStream {
        self.inner
    }
}

impl fmt::Debug for PayloadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadStream").field("size", &self.size).finish()
    }
}

/// Runs the purchase/delivery handshake.
pub struct DeliveryEngine<'a> {
    transport: &'a Transport,
    session: &'a Session,
}

impl<'a> DeliveryEngine<'a> {
    /// Deliver through `transport` on behalf of `session`.
    pub fn new(transport: &'a Transport, session: &'a Session) -> Self {
        Self { transport, session }
    }

    /// The `purchase` call for one version of a package.
    pub fn purchase_request(package: &str, version_code: i64) -> Request {
        Request::new(Operation::Purchase)
            .with("ot", OFFER_TYPE_DEFAULT)
            .with("doc", package)
            .with("vc", version_code)
    }

    /// Download `package` at exactly `version_code`.
    pub async fn download(
        &self,
        package: &str,
        version_code: i64,
    ) -> Result<PayloadStream, DownloadError> {
        let mut state = DownloadState::RequestDelivery;
        tracing::info!(package, version_code, %state, "download started");

        let descriptor = match self.request_delivery(package, version_code).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                state = DownloadState::Done;
                tracing::warn!(package, %state, error = %err, "delivery refused");
                return Err(err);
            }
        };

        state = DownloadState::FetchPayload;
        tracing::info!(package, %state, size = ?descriptor.download_size, "delivery granted");
        let stream = self.fetch(descriptor).await;

        state = DownloadState::Done;
        match &stream {
            Ok(payload) => tracing::info!(package, %state, size = ?payload.size(), "payload streaming"),
            Err(err) => tracing::warn!(package, %state, error = %err, "payload fetch failed"),
        }
        stream
    }

    /// Step one: obtain a descriptor or a denial.
    pub async fn request_delivery(
        &self,
        package: &str,
        version_code: i64,
    ) -> Result<DeliveryDescriptor, DownloadError> {
        let encoded = Self::purchase_request(package, version_code).encode()?;
        let body = match self
            .transport
            .execute(&encoded, Some(self.session), RetryMode::Once)
            .await
        {
            Ok(body) => body,
            Err(TransportError::HttpStatus { status, body }) => {
                if let Some(kind) = denial_for_status(status) {
                    let message = decode_response(&body).ok().and_then(|d| d.server_message);
                    return Err(DownloadError::Denied(Denial { kind, message }));
                }
                return Err(TransportError::HttpStatus { status, body }.into());
            }
            Err(err) => return Err(err.into()),
        };

        let decoded = decode_response(&body)?;
        let grant = match decoded.envelope {
            ResponseEnvelope::Delivery(grant) => grant,
            other => {
                return Err(DownloadError::Denied(Denial {
                    kind: DenialKind::Other,
                    message: decoded
                        .server_message
                        .or_else(|| Some(format!("unexpected {} reply", other.kind()))),
                }))
            }
        };
        let message = decoded.server_message.or(grant.status_message);
        match (grant.status, grant.descriptor) {
            (Some(status), _) if status != PURCHASE_STATUS_OK => Err(DownloadError::Denied(Denial {
                kind: DenialKind::Other,
                message: message.or_else(|| Some(format!("purchase status {}", status))),
            })),
            (_, Some(descriptor)) => Ok(descriptor),
            (_, None) => Err(DownloadError::Denied(Denial {
                kind: DenialKind::Other,
                message: message.or_else(|| Some("no download URL in reply".to_string())),
            })),
        }
    }

    /// Step two: stream the payload the descriptor points at.
    pub async fn fetch(&self, descriptor: DeliveryDescriptor) -> Result<PayloadStream, DownloadError> {
        let headers = self.payload_headers(&descriptor);
        let response = self.transport.fetch_payload(&descriptor.url, headers).await?;
        let size = response
            .content_length()
            .or_else(|| descriptor.download_size.and_then(|s| u64::try_from(s).ok()));
        let chunks = response.bytes_stream().map_err(TransportError::from);
        Ok(PayloadStream::new(size, chunks))
    }

    fn payload_headers(&self, descriptor: &DeliveryDescriptor) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.transport.device().download_user_agent()) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(""));
        if let Some(cookie) = descriptor
            .cookie_header()
            .and_then(|c| HeaderValue::from_str(&c).ok())
        {
            headers.insert(COOKIE, cookie);
        }
        headers
    }
}

/// Entitlement refusals the backend signals by status code.
pub fn denial_for_status(status: u16) -> Option<DenialKind> {
    match status {
        402 => Some(DenialKind::PaymentRequired),
        403 | 409 => Some(DenialKind::OwnershipMismatch),
        404 | 410 => Some(DenialKind::VersionUnavailable),
        _ => None,
    }
}
