//! # Error Taxonomy
//!
//! Every layer of the client owns one error enum. Lower layers are wrapped by
//! higher ones so a failure always tells which stage of an operation it came
//! from. [`StoreError`] sits on top and maps each failure to an
//! [`ErrorCategory`] that the command-line layer turns into an exit status.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

/// Failures while turning bytes into protocol messages (or the reverse).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The byte stream ended in the middle of a field.
    #[error("truncated message: field at offset {offset} needs {needed} more byte(s)")]
    Truncated { offset: usize, needed: usize },

    /// A field's wire type contradicts its schema, or a value has the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl From<prost::DecodeError> for CodecError {
    fn from(err: prost::DecodeError) -> Self {
        CodecError::Malformed(err.to_string())
    }
}

/// Failures of the HTTP executor.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or timeout failure (after local retries).
    #[error("network error: {0}")]
    Network(#[source] reqwest_middleware::Error),

    /// The backend answered with a non-success status.
    #[error("backend answered HTTP {status}")]
    HttpStatus { status: u16, body: Bytes },

    /// The backend kept throttling us after every allowed retry.
    #[error("rate limited by backend (HTTP {status})")]
    RateLimited { status: u16 },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// HTTP status carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::HttpStatus { status, .. } | TransportError::RateLimited { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.into())
    }
}

impl From<reqwest_middleware::Error> for TransportError {
    fn from(err: reqwest_middleware::Error) -> Self {
        TransportError::Network(err)
    }
}

/// Failures of the checkin and token exchange handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credentials or session token were rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A handshake reply did not have the expected shape.
    #[error("handshake protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("no session token supplied and no account configured")]
    MissingCredentials,

    #[error("not logged in; call login() first")]
    NotLoggedIn,

    #[error("handshake transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// Failures of query operations.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(TransportError),

    /// A single-item lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend handed out a continuation marker that was already followed.
    #[error("stale continuation marker: {0}")]
    StaleContinuation(String),

    #[error("expected a {expected} payload, got {found}")]
    UnexpectedPayload {
        expected: &'static str,
        found: &'static str,
    },
}

impl From<TransportError> for QueryError {
    fn from(err: TransportError) -> Self {
        // An expired or revoked session only ever shows up as a 401.
        if err.status() == Some(401) {
            QueryError::Auth(AuthError::Unauthorized(
                "session token rejected by backend".to_string(),
            ))
        } else {
            QueryError::Transport(err)
        }
    }
}

/// Why the backend refused to deliver a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    /// The account does not own the item (or owns a different offer of it).
    OwnershipMismatch,
    PaymentRequired,
    VersionUnavailable,
    Other,
}

impl fmt::Display for DenialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenialKind::OwnershipMismatch => "ownership mismatch",
            DenialKind::PaymentRequired => "payment required",
            DenialKind::VersionUnavailable => "version unavailable",
            DenialKind::Other => "delivery refused",
        };
        f.write_str(text)
    }
}

/// A delivery refusal with the backend's own message when it sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub kind: DenialKind,
    pub message: Option<String>,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.kind, msg),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Failures of the purchase/delivery handshake and payload fetch.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Entitlement refusal. Never retried.
    #[error("delivery denied: {0}")]
    Denied(Denial),

    #[error("download transport failure: {0}")]
    TransportFailure(TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<TransportError> for DownloadError {
    fn from(err: TransportError) -> Self {
        if err.status() == Some(401) {
            DownloadError::Auth(AuthError::Unauthorized(
                "session token rejected by backend".to_string(),
            ))
        } else {
            DownloadError::TransportFailure(err)
        }
    }
}

/// Failures while assembling a [`crate::configs::StoreConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] json5::Error),

    #[error("unknown device profile: {0}")]
    UnknownDevice(String),

    #[error("invalid {scheme} proxy URL: {url}")]
    InvalidProxy { scheme: &'static str, url: String },

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

/// Coarse failure classes, stable enough for scripts to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Protocol,
    Network,
    Entitlement,
    NotFound,
    Usage,
}

/// Top-level error returned by [`crate::client::PlayStoreClient`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl StoreError {
    /// Classify the failure for exit-status reporting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::Config(_) => ErrorCategory::Usage,
            StoreError::Auth(e) => auth_category(e),
            StoreError::Codec(_) => ErrorCategory::Protocol,
            StoreError::Transport(_) => ErrorCategory::Network,
            StoreError::Query(e) => match e {
                QueryError::Auth(a) => auth_category(a),
                QueryError::Codec(_)
                | QueryError::StaleContinuation(_)
                | QueryError::UnexpectedPayload { .. } => ErrorCategory::Protocol,
                QueryError::Transport(_) => ErrorCategory::Network,
                QueryError::NotFound(_) => ErrorCategory::NotFound,
                QueryError::InvalidArgument(_) => ErrorCategory::Usage,
            },
            StoreError::Download(e) => match e {
                DownloadError::Denied(_) => ErrorCategory::Entitlement,
                DownloadError::TransportFailure(_) => ErrorCategory::Network,
                DownloadError::Codec(_) => ErrorCategory::Protocol,
                DownloadError::Auth(a) => auth_category(a),
            },
        }
    }
}

fn auth_category(err: &AuthError) -> ErrorCategory {
    match err {
        AuthError::ProtocolMismatch(_) => ErrorCategory::Protocol,
        AuthError::Transport(_) => ErrorCategory::Network,
        _ => ErrorCategory::Auth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_status_becomes_auth_error() {
        let err = QueryError::from(TransportError::HttpStatus {
            status: 401,
            body: Bytes::new(),
        });
        assert!(matches!(err, QueryError::Auth(AuthError::Unauthorized(_))));

        let err = QueryError::from(TransportError::HttpStatus {
            status: 500,
            body: Bytes::new(),
        });
        assert!(matches!(err, QueryError::Transport(_)));
    }

    #[test]
    fn categories_stay_distinguishable() {
        let denied = StoreError::from(DownloadError::Denied(Denial {
            kind: DenialKind::PaymentRequired,
            message: None,
        }));
        assert_eq!(denied.category(), ErrorCategory::Entitlement);

        let mismatch = StoreError::from(AuthError::ProtocolMismatch("no androidId".into()));
        assert_eq!(mismatch.category(), ErrorCategory::Protocol);

        let missing = StoreError::from(QueryError::NotFound("com.example".into()));
        assert_eq!(missing.category(), ErrorCategory::NotFound);

        let limited = StoreError::from(TransportError::RateLimited { status: 429 });
        assert_eq!(limited.category(), ErrorCategory::Network);
    }

    #[test]
    fn denial_display_includes_backend_message() {
        let denial = Denial {
            kind: DenialKind::VersionUnavailable,
            message: Some("Item not found.".into()),
        };
        assert_eq!(denial.to_string(), "version unavailable: Item not found.");
    }
}
