//! Outgoing store requests.
//!
//! A [`Request`] names an [`Operation`] and carries typed parameters. Every
//! operation has a fixed parameter schema; [`Request::encode`] checks the
//! request against it and produces an [`EncodedRequest`] that the transport
//! can send as-is. [`decode_request`] is the exact inverse for every request
//! `encode` accepts that has no continuation; a continued request comes back
//! as whatever its marker spells out.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use prost::Message;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::proto::BulkDetailsRequest;
use super::wire;
use crate::error::CodecError;

/// Form bodies: `purchase` and the token exchange.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded; charset=UTF-8";
/// Protobuf bodies posted to `fdfe`.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";
/// The checkin service expects this spelling.
pub const CONTENT_TYPE_CHECKIN: &str = "application/x-protobuffer";

/// Which backend service a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The `fdfe` query and delivery service.
    Api,
    /// Device registration.
    Checkin,
    /// Token exchange.
    Auth,
}

/// Store operations with a known parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// One document by docid.
    Details,
    /// Several documents in one POST.
    BulkDetails,
    /// Full-text app search.
    Search,
    /// Category tree level.
    Browse,
    /// A category or subcategory listing.
    List,
    /// Recommendations ("similar apps").
    Similar,
    /// Purchase-and-deliver; never repeated.
    Purchase,
}

/// Value type a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Text.
    Str,
    /// Signed integer.
    Int,
    /// `true` or `false`.
    Bool,
    /// Repeated string values.
    List,
}

/// One entry of an operation's parameter schema.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Wire name, e.g. `doc`.
    pub name: &'static str,
    /// Value type it accepts.
    pub kind: ParamKind,
    /// Encoding fails when a required parameter is missing.
    pub required: bool,
}

const fn param(name: &'static str, kind: ParamKind, required: bool) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required,
    }
}

const DETAILS_PARAMS: &[ParamSpec] = &[param("doc", ParamKind::Str, true)];
const BULK_PARAMS: &[ParamSpec] = &[
    param("docid", ParamKind::List, true),
    param("includeChildDocs", ParamKind::Bool, false),
    param("includeDetails", ParamKind::Bool, false),
];
const SEARCH_PARAMS: &[ParamSpec] = &[
    param("c", ParamKind::Int, false),
    param("q", ParamKind::Str, true),
    param("n", ParamKind::Int, false),
    param("o", ParamKind::Int, false),
];
const BROWSE_PARAMS: &[ParamSpec] = &[
    param("c", ParamKind::Int, false),
    param("cat", ParamKind::Str, false),
    param("ctr", ParamKind::Str, false),
];
const LIST_PARAMS: &[ParamSpec] = &[
    param("c", ParamKind::Int, false),
    param("cat", ParamKind::Str, false),
    param("ctr", ParamKind::Str, false),
    param("n", ParamKind::Int, false),
    param("o", ParamKind::Int, false),
];
const SIMILAR_PARAMS: &[ParamSpec] = &[
    param("c", ParamKind::Int, false),
    param("rt", ParamKind::Int, false),
    param("doc", ParamKind::Str, true),
    param("n", ParamKind::Int, false),
    param("o", ParamKind::Int, false),
];
const PURCHASE_PARAMS: &[ParamSpec] = &[
    param("ot", ParamKind::Int, true),
    param("doc", ParamKind::Str, true),
    param("vc", ParamKind::Int, true),
];

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Operation; 7] = [
        Operation::Details,
        Operation::BulkDetails,
        Operation::Search,
        Operation::Browse,
        Operation::List,
        Operation::Similar,
        Operation::Purchase,
    ];

    /// Path relative to the `fdfe` base.
    pub const fn path(self) -> &'static str {
        match self {
            Operation::Details => "details",
            Operation::BulkDetails => "bulkDetails",
            Operation::Search => "search",
            Operation::Browse => "browse",
            Operation::List => "list",
            Operation::Similar => "rec",
            Operation::Purchase => "purchase",
        }
    }

    /// Inverse of [`Operation::path`].
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.path() == path)
    }

    /// Parameters this operation accepts.
    pub fn schema(self) -> &'static [ParamSpec] {
        match self {
            Operation::Details => DETAILS_PARAMS,
            Operation::BulkDetails => BULK_PARAMS,
            Operation::Search => SEARCH_PARAMS,
            Operation::Browse => BROWSE_PARAMS,
            Operation::List => LIST_PARAMS,
            Operation::Similar => SIMILAR_PARAMS,
            Operation::Purchase => PURCHASE_PARAMS,
        }
    }

    /// POST for operations with a body, GET otherwise.
    pub fn method(self) -> Method {
        match self {
            Operation::BulkDetails | Operation::Purchase => Method::POST,
            _ => Method::GET,
        }
    }

    /// Whether sending the request twice is harmless.
    pub const fn is_idempotent(self) -> bool {
        !matches!(self, Operation::Purchase)
    }

    fn spec_for(self, name: &str) -> Option<&'static ParamSpec> {
        self.schema().iter().find(|spec| spec.name == name)
    }
}

/// A typed request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Sent as-is; an empty string still produces `key=`.
    Str(String),
    /// Sent in decimal.
    Int(i64),
    /// Sent as `true` or `false`.
    Bool(bool),
    /// One `key=item` pair per item in forms and query strings.
    List(Vec<String>),
}

impl ParamValue {
    /// Kind of the carried value.
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::List(_) => ParamKind::List,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

/// Opaque next-page cursor handed out by the backend.
///
/// In practice it is a relative `fdfe` path whose query string already
/// carries the advanced offset, but callers must not rely on its shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationMarker(String);

impl ContinuationMarker {
    /// Wrap a marker taken from a reply.
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    /// The marker text, as the backend sent it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One logical store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// What to call.
    pub op: Operation,
    /// Parameters by wire name; the map order is the encoding order.
    pub params: BTreeMap<String, ParamValue>,
    /// When set, the marker replaces the encoded path and the parameters are
    /// not sent.
    pub continuation: Option<ContinuationMarker>,
}

impl Request {
    /// A request for `op` with no parameters.
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            params: BTreeMap::new(),
            continuation: None,
        }
    }

    /// Add (or replace) a parameter.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Add a parameter only when a value is present.
    pub fn with_opt<V: Into<ParamValue>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    /// Same logical operation, continued from `marker`.
    pub fn continued(&self, marker: ContinuationMarker) -> Self {
        Self {
            op: self.op,
            params: self.params.clone(),
            continuation: Some(marker),
        }
    }

    fn validate(&self) -> Result<(), CodecError> {
        for (name, value) in &self.params {
            let spec = self.op.spec_for(name).ok_or_else(|| {
                CodecError::Malformed(format!(
                    "unknown parameter `{}` for {}",
                    name,
                    self.op.path()
                ))
            })?;
            if spec.kind != value.kind() {
                return Err(CodecError::Malformed(format!(
                    "parameter `{}` of {} expects {:?}, got {:?}",
                    name,
                    self.op.path(),
                    spec.kind,
                    value.kind()
                )));
            }
        }
        for spec in self.op.schema().iter().filter(|s| s.required) {
            if !self.params.contains_key(spec.name) {
                return Err(CodecError::Malformed(format!(
                    "missing required parameter `{}` for {}",
                    spec.name,
                    self.op.path()
                )));
            }
        }
        Ok(())
    }

    /// Serialize into the exact bytes and target the backend expects.
    ///
    /// Parameters are emitted in name order, so equal requests always encode
    /// to identical output.
    pub fn encode(&self) -> Result<EncodedRequest, CodecError> {
        self.validate()?;

        if let Some(marker) = &self.continuation {
            return Ok(EncodedRequest::raw(marker.as_str()));
        }

        match self.op {
            Operation::BulkDetails => {
                let message = BulkDetailsRequest {
                    docid: match self.params.get("docid") {
                        Some(ParamValue::List(ids)) => ids.clone(),
                        _ => Vec::new(),
                    },
                    include_child_docs: self.bool_param("includeChildDocs"),
                    include_details: self.bool_param("includeDetails"),
                };
                Ok(EncodedRequest {
                    endpoint: Endpoint::Api,
                    method: Method::POST,
                    target: self.op.path().to_string(),
                    content_type: Some(CONTENT_TYPE_PROTOBUF),
                    body: Some(Bytes::from(message.encode_to_vec())),
                })
            }
            Operation::Purchase => Ok(EncodedRequest {
                endpoint: Endpoint::Api,
                method: Method::POST,
                target: self.op.path().to_string(),
                content_type: Some(CONTENT_TYPE_FORM),
                body: Some(Bytes::from(self.form_query())),
            }),
            _ => {
                let query = self.form_query();
                let target = if query.is_empty() {
                    self.op.path().to_string()
                } else {
                    format!("{}?{}", self.op.path(), query)
                };
                Ok(EncodedRequest::raw(&target))
            }
        }
    }

    fn bool_param(&self, name: &str) -> Option<bool> {
        match self.params.get(name) {
            Some(ParamValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn form_query(&self) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.params {
            match value {
                ParamValue::Str(s) => {
                    form.append_pair(name, s);
                }
                ParamValue::Int(i) => {
                    form.append_pair(name, &i.to_string());
                }
                ParamValue::Bool(b) => {
                    form.append_pair(name, if *b { "true" } else { "false" });
                }
                ParamValue::List(items) => {
                    for item in items {
                        form.append_pair(name, item);
                    }
                }
            }
        }
        form.finish()
    }
}

/// A request ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    /// Service that receives it.
    pub endpoint: Endpoint,
    /// HTTP method.
    pub method: Method,
    /// Path plus query, relative to the endpoint base. Empty for the
    /// checkin and auth endpoints, which have no sub-paths.
    pub target: String,
    /// `Content-Type` of `body`.
    pub content_type: Option<&'static str>,
    /// Request body; `None` for GETs.
    pub body: Option<Bytes>,
}

impl EncodedRequest {
    /// A bodiless GET of an arbitrary `fdfe` path.
    pub fn raw(target: &str) -> Self {
        Self {
            endpoint: Endpoint::Api,
            method: Method::GET,
            target: target.trim_start_matches('/').to_string(),
            content_type: None,
            body: None,
        }
    }
}

/// Parse an encoded request back into its typed form.
///
/// Continuation markers are opaque, so the result always describes a fresh
/// request; `decode_request(&r.encode()?) == r` holds for every request
/// without a continuation. A continued request decodes to the operation and
/// parameters spelled out in its marker, with no continuation.
pub fn decode_request(encoded: &EncodedRequest) -> Result<Request, CodecError> {
    if encoded.endpoint != Endpoint::Api {
        return Err(CodecError::Malformed(format!(
            "{:?} requests have no operation form",
            encoded.endpoint
        )));
    }
    let (path, query) = match encoded.target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (encoded.target.as_str(), None),
    };
    let op = Operation::from_path(path)
        .ok_or_else(|| CodecError::Malformed(format!("unknown operation path `{}`", path)))?;
    if encoded.method != op.method() {
        return Err(CodecError::Malformed(format!(
            "{} must be sent with {}",
            path,
            op.method()
        )));
    }

    let mut request = Request::new(op);
    match op {
        Operation::BulkDetails => {
            let body = encoded.body.as_deref().unwrap_or_default();
            let message: BulkDetailsRequest = wire::decode_message(body)?;
            request = request
                .with("docid", message.docid)
                .with_opt("includeChildDocs", message.include_child_docs)
                .with_opt("includeDetails", message.include_details);
        }
        Operation::Purchase => {
            let body = encoded.body.as_deref().unwrap_or_default();
            parse_form_into(&mut request, body)?;
        }
        _ => {
            if let Some(query) = query {
                parse_form_into(&mut request, query.as_bytes())?;
            }
        }
    }
    request.validate()?;
    Ok(request)
}

fn parse_form_into(request: &mut Request, form: &[u8]) -> Result<(), CodecError> {
    let op = request.op;
    for (name, value) in form_urlencoded::parse(form) {
        let spec = op.spec_for(&name).ok_or_else(|| {
            CodecError::Malformed(format!("unknown parameter `{}` for {}", name, op.path()))
        })?;
        let parsed = match spec.kind {
            ParamKind::Str => ParamValue::Str(value.into_owned()),
            ParamKind::Int => ParamValue::Int(value.parse().map_err(|_| {
                CodecError::Malformed(format!("parameter `{}` is not an integer: {}", name, value))
            })?),
            ParamKind::Bool => match value.as_ref() {
                "true" => ParamValue::Bool(true),
                "false" => ParamValue::Bool(false),
                other => {
                    return Err(CodecError::Malformed(format!(
                        "parameter `{}` is not a boolean: {}",
                        name, other
                    )))
                }
            },
            ParamKind::List => {
                let slot = request
                    .params
                    .entry(name.into_owned())
                    .or_insert_with(|| ParamValue::List(Vec::new()));
                if let ParamValue::List(items) = slot {
                    items.push(value.into_owned());
                }
                continue;
            }
        };
        if request.params.insert(name.to_string(), parsed).is_some() {
            return Err(CodecError::Malformed(format!(
                "parameter `{}` given more than once",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Request> {
        vec![
            Request::new(Operation::Details).with("doc", "com.example.app"),
            Request::new(Operation::Search)
                .with("c", 3)
                .with("q", "offline maps & more")
                .with("n", 20),
            Request::new(Operation::Browse).with("c", 3),
            Request::new(Operation::List)
                .with("c", 3)
                .with("cat", "GAME_ARCADE")
                .with("ctr", "apps_topselling_free"),
            Request::new(Operation::Similar)
                .with("c", 3)
                .with("rt", 1)
                .with("doc", "com.example.app"),
            Request::new(Operation::BulkDetails)
                .with("docid", vec!["a.b".to_string(), "c.d".to_string()])
                .with("includeDetails", true),
            Request::new(Operation::Purchase)
                .with("ot", 1)
                .with("doc", "com.example.app")
                .with("vc", 42),
        ]
    }

    #[test]
    fn every_operation_round_trips() {
        for request in samples() {
            let encoded = request.encode().unwrap();
            assert_eq!(decode_request(&encoded).unwrap(), request, "{:?}", encoded);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        // Insertion order differs; output must not.
        let a = Request::new(Operation::Search).with("q", "x").with("c", 3);
        let b = Request::new(Operation::Search).with("c", 3).with("q", "x");
        assert_eq!(a.encode().unwrap(), b.encode().unwrap());
        assert_eq!(a.encode().unwrap().target, "search?c=3&q=x");
    }

    #[test]
    fn absent_and_empty_parameters_differ() {
        let absent = Request::new(Operation::List).with("c", 3);
        let empty = Request::new(Operation::List).with("c", 3).with("cat", "");
        let absent_enc = absent.encode().unwrap();
        let empty_enc = empty.encode().unwrap();
        assert_eq!(absent_enc.target, "list?c=3");
        assert_eq!(empty_enc.target, "list?c=3&cat=");
        assert_eq!(decode_request(&empty_enc).unwrap(), empty);
        assert_eq!(decode_request(&absent_enc).unwrap(), absent);
    }

    #[test]
    fn schema_violations_are_rejected() {
        let unknown = Request::new(Operation::Details)
            .with("doc", "x")
            .with("bogus", 1);
        assert!(matches!(unknown.encode(), Err(CodecError::Malformed(_))));

        let wrong_kind = Request::new(Operation::Details).with("doc", 7);
        assert!(matches!(wrong_kind.encode(), Err(CodecError::Malformed(_))));

        let missing = Request::new(Operation::Purchase).with("doc", "x");
        assert!(matches!(missing.encode(), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn continuation_encodes_to_marker() {
        let first = Request::new(Operation::Search).with("c", 3).with("q", "maps");
        let next = first.continued(ContinuationMarker::new("search?c=3&q=maps&o=20&n=20"));
        let encoded = next.encode().unwrap();
        assert_eq!(encoded.method, Method::GET);
        assert_eq!(encoded.target, "search?c=3&q=maps&o=20&n=20");
    }

    #[test]
    fn continued_request_decodes_to_what_the_marker_names() {
        let next = Request::new(Operation::Search)
            .with("c", 3)
            .with("q", "maps")
            .continued(ContinuationMarker::new("search?c=3&q=maps&o=20"));
        let decoded = decode_request(&next.encode().unwrap()).unwrap();
        assert_ne!(decoded, next);
        assert_eq!(decoded.continuation, None);
        assert_eq!(
            decoded,
            Request::new(Operation::Search)
                .with("c", 3)
                .with("q", "maps")
                .with("o", 20)
        );
    }

    #[test]
    fn purchase_is_a_form_post() {
        let encoded = Request::new(Operation::Purchase)
            .with("ot", 1)
            .with("doc", "com.example.app")
            .with("vc", 42)
            .encode()
            .unwrap();
        assert_eq!(encoded.method, Method::POST);
        assert_eq!(encoded.content_type, Some(CONTENT_TYPE_FORM));
        assert_eq!(
            encoded.body.as_deref(),
            Some(&b"doc=com.example.app&ot=1&vc=42"[..])
        );
        assert!(!Operation::Purchase.is_idempotent());
    }

    #[test]
    fn decode_rejects_unknown_paths() {
        assert!(matches!(
            decode_request(&EncodedRequest::raw("toc")),
            Err(CodecError::Malformed(_))
        ));
    }
}
