//! Token exchange encoding.
//!
//! The auth endpoint speaks plain `application/x-www-form-urlencoded` in and
//! a line-oriented `Key=Value` document out.

use std::collections::HashMap;

use bytes::Bytes;
use url::form_urlencoded;

use crate::error::CodecError;

/// Encode handshake parameters in the given order.
pub fn encode_form<'a, I>(pairs: I) -> Bytes
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut form = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        form.append_pair(key, value);
    }
    Bytes::from(form.finish())
}

/// Parsed token exchange reply. Key lookup ignores case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthReply {
    fields: HashMap<String, String>,
}

impl AuthReply {
    /// Value of `key`; empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// True when no line of the body held a `Key=Value` pair.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse a `Key=Value` per line body. Lines without `=` are ignored.
pub fn decode_reply(body: &[u8]) -> Result<AuthReply, CodecError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| CodecError::Malformed(format!("auth reply is not UTF-8: {}", e)))?;
    let fields = text
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    Ok(AuthReply { fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_lookup_ignores_case() {
        let reply = decode_reply(b"SID=abc\nLSID=def\nAuth=tok/en=\n").unwrap();
        assert_eq!(reply.get("auth"), Some("tok/en="));
        assert_eq!(reply.get("SID"), Some("abc"));
        assert_eq!(reply.get("Token"), None);
    }

    #[test]
    fn non_utf8_reply_is_malformed() {
        assert!(matches!(
            decode_reply(&[0x41, 0xff, 0x3d]),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn form_keeps_order_and_escapes() {
        let body = encode_form([("Email", "a+b@example.com"), ("service", "androidmarket")]);
        assert_eq!(&body[..], b"Email=a%2Bb%40example.com&service=androidmarket");
    }
}
