use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity assigned by a successful checkin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinId {
    /// Device id for `X-DFE-Device-Id`.
    pub android_id: u64,
    /// Secret paired with `android_id`.
    pub security_token: u64,
}

impl CheckinId {
    /// `androidId` in the lowercase hex the backend expects in headers.
    pub fn android_id_hex(&self) -> String {
        format!("{:x}", self.android_id)
    }
}

/// An authenticated store session.
///
/// Immutable once built. A later login replaces the whole value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    token: String,
    checkin: Option<CheckinId>,
}

impl Session {
    /// A session for `token`, tied to `checkin` when the handshake ran one.
    pub fn new(token: impl Into<String>, checkin: Option<CheckinId>) -> Self {
        Self {
            token: token.into(),
            checkin,
        }
    }

    /// A session built around a token issued elsewhere.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(token, None)
    }

    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Identity from the checkin; `None` for injected tokens.
    pub fn checkin(&self) -> Option<&CheckinId> {
        self.checkin.as_ref()
    }

    /// `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("GoogleLogin auth={}", self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("checkin", &self.checkin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_forms() {
        let session = Session::new(
            "abc",
            Some(CheckinId {
                android_id: 0x3a1f_00c2,
                security_token: 9,
            }),
        );
        assert_eq!(session.authorization(), "GoogleLogin auth=abc");
        assert_eq!(session.checkin().map(CheckinId::android_id_hex).as_deref(), Some("3a1f00c2"));
        assert!(!format!("{:?}", session).contains("abc"));
    }
}
