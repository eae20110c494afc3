//! # Session & Authentication
//!
//! Establishes the credential every store call carries. Two paths lead to a
//! [`Session`]:
//!
//! 1. **Injected token**: a token issued elsewhere is wrapped as-is. No
//!    network call is made; the first rejected store call reveals a bad one.
//! 2. **Handshake**: a device checkin, then a token exchange using the
//!    configured account password or master token.
//!
//! ## Contained Modules:
//!
//! - **`checkin`**: Checkin request construction and reply parsing.
//! - **`session`**: The immutable `Session` value and its checkin identity.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Device checkin exchange.
pub mod checkin;
/// Session credential.
pub mod session;

pub use session::{CheckinId, Session};

use std::fmt;

use reqwest::Method;

use crate::codec::auth::{decode_reply, encode_form, AuthReply};
use crate::codec::request::CONTENT_TYPE_FORM;
use crate::codec::{EncodedRequest, Endpoint};
use crate::configs::AccountConfig;
use crate::device::DeviceProfile;
use crate::error::{AuthError, TransportError};
use crate::retrieve::{RetryMode, Transport};

const SERVICE: &str = "androidmarket";
const ACCOUNT_TYPE: &str = "HOSTED_OR_GOOGLE";
const APP: &str = "com.android.vending";
const CLIENT_SIG: &str = "38918a453d07199354f8b19af05ec6562ced5788";

/// What a login starts from.
#[derive(Clone)]
pub enum LoginCredential {
    /// A ready session token.
    Token(String),
    /// Account password, exchanged for a master token first.
    Password {
        /// Account address.
        email: String,
        /// Plain password.
        password: String,
    },
    /// A long-lived master token from an earlier login.
    MasterToken {
        /// Account address.
        email: String,
        /// `aas_et/...` token.
        token: String,
    },
}

impl fmt::Debug for LoginCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginCredential::Token(_) => f.write_str("Token(<redacted>)"),
            LoginCredential::Password { email, .. } => {
                f.debug_struct("Password").field("email", email).finish()
            }
            LoginCredential::MasterToken { email, .. } => {
                f.debug_struct("MasterToken").field("email", email).finish()
            }
        }
    }
}

impl LoginCredential {
    /// Pick the handshake secret from an account. A master token wins over a
    /// password.
    pub fn from_account(account: &AccountConfig) -> Result<Self, AuthError> {
        if account.email.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        match (&account.master_token, &account.password) {
            (Some(token), _) => Ok(LoginCredential::MasterToken {
                email: account.email.clone(),
                token: token.clone(),
            }),
            (None, Some(password)) => Ok(LoginCredential::Password {
                email: account.email.clone(),
                password: password.clone(),
            }),
            (None, None) => Err(AuthError::MissingCredentials),
        }
    }
}

/// Runs the handshake against one transport.
pub struct AuthManager {
    account: Option<AccountConfig>,
}

impl AuthManager {
    /// Handshake with `account`; without one only injected tokens work.
    pub fn new(account: Option<AccountConfig>) -> Self {
        Self { account }
    }

    /// Produce a session, from `token` when given, else by handshake with the
    /// configured account.
    pub async fn login(
        &self,
        transport: &Transport,
        token: Option<&str>,
    ) -> Result<Session, AuthError> {
        let credential = match token {
            Some(token) => LoginCredential::Token(token.to_string()),
            None => self
                .account
                .as_ref()
                .ok_or(AuthError::MissingCredentials)
                .and_then(LoginCredential::from_account)?,
        };
        self.login_with(transport, credential).await
    }

    /// Produce a session from an explicit credential.
    pub async fn login_with(
        &self,
        transport: &Transport,
        credential: LoginCredential,
    ) -> Result<Session, AuthError> {
        let (email, secret) = match credential {
            LoginCredential::Token(token) => {
                tracing::info!("using injected session token");
                return Ok(Session::from_token(token));
            }
            LoginCredential::Password { email, password } => (email, Secret::Password(password)),
            LoginCredential::MasterToken { email, token } => (email, Secret::MasterToken(token)),
        };

        let checkin = checkin::perform(transport).await?;
        let token = exchange_token(transport, &checkin, &email, secret).await?;
        tracing::info!(email = %email, "login complete");
        Ok(Session::new(token, Some(checkin)))
    }
}

enum Secret {
    Password(String),
    MasterToken(String),
}

/// Encoded token exchange call.
fn exchange_request(
    device: &DeviceProfile,
    checkin: &CheckinId,
    email: &str,
    secret: &Secret,
) -> EncodedRequest {
    let android_id = checkin.android_id_hex();
    let sdk = device.sdk_version.to_string();
    let (secret_key, secret_value) = match secret {
        Secret::Password(p) => ("Passwd", p.as_str()),
        Secret::MasterToken(t) => ("Token", t.as_str()),
    };
    let body = encode_form([
        ("Email", email),
        (secret_key, secret_value),
        ("service", SERVICE),
        ("accountType", ACCOUNT_TYPE),
        ("has_permission", "1"),
        ("source", "android"),
        ("androidId", android_id.as_str()),
        ("app", APP),
        ("client_sig", CLIENT_SIG),
        ("device_country", device.country.as_str()),
        ("operatorCountry", device.country.as_str()),
        ("lang", device.language()),
        ("sdk_version", sdk.as_str()),
    ]);
    EncodedRequest {
        endpoint: Endpoint::Auth,
        method: Method::POST,
        target: String::new(),
        content_type: Some(CONTENT_TYPE_FORM),
        body: Some(body),
    }
}

async fn exchange_token(
    transport: &Transport,
    checkin: &CheckinId,
    email: &str,
    secret: Secret,
) -> Result<String, AuthError> {
    let reply = exchange_once(transport, checkin, email, &secret).await?;
    if let Some(token) = reply.get("Auth") {
        return Ok(token.to_string());
    }

    // A password login may answer with only a master token; trade it in.
    let master = match (&secret, reply.get("Token")) {
        (Secret::Password(_), Some(master)) => master.to_string(),
        _ => {
            return Err(AuthError::ProtocolMismatch(
                "token exchange reply carries no Auth key".to_string(),
            ))
        }
    };
    tracing::debug!("received master token, exchanging it for a session token");
    let reply = exchange_once(transport, checkin, email, &Secret::MasterToken(master)).await?;
    reply.get("Auth").map(str::to_string).ok_or_else(|| {
        AuthError::ProtocolMismatch("master token exchange carries no Auth key".to_string())
    })
}

async fn exchange_once(
    transport: &Transport,
    checkin: &CheckinId,
    email: &str,
    secret: &Secret,
) -> Result<AuthReply, AuthError> {
    let request = exchange_request(transport.device(), checkin, email, secret);
    let body = match transport
        .execute(&request, None, RetryMode::Idempotent)
        .await
    {
        Ok(body) => body,
        Err(TransportError::HttpStatus { status, body }) if status == 401 || status == 403 => {
            let reason = decode_reply(&body)
                .ok()
                .and_then(|r| r.get("Error").map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(AuthError::Unauthorized(reason));
        }
        Err(err) => return Err(err.into()),
    };
    let reply = decode_reply(&body)
        .map_err(|e| AuthError::ProtocolMismatch(format!("token exchange reply: {}", e)))?;
    if let Some(error) = reply.get("Error") {
        return Err(AuthError::Unauthorized(error.to_string()));
    }
    Ok(reply)
}

/// Fetch a session token from a plain HTTP endpoint.
///
/// Uses its own client, so store proxies do not apply. The token is the whole
/// body with leading and trailing whitespace stripped, not the raw bytes; a
/// token served with a trailing newline comes back without it.
pub async fn fetch_remote_token(url: &str) -> Result<String, AuthError> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(TransportError::from)?;
    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::Unauthorized(format!(
            "remote token endpoint answered HTTP {}",
            status.as_u16()
        )));
    }
    let text = response.text().await.map_err(TransportError::from)?;
    let token = text.trim();
    if token.is_empty() {
        return Err(AuthError::ProtocolMismatch(
            "remote token endpoint returned an empty body".to_string(),
        ));
    }
    tracing::info!(url = %url, "retrieved remote session token");
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::auth::decode_reply;
    use crate::device::profiles;

    fn account(password: Option<&str>, master: Option<&str>) -> AccountConfig {
        AccountConfig {
            email: "user@example.com".into(),
            password: password.map(str::to_string),
            master_token: master.map(str::to_string),
        }
    }

    #[test]
    fn master_token_wins_over_password() {
        let credential =
            LoginCredential::from_account(&account(Some("pw"), Some("aas_et/x"))).unwrap();
        assert!(matches!(credential, LoginCredential::MasterToken { .. }));
        assert!(matches!(
            LoginCredential::from_account(&account(None, None)),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn exchange_form_fields() {
        let device = profiles::bacon();
        let checkin = CheckinId {
            android_id: 0xabc,
            security_token: 0,
        };
        let request = exchange_request(
            &device,
            &checkin,
            "user@example.com",
            &Secret::Password("pw".into()),
        );
        assert_eq!(request.endpoint, Endpoint::Auth);
        let form = decode_reply(
            String::from_utf8(request.body.unwrap().to_vec())
                .unwrap()
                .replace('&', "\n")
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(form.get("service"), Some("androidmarket"));
        assert_eq!(form.get("androidId"), Some("abc"));
        assert_eq!(form.get("Passwd"), Some("pw"));
        assert_eq!(form.get("sdk_version"), Some("23"));
        assert_eq!(form.get("Token"), None);
    }
}
