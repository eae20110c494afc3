//! # Store HTTP Transport
//!
//! Executes encoded requests against the store endpoints. One `reqwest`
//! client is shared by two middleware stacks: a retrying stack for idempotent
//! calls and a single-shot stack for calls that must never be repeated.
//! Both stacks share one throttle, placed after the retry layer.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, ACCEPT_LANGUAGE, AUTHORIZATION,
    CONTENT_TYPE, USER_AGENT,
};
use reqwest::{Proxy, StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

use super::retry::retry_middleware;
use super::throttle::{Throttle, ThrottleMiddleware};
use crate::auth::Session;
use crate::codec::{EncodedRequest, Endpoint};
use crate::configs::StoreConfig;
use crate::device::DeviceProfile;
use crate::error::TransportError;

const CLIENT_ID: &str = "am-android-google";
const ENABLED_EXPERIMENTS: &str = "cl:billing.select_add_instrument_by_default";
const UNSUPPORTED_EXPERIMENTS: &str = "nocache:billing.use_charging_poller,market_emails,buyer_currency,prod_baseline,checkin.set_asset_paid_app_field,shekel_test,content_ratings,buyer_currency_in_app,nocache:encrypted_apk,recent_changes";
const SMALLEST_SCREEN_WIDTH_DP: &str = "320";
const FILTER_LEVEL: &str = "3";

/// Whether a call may be repeated after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Bounded exponential backoff on network errors, 408, 429 and 5xx.
    Idempotent,
    /// Exactly one attempt.
    Once,
}

/// HTTP executor bound to one device profile and one proxy configuration.
pub struct Transport {
    retrying: ClientWithMiddleware,
    single_shot: ClientWithMiddleware,
    api_base: Url,
    checkin_url: Url,
    auth_url: Url,
    request_timeout: Duration,
    device: Arc<DeviceProfile>,
}

impl Transport {
    /// Build the transport.
    ///
    /// Proxies are fixed here. Environment proxy variables are ignored so
    /// configured proxies apply to store calls and nothing else.
    pub fn new(config: &StoreConfig, device: Arc<DeviceProfile>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .read_timeout(Duration::from_secs(config.timeouts.read_secs));
        if let Some(proxy) = &config.proxy.http {
            builder = builder.proxy(Proxy::http(proxy).map_err(TransportError::Build)?);
        }
        if let Some(proxy) = &config.proxy.https {
            builder = builder.proxy(Proxy::https(proxy).map_err(TransportError::Build)?);
        }
        let client = builder.build().map_err(TransportError::Build)?;

        let throttle = config.throttle.interval().map(|i| Arc::new(Throttle::new(i)));
        let paced = |builder: ClientBuilder| match &throttle {
            Some(t) => builder.with(ThrottleMiddleware::new(Arc::clone(t))),
            None => builder,
        };
        let retrying =
            paced(ClientBuilder::new(client.clone()).with(retry_middleware(&config.retry))).build();
        let single_shot = paced(ClientBuilder::new(client)).build();

        let parse = |url: &str| Url::parse(url).map_err(|_| TransportError::InvalidUrl(url.to_string()));
        let mut api_base = parse(&config.endpoints.api_base)?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        tracing::debug!(
            device = %device.name,
            api_base = %api_base,
            throttle = ?config.throttle.interval(),
            http_proxy = config.proxy.http.is_some(),
            https_proxy = config.proxy.https.is_some(),
            "store transport ready"
        );

        Ok(Self {
            retrying,
            single_shot,
            api_base,
            checkin_url: parse(&config.endpoints.checkin_url)?,
            auth_url: parse(&config.endpoints.auth_url)?,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            device,
        })
    }

    /// Profile whose headers this transport sends.
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// Absolute URL of an encoded request.
    pub fn resolve(&self, request: &EncodedRequest) -> Result<Url, TransportError> {
        match request.endpoint {
            Endpoint::Api => self
                .api_base
                .join(&request.target)
                .map_err(|_| TransportError::InvalidUrl(request.target.clone())),
            Endpoint::Checkin => Ok(self.checkin_url.clone()),
            Endpoint::Auth => Ok(self.auth_url.clone()),
        }
    }

    /// Execute a request and return the body of a 2xx reply.
    pub async fn execute(
        &self,
        request: &EncodedRequest,
        session: Option<&Session>,
        mode: RetryMode,
    ) -> Result<Bytes, TransportError> {
        self.execute_with_headers(request, session, mode, HeaderMap::new())
            .await
    }

    /// Like [`Transport::execute`], with extra headers that override the defaults.
    pub async fn execute_with_headers(
        &self,
        request: &EncodedRequest,
        session: Option<&Session>,
        mode: RetryMode,
        extra: HeaderMap,
    ) -> Result<Bytes, TransportError> {
        let url = self.resolve(request)?;
        let mut headers = match request.endpoint {
            Endpoint::Api => self.store_headers(session),
            Endpoint::Checkin => self.checkin_headers(),
            Endpoint::Auth => self.auth_headers(),
        };
        if let Some(content_type) = request.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        headers.extend(extra);

        let client = match mode {
            RetryMode::Idempotent => &self.retrying,
            RetryMode::Once => &self.single_shot,
        };
        let mut builder = client
            .request(request.method.clone(), url.clone())
            .headers(headers)
            .timeout(self.request_timeout);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        tracing::debug!(method = %request.method, url = %url, ?mode, "store request");
        let response = builder.send().await.map_err(|err| {
            tracing::warn!(url = %url, error = %err, "store request failed");
            TransportError::Network(err)
        })?;

        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "store response");
        map_status(status, body)
    }

    /// Raw GET of a payload URL, returning the unread response for streaming.
    ///
    /// Goes through the retrying stack but carries no session headers; the
    /// caller supplies whatever the descriptor demands.
    pub async fn fetch_payload(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<reqwest::Response, TransportError> {
        let url = Url::parse(url).map_err(|_| TransportError::InvalidUrl(url.to_string()))?;
        tracing::debug!(url = %url, "payload fetch");
        let response = self
            .retrying
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(TransportError::Network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "payload fetch refused");
        Err(status_error(status, body))
    }

    /// Headers carried by every `fdfe` call.
    pub fn store_headers(&self, session: Option<&Session>) -> HeaderMap {
        let device = &self.device;
        let mut headers = HeaderMap::new();
        put(&mut headers, ACCEPT_LANGUAGE, &device.accept_language());
        put(&mut headers, USER_AGENT, &device.store_user_agent());
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(""));
        headers.insert(
            HeaderName::from_static("x-dfe-client-id"),
            HeaderValue::from_static(CLIENT_ID),
        );
        headers.insert(
            HeaderName::from_static("x-dfe-enabled-experiments"),
            HeaderValue::from_static(ENABLED_EXPERIMENTS),
        );
        headers.insert(
            HeaderName::from_static("x-dfe-unsupported-experiments"),
            HeaderValue::from_static(UNSUPPORTED_EXPERIMENTS),
        );
        headers.insert(
            HeaderName::from_static("x-dfe-smallestscreenwidthdp"),
            HeaderValue::from_static(SMALLEST_SCREEN_WIDTH_DP),
        );
        headers.insert(
            HeaderName::from_static("x-dfe-filter-level"),
            HeaderValue::from_static(FILTER_LEVEL),
        );
        if let Some(session) = session {
            put(&mut headers, AUTHORIZATION, &session.authorization());
        }
        let device_id = session
            .and_then(Session::checkin)
            .map(|c| c.android_id_hex())
            .or_else(|| device.gsf_id.map(|id| format!("{:x}", id)));
        if let Some(id) = device_id {
            put(&mut headers, HeaderName::from_static("x-dfe-device-id"), &id);
        }
        headers
    }

    fn checkin_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        put(&mut headers, USER_AGENT, &self.device.checkin_user_agent());
        headers
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        put(&mut headers, USER_AGENT, &self.device.auth_user_agent());
        headers.insert(
            HeaderName::from_static("app"),
            HeaderValue::from_static("com.android.vending"),
        );
        headers
    }
}

/// Insert a header, skipping values that are not legal header text.
fn put(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => tracing::warn!(header = %name, "dropping header with invalid value"),
    }
}

/// Final status mapping once retries are exhausted.
pub fn map_status(status: StatusCode, body: Bytes) -> Result<Bytes, TransportError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(status_error(status, body))
    }
}

fn status_error(status: StatusCode, body: Bytes) -> TransportError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        TransportError::RateLimited {
            status: status.as_u16(),
        }
    } else {
        TransportError::HttpStatus {
            status: status.as_u16(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CheckinId;
    use crate::device::profiles;

    fn transport(config: &StoreConfig) -> Transport {
        let device = Arc::new(profiles::bacon());
        Transport::new(config, device).unwrap()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            map_status(StatusCode::OK, Bytes::from_static(b"x")).unwrap(),
            Bytes::from_static(b"x")
        );
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, Bytes::new()),
            Err(TransportError::RateLimited { status: 429 })
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, Bytes::new()),
            Err(TransportError::HttpStatus { status: 403, .. })
        ));
    }

    #[test]
    fn resolves_targets_against_the_api_base() {
        let mut config = StoreConfig::default();
        config.endpoints.api_base = "http://127.0.0.1:9/fdfe".into();
        let transport = transport(&config);
        let url = transport
            .resolve(&EncodedRequest::raw("details?doc=com.a"))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/fdfe/details?doc=com.a");
    }

    #[test]
    fn store_headers_carry_session_and_device_id() {
        let transport = transport(&StoreConfig::default());
        let session = Session::new(
            "tok",
            Some(CheckinId {
                android_id: 255,
                security_token: 1,
            }),
        );
        let headers = transport.store_headers(Some(&session));
        assert_eq!(headers[AUTHORIZATION], "GoogleLogin auth=tok");
        assert_eq!(headers["x-dfe-device-id"], "ff");
        assert_eq!(headers[ACCEPT_ENCODING], "");
        assert!(headers[USER_AGENT]
            .to_str()
            .unwrap()
            .starts_with("Android-Finsky/"));

        let anonymous = transport.store_headers(None);
        assert!(anonymous.get(AUTHORIZATION).is_none());
        assert!(anonymous.get("x-dfe-device-id").is_none());
    }

    #[test]
    fn bad_proxy_fails_construction() {
        let mut config = StoreConfig::default();
        config.proxy.https = Some("http://[::1".into());
        assert!(matches!(
            Transport::new(&config, Arc::new(profiles::bacon())),
            Err(TransportError::Build(_))
        ));
    }
}
