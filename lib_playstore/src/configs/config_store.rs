use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::device::{profiles, DeviceProfile};
use crate::error::ConfigError;

const DEFAULT_API_BASE: &str = "https://android.clients.google.com/fdfe/";
const DEFAULT_CHECKIN_URL: &str = "https://android.clients.google.com/checkin";
const DEFAULT_AUTH_URL: &str = "https://android.clients.google.com/auth";

/// Account used by the checkin + token exchange handshake.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Long-lived master token (`aas_et/...`) obtained by an earlier login.
    #[serde(default)]
    pub master_token: Option<String>,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("master_token", &self.master_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Proxies for backend calls only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThrottleConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
        }
    }
}

impl ThrottleConfig {
    /// Minimum spacing between requests, `None` when throttling is off.
    pub fn interval(&self) -> Option<Duration> {
        (self.enabled && self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

/// Bounds for the exponential backoff applied to idempotent calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_backoff_ms: 500,
            max_backoff_ms: 8000,
        }
    }
}

/// Client-side timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    /// Whole exchange of one backend call, body included.
    pub request_secs: u64,
    /// Longest silence allowed between two reads. Payload streams are bounded
    /// by this alone.
    pub read_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
            read_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    /// Base for store queries and delivery; relative paths are joined onto it.
    pub api_base: String,
    pub checkin_url: String,
    pub auth_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            checkin_url: DEFAULT_CHECKIN_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
        }
    }
}

impl EndpointConfig {
    /// Point every endpoint at one host, e.g. a local test backend.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base: format!("{}/fdfe/", base),
            checkin_url: format!("{}/checkin", base),
            auth_url: format!("{}/auth", base),
        }
    }
}

/// Complete client configuration.
///
/// Assembled in layers: built-in defaults, then an optional JSON5 file, then
/// environment variables. The command-line layer applies its own flags last.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Name of a built-in profile.
    pub device: String,
    /// Inline profile; wins over `device` when present.
    pub device_profile: Option<DeviceProfile>,
    pub account: Option<AccountConfig>,
    pub proxy: ProxyConfig,
    pub throttle: ThrottleConfig,
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
    pub endpoints: EndpointConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            device: profiles::DEFAULT_DEVICE.to_string(),
            device_profile: None,
            account: None,
            proxy: ProxyConfig::default(),
            throttle: ThrottleConfig::default(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Parse a JSON5 config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: StoreConfig = json5::from_str(&text)?;
        Ok(config)
    }

    /// Defaults, then `path` if given, then `PLAYSTORE_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                tracing::debug!(path = %p.display(), "loading store config file");
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `PLAYSTORE_*` overrides fetched through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device) = lookup("PLAYSTORE_DEVICE") {
            self.device = device;
            self.device_profile = None;
        }
        if let Some(email) = lookup("PLAYSTORE_EMAIL") {
            self.account.get_or_insert_with(AccountConfig::default).email = email;
        }
        if let Some(password) = lookup("PLAYSTORE_PASSWORD") {
            self.account.get_or_insert_with(AccountConfig::default).password = Some(password);
        }
        if let Some(token) = lookup("PLAYSTORE_MASTER_TOKEN") {
            self.account.get_or_insert_with(AccountConfig::default).master_token = Some(token);
        }
        if let Some(proxy) = lookup("PLAYSTORE_HTTP_PROXY") {
            self.proxy.http = Some(proxy);
        }
        if let Some(proxy) = lookup("PLAYSTORE_HTTPS_PROXY") {
            self.proxy.https = Some(proxy);
        }
        if let Some(flag) = lookup("PLAYSTORE_THROTTLE") {
            self.throttle.enabled = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
    }

    /// Check that every URL in the config parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (scheme, proxy) in [("http", &self.proxy.http), ("https", &self.proxy.https)] {
            if let Some(url) = proxy {
                Url::parse(url).map_err(|_| ConfigError::InvalidProxy {
                    scheme,
                    url: url.clone(),
                })?;
            }
        }
        for endpoint in [
            &self.endpoints.api_base,
            &self.endpoints.checkin_url,
            &self.endpoints.auth_url,
        ] {
            Url::parse(endpoint).map_err(|_| ConfigError::InvalidEndpoint(endpoint.clone()))?;
        }
        Ok(())
    }

    /// The device profile this config selects.
    pub fn resolve_device(&self) -> Result<DeviceProfile, ConfigError> {
        match &self.device_profile {
            Some(profile) => Ok(profile.clone()),
            None => profiles::find(&self.device)
                .ok_or_else(|| ConfigError::UnknownDevice(self.device.clone())),
        }
    }
}
