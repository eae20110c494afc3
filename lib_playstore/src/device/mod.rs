//! # Emulated Device Identity
//!
//! The store backend tailors every answer (compatibility filtering, available
//! versions, even whether an item is visible at all) to the device that asks.
//! This module holds the static description of the handset we pretend to be.
//!
//! ## Contained Modules:
//!
//! - **`profiles`**: Built-in handset profiles selectable by name.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Built-in handset profiles.
pub mod profiles;

use serde::{Deserialize, Serialize};

/// Hardware and software identity sent with checkin and store requests.
///
/// Built once from configuration and never mutated afterwards; the client
/// only hands out shared references to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    /// Short code name (e.g. `bacon`).
    pub name: String,
    /// `ro.build.fingerprint`
    pub build_fingerprint: String,
    /// `ro.build.id`
    pub build_id: String,
    /// `ro.product.device`
    pub device: String,
    /// `ro.hardware`
    pub hardware: String,
    /// `ro.product.name`
    pub product: String,
    /// `ro.product.model`, shown in the user agents.
    pub model: String,
    /// `ro.product.manufacturer`
    pub manufacturer: String,
    /// `ro.bootloader`
    pub bootloader: String,
    /// `gsm.version.baseband`
    pub radio: String,
    /// `ro.com.google.clientidbase`
    pub client: String,
    /// Android release string (e.g. `6.0.1`).
    pub release: String,
    /// API level (`ro.build.version.sdk`).
    pub sdk_version: u32,
    /// Java style locale, e.g. `en_US`.
    pub locale: String,
    /// Olson zone name, e.g. `America/New_York`.
    pub time_zone: String,
    /// Two-letter country code sent as `device_country` during token exchange.
    pub country: String,
    /// Numeric MCC+MNC of the SIM.
    pub sim_operator: String,
    /// Numeric MCC+MNC of the network.
    pub cell_operator: String,
    /// Roaming state as reported at checkin, e.g. `mobile-notroaming`.
    pub roaming: String,
    /// Pixels.
    pub screen_width: u32,
    /// Pixels.
    pub screen_height: u32,
    /// Dots per inch.
    pub screen_density: u32,
    /// Android `Configuration.touchscreen` constant.
    pub touch_screen: i32,
    /// Android `Configuration.keyboard` constant.
    pub keyboard: i32,
    /// Android `Configuration.navigation` constant.
    pub navigation: i32,
    /// Android `Configuration.screenLayout` size bits.
    pub screen_layout: i32,
    /// Physical keyboard present.
    pub has_hard_keyboard: bool,
    /// D-pad or trackball present.
    pub has_five_way_navigation: bool,
    /// OpenGL ES version, major in the high 16 bits (`0x30000` is 3.0).
    pub gl_es_version: i32,
    /// Supported ABIs, most preferred first.
    pub abis: Vec<String>,
    /// Shared libraries on the system image.
    pub shared_libraries: Vec<String>,
    /// `PackageManager` feature names the backend filters apps by.
    pub features: Vec<String>,
    /// OpenGL extension names.
    pub gl_extensions: Vec<String>,
    /// Locales the firmware ships.
    pub locales: Vec<String>,
    /// Version code of the emulated store application.
    pub vending_version: u32,
    /// Display form of `vending_version`, used in the store user agent.
    pub vending_version_string: String,
    /// Google Services Framework id, used as device id when no checkin ran.
    #[serde(default)]
    pub gsf_id: Option<u64>,
}

impl DeviceProfile {
    /// `User-Agent` for store (`fdfe`) calls.
    pub fn store_user_agent(&self) -> String {
        format!(
            "Android-Finsky/{} (api=3,versionCode={},sdk={},device={},hardware={},product={},platformVersionRelease={},model={},buildId={},isWideScreen=0,supportedAbis={})",
            self.vending_version_string,
            self.vending_version,
            self.sdk_version,
            self.device,
            self.hardware,
            self.product,
            self.release,
            self.model.replace(' ', "%20"),
            self.build_id,
            self.abis.join(";"),
        )
    }

    /// `User-Agent` for the checkin exchange.
    pub fn checkin_user_agent(&self) -> String {
        format!(
            "Android-Checkin/2.0 ({} {}); gzip",
            self.device, self.build_id
        )
    }

    /// `User-Agent` for the token exchange.
    pub fn auth_user_agent(&self) -> String {
        format!("GoogleAuth/1.4 ({} {})", self.device, self.build_id)
    }

    /// `User-Agent` for the raw payload download.
    pub fn download_user_agent(&self) -> String {
        format!(
            "AndroidDownloadManager/{} (Linux; U; Android {}; {} Build/{})",
            self.release, self.release, self.model, self.build_id
        )
    }

    /// `Accept-Language` value derived from the locale (`en_US` -> `en-US`).
    pub fn accept_language(&self) -> String {
        self.locale.replace('_', "-")
    }

    /// Language part of the locale (`en_US` -> `en`).
    pub fn language(&self) -> &str {
        self.locale.split('_').next().unwrap_or(&self.locale)
    }
}
