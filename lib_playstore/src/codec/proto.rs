//! # Store Protobuf Messages
//!
//! Rust representations of the store's proto2 messages, declared with the
//! `prost` derive. Only the fields this client reads or writes are listed;
//! prost skips every other field on decode, so newer backend schemas still
//! parse.

use prost::Message;

/// Top-level reply of every `fdfe` call.
#[derive(Clone, PartialEq, Message)]
pub struct ResponseWrapper {
    /// The reply proper.
    #[prost(message, optional, tag = "1")]
    pub payload: Option<Payload>,
    /// Out-of-band instructions sent alongside the payload.
    #[prost(message, optional, tag = "2")]
    pub commands: Option<ServerCommands>,
}

/// Union-like container; the backend populates exactly one member per reply.
#[derive(Clone, PartialEq, Message)]
pub struct Payload {
    /// Set on replies to `list`.
    #[prost(message, optional, tag = "1")]
    pub list_response: Option<ListResponse>,
    /// Set on replies to `details`.
    #[prost(message, optional, tag = "2")]
    pub details_response: Option<DetailsResponse>,
    /// Set on replies to `purchase`.
    #[prost(message, optional, tag = "4")]
    pub buy_response: Option<BuyResponse>,
    /// Set on replies to `search`.
    #[prost(message, optional, tag = "5")]
    pub search_response: Option<SearchResponse>,
    /// Set on replies to `browse`.
    #[prost(message, optional, tag = "7")]
    pub browse_response: Option<BrowseResponse>,
    /// Set on replies to `purchaseStatus`.
    #[prost(message, optional, tag = "8")]
    pub purchase_status_response: Option<PurchaseStatusResponse>,
    /// Set on replies to `bulkDetails`.
    #[prost(message, optional, tag = "19")]
    pub bulk_details_response: Option<BulkDetailsResponse>,
    /// Set on replies to `delivery`.
    #[prost(message, optional, tag = "21")]
    pub delivery_response: Option<DeliveryResponse>,
}

/// Out-of-band instructions, mostly user-visible error text.
#[derive(Clone, PartialEq, Message)]
pub struct ServerCommands {
    /// Ask the client to drop cached replies.
    #[prost(bool, optional, tag = "1")]
    pub clear_cache: Option<bool>,
    /// Text meant for the user, e.g. why a request was refused.
    #[prost(string, optional, tag = "2")]
    pub display_error_message: Option<String>,
    /// Backend-side debugging text.
    #[prost(string, optional, tag = "3")]
    pub log_error_stacktrace: Option<String>,
}

/// Reply to `details?doc=`.
#[derive(Clone, PartialEq, Message)]
pub struct DetailsResponse {
    /// The requested document.
    #[prost(message, optional, tag = "4")]
    pub doc_v2: Option<DocV2>,
    /// Legal footer text.
    #[prost(string, optional, tag = "5")]
    pub footer_html: Option<String>,
}

/// A store document: an app, or a container of documents.
#[derive(Clone, PartialEq, Message)]
pub struct DocV2 {
    /// Package name for apps, an opaque id for containers.
    #[prost(string, optional, tag = "1")]
    pub docid: Option<String>,
    /// Document id as the backend vertical knows it.
    #[prost(string, optional, tag = "2")]
    pub backend_docid: Option<String>,
    /// 1 for an app; other values are containers or media.
    #[prost(int32, optional, tag = "3")]
    pub doc_type: Option<i32>,
    /// Store vertical; 3 is Android apps.
    #[prost(int32, optional, tag = "4")]
    pub backend_id: Option<i32>,
    /// Display name.
    #[prost(string, optional, tag = "5")]
    pub title: Option<String>,
    /// Developer display name.
    #[prost(string, optional, tag = "6")]
    pub creator: Option<String>,
    /// Long description as HTML.
    #[prost(string, optional, tag = "7")]
    pub description_html: Option<String>,
    /// Price points; free apps carry one with zero micros.
    #[prost(message, repeated, tag = "8")]
    pub offer: Vec<Offer>,
    /// Nested documents of a container.
    #[prost(message, repeated, tag = "11")]
    pub child: Vec<DocV2>,
    /// Present on containers; holds the next-page path.
    #[prost(message, optional, tag = "12")]
    pub container_metadata: Option<ContainerMetadata>,
    /// App details, when the document is an app.
    #[prost(message, optional, tag = "13")]
    pub details: Option<DocumentDetails>,
    /// Star rating summary.
    #[prost(message, optional, tag = "14")]
    pub aggregate_rating: Option<AggregateRating>,
    /// Related listings linked from the page.
    #[prost(message, optional, tag = "15")]
    pub annotations: Option<Annotations>,
    /// Store path of this document's details.
    #[prost(string, optional, tag = "16")]
    pub details_url: Option<String>,
    /// Public web link.
    #[prost(string, optional, tag = "17")]
    pub share_url: Option<String>,
}

/// One price point of a document.
#[derive(Clone, PartialEq, Message)]
pub struct Offer {
    /// Price in millionths of the currency unit.
    #[prost(int64, optional, tag = "1")]
    pub micros: Option<i64>,
    /// ISO 4217 code.
    #[prost(string, optional, tag = "2")]
    pub currency_code: Option<String>,
    /// Localized display string, e.g. `$1.99`.
    #[prost(string, optional, tag = "3")]
    pub formatted_amount: Option<String>,
    /// 1 for a plain purchase.
    #[prost(int32, optional, tag = "8")]
    pub offer_type: Option<i32>,
}

/// Star rating summary.
#[derive(Clone, PartialEq, Message)]
pub struct AggregateRating {
    /// Rating scheme; 1 is five stars.
    #[prost(int32, optional, tag = "1")]
    pub r#type: Option<i32>,
    /// Mean rating, 0 to 5.
    #[prost(float, optional, tag = "2")]
    pub star_rating: Option<f32>,
    /// Number of ratings.
    #[prost(uint64, optional, tag = "3")]
    pub ratings_count: Option<u64>,
}

/// Pagination and sizing metadata of a container document.
#[derive(Clone, PartialEq, Message)]
pub struct ContainerMetadata {
    /// Path of the full listing.
    #[prost(string, optional, tag = "1")]
    pub browse_url: Option<String>,
    /// Path of the following page; absent on the last one.
    #[prost(string, optional, tag = "2")]
    pub next_page_url: Option<String>,
    /// Ranking score.
    #[prost(double, optional, tag = "3")]
    pub relevance: Option<f64>,
    /// Approximate total across all pages.
    #[prost(int64, optional, tag = "4")]
    pub estimated_results: Option<i64>,
    /// Opaque tracking value.
    #[prost(string, optional, tag = "5")]
    pub analytics_cookie: Option<String>,
    /// Whether the children are ranked.
    #[prost(bool, optional, tag = "6")]
    pub ordered: Option<bool>,
}

/// Type-specific details; only apps are modelled.
#[derive(Clone, PartialEq, Message)]
pub struct DocumentDetails {
    /// Set for app documents.
    #[prost(message, optional, tag = "1")]
    pub app_details: Option<AppDetails>,
}

/// Details carried by app documents.
#[derive(Clone, PartialEq, Message)]
pub struct AppDetails {
    /// Developer display name.
    #[prost(string, optional, tag = "1")]
    pub developer_name: Option<String>,
    /// Major version, when the developer sets one.
    #[prost(int32, optional, tag = "2")]
    pub major_version_number: Option<i32>,
    /// Latest version code offered to this device.
    #[prost(int32, optional, tag = "3")]
    pub version_code: Option<i32>,
    /// Human-readable version, e.g. `4.2.1`.
    #[prost(string, optional, tag = "4")]
    pub version_string: Option<String>,
    /// App name.
    #[prost(string, optional, tag = "5")]
    pub title: Option<String>,
    /// Category ids such as `GAME_ARCADE`.
    #[prost(string, repeated, tag = "7")]
    pub app_category: Vec<String>,
    /// Maturity rating code.
    #[prost(int32, optional, tag = "8")]
    pub content_rating: Option<i32>,
    /// APK size in bytes.
    #[prost(int64, optional, tag = "9")]
    pub installation_size: Option<i64>,
    /// Android permission names the app requests.
    #[prost(string, repeated, tag = "10")]
    pub permission: Vec<String>,
    /// Support address.
    #[prost(string, optional, tag = "11")]
    pub developer_email: Option<String>,
    /// Developer home page.
    #[prost(string, optional, tag = "12")]
    pub developer_website: Option<String>,
    /// Install bucket as display text, e.g. `1,000,000+`.
    #[prost(string, optional, tag = "13")]
    pub num_downloads: Option<String>,
    /// Android package name.
    #[prost(string, optional, tag = "14")]
    pub package_name: Option<String>,
    /// Release notes as HTML.
    #[prost(string, optional, tag = "15")]
    pub recent_changes_html: Option<String>,
    /// Display text, not a timestamp.
    #[prost(string, optional, tag = "16")]
    pub upload_date: Option<String>,
}

/// Links from a details page to related listings.
#[derive(Clone, PartialEq, Message)]
pub struct Annotations {
    /// Reviews listing.
    #[prost(message, optional, tag = "1")]
    pub section_ratings_and_reviews: Option<SectionMetadata>,
    /// Listing of apps installed by the same users.
    #[prost(message, optional, tag = "2")]
    pub section_cross_sell: Option<SectionMetadata>,
    /// Similar apps.
    #[prost(message, optional, tag = "3")]
    pub section_related: Option<SectionMetadata>,
    /// Other apps from the same developer.
    #[prost(message, optional, tag = "4")]
    pub section_more_by: Option<SectionMetadata>,
    /// Other works of the same creator.
    #[prost(message, optional, tag = "5")]
    pub section_body_of_work: Option<SectionMetadata>,
    /// Main content listing of a container.
    #[prost(message, optional, tag = "6")]
    pub section_core_content: Option<SectionMetadata>,
}

/// One related listing linked from a details page.
#[derive(Clone, PartialEq, Message)]
pub struct SectionMetadata {
    /// Section title shown on the page.
    #[prost(string, optional, tag = "1")]
    pub header: Option<String>,
    /// Store path of the listing.
    #[prost(string, optional, tag = "2")]
    pub list_url: Option<String>,
    /// Path of the full listing when it differs from `list_url`.
    #[prost(string, optional, tag = "3")]
    pub browse_url: Option<String>,
    /// Section blurb as HTML.
    #[prost(string, optional, tag = "4")]
    pub description_html: Option<String>,
}

/// Reply to `list` and `rec`.
#[derive(Clone, PartialEq, Message)]
pub struct ListResponse {
    /// Usually a single container holding the page.
    #[prost(message, repeated, tag = "2")]
    pub doc: Vec<DocV2>,
}

/// Reply to `search`.
#[derive(Clone, PartialEq, Message)]
pub struct SearchResponse {
    /// Query as the backend understood it.
    #[prost(string, optional, tag = "1")]
    pub original_query: Option<String>,
    /// Spelling correction offered by the backend.
    #[prost(string, optional, tag = "2")]
    pub suggested_query: Option<String>,
    /// Usually a single container holding the page.
    #[prost(message, repeated, tag = "5")]
    pub doc: Vec<DocV2>,
}

/// Reply to `browse`: the category tree level.
#[derive(Clone, PartialEq, Message)]
pub struct BrowseResponse {
    /// Path of the apps listed under this level.
    #[prost(string, optional, tag = "1")]
    pub contents_url: Option<String>,
    /// Path of the promotional listing.
    #[prost(string, optional, tag = "2")]
    pub promo_url: Option<String>,
    /// Entries of this level.
    #[prost(message, repeated, tag = "3")]
    pub category: Vec<BrowseLink>,
    /// Path from the root to this level.
    #[prost(message, repeated, tag = "4")]
    pub breadcrumb: Vec<BrowseLink>,
}

/// A named link to a category listing.
#[derive(Clone, PartialEq, Message)]
pub struct BrowseLink {
    /// Display name.
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    /// Store path of the linked listing.
    #[prost(string, optional, tag = "3")]
    pub data_url: Option<String>,
}

/// Body posted to `bulkDetails`.
#[derive(Clone, PartialEq, Message)]
pub struct BulkDetailsRequest {
    /// Packages to describe, in reply order.
    #[prost(string, repeated, tag = "1")]
    pub docid: Vec<String>,
    /// Also describe nested documents.
    #[prost(bool, optional, tag = "2")]
    pub include_child_docs: Option<bool>,
    /// Ask for full app details instead of summaries.
    #[prost(bool, optional, tag = "3")]
    pub include_details: Option<bool>,
}

/// Reply to `bulkDetails`.
#[derive(Clone, PartialEq, Message)]
pub struct BulkDetailsResponse {
    /// One entry per requested docid, in request order.
    #[prost(message, repeated, tag = "1")]
    pub entry: Vec<BulkDetailsEntry>,
}

/// One slot per requested docid; `doc` is absent for unknown packages.
#[derive(Clone, PartialEq, Message)]
pub struct BulkDetailsEntry {
    /// The document, absent when unknown.
    #[prost(message, optional, tag = "1")]
    pub doc: Option<DocV2>,
}

/// Reply to `purchase`.
#[derive(Clone, PartialEq, Message)]
pub struct BuyResponse {
    /// Outcome and delivery data.
    #[prost(message, optional, tag = "39")]
    pub purchase_status_response: Option<PurchaseStatusResponse>,
    /// Token for a later `delivery` call.
    #[prost(string, optional, tag = "55")]
    pub encoded_delivery_token: Option<String>,
}

/// Outcome of a purchase, with the delivery data when granted.
#[derive(Clone, PartialEq, Message)]
pub struct PurchaseStatusResponse {
    /// 1 when the purchase was granted.
    #[prost(int32, optional, tag = "1")]
    pub status: Option<i32>,
    /// Refusal text.
    #[prost(string, optional, tag = "2")]
    pub status_msg: Option<String>,
    /// Headline of the refusal text.
    #[prost(string, optional, tag = "3")]
    pub status_title: Option<String>,
    /// Short form of the refusal text.
    #[prost(string, optional, tag = "4")]
    pub brief_message: Option<String>,
    /// Web page explaining the status.
    #[prost(string, optional, tag = "5")]
    pub info_url: Option<String>,
    /// Where to fetch the APK; present when granted.
    #[prost(message, optional, tag = "8")]
    pub app_delivery_data: Option<AndroidAppDeliveryData>,
}

/// Reply to `delivery` for an already owned app.
#[derive(Clone, PartialEq, Message)]
pub struct DeliveryResponse {
    /// 1 when delivery data follows.
    #[prost(int32, optional, tag = "1")]
    pub status: Option<i32>,
    /// Where to fetch the APK.
    #[prost(message, optional, tag = "2")]
    pub app_delivery_data: Option<AndroidAppDeliveryData>,
}

/// Signed download location of a purchased APK.
#[derive(Clone, PartialEq, Message)]
pub struct AndroidAppDeliveryData {
    /// Payload size in bytes.
    #[prost(int64, optional, tag = "1")]
    pub download_size: Option<i64>,
    /// Digest of the payload.
    #[prost(string, optional, tag = "2")]
    pub signature: Option<String>,
    /// Signed, short-lived payload URL.
    #[prost(string, optional, tag = "3")]
    pub download_url: Option<String>,
    /// Cookies to send with the payload GET.
    #[prost(message, repeated, tag = "5")]
    pub download_auth_cookie: Vec<HttpCookie>,
    /// Copy-protected install.
    #[prost(bool, optional, tag = "6")]
    pub forward_locked: Option<bool>,
    /// Refund window in milliseconds.
    #[prost(int64, optional, tag = "7")]
    pub refund_timeout: Option<i64>,
    /// Install pushed from the web store.
    #[prost(bool, optional, tag = "8")]
    pub server_initiated: Option<bool>,
}

/// A cookie the payload host expects.
#[derive(Clone, PartialEq, Message)]
pub struct HttpCookie {
    /// Cookie name.
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    /// Cookie value.
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
}

// --- Checkin ---

/// Body posted to the checkin endpoint.
#[derive(Clone, PartialEq, Message)]
pub struct AndroidCheckinRequest {
    /// Android id of an earlier checkin; 0 for a new device.
    #[prost(int64, optional, tag = "2")]
    pub id: Option<i64>,
    /// Handset description.
    #[prost(message, optional, tag = "4")]
    pub checkin: Option<AndroidCheckinProto>,
    /// Locale such as `en_US`.
    #[prost(string, optional, tag = "6")]
    pub locale: Option<String>,
    /// Random per-install id.
    #[prost(int64, optional, tag = "7")]
    pub logging_id: Option<i64>,
    /// MAC addresses; left empty.
    #[prost(string, repeated, tag = "9")]
    pub mac_addr: Vec<String>,
    /// Mobile equipment id; left empty.
    #[prost(string, optional, tag = "10")]
    pub meid: Option<String>,
    /// `[email]token` entries tying accounts to the device.
    #[prost(string, repeated, tag = "11")]
    pub account_cookie: Vec<String>,
    /// Olson zone name.
    #[prost(string, optional, tag = "12")]
    pub time_zone: Option<String>,
    /// Checkin protocol version; 3 here.
    #[prost(int32, optional, tag = "14")]
    pub version: Option<i32>,
    /// OTA certificates; left empty.
    #[prost(string, repeated, tag = "15")]
    pub ota_cert: Vec<String>,
    /// Capabilities used for app compatibility.
    #[prost(message, optional, tag = "18")]
    pub device_configuration: Option<DeviceConfigurationProto>,
    /// Kinds of the `mac_addr` entries.
    #[prost(string, repeated, tag = "19")]
    pub mac_addr_type: Vec<String>,
    /// Checkin fragment number.
    #[prost(int32, optional, tag = "20")]
    pub fragment: Option<i32>,
    /// Android user profile; 0 is the owner.
    #[prost(int32, optional, tag = "22")]
    pub user_serial_number: Option<i32>,
}

/// Checkin event describing the handset.
#[derive(Clone, PartialEq, Message)]
pub struct AndroidCheckinProto {
    /// Firmware build properties.
    #[prost(message, optional, tag = "1")]
    pub build: Option<AndroidBuildProto>,
    /// 0 on a first checkin.
    #[prost(int64, optional, tag = "2")]
    pub last_checkin_msec: Option<i64>,
    /// MCC and MNC of the network.
    #[prost(string, optional, tag = "6")]
    pub cell_operator: Option<String>,
    /// MCC and MNC of the SIM.
    #[prost(string, optional, tag = "7")]
    pub sim_operator: Option<String>,
    /// Roaming state, e.g. `mobile-notroaming`.
    #[prost(string, optional, tag = "8")]
    pub roaming: Option<String>,
    /// Android user profile; 0 is the owner.
    #[prost(int32, optional, tag = "9")]
    pub user_number: Option<i32>,
}

/// Build properties of the emulated firmware.
#[derive(Clone, PartialEq, Message)]
pub struct AndroidBuildProto {
    /// Build fingerprint.
    #[prost(string, optional, tag = "1")]
    pub id: Option<String>,
    /// Board name.
    #[prost(string, optional, tag = "2")]
    pub product: Option<String>,
    /// Carrier brand.
    #[prost(string, optional, tag = "3")]
    pub carrier: Option<String>,
    /// Baseband version.
    #[prost(string, optional, tag = "4")]
    pub radio: Option<String>,
    /// Bootloader version.
    #[prost(string, optional, tag = "5")]
    pub bootloader: Option<String>,
    /// Client id, `android-google` for stock builds.
    #[prost(string, optional, tag = "6")]
    pub client: Option<String>,
    /// Build time in seconds since the epoch.
    #[prost(int64, optional, tag = "7")]
    pub timestamp: Option<i64>,
    /// Play services version.
    #[prost(int32, optional, tag = "8")]
    pub google_services: Option<i32>,
    /// Device code name.
    #[prost(string, optional, tag = "9")]
    pub device: Option<String>,
    /// API level.
    #[prost(int32, optional, tag = "10")]
    pub sdk_version: Option<i32>,
    /// Marketing model name.
    #[prost(string, optional, tag = "11")]
    pub model: Option<String>,
    /// Manufacturer name.
    #[prost(string, optional, tag = "12")]
    pub manufacturer: Option<String>,
    /// Product code name.
    #[prost(string, optional, tag = "13")]
    pub build_product: Option<String>,
    /// Whether the build came over the air.
    #[prost(bool, optional, tag = "14")]
    pub ota_installed: Option<bool>,
}

/// Hardware and software capabilities used for compatibility filtering.
#[derive(Clone, PartialEq, Message)]
pub struct DeviceConfigurationProto {
    /// Android `Configuration.touchscreen` constant.
    #[prost(int32, optional, tag = "1")]
    pub touch_screen: Option<i32>,
    /// Android `Configuration.keyboard` constant.
    #[prost(int32, optional, tag = "2")]
    pub keyboard: Option<i32>,
    /// Android `Configuration.navigation` constant.
    #[prost(int32, optional, tag = "3")]
    pub navigation: Option<i32>,
    /// Android `Configuration.screenLayout` size bits.
    #[prost(int32, optional, tag = "4")]
    pub screen_layout: Option<i32>,
    /// Physical keyboard present.
    #[prost(bool, optional, tag = "5")]
    pub has_hard_keyboard: Option<bool>,
    /// D-pad or trackball present.
    #[prost(bool, optional, tag = "6")]
    pub has_five_way_navigation: Option<bool>,
    /// Dots per inch.
    #[prost(int32, optional, tag = "7")]
    pub screen_density: Option<i32>,
    /// OpenGL ES version, major in the high 16 bits.
    #[prost(int32, optional, tag = "8")]
    pub gl_es_version: Option<i32>,
    /// Shared libraries on the system image.
    #[prost(string, repeated, tag = "9")]
    pub system_shared_library: Vec<String>,
    /// `PackageManager` feature names.
    #[prost(string, repeated, tag = "10")]
    pub system_available_feature: Vec<String>,
    /// Supported ABIs, preferred first.
    #[prost(string, repeated, tag = "11")]
    pub native_platform: Vec<String>,
    /// Pixels.
    #[prost(int32, optional, tag = "12")]
    pub screen_width: Option<i32>,
    /// Pixels.
    #[prost(int32, optional, tag = "13")]
    pub screen_height: Option<i32>,
    /// Locales the firmware ships.
    #[prost(string, repeated, tag = "14")]
    pub system_supported_locale: Vec<String>,
    /// OpenGL extension names.
    #[prost(string, repeated, tag = "15")]
    pub gl_extension: Vec<String>,
}

/// Checkin reply carrying the device identifiers.
#[derive(Clone, PartialEq, Message)]
pub struct AndroidCheckinResponse {
    /// Checkin statistics were accepted.
    #[prost(bool, optional, tag = "1")]
    pub stats_ok: Option<bool>,
    /// Server time.
    #[prost(int64, optional, tag = "3")]
    pub time_msec: Option<i64>,
    /// Settings digest.
    #[prost(string, optional, tag = "4")]
    pub digest: Option<String>,
    /// The device may use the store.
    #[prost(bool, optional, tag = "6")]
    pub market_ok: Option<bool>,
    /// Device identifier, sent later as hex in `X-DFE-Device-Id`.
    #[prost(fixed64, optional, tag = "7")]
    pub android_id: Option<u64>,
    /// Secret paired with `android_id`.
    #[prost(fixed64, optional, tag = "8")]
    pub security_token: Option<u64>,
    /// Sent back on the next checkin.
    #[prost(string, optional, tag = "12")]
    pub device_checkin_consistency_token: Option<String>,
}

/// Encode any message into a fresh buffer.
pub fn to_bytes<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}
