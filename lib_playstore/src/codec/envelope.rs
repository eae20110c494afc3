//! Decoded store responses.
//!
//! The backend wraps every answer in one `ResponseWrapper` whose payload has a
//! dozen optional members. [`decode_response`] inspects them once, in a fixed
//! order, and yields a [`ResponseEnvelope`] with exactly one variant set.

use bytes::Bytes;
use serde::Serialize;

use super::proto::{
    self, AndroidAppDeliveryData, Annotations, DocV2, ResponseWrapper, SectionMetadata,
};
use super::request::ContinuationMarker;
use super::wire;
use crate::error::CodecError;

/// Purchase status meaning "granted".
pub const PURCHASE_STATUS_OK: i32 = 1;

/// One offer of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Millionths of the currency unit; `Some(0)` for free apps.
    pub micros: Option<i64>,
    /// ISO 4217 code.
    pub currency_code: Option<String>,
    /// Localized display form, e.g. `$1.99`.
    pub formatted_amount: Option<String>,
    /// 1 for a plain purchase.
    pub offer_type: Option<i32>,
}

/// Aggregate user rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Mean of all ratings, 0 to 5.
    pub star_rating: Option<f32>,
    /// Number of ratings.
    pub ratings_count: Option<u64>,
}

/// App-specific part of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    /// Android package name, normally equal to the docid.
    pub package_name: Option<String>,
    /// Latest version code offered to the emulated device.
    pub version_code: Option<i32>,
    /// Display version, e.g. `4.2.1`.
    pub version_string: Option<String>,
    /// Developer display name.
    pub developer_name: Option<String>,
    /// Support address.
    pub developer_email: Option<String>,
    /// Developer home page.
    pub developer_website: Option<String>,
    /// Display text as the store formats it, not a timestamp.
    pub upload_date: Option<String>,
    /// APK size in bytes.
    pub installation_size: Option<i64>,
    /// Install bucket, e.g. `1,000,000+`.
    pub num_downloads: Option<String>,
    /// Release notes as HTML.
    pub recent_changes_html: Option<String>,
    /// Category ids such as `GAME_ARCADE`.
    pub categories: Vec<String>,
    /// Android permission names.
    pub permissions: Vec<String>,
}

/// A link from a details page to a related listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Which annotation slot it came from: `related`, `moreBy`, `crossSell`,
    /// `ratingsAndReviews`, `bodyOfWork` or `coreContent`.
    pub kind: &'static str,
    /// Title shown on the page.
    pub header: Option<String>,
    /// Store path of the listing, relative to the API base.
    pub list_url: Option<String>,
}

/// A store document flattened for callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Package name for apps; empty when the backend sent none.
    pub docid: String,
    /// Display name.
    pub title: Option<String>,
    /// Developer display name.
    pub creator: Option<String>,
    /// Long description as HTML.
    pub description_html: Option<String>,
    /// Store path of the details page.
    pub details_url: Option<String>,
    /// Public web link.
    pub share_url: Option<String>,
    /// Price points; free apps carry one with zero micros.
    pub offers: Vec<Price>,
    /// User rating summary.
    pub rating: Option<Rating>,
    /// Set for app documents only.
    pub app: Option<AppInfo>,
    /// Related listings, in annotation order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    /// Browse URL of a container document (subcategory entries carry one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browse_url: Option<String>,
}

impl Document {
    /// Latest version code the backend offers for this device.
    pub fn version_code(&self) -> Option<i32> {
        self.app.as_ref().and_then(|a| a.version_code)
    }
}

impl From<&DocV2> for Document {
    fn from(doc: &DocV2) -> Self {
        let app = doc
            .details
            .as_ref()
            .and_then(|d| d.app_details.as_ref())
            .map(|a| AppInfo {
                package_name: a.package_name.clone(),
                version_code: a.version_code,
                version_string: a.version_string.clone(),
                developer_name: a.developer_name.clone(),
                developer_email: a.developer_email.clone(),
                developer_website: a.developer_website.clone(),
                upload_date: a.upload_date.clone(),
                installation_size: a.installation_size,
                num_downloads: a.num_downloads.clone(),
                recent_changes_html: a.recent_changes_html.clone(),
                categories: a.app_category.clone(),
                permissions: a.permission.clone(),
            });
        Document {
            docid: doc.docid.clone().unwrap_or_default(),
            title: doc.title.clone(),
            creator: doc.creator.clone(),
            description_html: doc.description_html.clone(),
            details_url: doc.details_url.clone(),
            share_url: doc.share_url.clone(),
            offers: doc
                .offer
                .iter()
                .map(|o| Price {
                    micros: o.micros,
                    currency_code: o.currency_code.clone(),
                    formatted_amount: o.formatted_amount.clone(),
                    offer_type: o.offer_type,
                })
                .collect(),
            rating: doc.aggregate_rating.as_ref().map(|r| Rating {
                star_rating: r.star_rating,
                ratings_count: r.ratings_count,
            }),
            app,
            sections: doc.annotations.as_ref().map(sections).unwrap_or_default(),
            browse_url: doc
                .container_metadata
                .as_ref()
                .and_then(|m| m.browse_url.clone()),
        }
    }
}

fn sections(annotations: &Annotations) -> Vec<Section> {
    let slots: [(&'static str, &Option<SectionMetadata>); 6] = [
        ("ratingsAndReviews", &annotations.section_ratings_and_reviews),
        ("crossSell", &annotations.section_cross_sell),
        ("related", &annotations.section_related),
        ("moreBy", &annotations.section_more_by),
        ("bodyOfWork", &annotations.section_body_of_work),
        ("coreContent", &annotations.section_core_content),
    ];
    slots
        .into_iter()
        .filter_map(|(kind, meta)| {
            meta.as_ref().map(|m| Section {
                kind,
                header: m.header.clone(),
                list_url: m.list_url.clone(),
            })
        })
        .collect()
}

/// One entry of a browse level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Display name.
    pub name: Option<String>,
    /// Store path listing the entry's content.
    pub data_url: Option<String>,
}

/// Signed, single-use download location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDescriptor {
    /// Absolute payload URL.
    pub url: String,
    /// `(name, value)` cookies the payload fetch must present.
    pub cookies: Vec<(String, String)>,
    /// Payload size in bytes, as announced by the backend.
    pub download_size: Option<i64>,
    /// Payload digest, as announced by the backend.
    pub signature: Option<String>,
}

impl DeliveryDescriptor {
    fn from_proto(data: &AndroidAppDeliveryData) -> Option<Self> {
        let url = data.download_url.clone().filter(|u| !u.is_empty())?;
        Some(DeliveryDescriptor {
            url,
            cookies: data
                .download_auth_cookie
                .iter()
                .filter_map(|c| Some((c.name.clone()?, c.value.clone().unwrap_or_default())))
                .collect(),
            download_size: data.download_size,
            signature: data.signature.clone(),
        })
    }

    /// `Cookie` header value, `None` when no cookie is required.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Outcome of a purchase/delivery call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryGrant {
    /// [`PURCHASE_STATUS_OK`] when granted.
    pub status: Option<i32>,
    /// Refusal text from the backend.
    pub status_message: Option<String>,
    /// Where to fetch the payload; absent when refused.
    pub descriptor: Option<DeliveryDescriptor>,
}

/// One decoded store answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ResponseEnvelope {
    /// Single-item details; `None` when the backend returned an empty shell.
    Details(Option<Box<Document>>),
    /// One page of a listing, search or recommendation.
    ItemList {
        /// Documents on this page.
        items: Vec<Document>,
        /// Cursor to the next page; `None` on the last one.
        continuation: Option<ContinuationMarker>,
    },
    /// Aligned with the requested ids; `None` marks an unknown package.
    BulkDetails(Vec<Option<Document>>),
    /// A browse level.
    Categories(Vec<Category>),
    /// A page that carries nothing but the cursor to the next one.
    Continuation(ContinuationMarker),
    /// A payload none of the known members matched, kept undecoded.
    #[serde(serialize_with = "serialize_raw")]
    Raw(Bytes),
    /// Outcome of a purchase or delivery call.
    Delivery(DeliveryGrant),
}

fn serialize_raw<S: serde::Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("<{} bytes>", bytes.len()))
}

impl ResponseEnvelope {
    /// Variant name, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseEnvelope::Details(_) => "details",
            ResponseEnvelope::ItemList { .. } => "itemList",
            ResponseEnvelope::BulkDetails(_) => "bulkDetails",
            ResponseEnvelope::Categories(_) => "categories",
            ResponseEnvelope::Continuation(_) => "continuation",
            ResponseEnvelope::Raw(_) => "raw",
            ResponseEnvelope::Delivery(_) => "delivery",
        }
    }

    /// Cursor to the next page, if this envelope has one.
    pub fn continuation(&self) -> Option<&ContinuationMarker> {
        match self {
            ResponseEnvelope::ItemList { continuation, .. } => continuation.as_ref(),
            ResponseEnvelope::Continuation(marker) => Some(marker),
            _ => None,
        }
    }

    /// Documents carried by list-shaped envelopes.
    pub fn items(&self) -> &[Document] {
        match self {
            ResponseEnvelope::ItemList { items, .. } => items,
            _ => &[],
        }
    }
}

/// Envelope plus the out-of-band message the backend attached, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    /// The decoded payload.
    pub envelope: ResponseEnvelope,
    /// Non-empty `displayErrorMessage` from the server commands.
    pub server_message: Option<String>,
}

/// Decode the body of an `fdfe` reply.
pub fn decode_response(body: &Bytes) -> Result<DecodedResponse, CodecError> {
    let wrapper: ResponseWrapper = wire::decode_message(body)?;
    let server_message = wrapper
        .commands
        .as_ref()
        .and_then(|c| c.display_error_message.clone())
        .filter(|m| !m.is_empty());
    let envelope = match wrapper.payload {
        Some(payload) => classify(payload, body),
        None => ResponseEnvelope::Raw(body.clone()),
    };
    Ok(DecodedResponse {
        envelope,
        server_message,
    })
}

fn classify(payload: proto::Payload, body: &Bytes) -> ResponseEnvelope {
    if let Some(delivery) = payload.delivery_response {
        return ResponseEnvelope::Delivery(DeliveryGrant {
            status: delivery.status,
            status_message: None,
            descriptor: delivery
                .app_delivery_data
                .as_ref()
                .and_then(DeliveryDescriptor::from_proto),
        });
    }
    let purchase = payload
        .buy_response
        .and_then(|b| b.purchase_status_response)
        .or(payload.purchase_status_response);
    if let Some(status) = purchase {
        return ResponseEnvelope::Delivery(DeliveryGrant {
            status: status.status,
            status_message: status.status_msg.or(status.brief_message),
            descriptor: status
                .app_delivery_data
                .as_ref()
                .and_then(DeliveryDescriptor::from_proto),
        });
    }
    if let Some(details) = payload.details_response {
        return ResponseEnvelope::Details(
            details
                .doc_v2
                .as_ref()
                .filter(|d| d.docid.is_some())
                .map(|d| Box::new(Document::from(d))),
        );
    }
    if let Some(bulk) = payload.bulk_details_response {
        return ResponseEnvelope::BulkDetails(
            bulk.entry
                .iter()
                .map(|e| e.doc.as_ref().filter(|d| d.docid.is_some()).map(Document::from))
                .collect(),
        );
    }
    if let Some(search) = payload.search_response {
        return item_list(&search.doc);
    }
    if let Some(list) = payload.list_response {
        return item_list(&list.doc);
    }
    if let Some(browse) = payload.browse_response {
        return ResponseEnvelope::Categories(
            browse
                .category
                .iter()
                .map(|c| Category {
                    name: c.name.clone(),
                    data_url: c.data_url.clone(),
                })
                .collect(),
        );
    }
    ResponseEnvelope::Raw(body.clone())
}

/// Container documents contribute their children; leaf documents are items
/// themselves. A childless document with a `nextPageUrl` is an exhausted
/// container and contributes only its cursor. The first cursor found wins.
fn item_list(docs: &[DocV2]) -> ResponseEnvelope {
    let mut items = Vec::new();
    let mut continuation = None;
    for doc in docs {
        let next = doc
            .container_metadata
            .as_ref()
            .and_then(|m| m.next_page_url.clone())
            .filter(|u| !u.is_empty());
        if !doc.child.is_empty() {
            items.extend(doc.child.iter().map(Document::from));
        } else if next.is_none() {
            items.push(Document::from(doc));
        }
        if continuation.is_none() {
            continuation = next.map(ContinuationMarker::new);
        }
    }
    match (items.is_empty(), continuation) {
        (true, Some(marker)) => ResponseEnvelope::Continuation(marker),
        (_, continuation) => ResponseEnvelope::ItemList {
            items,
            continuation,
        },
    }
}
