use bytes::Bytes;
use prost::Message;

use lib_playstore::codec::proto::{
    AndroidAppDeliveryData, AndroidCheckinResponse, AppDetails, BulkDetailsEntry,
    BulkDetailsResponse, BuyResponse, ContainerMetadata, DetailsResponse, DocV2, DocumentDetails,
    HttpCookie, ListResponse, Payload, PurchaseStatusResponse, ResponseWrapper, SearchResponse,
    ServerCommands,
};

/// `payload` inside a wrapper with no server commands.
pub fn wrap(payload: Payload) -> Bytes {
    Bytes::from(
        ResponseWrapper {
            payload: Some(payload),
            commands: None,
        }
        .encode_to_vec(),
    )
}

/// A wrapper with no payload and a user-visible error message.
pub fn server_message(message: &str) -> Bytes {
    Bytes::from(
        ResponseWrapper {
            payload: None,
            commands: Some(ServerCommands {
                display_error_message: Some(message.to_string()),
                ..Default::default()
            }),
        }
        .encode_to_vec(),
    )
}

/// An app document whose package name is `docid`.
pub fn app(docid: &str, version_code: i32) -> DocV2 {
    DocV2 {
        docid: Some(docid.to_string()),
        title: Some(format!("{} title", docid)),
        details: Some(DocumentDetails {
            app_details: Some(AppDetails {
                package_name: Some(docid.to_string()),
                version_code: Some(version_code),
                ..Default::default()
            }),
        }),
        ..Default::default()
    }
}

/// Reply to `details` for one app.
pub fn details(docid: &str, version_code: i32) -> Bytes {
    wrap(Payload {
        details_response: Some(DetailsResponse {
            doc_v2: Some(app(docid, version_code)),
            footer_html: None,
        }),
        ..Default::default()
    })
}

fn container(docids: &[&str], next: Option<&str>) -> DocV2 {
    DocV2 {
        docid: Some("container".to_string()),
        child: docids.iter().map(|d| app(d, 1)).collect(),
        container_metadata: Some(ContainerMetadata {
            next_page_url: next.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// One `list` page holding `docids`, pointing at `next` when given.
pub fn list_page(docids: &[&str], next: Option<&str>) -> Bytes {
    wrap(Payload {
        list_response: Some(ListResponse {
            doc: vec![container(docids, next)],
        }),
        ..Default::default()
    })
}

/// A search page holding `docids`, continued by `next`.
pub fn search_page(docids: &[&str], next: Option<&str>) -> Bytes {
    wrap(Payload {
        search_response: Some(SearchResponse {
            doc: vec![container(docids, next)],
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Bulk reply with one entry per slot; `None` is an unknown package.
pub fn bulk(entries: &[Option<&str>]) -> Bytes {
    wrap(Payload {
        bulk_details_response: Some(BulkDetailsResponse {
            entry: entries
                .iter()
                .map(|e| BulkDetailsEntry {
                    doc: e.map(|d| app(d, 1)),
                })
                .collect(),
        }),
        ..Default::default()
    })
}

/// Checkin reply assigning the given identity.
pub fn checkin(android_id: u64, security_token: u64) -> Bytes {
    Bytes::from(
        AndroidCheckinResponse {
            stats_ok: Some(true),
            android_id: Some(android_id),
            security_token: Some(security_token),
            ..Default::default()
        }
        .encode_to_vec(),
    )
}

/// A granted purchase pointing at `url`, guarded by one cookie.
pub fn purchase_granted(url: &str, cookie: (&str, &str), size: i64) -> Bytes {
    wrap(Payload {
        buy_response: Some(BuyResponse {
            purchase_status_response: Some(PurchaseStatusResponse {
                status: Some(1),
                app_delivery_data: Some(AndroidAppDeliveryData {
                    download_size: Some(size),
                    download_url: Some(url.to_string()),
                    download_auth_cookie: vec![HttpCookie {
                        name: Some(cookie.0.to_string()),
                        value: Some(cookie.1.to_string()),
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            }),
            encoded_delivery_token: None,
        }),
        ..Default::default()
    })
}

/// A purchase reply that refuses with `status` and `message`.
pub fn purchase_refused(status: i32, message: &str) -> Bytes {
    wrap(Payload {
        buy_response: Some(BuyResponse {
            purchase_status_response: Some(PurchaseStatusResponse {
                status: Some(status),
                status_msg: Some(message.to_string()),
                ..Default::default()
            }),
            encoded_delivery_token: None,
        }),
        ..Default::default()
    })
}

/// `Key=Value` lines of a token exchange reply.
pub fn auth_form(pairs: &[(&str, &str)]) -> Bytes {
    let text: String = pairs
        .iter()
        .map(|(k, v)| format!("{}={}\n", k, v))
        .collect();
    Bytes::from(text)
}
