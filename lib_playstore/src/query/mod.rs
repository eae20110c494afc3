//! # Query Engine
//!
//! The read-only store operations, each one a [`Request`] built here, sent
//! through the [`Transport`] with the caller's [`Session`] and decoded into a
//! [`ResponseEnvelope`]. Listing operations can be expanded page by page
//! through [`pages::Pager`].
//!
//! ## Contained Modules:
//!
//! - **`pages`**: Continuation-following pager, `PageSet` and partial results.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Pagination over continuation markers.
pub mod pages;

pub use pages::{PageSet, Pager, PartialPages};

use std::collections::HashMap;

use serde::Serialize;

use crate::auth::Session;
use crate::codec::envelope::Section;
use crate::codec::{
    decode_response, DecodedResponse, Document, EncodedRequest, Operation, Request,
    ResponseEnvelope,
};
use crate::error::{QueryError, TransportError};
use crate::retrieve::{RetryMode, Transport};

/// Backend catalogue id of the apps corpus.
const APPS_CORPUS: i64 = 3;
/// Recommendation type "similar to this document".
const REC_SIMILAR: i64 = 1;

/// A related listing fetched alongside a details page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPage {
    /// The link that was followed.
    pub section: Section,
    /// First page of the linked listing.
    pub envelope: ResponseEnvelope,
}

/// A details lookup together with its related listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsWithPages {
    /// The details document.
    pub document: Document,
    /// One entry per section link that resolved.
    pub pages: Vec<RelatedPage>,
}

/// Issues store queries with one session.
#[derive(Clone, Copy)]
pub struct QueryEngine<'a> {
    transport: &'a Transport,
    session: &'a Session,
}

impl<'a> QueryEngine<'a> {
    /// Query through `transport` on behalf of `session`.
    pub fn new(transport: &'a Transport, session: &'a Session) -> Self {
        Self { transport, session }
    }

    /// Send `request` and decode the reply.
    pub async fn call(&self, request: &Request) -> Result<DecodedResponse, QueryError> {
        let encoded = request.encode()?;
        let mode = if request.op.is_idempotent() {
            RetryMode::Idempotent
        } else {
            RetryMode::Once
        };
        self.send(&encoded, mode).await
    }

    async fn send(
        &self,
        encoded: &EncodedRequest,
        mode: RetryMode,
    ) -> Result<DecodedResponse, QueryError> {
        let body = self
            .transport
            .execute(encoded, Some(self.session), mode)
            .await?;
        let decoded = decode_response(&body)?;
        if let Some(message) = &decoded.server_message {
            tracing::warn!(path = %encoded.target, message = %message, "backend message");
        }
        Ok(decoded)
    }

    /// Single-item lookup.
    pub async fn details(&self, package: &str) -> Result<Document, QueryError> {
        let request = Request::new(Operation::Details).with("doc", package);
        let decoded = match self.call(&request).await {
            Ok(decoded) => decoded,
            Err(QueryError::Transport(TransportError::HttpStatus { status: 404, .. })) => {
                return Err(QueryError::NotFound(package.to_string()))
            }
            Err(err) => return Err(err),
        };
        match decoded.envelope {
            ResponseEnvelope::Details(Some(doc)) => Ok(*doc),
            ResponseEnvelope::Details(None) => Err(QueryError::NotFound(package.to_string())),
            other => Err(QueryError::UnexpectedPayload {
                expected: "details",
                found: other.kind(),
            }),
        }
    }

    /// Details plus every related section listing the page links to.
    pub async fn details_with_pages(&self, package: &str) -> Result<DetailsWithPages, QueryError> {
        let document = self.details(package).await?;
        let mut pages = Vec::new();
        for section in &document.sections {
            let Some(list_url) = section.list_url.as_deref().filter(|u| !u.is_empty()) else {
                continue;
            };
            tracing::debug!(section = section.kind, url = %list_url, "fetching related page");
            let decoded = self
                .send(&EncodedRequest::raw(list_url), RetryMode::Idempotent)
                .await?;
            pages.push(RelatedPage {
                section: section.clone(),
                envelope: decoded.envelope,
            });
        }
        Ok(DetailsWithPages { document, pages })
    }

    /// Details of many packages in one round trip.
    ///
    /// The result has one slot per input, in input order; `None` marks a
    /// package the backend does not know.
    pub async fn bulk_details(
        &self,
        packages: &[String],
        include_child_docs: bool,
        include_details: bool,
    ) -> Result<Vec<Option<Document>>, QueryError> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }
        let request = Request::new(Operation::BulkDetails)
            .with("docid", packages.to_vec())
            .with("includeChildDocs", include_child_docs)
            .with("includeDetails", include_details);
        let entries = match self.call(&request).await?.envelope {
            ResponseEnvelope::BulkDetails(entries) => entries,
            other => {
                return Err(QueryError::UnexpectedPayload {
                    expected: "bulkDetails",
                    found: other.kind(),
                })
            }
        };
        Ok(align_bulk(packages, entries))
    }

    /// First search page for `query` among apps.
    pub fn search_request(query: &str) -> Request {
        Request::new(Operation::Search)
            .with("c", APPS_CORPUS)
            .with("q", query)
    }

    /// First page of a search. Expand with [`QueryEngine::get_pages`].
    pub async fn search(&self, query: &str) -> Result<ResponseEnvelope, QueryError> {
        Ok(self.call(&Self::search_request(query)).await?.envelope)
    }

    /// Top level of the app category tree.
    pub fn browse_request() -> Request {
        Request::new(Operation::Browse).with("c", APPS_CORPUS)
    }

    /// Top-level categories.
    pub async fn browse(&self) -> Result<ResponseEnvelope, QueryError> {
        Ok(self.call(&Self::browse_request()).await?.envelope)
    }

    /// Request for the category hierarchy level selected by `category` and
    /// `subcategory`.
    pub fn list_request(
        category: Option<&str>,
        subcategory: Option<&str>,
    ) -> Result<Request, QueryError> {
        match (category, subcategory) {
            (None, None) => Ok(Self::browse_request()),
            (None, Some(sub)) => Err(QueryError::InvalidArgument(format!(
                "subcategory `{}` given without a category",
                sub
            ))),
            (Some(cat), sub) => Ok(Request::new(Operation::List)
                .with("c", APPS_CORPUS)
                .with("cat", cat)
                .with_opt("ctr", sub)),
        }
    }

    /// Categories, subcategories of `category`, or the apps of a subcategory.
    pub async fn list(
        &self,
        category: Option<&str>,
        subcategory: Option<&str>,
    ) -> Result<ResponseEnvelope, QueryError> {
        let request = Self::list_request(category, subcategory)?;
        Ok(self.call(&request).await?.envelope)
    }

    /// Recommendations seeded by `package`.
    pub fn similar_request(package: &str) -> Request {
        Request::new(Operation::Similar)
            .with("c", APPS_CORPUS)
            .with("rt", REC_SIMILAR)
            .with("doc", package)
    }

    /// Apps the backend recommends as similar to `package`.
    pub async fn list_similar(&self, package: &str) -> Result<ResponseEnvelope, QueryError> {
        Ok(self.call(&Self::similar_request(package)).await?.envelope)
    }

    /// GET an arbitrary `fdfe` path and decode whatever comes back.
    pub async fn free_request(&self, path: &str) -> Result<ResponseEnvelope, QueryError> {
        Ok(self
            .send(&EncodedRequest::raw(path), RetryMode::Idempotent)
            .await?
            .envelope)
    }

    /// Lazily page through `request`.
    pub fn pager(&self, request: Request) -> Pager<'a> {
        Pager::new(*self, request)
    }

    /// Follow continuation markers from `request` until the backend stops
    /// returning them.
    pub async fn get_pages(&self, request: Request) -> Result<PageSet, PartialPages> {
        self.pager(request).into_page_set().await
    }

    /// Like [`QueryEngine::get_pages`] when the first page was already fetched.
    /// `first` leads the set and is not requested again.
    pub async fn get_pages_from(
        &self,
        request: Request,
        first: ResponseEnvelope,
    ) -> Result<PageSet, PartialPages> {
        Pager::starting_with(*self, request, first)
            .into_page_set()
            .await
    }
}

fn align_bulk(packages: &[String], entries: Vec<Option<Document>>) -> Vec<Option<Document>> {
    if entries.len() == packages.len() {
        return entries;
    }
    tracing::debug!(
        requested = packages.len(),
        returned = entries.len(),
        "bulk reply count differs, aligning by docid"
    );
    let by_id: HashMap<String, Document> = entries
        .into_iter()
        .flatten()
        .map(|doc| (doc.docid.clone(), doc))
        .collect();
    // A package requested twice gets a copy in each slot.
    packages.iter().map(|p| by_id.get(p).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document {
            docid: id.into(),
            title: None,
            creator: None,
            description_html: None,
            details_url: None,
            share_url: None,
            offers: vec![],
            rating: None,
            app: None,
            sections: vec![],
            browse_url: None,
        }
    }

    #[test]
    fn bulk_alignment_by_position_and_by_id() {
        let packages: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let positional = align_bulk(&packages, vec![Some(doc("a")), None, Some(doc("c"))]);
        assert_eq!(positional.len(), 3);
        assert!(positional[1].is_none());

        let compacted = align_bulk(&packages, vec![Some(doc("c")), Some(doc("a"))]);
        let ids: Vec<_> = compacted
            .iter()
            .map(|d| d.as_ref().map(|d| d.docid.as_str()))
            .collect();
        assert_eq!(ids, [Some("a"), None, Some("c")]);

        let repeated: Vec<String> = ["a", "a", "b"].iter().map(|s| s.to_string()).collect();
        let deduplicated = align_bulk(&repeated, vec![Some(doc("a")), Some(doc("b"))]);
        let ids: Vec<_> = deduplicated
            .iter()
            .map(|d| d.as_ref().map(|d| d.docid.as_str()))
            .collect();
        assert_eq!(ids, [Some("a"), Some("a"), Some("b")]);
    }

    #[test]
    fn list_levels() {
        assert_eq!(
            QueryEngine::list_request(None, None).unwrap().op,
            Operation::Browse
        );
        assert!(matches!(
            QueryEngine::list_request(None, Some("apps_topselling_free")),
            Err(QueryError::InvalidArgument(_))
        ));
        let sub = QueryEngine::list_request(Some("GAME"), None)
            .unwrap()
            .encode()
            .unwrap();
        assert_eq!(sub.target, "list?c=3&cat=GAME");
        let apps = QueryEngine::list_request(Some("GAME"), Some("apps_topselling_free"))
            .unwrap()
            .encode()
            .unwrap();
        assert_eq!(apps.target, "list?c=3&cat=GAME&ctr=apps_topselling_free");
    }

    #[test]
    fn similar_target() {
        let encoded = QueryEngine::similar_request("com.a").encode().unwrap();
        assert_eq!(encoded.target, "rec?c=3&doc=com.a&rt=1");
    }
}
