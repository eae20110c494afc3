//! Continuation-following pagination.

use std::collections::HashSet;

use futures_util::stream::{self, Stream};
use serde::Serialize;
use thiserror::Error;

use super::QueryEngine;
use crate::codec::{ContinuationMarker, Document, Request, ResponseEnvelope};
use crate::error::{QueryError, TransportError};

/// Envelopes of one expansion, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PageSet {
    pages: Vec<ResponseEnvelope>,
}

impl PageSet {
    /// Pages in fetch order.
    pub fn pages(&self) -> &[ResponseEnvelope] {
        &self.pages
    }

    /// Take the pages out.
    pub fn into_pages(self) -> Vec<ResponseEnvelope> {
        self.pages
    }

    /// Number of pages, not documents.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when nothing was fetched.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Every document across all pages.
    pub fn items(&self) -> impl Iterator<Item = &Document> + '_ {
        self.pages.iter().flat_map(|p| p.items())
    }
}

impl From<Vec<ResponseEnvelope>> for PageSet {
    fn from(pages: Vec<ResponseEnvelope>) -> Self {
        Self { pages }
    }
}

/// The pages fetched before an expansion failed, and the failure.
#[derive(Debug, Error)]
#[error("pagination stopped after {} page(s): {}", .pages.len(), .error)]
pub struct PartialPages {
    /// Every page fetched before the failure.
    pub pages: PageSet,
    /// Why the expansion stopped.
    #[source]
    pub error: QueryError,
}

enum Cursor {
    Start,
    /// First page already fetched by the caller.
    Prefetched(Box<ResponseEnvelope>),
    Next(ContinuationMarker),
    /// The backend pointed back at a page already visited.
    Stale(ContinuationMarker),
    Done,
}

/// Restartable, finite, lazy sequence of pages.
///
/// Ends when a page carries no continuation marker, or right after the
/// first error.
pub struct Pager<'a> {
    engine: QueryEngine<'a>,
    request: Request,
    cursor: Cursor,
    seen: HashSet<ContinuationMarker>,
}

impl<'a> Pager<'a> {
    pub(crate) fn new(engine: QueryEngine<'a>, request: Request) -> Self {
        Self {
            engine,
            request,
            cursor: Cursor::Start,
            seen: HashSet::new(),
        }
    }

    /// Continue an expansion whose first page the caller already holds.
    pub fn starting_with(engine: QueryEngine<'a>, request: Request, first: ResponseEnvelope) -> Self {
        Self {
            cursor: Cursor::Prefetched(Box::new(first)),
            ..Self::new(engine, request)
        }
    }

    /// The request this pager expands.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// True once the last page was returned.
    pub fn is_done(&self) -> bool {
        matches!(self.cursor, Cursor::Done)
    }

    /// Start over from the first page.
    pub fn restart(&mut self) {
        self.cursor = Cursor::Start;
        self.seen.clear();
    }

    /// Fetch the next page; `None` once the expansion is over.
    ///
    /// A repeated marker ends the expansion with `StaleContinuation` on the
    /// call after the page that carried it.
    pub async fn next_page(&mut self) -> Option<Result<ResponseEnvelope, QueryError>> {
        let fetched = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return None,
            Cursor::Stale(marker) => {
                return Some(Err(QueryError::StaleContinuation(marker.to_string())))
            }
            Cursor::Prefetched(envelope) => Ok(*envelope),
            Cursor::Start => self.fetch(self.request.clone()).await,
            Cursor::Next(marker) => {
                let request = self.request.continued(marker);
                self.fetch(request).await
            }
        };
        let envelope = match fetched {
            Ok(envelope) => envelope,
            Err(err) => return Some(Err(err)),
        };

        if let Some(marker) = envelope.continuation() {
            self.cursor = if self.seen.insert(marker.clone()) {
                Cursor::Next(marker.clone())
            } else {
                tracing::warn!(marker = %marker, "continuation marker repeats an earlier page");
                Cursor::Stale(marker.clone())
            };
        }
        tracing::debug!(
            op = self.request.op.path(),
            kind = envelope.kind(),
            items = envelope.items().len(),
            more = !self.is_done(),
            "page fetched"
        );
        Some(Ok(envelope))
    }

    async fn fetch(&self, request: Request) -> Result<ResponseEnvelope, QueryError> {
        match self.engine.call(&request).await {
            Ok(decoded) => Ok(decoded.envelope),
            Err(QueryError::Transport(TransportError::HttpStatus {
                status: 404 | 410, ..
            })) if request.continuation.is_some() => Err(QueryError::StaleContinuation(
                request
                    .continuation
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            )),
            Err(err) => Err(err),
        }
    }

    /// Fetch every remaining page.
    pub async fn into_page_set(mut self) -> Result<PageSet, PartialPages> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await {
            match page {
                Ok(envelope) => pages.push(envelope),
                Err(error) => {
                    return Err(PartialPages {
                        pages: PageSet::from(pages),
                        error,
                    })
                }
            }
        }
        Ok(PageSet::from(pages))
    }

    /// The remaining pages as a `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = Result<ResponseEnvelope, QueryError>> + 'a {
        stream::unfold(self, |mut pager| async move {
            pager.next_page().await.map(|page| (page, pager))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Category;

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
    fn page_set_flattens_items_in_order() {
        let pages = PageSet::from(vec![
            ResponseEnvelope::ItemList {
                items: vec![doc("a"), doc("b")],
                continuation: Some(ContinuationMarker::new("next")),
            },
            ResponseEnvelope::Categories(vec![Category {
                name: Some("x".into()),
                data_url: None,
            }]),
            ResponseEnvelope::ItemList {
                items: vec![doc("c")],
                continuation: None,
            },
        ]);
        let ids: Vec<_> = pages.items().map(|d| d.docid.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn partial_pages_report_progress() {
        let partial = PartialPages {
            pages: PageSet::from(vec![ResponseEnvelope::Continuation(ContinuationMarker::new(
                "m",
            ))]),
            error: QueryError::StaleContinuation("m".into()),
        };
        assert!(partial.to_string().starts_with("pagination stopped after 1 page(s)"));
    }
}
