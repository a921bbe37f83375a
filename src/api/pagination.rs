//! Pagination traversal for Personio API endpoints
//!
//! The API mixes offset- and page-based pagination depending on the endpoint
//! version; responses carry `data`/`_data` record arrays and `metadata`/
//! `_meta` continuation info. This module hides those mechanics behind a lazy
//! page stream: one page is fetched per advance, the stream ends when the API
//! signals no further pages, and re-iteration means restarting the whole
//! call.
//!
//! Includes a safety bound on the number of pages per logical fetch to
//! prevent infinite loops against a misbehaving endpoint.

use std::pin::Pin;

use futures_util::stream::{self, Stream};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::gateway::HttpGateway;
use super::{ApiError, ApiResult};

/// Maximum pages fetched for a single logical fetch.
const MAX_PAGES: u64 = 1000;

/// Page size requested from the API.
const PAGE_LIMIT: u64 = 100;

/// One HTTP response unit from a paginated endpoint: a bounded batch of
/// records plus the server's continuation info.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records in server-defined order (never re-sorted)
    pub records: Vec<Value>,
    /// 1-based index of this page as reported by the server
    pub current_page: u64,
    /// Total pages the server expects to return
    pub total_pages: u64,
}

/// Lazy, finite stream of pages from one endpoint call sequence.
pub type PageStream = Pin<Box<dyn Stream<Item = ApiResult<Page>> + Send>>;

/// Cursor state scoped to one endpoint call sequence; never shared across
/// endpoints or runs.
struct Cursor {
    gateway: HttpGateway,
    endpoint: String,
    base_params: Vec<(String, String)>,
    next_page: u64,
    records_fetched: u64,
    pages_fetched: u64,
    done: bool,
}

/// Build the lazy page stream for an endpoint.
///
/// An unrecoverable failure mid-traversal yields the error as the final item;
/// the caller discards any partially fetched pages (no partial-page commit).
pub(super) fn page_stream(
    gateway: HttpGateway,
    endpoint: String,
    params: Vec<(String, String)>,
) -> PageStream {
    let cursor = Cursor {
        gateway,
        endpoint,
        base_params: params,
        next_page: 1,
        records_fetched: 0,
        pages_fetched: 0,
        done: false,
    };

    Box::pin(stream::unfold(cursor, |mut cursor| async move {
        if cursor.done {
            return None;
        }

        if cursor.pages_fetched >= MAX_PAGES {
            cursor.done = true;
            return Some((
                Err(ApiError::Pagination(format!(
                    "exceeded {MAX_PAGES} pages for {}",
                    cursor.endpoint
                ))),
                cursor,
            ));
        }

        let mut params = cursor.base_params.clone();
        params.push(("limit".to_string(), PAGE_LIMIT.to_string()));
        params.push(("offset".to_string(), cursor.records_fetched.to_string()));
        params.push(("page".to_string(), cursor.next_page.to_string()));

        debug!(
            endpoint = %cursor.endpoint,
            page = cursor.next_page,
            "fetching page"
        );

        let body = match cursor
            .gateway
            .request(Method::GET, &cursor.endpoint, &params)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                cursor.done = true;
                return Some((Err(e), cursor));
            }
        };

        cursor.pages_fetched += 1;
        let page = parse_page(&body);

        if page.records.is_empty() {
            debug!(endpoint = %cursor.endpoint, "no more data");
            return None;
        }

        if page.current_page >= page.total_pages {
            cursor.done = true;
        } else {
            cursor.records_fetched += page.records.len() as u64;
            cursor.next_page = page.current_page + 1;
        }

        debug!(
            endpoint = %cursor.endpoint,
            records = page.records.len(),
            current_page = page.current_page,
            total_pages = page.total_pages,
            "fetched page"
        );

        Some((Ok(page), cursor))
    }))
}

/// Extract records and continuation info from a response body.
///
/// Some endpoints return a single object instead of a list under `data`;
/// that object becomes a one-record final page. Absent metadata means a
/// single-page response.
fn parse_page(body: &Value) -> Page {
    let records = match body.get("data").or_else(|| body.get("_data")) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single.clone()],
    };

    let metadata = body.get("metadata").or_else(|| body.get("_meta"));
    let current_page = metadata
        .and_then(|m| m.get("current_page"))
        .and_then(Value::as_u64)
        .unwrap_or(1);
    let total_pages = metadata
        .and_then(|m| m.get("total_pages"))
        .and_then(Value::as_u64)
        .unwrap_or(1);

    Page {
        records,
        current_page,
        total_pages,
    }
}
