//! Purpose: Solr search over `solr/{query}`: single pages and cursor-following traversal.
//! Exports: `SearchPage`, `ResponseHeader`, `ResultSet`, `SearchCursor`, `cursor_params`.
//! Role: Pagination engine turning one bounded query into a lazy document sequence.
//! Invariants: Cursor traversals never send `start`; they always carry a stable sort.
//! Invariants: A traversal ends when the server echoes the cursor it was sent.
//! Invariants: The first fetch/decode error is yielded once and ends the traversal.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, IslandoraClient};
use super::transport::{Method, RequestBody, Transport};
use crate::core::error::{Error, ErrorKind};
use crate::core::params::Params;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

pub const CURSOR_PARAM: &str = "cursorMark";
pub const CURSOR_START: &str = "*";
pub const DEFAULT_ROWS: u32 = 100;
pub const DEFAULT_SORT: &str = "PID asc";
pub const DEFAULT_FIELDS: &str = "PID";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ResponseHeader {
    #[serde(default)]
    pub status: i64,
    #[serde(rename = "QTime", default)]
    pub qtime: u64,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ResultSet {
    #[serde(rename = "numFound", default)]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SearchPage {
    #[serde(rename = "responseHeader", default)]
    pub header: ResponseHeader,
    #[serde(default)]
    pub response: ResultSet,
    #[serde(
        rename = "nextCursorMark",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor_mark: Option<String>,
}

/// Rewrite caller params for cursor mode: drop `start`, default `rows`/`sort`/`fl`,
/// seed the cursor.
pub fn cursor_params(mut params: Params) -> Params {
    params.remove("start");
    params.insert_if_absent("rows", DEFAULT_ROWS);
    params.insert_if_absent("sort", DEFAULT_SORT);
    params.insert_if_absent("fl", DEFAULT_FIELDS);
    params.insert(CURSOR_PARAM, CURSOR_START);
    params
}

impl<T: Transport> IslandoraClient<T> {
    /// One raw page. `params` go straight into the query string
    /// (`fl`, `rows`, `start`, `sort`, ...).
    pub fn solr_query(&self, query: &str, params: &Params) -> ApiResult<SearchPage> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.execute_json(
            Method::Get,
            &format!("solr/{encoded}"),
            params,
            RequestBody::Empty,
        )
    }

    /// Every matching document, fetched page by page with Solr deep-paging cursors.
    /// Use `solr_query` when an absolute `start` offset is needed.
    pub fn solr_cursor(&self, query: &str, params: Params) -> SearchCursor<'_, T> {
        SearchCursor::new(self, query, params)
    }
}

pub struct SearchCursor<'a, T> {
    client: &'a IslandoraClient<T>,
    query: String,
    params: Params,
    buffer: VecDeque<Value>,
    pages: usize,
    finished: bool,
}

impl<'a, T: Transport> SearchCursor<'a, T> {
    fn new(client: &'a IslandoraClient<T>, query: &str, params: Params) -> Self {
        Self {
            client,
            query: query.to_string(),
            params: cursor_params(params),
            buffer: VecDeque::new(),
            pages: 0,
            finished: false,
        }
    }

    pub fn next_document(&mut self) -> ApiResult<Option<Value>> {
        loop {
            if let Some(doc) = self.buffer.pop_front() {
                return Ok(Some(doc));
            }
            if self.finished {
                return Ok(None);
            }
            if let Err(err) = self.fetch_page() {
                self.finished = true;
                return Err(err);
            }
        }
    }

    /// True once the last page has been fetched and every buffered document handed out.
    pub fn is_finished(&self) -> bool {
        self.finished && self.buffer.is_empty()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn cursor_mark(&self) -> Option<&str> {
        self.params.get(CURSOR_PARAM)
    }

    fn fetch_page(&mut self) -> ApiResult<()> {
        let sent = self
            .params
            .get(CURSOR_PARAM)
            .unwrap_or(CURSOR_START)
            .to_string();
        tracing::debug!(
            query = %self.query,
            cursor = %sent,
            page = self.pages + 1,
            "fetching search page"
        );
        let page = self.client.solr_query(&self.query, &self.params)?;
        self.pages += 1;

        let next = page.next_cursor_mark.ok_or_else(|| {
            Error::new(ErrorKind::DecodeAnomaly)
                .with_message("search response has no nextCursorMark")
                .with_hint(
                    "Cursor traversal needs a Solr version with deep paging \
                     and a sort on a unique field.",
                )
        })?;
        let empty = page.response.docs.is_empty();
        self.buffer.extend(page.response.docs);

        if next == sent {
            self.finished = true;
            return Ok(());
        }
        if empty {
            tracing::warn!(
                query = %self.query,
                cursor = %sent,
                next = %next,
                "empty search page with an advancing cursor; continuing"
            );
        }
        self.params.insert(CURSOR_PARAM, next);
        Ok(())
    }
}

impl<T: Transport> Iterator for SearchCursor<'_, T> {
    type Item = ApiResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_document().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::{CURSOR_PARAM, SearchPage, cursor_params};
    use crate::core::params::Params;
    use serde_json::json;

    #[test]
    fn cursor_params_apply_defaults() {
        let params = cursor_params(Params::new());
        assert_eq!(params.get("rows"), Some("100"));
        assert_eq!(params.get("sort"), Some("PID asc"));
        assert_eq!(params.get("fl"), Some("PID"));
        assert_eq!(params.get(CURSOR_PARAM), Some("*"));
    }

    #[test]
    fn cursor_params_drop_start_and_keep_caller_values() {
        let params = cursor_params(
            Params::new()
                .with("start", 200)
                .with("rows", 10)
                .with("fl", "PID,fgs_label_s")
                .with(CURSOR_PARAM, "AoE"),
        );
        assert!(!params.contains("start"));
        assert_eq!(params.get("rows"), Some("10"));
        assert_eq!(params.get("fl"), Some("PID,fgs_label_s"));
        assert_eq!(params.get(CURSOR_PARAM), Some("*"));
    }

    #[test]
    fn page_decodes_solr_envelope() {
        let page: SearchPage = serde_json::from_value(json!({
            "responseHeader": {"status": 0, "QTime": 3, "params": {"q": "*:*"}},
            "response": {"numFound": 2, "start": 0, "docs": [{"PID": "a:1"}, {"PID": "a:2"}]},
            "nextCursorMark": "AoE"
        }))
        .expect("page");
        assert_eq!(page.header.qtime, 3);
        assert_eq!(page.response.num_found, 2);
        assert_eq!(page.response.docs[1]["PID"], "a:2");
        assert_eq!(page.next_cursor_mark.as_deref(), Some("AoE"));
    }
}
