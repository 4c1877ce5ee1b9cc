// src/query/search.rs
//! Workspace search through the `/search` endpoint.

use super::condition::SortDirection;
use super::filter::{TimestampKind, WireSort};
use crate::api::{NotionTransport, Rows};
use crate::constants::{NOTION_API_MIN_PAGE_SIZE, NOTION_API_PAGE_SIZE};
use crate::error::{AppError, QueryError};
use crate::model::NotionObject;
use log::debug;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchObjectKind {
    Page,
    Database,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct SearchFilter {
    property: &'static str,
    value: SearchObjectKind,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<SearchFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<WireSort>,
    page_size: u32,
}

/// A search over pages and databases shared with the integration.
///
/// Built with [`crate::Session::search`]; nothing is sent until
/// [`SearchQuery::execute`] is iterated.
pub struct SearchQuery<'s, C: ?Sized> {
    transport: &'s C,
    text: String,
    kind: Option<SearchObjectKind>,
    sort: Option<SortDirection>,
    page_size: u32,
    exact: bool,
    include_archived: bool,
}

impl<'s, C: NotionTransport + ?Sized> SearchQuery<'s, C> {
    pub fn new(transport: &'s C, text: impl Into<String>) -> Self {
        Self {
            transport,
            text: text.into(),
            kind: None,
            sort: None,
            page_size: NOTION_API_PAGE_SIZE,
            exact: false,
            include_archived: false,
        }
    }

    /// Keeps only objects whose title equals the search text. Notion itself
    /// matches on substrings.
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Also yields archived pages and databases, which are skipped by default.
    pub fn include_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn pages_only(mut self) -> Self {
        self.kind = Some(SearchObjectKind::Page);
        self
    }

    pub fn databases_only(mut self) -> Self {
        self.kind = Some(SearchObjectKind::Database);
        self
    }

    /// Orders results by last edit time.
    pub fn sort_by_last_edited(mut self, ascending: bool) -> Self {
        self.sort = Some(if ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        });
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Request body of the first page.
    pub fn request_body(&self) -> Result<Value, AppError> {
        if !(NOTION_API_MIN_PAGE_SIZE..=NOTION_API_PAGE_SIZE).contains(&self.page_size) {
            return Err(QueryError::InvalidPageSize {
                requested: self.page_size,
            }
            .into());
        }
        let body = SearchBody {
            query: &self.text,
            filter: self.kind.map(|value| SearchFilter {
                property: "object",
                value,
            }),
            sort: self.sort.map(|direction| WireSort::Timestamp {
                timestamp: TimestampKind::LastEditedTime,
                direction,
            }),
            page_size: self.page_size,
        };
        Ok(serde_json::to_value(body)?)
    }

    /// Lazily yields matching pages and databases.
    pub fn execute(&self) -> Result<SearchResults<'s, C>, AppError> {
        Ok(SearchResults {
            rows: Rows::new(self.transport, "search", self.request_body()?),
            title: self.exact.then(|| self.text.clone()),
            include_archived: self.include_archived,
        })
    }
}

/// Search hits, filtered client-side by title and archive state.
///
/// Errors from the underlying pages are passed through and end the sequence.
pub struct SearchResults<'s, C: ?Sized> {
    rows: Rows<'s, C, NotionObject>,
    title: Option<String>,
    include_archived: bool,
}

impl<'s, C: NotionTransport + ?Sized> SearchResults<'s, C> {
    pub fn pages_fetched(&self) -> usize {
        self.rows.pages_fetched()
    }

    fn keeps(&self, object: &NotionObject) -> bool {
        if !self.include_archived && object.is_archived() {
            debug!("Skipping archived {} in search results", object.object_type_name());
            return false;
        }
        match &self.title {
            Some(title) => object.display_title() == *title,
            None => true,
        }
    }
}

impl<'s, C: NotionTransport + ?Sized> Iterator for SearchResults<'s, C> {
    type Item = Result<NotionObject, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(object) if !self.keeps(&object) => continue,
                other => return Some(other),
            }
        }
    }
}

impl<'s, C: NotionTransport + ?Sized> std::iter::FusedIterator for SearchResults<'s, C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Offline;

    impl NotionTransport for Offline {
        fn get(&self, _endpoint: &str) -> Result<Value, AppError> {
            Ok(Value::Null)
        }

        fn post(&self, _endpoint: &str, _body: &Value) -> Result<Value, AppError> {
            Ok(json!({"results": [], "has_more": false}))
        }
    }

    #[test]
    fn builds_filter_and_sort() {
        let body = SearchQuery::new(&Offline, "roadmap")
            .databases_only()
            .sort_by_last_edited(false)
            .request_body()
            .unwrap();
        assert_eq!(
            body,
            json!({
                "query": "roadmap",
                "filter": {"property": "object", "value": "database"},
                "sort": {"timestamp": "last_edited_time", "direction": "descending"},
                "page_size": 100
            })
        );
    }

    #[test]
    fn empty_text_is_omitted() {
        let body = SearchQuery::new(&Offline, "").pages_only().request_body().unwrap();
        assert_eq!(
            body,
            json!({"filter": {"property": "object", "value": "page"}, "page_size": 100})
        );
    }

    #[test]
    fn rejects_oversized_pages() {
        let err = SearchQuery::new(&Offline, "x").page_size(500).request_body();
        assert!(matches!(
            err,
            Err(AppError::Query(QueryError::InvalidPageSize { requested: 500 }))
        ));
    }
}
