// src/api/pagination.rs
//! Lazy cursor pagination over list endpoints.

use super::parser::{parse_paginated, PaginatedResponse};
use super::NotionTransport;
use crate::error::AppError;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    /// No request sent yet.
    Idle,
    /// The last page said more rows follow this cursor.
    HasMore(String),
    Exhausted,
}

/// Rows of a paginated POST endpoint, fetched one page at a time.
///
/// A page is requested only once every buffered row has been consumed, and
/// the `next_cursor` Notion returns is sent back unchanged as `start_cursor`.
/// A failed request is yielded as a single `Err`, after which the iterator is
/// exhausted. Iterating again means building a new `Rows` from the same
/// request body, which starts over from the first page.
pub struct Rows<'t, C: ?Sized, T> {
    transport: Option<&'t C>,
    endpoint: String,
    body: Value,
    state: CursorState,
    buffer: VecDeque<T>,
    pages_fetched: usize,
    rows_yielded: usize,
    _rows: PhantomData<fn() -> T>,
}

impl<'t, C, T> Rows<'t, C, T>
where
    C: NotionTransport + ?Sized,
    T: DeserializeOwned,
{
    /// `body` is the first page's request body; it must be a JSON object.
    pub fn new(transport: &'t C, endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            transport: Some(transport),
            endpoint: endpoint.into(),
            body,
            state: CursorState::Idle,
            buffer: VecDeque::new(),
            pages_fetched: 0,
            rows_yielded: 0,
            _rows: PhantomData,
        }
    }

    /// An iterator that yields nothing and never touches the network.
    pub fn empty() -> Self {
        Self {
            transport: None,
            endpoint: String::new(),
            body: Value::Null,
            state: CursorState::Exhausted,
            buffer: VecDeque::new(),
            pages_fetched: 0,
            rows_yielded: 0,
            _rows: PhantomData,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn rows_yielded(&self) -> usize {
        self.rows_yielded
    }

    fn fetch_page(&mut self, transport: &C, cursor: Option<String>) -> Result<(), AppError> {
        let mut body = self.body.clone();
        if let (Some(cursor), Value::Object(map)) = (cursor, &mut body) {
            map.insert("start_cursor".to_string(), Value::String(cursor));
        }

        debug!(
            "Requesting page {} of {}",
            self.pages_fetched + 1,
            self.endpoint
        );
        let response = transport.post(&self.endpoint, &body)?;
        let page: PaginatedResponse<T> = parse_paginated(response)?;
        self.pages_fetched += 1;

        self.state = match page.next_cursor {
            Some(next) if page.has_more => CursorState::HasMore(next),
            _ => CursorState::Exhausted,
        };
        self.buffer.extend(page.results);
        Ok(())
    }
}

impl<'t, C, T> Iterator for Rows<'t, C, T>
where
    C: NotionTransport + ?Sized,
    T: DeserializeOwned,
{
    type Item = Result<T, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.rows_yielded += 1;
                return Some(Ok(row));
            }

            let cursor = match std::mem::replace(&mut self.state, CursorState::Exhausted) {
                CursorState::Idle => None,
                CursorState::HasMore(cursor) => Some(cursor),
                CursorState::Exhausted => return None,
            };
            let transport = self.transport?;

            // The state stays Exhausted if the request fails.
            if let Err(e) = self.fetch_page(transport, cursor) {
                return Some(Err(e));
            }
        }
    }
}

impl<'t, C, T> std::iter::FusedIterator for Rows<'t, C, T>
where
    C: NotionTransport + ?Sized,
    T: DeserializeOwned,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct Script {
        pages: RefCell<VecDeque<Result<Value, AppError>>>,
        bodies: RefCell<Vec<Value>>,
    }

    impl Script {
        fn new(pages: Vec<Result<Value, AppError>>) -> Self {
            Self {
                pages: RefCell::new(pages.into()),
                bodies: RefCell::new(Vec::new()),
            }
        }
    }

    impl NotionTransport for Script {
        fn get(&self, endpoint: &str) -> Result<Value, AppError> {
            Err(AppError::MalformedResponse(format!("unexpected GET {}", endpoint)))
        }

        fn post(&self, _endpoint: &str, body: &Value) -> Result<Value, AppError> {
            self.bodies.borrow_mut().push(body.clone());
            self.pages
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::MalformedResponse("no more pages".into())))
        }
    }

    #[test]
    fn stops_after_an_error() {
        let script = Script::new(vec![
            Ok(json!({"results": [1], "next_cursor": "c1", "has_more": true})),
            Err(AppError::MalformedResponse("boom".into())),
        ]);
        let mut rows: Rows<_, i64> = Rows::new(&script, "search", json!({}));

        assert_eq!(rows.next().unwrap().unwrap(), 1);
        assert!(rows.next().unwrap().is_err());
        assert!(rows.next().is_none());
        assert!(rows.next().is_none());
        assert_eq!(script.bodies.borrow().len(), 2);
        assert_eq!(script.bodies.borrow()[1], json!({"start_cursor": "c1"}));
    }

    #[test]
    fn has_more_without_cursor_ends_iteration() {
        let script = Script::new(vec![Ok(
            json!({"results": [1, 2], "next_cursor": null, "has_more": true}),
        )]);
        let rows: Vec<i64> = Rows::new(&script, "search", json!({}))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows, vec![1, 2]);
        assert_eq!(script.bodies.borrow().len(), 1);
    }

    #[test]
    fn empty_rows_never_request() {
        let mut rows: Rows<Script, Value> = Rows::empty();
        assert!(rows.next().is_none());
        assert_eq!(rows.pages_fetched(), 0);
    }
}
