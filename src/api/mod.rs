// src/api/mod.rs
//! Notion API interaction.
//!
//! Everything above this module talks to Notion through [`NotionTransport`],
//! never through HTTP directly. [`client::NotionHttpClient`] is the blocking
//! reqwest implementation; tests substitute in-memory transports.

pub mod client;
pub mod pagination;
pub mod parser;

pub use client::NotionHttpClient;
pub use pagination::Rows;
pub use parser::PaginatedResponse;

use crate::error::AppError;
use serde_json::Value;

/// Sends requests to the Notion REST API and returns the decoded JSON body.
///
/// Endpoints are paths relative to the API root, e.g. `users/me` or
/// `databases/{id}/query`. Implementations map Notion error bodies to
/// [`AppError::NotionService`] and never retry.
pub trait NotionTransport {
    fn get(&self, endpoint: &str) -> Result<Value, AppError>;
    fn post(&self, endpoint: &str, body: &Value) -> Result<Value, AppError>;
}

impl<T: NotionTransport + ?Sized> NotionTransport for &T {
    fn get(&self, endpoint: &str) -> Result<Value, AppError> {
        (**self).get(endpoint)
    }

    fn post(&self, endpoint: &str, body: &Value) -> Result<Value, AppError> {
        (**self).post(endpoint, body)
    }
}
