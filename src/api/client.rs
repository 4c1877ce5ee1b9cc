// src/api/client.rs
//! Blocking HTTP client for the Notion API.
//!
//! A thin wrapper around `reqwest::blocking` that adds authentication and
//! version headers and hands bodies to the parser. No retries.

use super::parser::{parse_api_response, ApiResponse};
use super::NotionTransport;
use crate::constants::{NOTION_API_BASE_URL, NOTION_VERSION};
use crate::error::AppError;
use crate::types::{ApiKey, ValidatedUrl};
use reqwest::blocking::{Client, Response};
use reqwest::header;
use serde_json::Value;

/// A thin wrapper around reqwest Client for Notion API requests.
#[derive(Clone, Debug)]
pub struct NotionHttpClient {
    client: Client,
    base_url: String,
}

impl NotionHttpClient {
    /// Creates a client for the public Notion endpoint.
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        let base_url = ValidatedUrl::parse(NOTION_API_BASE_URL)?;
        Self::with_base_url(api_key, &base_url)
    }

    /// Creates a client against another endpoint, e.g. a proxy or a test server.
    pub fn with_base_url(api_key: &ApiKey, base_url: &ValidatedUrl) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.base().to_string(),
        })
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl NotionTransport for NotionHttpClient {
    fn get(&self, endpoint: &str) -> Result<Value, AppError> {
        let url = self.url(endpoint);
        log::debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        parse_api_response(extract_response_text(response)?)
    }

    fn post(&self, endpoint: &str, body: &Value) -> Result<Value, AppError> {
        let url = self.url(endpoint);
        log::debug!("POST {}", url);
        log::trace!("Request body: {}", body);
        let response = self.client.post(url).json(body).send()?;
        parse_api_response(extract_response_text(response)?)
    }
}

/// Extracts the response body as text with metadata.
pub fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let text = response.text()?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}
