// src/api/parser.rs
//! Turns raw HTTP bodies into JSON values or typed errors.

use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, NotionErrorCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    pub url: String,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Error body returned by Notion for any non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionError {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// The list envelope shared by query and search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// Decodes a response body, mapping error statuses to `AppError::NotionService`.
pub fn parse_api_response(result: ApiResponse<String>) -> Result<Value, AppError> {
    if result.is_success() {
        serde_json::from_str(&result.data).map_err(|e| {
            log::error!("Failed to parse response from {}: {}", result.url, e);
            AppError::MalformedResponse(format!("{} (body: {})", e, preview(&result.data)))
        })
    } else {
        Err(parse_error_body(&result))
    }
}

fn parse_error_body(result: &ApiResponse<String>) -> AppError {
    match serde_json::from_str::<NotionError>(&result.data) {
        Ok(error) => {
            if let Some(request_id) = &error.request_id {
                log::debug!("Notion request {} failed with {}", request_id, error.code);
            }
            AppError::NotionService {
                code: NotionErrorCode::from_api_response(&error.code),
                message: error.message,
                status: error.status,
            }
        }
        // Fallback to generic error with HTTP status code
        Err(_) => AppError::NotionService {
            code: NotionErrorCode::from_http_status(result.status),
            message: format!("HTTP {} from {}: {}", result.status, result.url, preview(&result.data)),
            status: result.status,
        },
    }
}

/// Deserializes an already decoded value into a typed object.
pub fn parse_object<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::MalformedResponse(e.to_string()))
}

/// Deserializes a list envelope, rows included.
pub fn parse_paginated<T: DeserializeOwned>(value: Value) -> Result<PaginatedResponse<T>, AppError> {
    parse_object(value)
}

fn preview(body: &str) -> String {
    if body.len() > ERROR_BODY_PREVIEW_LENGTH {
        let cut = (0..=ERROR_BODY_PREVIEW_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
