// src/lib.rs
//! notion-query library: a typed Notion client with a schema-validated
//! query compiler.
//!
//! Queries are built from [`prop`], checked against a database [`Schema`]
//! by [`Query::compile`], and executed lazily through a [`Session`].
//!
//! # Public API
//!
//! - **Error handling**: `AppError`, `QueryError`, `ValidationError`
//! - **Configuration**: `ClientConfig`
//! - **Domain model**: `NotionObject`, `Page`, `Database`, `PropertyValue`, `Schema`
//! - **Domain types**: `NotionId`, `PageId`, `DatabaseId`, `ApiKey`, `Tristate`
//! - **Queries**: `prop`, `Query`, `CompiledQuery`, `SearchQuery`
//! - **Execution**: `Session`, `Rows`, `NotionTransport`, `NotionHttpClient`

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod query;
pub mod session;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionErrorCode, QueryError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::ClientConfig;

// --- Domain Model ---
pub use crate::model::{
    Database, FormulaType, FormulaValue, NotionObject, Page, Parent, PropertySchema,
    PropertyType, PropertyValue, RollupType, RollupValue, Schema, SchemaView, User,
};

// --- Domain Types ---
pub use crate::types::{
    ApiKey, DatabaseId, NotionId, PageId, PropertyName, Tristate, UserId, ValidatedUrl,
};

// --- Queries ---
pub use crate::query::{
    prop, ArrayQuantifier, CompiledQuery, ConditionNode, Operand, Operator, Predicate,
    PropertyRef, Query, QueryFilter, SearchObjectKind, SearchQuery, SearchResults, SortDirection,
    SortSpec, WireSort,
};

// --- Execution ---
pub use crate::api::{NotionHttpClient, NotionTransport, PaginatedResponse, Rows};
pub use crate::session::Session;
