// src/constants.rs
//! Domain constants that define the operational boundaries of the system.

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100, which is also the default page size of a
/// compiled query.
pub const NOTION_API_PAGE_SIZE: u32 = 100;

/// Smallest page size Notion accepts.
pub const NOTION_API_MIN_PAGE_SIZE: u32 = 1;

/// API version sent in the `Notion-Version` header.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Default REST endpoint.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Environment variables consulted for the integration token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["NOTION_TOKEN", "NOTION_API_KEY"];

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV_VAR: &str = "NOTION_QUERY_CONFIG";

/// Config file location relative to the home directory.
pub const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".notion-query/config.toml";

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
