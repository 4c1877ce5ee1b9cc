// src/config.rs
use crate::constants::{
    CONFIG_PATH_ENV_VAR, DEFAULT_CONFIG_RELATIVE_PATH, NOTION_API_BASE_URL, NOTION_API_PAGE_SIZE,
    TOKEN_ENV_VARS,
};
use crate::error::AppError;
use crate::query::{prop, SortSpec};
use crate::types::{ApiKey, ValidatedUrl, ValidationError};
use clap::{Parser, Subcommand};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Written by `notion-query config` when no configuration file exists yet.
pub const DEFAULT_CONFIG: &str = r#"# Configuration for notion-query
#
# Values may reference environment variables as ${env:VAR_NAME}
# or ${env:VAR_NAME|DEFAULT_VALUE}.

[notion_query]
token = "${env:NOTION_TOKEN}"
debug = "${env:NOTION_QUERY_DEBUG|false}"
# base_url = "https://api.notion.com/v1"
"#;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the configuration file location and the resolved settings
    Config,
    /// Show the client version and the integration user
    Info,
    /// List the properties of a database and their types
    Schema {
        /// Notion database URL or ID
        database: String,
    },
    /// List the rows of a database
    Query {
        /// Notion database URL or ID
        database: String,

        /// Sort by a property, e.g. "Released:desc" (repeatable, first wins ties)
        #[arg(long = "sort", value_parser = parse_sort_arg)]
        sorts: Vec<SortSpec>,

        /// Rows requested per API call (1-100)
        #[arg(long, default_value_t = NOTION_API_PAGE_SIZE)]
        page_size: u32,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Parses `NAME`, `NAME:asc` or `NAME:desc`.
pub fn parse_sort_arg(input: &str) -> Result<SortSpec, ValidationError> {
    let (name, direction) = match input.rsplit_once(':') {
        Some((name, dir)) if dir.eq_ignore_ascii_case("asc") => (name, false),
        Some((name, dir)) if dir.eq_ignore_ascii_case("desc") => (name, true),
        _ => (input, false),
    };
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidSortSpec {
            input: input.to_string(),
            reason: "property name is empty".to_string(),
        });
    }
    let property = prop(name);
    Ok(if direction {
        property.desc()
    } else {
        property.asc()
    })
}

/// Contents of the configuration file after environment interpolation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub notion_query: FileSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSection {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub debug: bool,
}

/// Accepts a TOML boolean or a string such as `"false"`, which is what an
/// interpolated `${env:...}` value turns into.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Text(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, got '{}'",
                other
            ))),
        },
    }
}

/// Determines the path of the config file.
pub fn config_file_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_RELATIVE_PATH))
        .ok_or_else(|| {
            AppError::MissingConfiguration(format!(
                "cannot determine the home directory; set {}",
                CONFIG_PATH_ENV_VAR
            ))
        })
}

/// Resolves `${env:VAR}` and `${env:VAR|DEFAULT}` against the process environment.
///
/// Returns `None` when the variable is unset and no default is given. Values
/// that are not a placeholder are returned unchanged.
pub fn resolve_env_value(value: &str) -> Option<String> {
    resolve_env_value_with(value, |name| std::env::var(name).ok())
}

fn resolve_env_value_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    lazy_static::lazy_static! {
        static ref ENV_PLACEHOLDER: Regex = Regex::new(r"^\$\{env:(\w+)(?:\|(.*))?\}$")
            .expect("Failed to compile env placeholder regex - this is a bug in the code");
    }

    match ENV_PLACEHOLDER.captures(value) {
        Some(captures) => {
            let default = captures.get(2).map(|m| m.as_str().to_string());
            captures
                .get(1)
                .and_then(|name| lookup(name.as_str()))
                .or(default)
        }
        None => Some(value.to_string()),
    }
}

fn resolve_table(table: &mut toml::Table, lookup: &dyn Fn(&str) -> Option<String>) {
    let mut unset = Vec::new();
    for (key, value) in table.iter_mut() {
        match value {
            toml::Value::Table(nested) => resolve_table(nested, lookup),
            toml::Value::String(s) => match resolve_env_value_with(s, lookup) {
                Some(resolved) => *s = resolved,
                None => unset.push(key.clone()),
            },
            _ => {}
        }
    }
    for key in unset {
        table.remove(&key);
    }
}

/// Reads a configuration file and interpolates environment placeholders.
pub fn load_config_file(path: &Path) -> Result<FileConfig, AppError> {
    load_config_file_with(path, &|name| std::env::var(name).ok())
}

fn load_config_file_with(
    path: &Path,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<FileConfig, AppError> {
    log::info!("Loading configuration from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let config_error = |message: String| AppError::Config {
        path: path.display().to_string(),
        message,
    };

    let mut table: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| config_error(e.to_string()))?;
    if !table.contains_key("notion_query") {
        return Err(config_error(
            "missing the [notion_query] section".to_string(),
        ));
    }
    resolve_table(&mut table, lookup);

    toml::Value::Table(table)
        .try_into::<FileConfig>()
        .map_err(|e| config_error(e.to_string()))
}

/// Writes the default configuration if `path` does not exist yet.
/// Returns whether a file was created.
pub fn ensure_config_file(path: &Path) -> Result<bool, AppError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    log::info!("Created default configuration at {}", path.display());
    Ok(true)
}

/// Resolved client configuration: validated and ready to open a session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: ApiKey,
    pub api_base_url: ValidatedUrl,
    pub debug: bool,
    /// The file the settings were read from, if one existed.
    pub config_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Resolves configuration from the environment and the config file.
    ///
    /// The token comes from `NOTION_TOKEN` or `NOTION_API_KEY` if set,
    /// otherwise from the file's `token` entry.
    pub fn resolve() -> Result<Self, AppError> {
        let path = config_file_path()?;
        let file = if path.exists() {
            Some(load_config_file(&path)?)
        } else {
            None
        };
        let env_token = TOKEN_ENV_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
        Self::from_sources(env_token, file, path)
    }

    pub fn from_sources(
        env_token: Option<String>,
        file: Option<FileConfig>,
        path: PathBuf,
    ) -> Result<Self, AppError> {
        let section = file.as_ref().map(|f| f.notion_query.clone()).unwrap_or_default();

        let token = env_token
            .or_else(|| section.token.clone().filter(|t| !t.is_empty()))
            .ok_or_else(|| {
                AppError::MissingConfiguration(format!(
                    "no Notion token found; set {} or add `token` to {}",
                    TOKEN_ENV_VARS[0],
                    path.display()
                ))
            })?;

        let api_base_url =
            ValidatedUrl::parse(section.base_url.as_deref().unwrap_or(NOTION_API_BASE_URL))?;

        Ok(Self {
            api_key: ApiKey::new(token)?,
            api_base_url,
            debug: section.debug,
            config_path: file.map(|_| path),
        })
    }
}

/// Debug logging is on when asked for with `--verbose` or by the `debug`
/// setting of a configuration that resolved.
pub fn debug_logging_enabled(verbose: bool, config: Option<&ClientConfig>) -> bool {
    verbose || config.is_some_and(|config| config.debug)
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config_path {
            Some(path) => writeln!(f, "config file: {}", path.display())?,
            None => writeln!(f, "config file: (none)")?,
        }
        writeln!(f, "token:       {}", self.api_key)?;
        writeln!(f, "base url:    {}", self.api_base_url)?;
        write!(f, "debug:       {}", self.debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortDirection;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_env_placeholders() {
        let env = lookup(&[("NOTION_TOKEN", "secret_from_env")]);
        assert_eq!(
            resolve_env_value_with("${env:NOTION_TOKEN}", &env).as_deref(),
            Some("secret_from_env")
        );
        assert_eq!(
            resolve_env_value_with("${env:MISSING|fallback}", &env).as_deref(),
            Some("fallback")
        );
        assert_eq!(
            resolve_env_value_with("${env:MISSING|}", &env).as_deref(),
            Some("")
        );
        assert_eq!(resolve_env_value_with("${env:MISSING}", &env), None);
        assert_eq!(
            resolve_env_value_with("plain ${env:X}", &env).as_deref(),
            Some("plain ${env:X}")
        );
    }

    #[test]
    fn test_load_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert!(ensure_config_file(&path).unwrap());
        assert!(!ensure_config_file(&path).unwrap());

        let env = lookup(&[("NOTION_TOKEN", "secret_abcdefghijklmnopqrs")]);
        let file = load_config_file_with(&path, &env).unwrap();
        assert_eq!(
            file.notion_query.token.as_deref(),
            Some("secret_abcdefghijklmnopqrs")
        );
        assert!(!file.notion_query.debug);

        let config = ClientConfig::from_sources(None, Some(file), path.clone()).unwrap();
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.api_base_url.base(), "https://api.notion.com/v1");
        assert!(config.to_string().contains("secret_abc..."));
    }

    #[test]
    fn test_unset_token_is_missing_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, DEFAULT_CONFIG).unwrap();

        let file = load_config_file_with(&path, &lookup(&[])).unwrap();
        assert!(file.notion_query.token.is_none());

        let err = ClientConfig::from_sources(None, Some(file), path).unwrap_err();
        assert!(matches!(err, AppError::MissingConfiguration(_)));
    }

    #[test]
    fn test_env_token_wins_over_file() {
        let file = FileConfig {
            notion_query: FileSection {
                token: Some("secret_from_file_0000000".to_string()),
                base_url: Some("http://localhost:9999".to_string()),
                debug: true,
            },
        };
        let config = ClientConfig::from_sources(
            Some("ntn_from_environment_000".to_string()),
            Some(file),
            PathBuf::from("/nowhere/config.toml"),
        )
        .unwrap();
        assert_eq!(config.api_key.as_str(), "ntn_from_environment_000");
        assert_eq!(config.api_base_url.base(), "http://localhost:9999");
        assert!(config.debug);
    }

    #[test]
    fn test_debug_setting_enables_debug_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, DEFAULT_CONFIG).unwrap();

        let env = lookup(&[
            ("NOTION_TOKEN", "secret_abcdefghijklmnopqrs"),
            ("NOTION_QUERY_DEBUG", "true"),
        ]);
        let file = load_config_file_with(&path, &env).unwrap();
        let config = ClientConfig::from_sources(None, Some(file), path).unwrap();
        assert!(config.debug);
        assert!(debug_logging_enabled(false, Some(&config)));

        let quiet = ClientConfig { debug: false, ..config };
        assert!(!debug_logging_enabled(false, Some(&quiet)));
        assert!(debug_logging_enabled(true, Some(&quiet)));
        assert!(!debug_logging_enabled(false, None));
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[other]\nkey = 1\n").unwrap();
        assert!(matches!(
            load_config_file_with(&path, &lookup(&[])),
            Err(AppError::Config { .. })
        ));
    }

    #[test]
    fn test_sort_args() {
        let spec = parse_sort_arg("Released:desc").unwrap();
        assert_eq!(spec.property.as_str(), "Released");
        assert_eq!(spec.direction, SortDirection::Descending);

        let spec = parse_sort_arg("Ratio: 1:2").unwrap();
        assert_eq!(spec.property.as_str(), "Ratio: 1:2");
        assert_eq!(spec.direction, SortDirection::Ascending);

        assert!(parse_sort_arg(":asc").is_err());
    }

    #[test]
    fn test_cli_parses_query_command() {
        let cli = CommandLineInput::try_parse_from([
            "notion-query",
            "query",
            "550e8400e29b41d4a716446655440000",
            "--sort",
            "Released:desc",
            "--sort",
            "Topic",
            "--limit",
            "5",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Query {
                sorts,
                page_size,
                limit,
                ..
            } => {
                assert_eq!(sorts.len(), 2);
                assert_eq!(page_size, 100);
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
