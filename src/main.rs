// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_query::config::{
    config_file_path, debug_logging_enabled, ensure_config_file, ClientConfig, Command,
    CommandLineInput,
};
use notion_query::{AppError, DatabaseId, Query, Session, SortSpec};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("notion_query.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn show_config() -> Result<()> {
    let path = config_file_path()?;
    if ensure_config_file(&path)? {
        println!("Created a default configuration at {}", path.display());
    }
    let config = ClientConfig::resolve().context("Failed to resolve configuration")?;
    println!("{}", config);
    Ok(())
}

fn show_info(session: &Session) -> Result<()> {
    println!("notion-query {}", env!("CARGO_PKG_VERSION"));
    let user = session
        .whoami()
        .context("Failed to retrieve the integration user")?;
    println!(
        "integration: {} ({})",
        user.name.as_deref().unwrap_or("unnamed"),
        user.id.to_hyphenated()
    );
    Ok(())
}

fn show_schema(session: &Session, database: &str) -> Result<()> {
    let id = DatabaseId::parse(database)?;
    let database = session
        .retrieve_database(&id)
        .with_context(|| format!("Failed to retrieve database {}", id))?;
    println!("{}", database.title());
    for (name, property_type) in database.schema().iter() {
        println!("  {:<30} {}", name, property_type);
    }
    Ok(())
}

fn list_rows(
    session: &Session,
    database: &str,
    sorts: Vec<SortSpec>,
    page_size: u32,
    limit: Option<usize>,
) -> Result<()> {
    let id = DatabaseId::parse(database)?;
    let query = Query::new().sort(sorts).page_size(page_size);
    let rows = session
        .query_database(&id, &query)
        .with_context(|| format!("Failed to query database {}", id))?;

    let mut printed = 0;
    for row in rows.take(limit.unwrap_or(usize::MAX)) {
        let page = row?;
        println!(
            "{}  {}",
            page.id.to_hyphenated(),
            page.title().unwrap_or_default()
        );
        printed += 1;
    }
    log::info!("Printed {} row(s)", printed);
    Ok(())
}

fn open_session(config: Result<ClientConfig, AppError>) -> Result<Session> {
    let config = config.context("Failed to resolve configuration")?;
    Ok(Session::from_config(&config)?)
}

fn run(cli: CommandLineInput, config: Result<ClientConfig, AppError>) -> Result<()> {
    match cli.command {
        Command::Config => show_config(),
        Command::Info => show_info(&open_session(config)?),
        Command::Schema { database } => show_schema(&open_session(config)?, &database),
        Command::Query {
            database,
            sorts,
            page_size,
            limit,
        } => list_rows(&open_session(config)?, &database, sorts, page_size, limit),
    }
}

fn main() {
    let cli = CommandLineInput::parse();

    // Resolved before logging so the file's `debug` setting can raise the level.
    let config = ClientConfig::resolve();
    let debug = debug_logging_enabled(cli.verbose, config.as_ref().ok());

    if let Err(e) = setup_logging(debug) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli, config) {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
