// src/session.rs
//! The entry point for talking to a workspace.
//!
//! A `Session` owns its transport and is passed explicitly to whatever needs
//! it. Several sessions with different tokens can coexist in one process.

use crate::api::parser::parse_object;
use crate::api::{NotionHttpClient, NotionTransport, Rows};
use crate::config::ClientConfig;
use crate::error::{AppError, QueryError};
use crate::model::{Database, Page, Schema, User};
use crate::query::{CompiledQuery, Query, SearchQuery};
use crate::types::DatabaseId;
use log::{debug, info};
use serde_json::json;

pub struct Session<C = NotionHttpClient> {
    transport: C,
}

impl Session<NotionHttpClient> {
    /// Opens a session over HTTP using resolved configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let client = NotionHttpClient::with_base_url(&config.api_key, &config.api_base_url)?;
        Ok(Self::new(client))
    }
}

impl<C: NotionTransport> Session<C> {
    pub fn new(transport: C) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &C {
        &self.transport
    }

    /// The bot user the integration token belongs to.
    pub fn whoami(&self) -> Result<User, AppError> {
        parse_object(self.transport.get("users/me")?)
    }

    pub fn retrieve_database(&self, id: &DatabaseId) -> Result<Database, AppError> {
        let endpoint = format!("databases/{}", id.to_hyphenated());
        parse_object(self.transport.get(&endpoint)?)
    }

    /// The database's declared schema. Formula and rollup result types may
    /// still be unresolved.
    pub fn schema(&self, id: &DatabaseId) -> Result<Schema, AppError> {
        Ok(self.retrieve_database(id)?.schema())
    }

    /// Compiles `query` against the database's live schema and returns its
    /// rows lazily.
    ///
    /// If the query touches a formula or rollup whose result type the schema
    /// does not reveal, one row is fetched to observe it. A database with no
    /// rows yields an empty iterator in that case.
    pub fn query_database(
        &self,
        id: &DatabaseId,
        query: &Query,
    ) -> Result<Rows<'_, C, Page>, AppError> {
        let mut schema = self.schema(id)?;
        self.query_database_with_schema(id, &mut schema, query)
    }

    /// Like [`Session::query_database`] but with a caller-held schema, which is
    /// refined in place when probing is needed.
    pub fn query_database_with_schema(
        &self,
        id: &DatabaseId,
        schema: &mut Schema,
        query: &Query,
    ) -> Result<Rows<'_, C, Page>, AppError> {
        let compiled = match query.compile(&*schema) {
            Ok(compiled) => compiled,
            Err(QueryError::UnresolvedPropertyType { property }) => {
                info!(
                    "Probing database {} to resolve the type of '{}'",
                    id, property
                );
                match self.probe_row(id)? {
                    Some(page) => {
                        schema.refine_from_page(&page);
                        query.compile(&*schema)?
                    }
                    None => {
                        info!("Database {} is empty", id);
                        return Ok(Rows::empty());
                    }
                }
            }
            Err(e) => return Err(e.into()),
        };
        self.execute(id, &compiled)
    }

    /// Starts a fresh row iterator for an already compiled query.
    pub fn execute(
        &self,
        id: &DatabaseId,
        compiled: &CompiledQuery,
    ) -> Result<Rows<'_, C, Page>, AppError> {
        let endpoint = format!("databases/{}/query", id.to_hyphenated());
        Ok(Rows::new(
            &self.transport,
            endpoint,
            compiled.request_body(None)?,
        ))
    }

    fn probe_row(&self, id: &DatabaseId) -> Result<Option<Page>, AppError> {
        let endpoint = format!("databases/{}/query", id.to_hyphenated());
        let mut rows: Rows<'_, C, Page> =
            Rows::new(&self.transport, endpoint, json!({"page_size": 1}));
        let row = rows.next().transpose()?;
        debug!("Probe fetched {} page(s)", rows.pages_fetched());
        Ok(row)
    }

    pub fn search(&self, text: impl Into<String>) -> SearchQuery<'_, C> {
        SearchQuery::new(&self.transport, text)
    }
}
