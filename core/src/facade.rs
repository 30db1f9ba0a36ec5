//! Async facade: one request per call, classified and decoded.
//!
//! `Crudly` owns an immutable `CrudlyClient` and a `Transport`. Each method
//! builds a request, sends it once and parses the response. Nothing is
//! retried or cached, and no state is shared between calls, so a single
//! instance can be used from many tasks at once (wrap it in an `Arc`).

use tracing::debug;

use crate::client::CrudlyClient;
use crate::config::CrudlyConfig;
use crate::error::{CrudlyError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::query::GetEntitiesOptions;
use crate::schema::{TableSchema, Tables};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Entity, EntityId, GetEntitiesResponse, RateLimit};

#[derive(Debug, Clone)]
pub struct Crudly<T = UreqTransport> {
    client: CrudlyClient,
    transport: T,
}

impl Crudly<UreqTransport> {
    /// Client over the default `UreqTransport`. Its futures must be polled
    /// inside a Tokio runtime, since requests run on the blocking pool.
    pub fn new(config: CrudlyConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> Crudly<T> {
    pub fn with_transport(config: CrudlyConfig, transport: T) -> Self {
        Self {
            client: CrudlyClient::new(&config),
            transport,
        }
    }

    pub fn client(&self) -> &CrudlyClient {
        &self.client
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "sending request");
        let response = self.transport.send(request).await.map_err(CrudlyError::Transport)?;
        debug!(%method, %url, status = response.status, "received response");
        Ok(response)
    }

    /// Create an entity and return the id the backend assigned to it.
    pub async fn create_entity(&self, table: &str, entity: &Entity) -> Result<EntityId> {
        let request = self.client.build_create_entity(table, entity)?;
        self.client.parse_create_entity(self.execute(request).await?)
    }

    /// Create several entities in one request.
    pub async fn create_entities(&self, table: &str, entities: &[Entity]) -> Result<()> {
        let request = self.client.build_create_entities(table, entities)?;
        self.client.parse_create_entities(self.execute(request).await?)
    }

    /// Create or replace the entity stored under `id`.
    pub async fn put_entity(&self, table: &str, id: &str, entity: &Entity) -> Result<EntityId> {
        let request = self.client.build_put_entity(table, id, entity)?;
        self.client.parse_put_entity(self.execute(request).await?)
    }

    /// Fetch one entity; `None` when the backend reports it absent.
    pub async fn get_entity_by_id(&self, table: &str, id: &str) -> Result<Option<Entity>> {
        let request = self.client.build_get_entity_by_id(table, id);
        self.client.parse_get_entity_by_id(self.execute(request).await?)
    }

    pub async fn get_entities(&self, table: &str, options: &GetEntitiesOptions) -> Result<GetEntitiesResponse> {
        let request = self.client.build_get_entities(table, options);
        self.client.parse_get_entities(self.execute(request).await?)
    }

    /// Apply a partial update and return the resulting entity.
    pub async fn update_entity(&self, table: &str, id: &str, entity: &Entity) -> Result<Entity> {
        let request = self.client.build_update_entity(table, id, entity)?;
        self.client.parse_update_entity(self.execute(request).await?)
    }

    pub async fn delete_entity(&self, table: &str, id: &str) -> Result<()> {
        let request = self.client.build_delete_entity(table, id);
        self.client.parse_delete_entity(self.execute(request).await?)
    }

    pub async fn get_total_entity_count(&self, table: &str) -> Result<u64> {
        let request = self.client.build_get_total_entity_count(table);
        self.client.parse_get_total_entity_count(self.execute(request).await?)
    }

    pub async fn create_table(&self, table: &str, schema: &TableSchema) -> Result<()> {
        let request = self.client.build_create_table(table, schema)?;
        self.client.parse_create_table(self.execute(request).await?)
    }

    /// Fetch a table's schema; `None` when the table does not exist.
    pub async fn get_table_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        let request = self.client.build_get_table_schema(table);
        self.client.parse_get_table_schema(self.execute(request).await?)
    }

    pub async fn get_tables(&self) -> Result<Tables> {
        let request = self.client.build_get_tables();
        self.client.parse_get_tables(self.execute(request).await?)
    }

    pub async fn delete_table(&self, table: &str) -> Result<()> {
        let request = self.client.build_delete_table(table);
        self.client.parse_delete_table(self.execute(request).await?)
    }

    pub async fn get_rate_limit(&self) -> Result<RateLimit> {
        let request = self.client.build_get_rate_limit();
        self.client.parse_get_rate_limit(self.execute(request).await?)
    }
}
