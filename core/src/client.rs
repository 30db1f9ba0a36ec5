//! Stateless HTTP request builder and response parser for the Crudly API.
//!
//! # Design
//! `CrudlyClient` holds the base URL and the merged header set, both fixed at
//! construction. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. `Crudly` wires the two together over a `Transport`; the
//! split keeps every operation testable without a network.
//!
//! Only `parse_get_entity_by_id` and `parse_get_table_schema` allow a 404,
//! mapping it to `None`. Everywhere else 404 is `CrudlyError::NotFound`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CrudlyConfig;
use crate::error::{check_status, CrudlyError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::GetEntitiesOptions;
use crate::schema::{TableSchema, Tables};
use crate::types::{Entity, EntityId, GetEntitiesResponse, RateLimit, TotalEntityCount};

const NOT_FOUND: u16 = 404;

/// Synchronous, stateless request builder and response parser.
#[derive(Debug, Clone)]
pub struct CrudlyClient {
    base_url: String,
    headers: Vec<(String, String)>,
}

impl CrudlyClient {
    pub fn new(config: &CrudlyConfig) -> Self {
        Self {
            base_url: config.base_url(),
            headers: config.headers(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    pub fn build_create_entity(&self, table: &str, entity: &Entity) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, format!("/tables/{table}/entities"), entity)
    }

    pub fn build_create_entities(&self, table: &str, entities: &[Entity]) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, format!("/tables/{table}/entities/batch"), entities)
    }

    pub fn build_put_entity(&self, table: &str, id: &str, entity: &Entity) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Put, format!("/tables/{table}/entities/{id}"), entity)
    }

    pub fn build_get_entity_by_id(&self, table: &str, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/tables/{table}/entities/{id}"))
    }

    pub fn build_get_entities(&self, table: &str, options: &GetEntitiesOptions) -> HttpRequest {
        let query = options.encode();
        let path = if query.is_empty() {
            format!("/tables/{table}/entities")
        } else {
            format!("/tables/{table}/entities?{query}")
        };
        self.request(HttpMethod::Get, path)
    }

    pub fn build_update_entity(&self, table: &str, id: &str, entity: &Entity) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Patch, format!("/tables/{table}/entities/{id}"), entity)
    }

    pub fn build_delete_entity(&self, table: &str, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/tables/{table}/entities/{id}"))
    }

    pub fn build_get_total_entity_count(&self, table: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/tables/{table}/totalEntityCount"))
    }

    pub fn parse_create_entity(&self, response: HttpResponse) -> Result<EntityId> {
        check_status(&response, &[])?;
        Ok(response.body)
    }

    pub fn parse_create_entities(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, &[])
    }

    pub fn parse_put_entity(&self, response: HttpResponse) -> Result<EntityId> {
        check_status(&response, &[])?;
        Ok(response.body)
    }

    pub fn parse_get_entity_by_id(&self, response: HttpResponse) -> Result<Option<Entity>> {
        check_status(&response, &[NOT_FOUND])?;
        if response.status == NOT_FOUND {
            return Ok(None);
        }
        decode(&response).map(Some)
    }

    pub fn parse_get_entities(&self, response: HttpResponse) -> Result<GetEntitiesResponse> {
        check_status(&response, &[])?;
        decode(&response)
    }

    pub fn parse_update_entity(&self, response: HttpResponse) -> Result<Entity> {
        check_status(&response, &[])?;
        decode(&response)
    }

    pub fn parse_delete_entity(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, &[])
    }

    pub fn parse_get_total_entity_count(&self, response: HttpResponse) -> Result<u64> {
        check_status(&response, &[])?;
        decode::<TotalEntityCount>(&response).map(|count| count.total_entity_count)
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    pub fn build_create_table(&self, table: &str, schema: &TableSchema) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Put, format!("/tables/{table}"), schema)
    }

    pub fn build_get_table_schema(&self, table: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/tables/{table}"))
    }

    pub fn build_get_tables(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/tables".to_string())
    }

    pub fn build_delete_table(&self, table: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/tables/{table}"))
    }

    pub fn parse_create_table(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, &[])
    }

    pub fn parse_get_table_schema(&self, response: HttpResponse) -> Result<Option<TableSchema>> {
        check_status(&response, &[NOT_FOUND])?;
        if response.status == NOT_FOUND {
            return Ok(None);
        }
        decode(&response).map(Some)
    }

    pub fn parse_get_tables(&self, response: HttpResponse) -> Result<Tables> {
        check_status(&response, &[])?;
        decode(&response)
    }

    pub fn parse_delete_table(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, &[])
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    pub fn build_get_rate_limit(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/rateLimit".to_string())
    }

    pub fn parse_get_rate_limit(&self, response: HttpResponse) -> Result<RateLimit> {
        check_status(&response, &[])?;
        decode(&response)
    }

    fn request(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: self.headers.clone(),
            body: None,
        }
    }

    fn json_request<T: Serialize + ?Sized>(&self, method: HttpMethod, path: String, body: &T) -> Result<HttpRequest> {
        let body = serde_json::to_string(body).map_err(|e| CrudlyError::Serialization(e.to_string()))?;
        let mut request = self.request(method, path);
        request
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|e| CrudlyError::Deserialization(e.to_string()))
}
