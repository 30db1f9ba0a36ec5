//! Async client for the Crudly table-storage API.
//!
//! # Overview
//! Define tables with typed field schemas and create, read, update and
//! delete entities in them. Every call performs exactly one HTTP request;
//! non-success statuses come back as a typed `CrudlyError`.
//!
//! ```no_run
//! use crudly::{Crudly, CrudlyConfig, GetEntitiesOptions};
//!
//! # async fn run() -> crudly::Result<()> {
//! let crudly = Crudly::new(CrudlyConfig::new("project-id", "project-key"));
//! let page = crudly
//!     .get_entities("users", &GetEntitiesOptions::new().filter("age:gt:18").limit(20))
//!     .await?;
//! println!("{} of {}", page.entities.len(), page.total_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - `CrudlyClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` classifies and decodes an `HttpResponse`.
//! - `Transport` is the I/O seam; `UreqTransport` is the default.
//! - `Crudly` composes the two and is safe to share between tasks.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod facade;
pub mod http;
pub mod query;
pub mod schema;
pub mod transport;
pub mod types;

pub use client::CrudlyClient;
pub use config::CrudlyConfig;
pub use error::{CrudlyError, Result};
pub use facade::Crudly;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::GetEntitiesOptions;
pub use schema::{FieldSchema, FieldType, TableName, TableSchema, Tables};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{Entity, EntityId, GetEntitiesResponse, RateLimit};
