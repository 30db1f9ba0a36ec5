use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, RawQuery, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const PROJECT_ID_HEADER: &str = "x-project-id";
pub const PROJECT_KEY_HEADER: &str = "x-project-key";
pub const DEFAULT_QUOTA: u64 = 10_000;
pub const DEFAULT_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(rename = "isOptional", default)]
    pub is_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

pub type TableSchema = BTreeMap<String, FieldSchema>;
pub type Entity = Map<String, Value>;

#[derive(Debug, Default)]
struct Table {
    schema: TableSchema,
    entities: Vec<(String, Entity)>,
}

#[derive(Debug)]
pub struct Backend {
    tables: BTreeMap<String, Table>,
    quota: u64,
    remaining: u64,
}

impl Backend {
    pub fn new(quota: u64) -> Self {
        Self {
            tables: BTreeMap::new(),
            quota,
            remaining: quota,
        }
    }

    fn table(&self, name: &str) -> Result<&Table, Rejection> {
        self.tables.get(name).ok_or_else(not_found)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, Rejection> {
        self.tables.get_mut(name).ok_or_else(not_found)
    }
}

pub type Db = Arc<RwLock<Backend>>;

/// Status plus plain-text body. 404s carry an empty body.
type Rejection = (StatusCode, String);

fn not_found() -> Rejection {
    (StatusCode::NOT_FOUND, String::new())
}

fn bad_request(reason: String) -> Rejection {
    (StatusCode::BAD_REQUEST, reason)
}

pub fn app() -> Router {
    app_with_quota(DEFAULT_QUOTA)
}

/// Router whose project may issue `quota` requests before getting 429s.
pub fn app_with_quota(quota: u64) -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::new(quota)));
    Router::new()
        .route("/tables", get(get_tables))
        .route(
            "/tables/{table}",
            get(get_table_schema).put(create_table).delete(delete_table),
        )
        .route("/tables/{table}/entities", get(get_entities).post(create_entity))
        .route("/tables/{table}/entities/batch", post(create_entities))
        .route(
            "/tables/{table}/entities/{id}",
            get(get_entity)
                .put(put_entity)
                .patch(update_entity)
                .delete(delete_entity),
        )
        .route("/tables/{table}/totalEntityCount", get(total_entity_count))
        .route("/rateLimit", get(rate_limit))
        .layer(middleware::from_fn_with_state(db.clone(), guard))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_quota(listener, DEFAULT_QUOTA).await
}

pub async fn run_with_quota(listener: TcpListener, quota: u64) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_quota(quota)).await
}

/// Rejects requests without project credentials and enforces the quota.
async fn guard(State(db): State<Db>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    if !headers.contains_key(PROJECT_ID_HEADER) || !headers.contains_key(PROJECT_KEY_HEADER) {
        return (StatusCode::UNAUTHORIZED, "missing project credentials").into_response();
    }
    {
        let mut backend = db.write().await;
        if backend.remaining == 0 {
            debug!(uri = %request.uri(), "quota exhausted");
            return StatusCode::TOO_MANY_REQUESTS.into_response();
        }
        backend.remaining -= 1;
    }
    next.run(request).await
}

// --- tables ---

async fn get_tables(State(db): State<Db>) -> Json<BTreeMap<String, TableSchema>> {
    let backend = db.read().await;
    Json(
        backend
            .tables
            .iter()
            .map(|(name, table)| (name.clone(), table.schema.clone()))
            .collect(),
    )
}

async fn get_table_schema(
    State(db): State<Db>,
    Path(table): Path<String>,
) -> Result<Json<TableSchema>, Rejection> {
    let backend = db.read().await;
    backend.table(&table).map(|t| Json(t.schema.clone()))
}

/// Creates the table, or replaces the schema of an existing one.
async fn create_table(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(schema): Json<TableSchema>,
) -> Result<StatusCode, Rejection> {
    validate_schema(&schema).map_err(bad_request)?;
    db.write().await.tables.entry(table).or_default().schema = schema;
    Ok(StatusCode::OK)
}

async fn delete_table(
    State(db): State<Db>,
    Path(table): Path<String>,
) -> Result<StatusCode, Rejection> {
    db.write()
        .await
        .tables
        .remove(&table)
        .map(|_| StatusCode::OK)
        .ok_or_else(not_found)
}

// --- entities ---

async fn create_entity(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(entity): Json<Entity>,
) -> Result<String, Rejection> {
    let mut backend = db.write().await;
    let table = backend.table_mut(&table)?;
    validate_entity(&table.schema, &entity, false).map_err(bad_request)?;
    Ok(table.insert(Uuid::new_v4().to_string(), entity))
}

async fn create_entities(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(entities): Json<Vec<Entity>>,
) -> Result<StatusCode, Rejection> {
    let mut backend = db.write().await;
    let table = backend.table_mut(&table)?;
    for (index, entity) in entities.iter().enumerate() {
        validate_entity(&table.schema, entity, false)
            .map_err(|reason| bad_request(format!("entity {index}: {reason}")))?;
    }
    for entity in entities {
        table.insert(Uuid::new_v4().to_string(), entity);
    }
    Ok(StatusCode::OK)
}

async fn put_entity(
    State(db): State<Db>,
    Path((table, id)): Path<(String, String)>,
    Json(entity): Json<Entity>,
) -> Result<String, Rejection> {
    let mut backend = db.write().await;
    let table = backend.table_mut(&table)?;
    validate_entity(&table.schema, &entity, false).map_err(bad_request)?;
    table.entities.retain(|(existing, _)| existing != &id);
    Ok(table.insert(id, entity))
}

async fn get_entity(
    State(db): State<Db>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Entity>, Rejection> {
    let backend = db.read().await;
    backend
        .table(&table)?
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(not_found)
}

async fn update_entity(
    State(db): State<Db>,
    Path((table, id)): Path<(String, String)>,
    Json(patch): Json<Entity>,
) -> Result<Json<Entity>, Rejection> {
    let mut backend = db.write().await;
    let table = backend.table_mut(&table)?;
    validate_entity(&table.schema, &patch, true).map_err(bad_request)?;
    let entity = table
        .entities
        .iter_mut()
        .find(|(existing, _)| existing == &id)
        .map(|(_, entity)| entity)
        .ok_or_else(not_found)?;
    entity.extend(patch);
    Ok(Json(entity.clone()))
}

async fn delete_entity(
    State(db): State<Db>,
    Path((table, id)): Path<(String, String)>,
) -> Result<StatusCode, Rejection> {
    let mut backend = db.write().await;
    let table = backend.table_mut(&table)?;
    let before = table.entities.len();
    table.entities.retain(|(existing, _)| existing != &id);
    if table.entities.len() == before {
        return Err(not_found());
    }
    Ok(StatusCode::OK)
}

async fn get_entities(
    State(db): State<Db>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, Rejection> {
    let query = ReadQuery::parse(query.as_deref().unwrap_or_default()).map_err(bad_request)?;
    let backend = db.read().await;
    let table = backend.table(&table)?;
    query.check_fields(&table.schema).map_err(bad_request)?;

    let mut matching: Vec<&Entity> = table
        .entities
        .iter()
        .map(|(_, entity)| entity)
        .filter(|entity| query.matches(entity))
        .collect();
    for (field, descending) in query.orders.iter().rev() {
        matching.sort_by(|a, b| {
            let ordering = compare_values(a.get(field), b.get(field));
            if *descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    let total_count = matching.len();
    let entities: Vec<&Entity> = matching
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();
    Ok(Json(json!({
        "entities": entities,
        "totalCount": total_count,
        "offset": query.offset,
        "limit": query.limit,
    })))
}

async fn total_entity_count(
    State(db): State<Db>,
    Path(table): Path<String>,
) -> Result<Json<Value>, Rejection> {
    let backend = db.read().await;
    let count = backend.table(&table)?.entities.len();
    Ok(Json(json!({ "totalEntityCount": count })))
}

async fn rate_limit(State(db): State<Db>) -> Json<Value> {
    let backend = db.read().await;
    Json(json!({ "remaining": backend.remaining, "limit": backend.quota }))
}

impl Table {
    fn id_field(&self) -> Option<&str> {
        self.schema
            .iter()
            .find(|(_, field)| field.field_type == "id")
            .map(|(name, _)| name.as_str())
    }

    fn get(&self, id: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, entity)| entity)
    }

    /// Stores `entity` under `id`, writing the id into the table's id field.
    fn insert(&mut self, id: String, mut entity: Entity) -> String {
        if let Some(field) = self.id_field() {
            entity.insert(field.to_string(), Value::String(id.clone()));
        }
        self.entities.push((id.clone(), entity));
        id
    }
}

// --- validation ---

const FIELD_TYPES: [&str; 6] = ["id", "integer", "string", "boolean", "time", "enum"];

pub fn validate_schema(schema: &TableSchema) -> Result<(), String> {
    for (name, field) in schema {
        if !FIELD_TYPES.contains(&field.field_type.as_str()) {
            return Err(format!("field {name}: unknown type {}", field.field_type));
        }
        let has_values = field.values.as_ref().is_some_and(|values| !values.is_empty());
        match (field.field_type.as_str(), has_values) {
            ("enum", false) => return Err(format!("field {name}: enum requires values")),
            ("enum", true) | (_, false) => {}
            (_, true) => return Err(format!("field {name}: only enum fields take values")),
        }
    }
    Ok(())
}

/// With `partial`, only the supplied fields are checked.
pub fn validate_entity(schema: &TableSchema, entity: &Entity, partial: bool) -> Result<(), String> {
    for (name, value) in entity {
        let field = schema
            .get(name)
            .ok_or_else(|| format!("unknown field: {name}"))?;
        if field.field_type == "id" {
            return Err(format!("field {name} is assigned by the backend"));
        }
        check_value(name, field, value)?;
    }
    if !partial {
        for (name, field) in schema {
            let missing = entity.get(name).map_or(true, Value::is_null);
            if field.field_type != "id" && !field.is_optional && missing {
                return Err(format!("missing required field: {name}"));
            }
        }
    }
    Ok(())
}

fn check_value(name: &str, field: &FieldSchema, value: &Value) -> Result<(), String> {
    if value.is_null() {
        return if field.is_optional {
            Ok(())
        } else {
            Err(format!("field {name} is not optional"))
        };
    }
    let valid = match field.field_type.as_str() {
        "integer" => value.is_i64() || value.is_u64(),
        "string" | "time" => value.is_string(),
        "boolean" => value.is_boolean(),
        "enum" => value.as_str().is_some_and(|v| {
            field
                .values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|allowed| allowed == v)
        }),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("invalid value for field {name}: {value}"))
    }
}

// --- reads ---

const FILTER_OPS: [&str; 4] = ["eq", "neq", "gt", "lt"];

#[derive(Debug, PartialEq)]
struct Filter {
    field: String,
    op: String,
    value: String,
}

#[derive(Debug, PartialEq)]
struct ReadQuery {
    filters: Vec<Filter>,
    orders: Vec<(String, bool)>,
    limit: usize,
    offset: usize,
}

impl ReadQuery {
    fn parse(query: &str) -> Result<Self, String> {
        let mut read = ReadQuery {
            filters: Vec::new(),
            orders: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "filter" => {
                    let mut parts = value.splitn(3, ':');
                    match (parts.next(), parts.next(), parts.next()) {
                        (Some(_), Some(op), Some(_)) if !FILTER_OPS.contains(&op) => {
                            return Err(format!("unknown filter operator: {op}"))
                        }
                        (Some(field), Some(op), Some(literal)) => read.filters.push(Filter {
                            field: field.to_string(),
                            op: op.to_string(),
                            value: literal.to_string(),
                        }),
                        _ => return Err(format!("malformed filter: {value}")),
                    }
                }
                "order" => match value.split_once(':') {
                    Some((field, "asc")) => read.orders.push((field.to_string(), false)),
                    Some((field, "desc")) => read.orders.push((field.to_string(), true)),
                    _ => return Err(format!("malformed order: {value}")),
                },
                "limit" => {
                    read.limit = value
                        .parse()
                        .ok()
                        .filter(|limit| *limit > 0)
                        .ok_or_else(|| format!("invalid limit: {value}"))?
                }
                "offset" => {
                    read.offset = value
                        .parse()
                        .map_err(|_| format!("invalid offset: {value}"))?
                }
                other => return Err(format!("unknown query parameter: {other}")),
            }
        }
        Ok(read)
    }

    /// Every filter and order must name a field of the table.
    fn check_fields(&self, schema: &TableSchema) -> Result<(), String> {
        if let Some(filter) = self.filters.iter().find(|f| !schema.contains_key(&f.field)) {
            return Err(format!("unknown filter field: {}", filter.field));
        }
        if let Some((field, _)) = self.orders.iter().find(|(field, _)| !schema.contains_key(field)) {
            return Err(format!("unknown order field: {field}"));
        }
        Ok(())
    }

    fn matches(&self, entity: &Entity) -> bool {
        self.filters.iter().all(|filter| {
            let ordering = entity
                .get(&filter.field)
                .and_then(|value| compare_literal(value, &filter.value));
            match filter.op.as_str() {
                "eq" => ordering == Some(Ordering::Equal),
                "neq" => ordering != Some(Ordering::Equal),
                "gt" => ordering == Some(Ordering::Greater),
                "lt" => ordering == Some(Ordering::Less),
                _ => false,
            }
        })
    }
}

fn compare_literal(value: &Value, literal: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => n.as_f64()?.partial_cmp(&literal.parse::<f64>().ok()?),
        Value::String(s) => Some(s.as_str().cmp(literal)),
        Value::Bool(b) => Some(b.cmp(&literal.parse::<bool>().ok()?)),
        _ => None,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
