use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_quota};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-PROJECT-ID", "project")
        .header("X-PROJECT-KEY", "secret")
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-PROJECT-ID", "project")
        .header("X-PROJECT-KEY", "secret")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn users_schema() -> Value {
    json!({
        "id": { "type": "id", "isOptional": false },
        "name": { "type": "string", "isOptional": false },
        "age": { "type": "integer", "isOptional": true },
        "role": { "type": "enum", "isOptional": true, "values": ["admin", "member"] }
    })
}

// --- auth and quota ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/tables").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn exhausted_quota_returns_429() {
    let app = app_with_quota(1);
    let resp = app.clone().oneshot(request("GET", "/rateLimit")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let limit: Value = body_json(resp).await;
    assert_eq!(limit, json!({ "remaining": 0, "limit": 1 }));

    let resp = app.oneshot(request("GET", "/tables")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

// --- tables ---

#[tokio::test]
async fn unknown_table_returns_404() {
    let resp = app().oneshot(request("GET", "/tables/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.is_empty());
}

#[tokio::test]
async fn enum_without_values_is_rejected() {
    let resp = app()
        .oneshot(json_request(
            "PUT",
            "/tables/pets",
            json!({ "kind": { "type": "enum", "isOptional": false } }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "field kind: enum requires values");
}

#[tokio::test]
async fn schema_round_trips() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/tables/users", users_schema()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(request("GET", "/tables/users")).await.unwrap();
    let schema: Value = body_json(resp).await;
    assert_eq!(schema, users_schema());

    let resp = app.oneshot(request("GET", "/tables")).await.unwrap();
    let tables: Value = body_json(resp).await;
    assert_eq!(tables, json!({ "users": users_schema() }));
}

// --- entities ---

#[tokio::test]
async fn create_entity_in_unknown_table_returns_404() {
    let resp = app()
        .oneshot(json_request("POST", "/tables/nope/entities", json!({ "name": "x" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entity_lifecycle() {
    let app = app();
    app.clone()
        .oneshot(json_request("PUT", "/tables/users", users_schema()))
        .await
        .unwrap();

    // create returns the id as raw text
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/tables/users/entities", json!({ "name": "Ada", "age": 36 })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let id = body_text(resp).await;
    assert!(!id.is_empty());

    // invalid entity is rejected with a plain-text reason
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/tables/users/entities", json!({ "age": 1 })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "missing required field: name");

    // get includes the backend-assigned id
    let resp = app
        .clone()
        .oneshot(request("GET", &format!("/tables/users/entities/{id}")))
        .await
        .unwrap();
    let entity: Value = body_json(resp).await;
    assert_eq!(entity, json!({ "id": id, "name": "Ada", "age": 36 }));

    // patch merges
    let resp = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/tables/users/entities/{id}"),
            json!({ "role": "admin" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let entity: Value = body_json(resp).await;
    assert_eq!(entity["role"], "admin");
    assert_eq!(entity["name"], "Ada");

    // delete, then 404
    let resp = app
        .clone()
        .oneshot(request("DELETE", &format!("/tables/users/entities/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app
        .oneshot(request("GET", &format!("/tables/users/entities/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_filter_order_and_paginate() {
    let app = app();
    app.clone()
        .oneshot(json_request("PUT", "/tables/users", users_schema()))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tables/users/entities/batch",
            json!([
                { "name": "a", "age": 10 },
                { "name": "b", "age": 30 },
                { "name": "c", "age": 20 },
                { "name": "d", "age": 40 }
            ]),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            "/tables/users/entities?filter=age%3Agt%3A15&order=age%3Adesc&limit=2&offset=1",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = body_json(resp).await;
    assert_eq!(page["totalCount"], 3);
    assert_eq!(page["offset"], 1);
    assert_eq!(page["limit"], 2);
    let names: Vec<&str> = page["entities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["b", "c"]);

    let resp = app
        .oneshot(request("GET", "/tables/users/totalEntityCount"))
        .await
        .unwrap();
    let count: Value = body_json(resp).await;
    assert_eq!(count, json!({ "totalEntityCount": 4 }));
}

#[tokio::test]
async fn invalid_batch_inserts_nothing() {
    let app = app();
    app.clone()
        .oneshot(json_request("PUT", "/tables/users", users_schema()))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tables/users/entities/batch",
            json!([{ "name": "ok" }, { "name": "bad", "role": "owner" }]),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.starts_with("entity 1:"));

    let resp = app
        .oneshot(request("GET", "/tables/users/totalEntityCount"))
        .await
        .unwrap();
    let count: Value = body_json(resp).await;
    assert_eq!(count["totalEntityCount"], 0);
}

#[tokio::test]
async fn put_entity_uses_the_path_id() {
    let app = app();
    app.clone()
        .oneshot(json_request("PUT", "/tables/users", users_schema()))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/tables/users/entities/u-1", json!({ "name": "Grace" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "u-1");

    let resp = app
        .oneshot(request("GET", "/tables/users/entities/u-1"))
        .await
        .unwrap();
    let entity: Value = body_json(resp).await;
    assert_eq!(entity, json!({ "id": "u-1", "name": "Grace" }));
}

#[tokio::test]
async fn unknown_read_fields_are_rejected_on_an_empty_table() {
    let app = app();
    app.clone()
        .oneshot(json_request("PUT", "/tables/users", users_schema()))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(request("GET", "/tables/users/entities?filter=colour%3Aeq%3Ared"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "unknown filter field: colour");

    let resp = app
        .oneshot(request("GET", "/tables/users/entities?order=colour%3Adesc"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "unknown order field: colour");
}

#[tokio::test]
async fn zero_limit_is_rejected() {
    let app = app();
    app.clone()
        .oneshot(json_request("PUT", "/tables/users", users_schema()))
        .await
        .unwrap();
    let resp = app
        .oneshot(request("GET", "/tables/users/entities?limit=0"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "invalid limit: 0");
}
