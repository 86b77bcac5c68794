//! In-process reference API for end-to-end tests
//!
//! Serves the routes the built-in suites exercise from an in-memory store on
//! an ephemeral port.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;

const TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";

#[derive(Default)]
struct Db {
    next_id: i64,
    users: Vec<Value>,
    passwords: Vec<(String, String)>,
    categories: Vec<Value>,
    tokens: HashSet<String>,
}

impl Db {
    fn record(&mut self, fields: Map<String, Value>) -> Value {
        self.next_id += 1;
        let mut record = Map::new();
        record.insert("id".into(), json!(self.next_id));
        record.insert("createdAt".into(), json!(TIMESTAMP));
        record.insert("updatedAt".into(), json!(TIMESTAMP));
        record.extend(fields);
        Value::Object(record)
    }
}

type Shared = Arc<Mutex<Db>>;

/// A running mock API; stops when dropped
pub struct MockApi {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve the mock API reporting `version` from `/version`
pub async fn spawn(version: &str) -> MockApi {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(version.to_string());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockApi {
        base_url: format!("http://{}", addr),
        handle,
    }
}

fn router(version: String) -> Router {
    let db: Shared = Arc::default();
    Router::new()
        .route("/healthcheck", get(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/version",
            get(move || {
                let version = version.clone();
                async move { Json(json!({ "version": version })) }
            }),
        )
        .route("/auth/register", axum::routing::post(register))
        .route("/auth/login", axum::routing::post(login))
        .route("/user", get(list_users).post(create_user))
        .route(
            "/user/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/category", get(list_categories).post(create_category))
        .route(
            "/category/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .with_state(db)
}

fn status(code: StatusCode) -> Response {
    code.into_response()
}

fn created(body: Value) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn string_field(body: &Value, name: &str) -> Option<String> {
    body.get(name).and_then(Value::as_str).map(str::to_string)
}

fn position(records: &[Value], id: &str) -> Option<usize> {
    let id: i64 = id.parse().ok()?;
    records.iter().position(|r| r["id"] == json!(id))
}

fn authorized(db: &Db, headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| db.tokens.contains(token))
}

async fn register(State(db): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut db = db.lock().unwrap();
    let (Some(email), Some(name), Some(password)) = (
        string_field(&body, "email"),
        string_field(&body, "name"),
        string_field(&body, "password"),
    ) else {
        return status(StatusCode::BAD_REQUEST);
    };
    if db.passwords.iter().any(|(e, _)| *e == email) {
        return status(StatusCode::CONFLICT);
    }
    let mut fields = Map::new();
    fields.insert("email".into(), json!(email));
    fields.insert("name".into(), json!(name));
    let user = db.record(fields);
    db.users.push(user.clone());
    db.passwords.push((email, password));
    created(user)
}

async fn login(State(db): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut db = db.lock().unwrap();
    let email = string_field(&body, "email").unwrap_or_default();
    let password = string_field(&body, "password").unwrap_or_default();
    if !db.passwords.iter().any(|(e, p)| *e == email && *p == password) {
        return status(StatusCode::UNAUTHORIZED);
    }
    let token = format!("token-{}-{}", email, db.tokens.len());
    db.tokens.insert(token.clone());
    ok(json!({ "token": token }))
}

async fn list_users(State(db): State<Shared>) -> Response {
    let db = db.lock().unwrap();
    ok(Value::Array(db.users.clone()))
}

async fn create_user(State(db): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut db = db.lock().unwrap();
    let (Some(email), Some(name)) = (string_field(&body, "email"), string_field(&body, "name"))
    else {
        return status(StatusCode::BAD_REQUEST);
    };
    let mut fields = Map::new();
    fields.insert("email".into(), json!(email));
    fields.insert("name".into(), json!(name));
    let user = db.record(fields);
    db.users.push(user.clone());
    created(user)
}

async fn get_user(State(db): State<Shared>, Path(id): Path<String>) -> Response {
    let db = db.lock().unwrap();
    match position(&db.users, &id) {
        Some(i) => ok(db.users[i].clone()),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn update_user(
    State(db): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut db = db.lock().unwrap();
    let Some(i) = position(&db.users, &id) else {
        return status(StatusCode::NOT_FOUND);
    };
    for field in ["email", "name"] {
        if let Some(value) = string_field(&body, field) {
            db.users[i][field] = json!(value);
        }
    }
    ok(db.users[i].clone())
}

async fn delete_user(State(db): State<Shared>, Path(id): Path<String>) -> Response {
    let mut db = db.lock().unwrap();
    match position(&db.users, &id) {
        Some(i) => {
            db.users.remove(i);
            status(StatusCode::NO_CONTENT)
        }
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn list_categories(State(db): State<Shared>, headers: HeaderMap) -> Response {
    let db = db.lock().unwrap();
    if !authorized(&db, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    ok(Value::Array(db.categories.clone()))
}

async fn create_category(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut db = db.lock().unwrap();
    if !authorized(&db, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    let Some(name) = string_field(&body, "name") else {
        return status(StatusCode::BAD_REQUEST);
    };
    if db.categories.iter().any(|c| c["name"] == json!(name)) {
        return status(StatusCode::CONFLICT);
    }
    let mut fields = Map::new();
    fields.insert("name".into(), json!(name));
    let category = db.record(fields);
    db.categories.push(category.clone());
    created(category)
}

async fn get_category(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let db = db.lock().unwrap();
    if !authorized(&db, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    match position(&db.categories, &id) {
        Some(i) => ok(db.categories[i].clone()),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn update_category(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut db = db.lock().unwrap();
    if !authorized(&db, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    let Some(i) = position(&db.categories, &id) else {
        return status(StatusCode::NOT_FOUND);
    };
    let Some(name) = string_field(&body, "name") else {
        return status(StatusCode::BAD_REQUEST);
    };
    let conflict = db
        .categories
        .iter()
        .enumerate()
        .any(|(j, c)| j != i && c["name"] == json!(name));
    if conflict {
        return status(StatusCode::CONFLICT);
    }
    db.categories[i]["name"] = json!(name);
    ok(db.categories[i].clone())
}

async fn delete_category(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut db = db.lock().unwrap();
    if !authorized(&db, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    match position(&db.categories, &id) {
        Some(i) => {
            db.categories.remove(i);
            status(StatusCode::NO_CONTENT)
        }
        None => status(StatusCode::NOT_FOUND),
    }
}
