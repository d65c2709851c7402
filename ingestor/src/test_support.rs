//! Test doubles for the store: an in-memory [`Store`] and an in-process
//! fake of the InfluxDB HTTP API.

use crate::errors::{Error, Result};
use crate::model::{Record, DEVICE_TAG};
use crate::store::{Bucket, BucketCreation, Organization, Point, Store};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub org_id: String,
    pub bucket: String,
    pub point: Point,
}

#[derive(Default)]
struct MemoryState {
    orgs: Vec<Organization>,
    buckets: Vec<(String, Bucket)>,
    points: Vec<StoredPoint>,
    calls: usize,
    create_calls: usize,
    hide_buckets: bool,
    fail_writes: Option<String>,
    fail_queries: Option<String>,
}

/// In-memory store that counts the calls made against it
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn with_orgs(orgs: &[(&str, &str)]) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().orgs = orgs
            .iter()
            .map(|(id, name)| Organization {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
        store
    }

    /// Bucket listings come back empty, as if a concurrent creator raced us
    pub fn hide_buckets_from_listing(&self) {
        self.state.lock().unwrap().hide_buckets = true;
    }

    pub fn fail_writes(&self, message: &str) {
        self.state.lock().unwrap().fail_writes = Some(message.to_string());
    }

    pub fn fail_queries(&self, message: &str) {
        self.state.lock().unwrap().fail_queries = Some(message.to_string());
    }

    /// Total number of store calls of any kind
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn bucket_names(&self, org_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .buckets
            .iter()
            .filter(|(org, _)| org == org_id)
            .map(|(_, b)| b.name.clone())
            .collect()
    }

    pub fn points(&self) -> Vec<StoredPoint> {
        self.state.lock().unwrap().points.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_orgs(&self, name: &str) -> Result<Vec<Organization>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        // Prefix match, so exact-name filtering is left to the caller
        Ok(state
            .orgs
            .iter()
            .filter(|org| org.name.starts_with(name))
            .cloned()
            .collect())
    }

    async fn list_buckets(&self, org_id: &str, name: &str) -> Result<Vec<Bucket>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.hide_buckets {
            return Ok(Vec::new());
        }
        Ok(state
            .buckets
            .iter()
            .filter(|(org, b)| org == org_id && b.name == name)
            .map(|(_, b)| b.clone())
            .collect())
    }

    async fn create_bucket(
        &self,
        org_id: &str,
        name: &str,
        _retention: Duration,
    ) -> Result<BucketCreation> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.create_calls += 1;
        if state
            .buckets
            .iter()
            .any(|(org, b)| org == org_id && b.name == name)
        {
            return Ok(BucketCreation::AlreadyExists);
        }
        let id = format!("bucket-{}", state.buckets.len() + 1);
        state.buckets.push((
            org_id.to_string(),
            Bucket {
                id,
                name: name.to_string(),
            },
        ));
        Ok(BucketCreation::Created)
    }

    async fn write_point(&self, org_id: &str, bucket: &str, point: &Point) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if let Some(message) = &state.fail_writes {
            return Err(Error::Store {
                status: 503,
                message: message.clone(),
            });
        }
        state.points.push(StoredPoint {
            org_id: org_id.to_string(),
            bucket: bucket.to_string(),
            point: point.clone(),
        });
        Ok(())
    }

    async fn query_last_hour(
        &self,
        org_id: &str,
        bucket: &str,
        measurement: &str,
        device_id: &str,
    ) -> Result<Vec<Record>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if !state
            .buckets
            .iter()
            .any(|(org, b)| org == org_id && b.name == bucket)
        {
            return Err(Error::Store {
                status: 404,
                message: format!("failed to initialize execute state: could not find bucket \"{}\"", bucket),
            });
        }

        if let Some(message) = &state.fail_queries {
            return Err(Error::Store {
                status: 500,
                message: message.clone(),
            });
        }

        // One record per field, shaped like the store's own output
        let mut records = Vec::new();
        for stored in state.points.iter().filter(|p| {
            p.org_id == org_id
                && p.bucket == bucket
                && p.point.measurement == measurement
                && p.point.tag_value(DEVICE_TAG) == Some(device_id)
        }) {
            for (field, value) in &stored.point.fields {
                let mut record = Record::new();
                record.insert("_measurement".to_string(), json!(measurement));
                record.insert("_field".to_string(), json!(field));
                record.insert("_value".to_string(), json!(value));
                record.insert(DEVICE_TAG.to_string(), json!(device_id));
                records.push(record);
            }
        }
        Ok(records)
    }
}

pub const FAKE_TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
pub struct WriteCall {
    pub org_id: String,
    pub bucket: String,
    pub precision: String,
    pub body: String,
}

/// What the fake InfluxDB knows and what it was asked
#[derive(Debug, Default)]
pub struct FakeInfluxState {
    /// (id, name)
    pub orgs: Vec<(String, String)>,
    /// (org id, bucket name)
    pub buckets: Vec<(String, String)>,
    pub created: Vec<Value>,
    pub writes: Vec<WriteCall>,
    pub queries: Vec<String>,
    pub query_response: String,
}

impl FakeInfluxState {
    pub fn with_org(id: &str, name: &str) -> Self {
        Self {
            orgs: vec![(id.to_string(), name.to_string())],
            ..Self::default()
        }
    }
}

pub struct FakeInflux {
    pub url: String,
    pub state: Arc<Mutex<FakeInfluxState>>,
}

type Shared = Arc<Mutex<FakeInfluxState>>;

fn api_error(status: StatusCode, code: &str, message: String) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Token {}", FAKE_TOKEN).as_str())
}

fn unauthorized() -> Response {
    api_error(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "unauthorized access".to_string(),
    )
}

async fn fake_orgs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = state.lock().unwrap();
    let orgs: Vec<Value> = state
        .orgs
        .iter()
        .filter(|(_, name)| params.get("org").map_or(true, |org| org == name))
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
    if orgs.is_empty() {
        if let Some(org) = params.get("org") {
            return api_error(
                StatusCode::NOT_FOUND,
                "not found",
                format!("organization name \"{}\" not found", org),
            );
        }
    }
    Json(json!({ "orgs": orgs })).into_response()
}

async fn fake_list_buckets(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = state.lock().unwrap();
    let buckets: Vec<Value> = state
        .buckets
        .iter()
        .enumerate()
        .filter(|(_, (org, name))| {
            params.get("orgID").map_or(true, |o| o == org)
                && params.get("name").map_or(true, |n| n == name)
        })
        .map(|(i, (_, name))| json!({ "id": format!("b{}", i), "name": name }))
        .collect();
    Json(json!({ "buckets": buckets })).into_response()
}

async fn fake_create_bucket(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    let org = body["orgID"].as_str().unwrap_or_default().to_string();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if state.buckets.iter().any(|(o, n)| *o == org && *n == name) {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "conflict",
            format!("bucket with name {} already exists", name),
        );
    }
    state.buckets.push((org, name.clone()));
    state.created.push(body);
    (StatusCode::CREATED, Json(json!({ "id": "new", "name": name }))).into_response()
}

async fn fake_write(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();
    state.lock().unwrap().writes.push(WriteCall {
        org_id: param("orgID"),
        bucket: param("bucket"),
        precision: param("precision"),
        body,
    });
    StatusCode::NO_CONTENT.into_response()
}

async fn fake_query(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    state
        .queries
        .push(body["query"].as_str().unwrap_or_default().to_string());
    (
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        state.query_response.clone(),
    )
        .into_response()
}

/// Serves a fake InfluxDB API on an ephemeral local port
pub async fn spawn_fake_influx(state: FakeInfluxState) -> FakeInflux {
    let state = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/api/v2/orgs", get(fake_orgs))
        .route(
            "/api/v2/buckets",
            get(fake_list_buckets).post(fake_create_bucket),
        )
        .route("/api/v2/write", post(fake_write))
        .route("/api/v2/query", post(fake_query))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeInflux {
        url: format!("http://{}", addr),
        state,
    }
}
