use crate::errors::Error;
use crate::ingest::record_reading;
use crate::metrics::{INVALID_REQUESTS_TOTAL, QUERY_FAILURES_TOTAL, WRITE_FAILURES_TOTAL};
use crate::model::{ErrorBody, QueryParams, Record, WriteAck, WriteRequest};
use crate::query::last_hour_readings;
use crate::store::Store;
use crate::validate::{validate_query, validate_write};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Process-wide dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub org_name: Arc<str>,
}

pub fn create_router(store: Arc<dyn Store>, org_name: &str) -> Router {
    let state = AppState {
        store,
        org_name: Arc::from(org_name),
    };

    Router::new()
        .route("/write", post(write_reading))
        .route("/query", get(query_readings))
        .with_state(state)
}

async fn write_reading(
    State(state): State<AppState>,
    body: Result<Json<WriteRequest>, JsonRejection>,
) -> Result<Json<WriteAck>, AppError> {
    let Json(request) = body.map_err(|e| Error::InvalidInput(e.body_text()))?;
    info!(
        client = ?request.client_name,
        device_id = ?request.device_id,
        "write request received"
    );

    let reading = validate_write(request)?;
    record_reading(state.store.as_ref(), &state.org_name, &reading)
        .await
        .inspect_err(|_| WRITE_FAILURES_TOTAL.inc())?;

    Ok(Json(WriteAck {
        message: "Reading stored".to_string(),
    }))
}

async fn query_readings(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<Vec<Record>>, AppError> {
    let Query(params) = params.map_err(|e| Error::InvalidInput(e.body_text()))?;
    info!(
        client = ?params.client_name,
        device_id = ?params.device_id,
        "query request received"
    );

    let query = validate_query(params)?;
    let records = last_hour_readings(state.store.as_ref(), &state.org_name, &query)
        .await
        .inspect_err(|_| QUERY_FAILURES_TOTAL.inc())?;

    Ok(Json(records))
}

pub struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            INVALID_REQUESTS_TOTAL.inc();
            warn!("Rejected request: {}", self.0);
            StatusCode::BAD_REQUEST
        } else {
            error!("API error: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}
