use super::{Bucket, BucketCreation, FluxRecords, Organization, Point, Store};
use crate::errors::{Error, Result};
use crate::model::{Record, DEVICE_TAG};
use crate::store::last_hour_query;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// [`Store`] backed by the InfluxDB v2 HTTP API
#[derive(Clone)]
pub struct InfluxStore {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OrgsPage {
    #[serde(default)]
    orgs: Vec<Organization>,
}

#[derive(Debug, Deserialize)]
struct BucketsPage {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

/// Error body returned by the API on non-success status codes
#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl InfluxStore {
    pub fn new(base_url: &str, token: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Token {}", self.token))
    }
}

async fn read_api_error(resp: Response) -> (StatusCode, ApiError) {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let api_error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| ApiError {
        code: String::new(),
        message: body,
    });
    (status, api_error)
}

fn store_error(status: StatusCode, api_error: ApiError) -> Error {
    let message = if api_error.message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string()
    } else {
        api_error.message
    };
    Error::Store {
        status: status.as_u16(),
        message,
    }
}

/// Turns a non-success response into an error
async fn check(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let (status, api_error) = read_api_error(resp).await;
    Err(store_error(status, api_error))
}

#[async_trait]
impl Store for InfluxStore {
    async fn list_orgs(&self, name: &str) -> Result<Vec<Organization>> {
        let resp = self
            .request(Method::GET, "/api/v2/orgs")
            .query(&[("org", name)])
            .send()
            .await?;

        // A name filter with no match is answered with 404
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let page: OrgsPage = check(resp).await?.json().await?;
        Ok(page.orgs)
    }

    async fn list_buckets(&self, org_id: &str, name: &str) -> Result<Vec<Bucket>> {
        let resp = self
            .request(Method::GET, "/api/v2/buckets")
            .query(&[("orgID", org_id), ("name", name)])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let page: BucketsPage = check(resp).await?.json().await?;
        debug!(org_id, name, found = page.buckets.len(), "listed buckets");
        Ok(page.buckets)
    }

    async fn create_bucket(
        &self,
        org_id: &str,
        name: &str,
        retention: Duration,
    ) -> Result<BucketCreation> {
        let body = json!({
            "orgID": org_id,
            "name": name,
            "retentionRules": [
                { "type": "expire", "everySeconds": retention.as_secs() }
            ],
        });
        let resp = self
            .request(Method::POST, "/api/v2/buckets")
            .json(&body)
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(BucketCreation::Created);
        }

        let (status, api_error) = read_api_error(resp).await;
        let conflict = status == StatusCode::CONFLICT
            || (status == StatusCode::UNPROCESSABLE_ENTITY && api_error.code == "conflict");
        if conflict {
            warn!(bucket = name, message = %api_error.message, "bucket create conflict");
            return Ok(BucketCreation::AlreadyExists);
        }
        Err(store_error(status, api_error))
    }

    async fn write_point(&self, org_id: &str, bucket: &str, point: &Point) -> Result<()> {
        let line = point.to_line_protocol();
        debug!(
            bucket,
            device_id = point.tag_value(DEVICE_TAG).unwrap_or_default(),
            line = %line,
            "writing point"
        );

        let resp = self
            .request(Method::POST, "/api/v2/write")
            .query(&[("orgID", org_id), ("bucket", bucket), ("precision", "ns")])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn query_last_hour(
        &self,
        org_id: &str,
        bucket: &str,
        measurement: &str,
        device_id: &str,
    ) -> Result<Vec<Record>> {
        let query = last_hour_query(bucket, measurement, device_id);
        let body = json!({
            "query": query,
            "type": "flux",
            "dialect": {
                "header": true,
                "delimiter": ",",
                "annotations": ["datatype", "group", "default"],
                "commentPrefix": "#",
                "dateTimeFormat": "RFC3339",
            },
        });

        let resp = self
            .request(Method::POST, "/api/v2/query")
            .query(&[("orgID", org_id)])
            .header(ACCEPT, "application/csv")
            .json(&body)
            .send()
            .await?;
        let csv = check(resp).await?.bytes().await?;

        let records = FluxRecords::new(csv.as_ref()).collect::<Result<Vec<_>>>()?;
        debug!(bucket, device_id, rows = records.len(), "query completed");
        Ok(records)
    }
}
