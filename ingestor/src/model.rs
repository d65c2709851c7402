use serde::{Deserialize, Serialize};

/// Measurement every reading is stored under
pub const MEASUREMENT: &str = "air_purifier";

/// Tag carrying the device id on each point
pub const DEVICE_TAG: &str = "device_id";

/// Body of `POST /write`. Every field is optional here so that a missing
/// field is reported as invalid input instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub client_name: Option<String>,
    pub device_id: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// A validated sensor reading from one device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub client_name: String,
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
}

/// Query string of `GET /query`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub client_name: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceQuery {
    pub client_name: String,
    pub device_id: String,
}

/// One decoded query row, keyed by column label
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteAck {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Every client gets its own bucket, named after it.
pub fn bucket_name(client_name: &str) -> String {
    format!("bucket_{}", client_name)
}
