use crate::errors::{Error, Result};
use crate::model::{DeviceQuery, QueryParams, Reading, WriteRequest};

/// Validates a write request and turns it into a reading.
///
/// Only absent values are rejected: a temperature or humidity of `0` is a
/// legitimate measurement. Empty names count as absent.
pub fn validate_write(request: WriteRequest) -> Result<Reading> {
    let mut missing = Vec::new();

    let client_name = non_empty(request.client_name);
    if client_name.is_none() {
        missing.push("clientName");
    }
    let device_id = non_empty(request.device_id);
    if device_id.is_none() {
        missing.push("deviceId");
    }
    if request.temperature.is_none() {
        missing.push("temperature");
    }
    if request.humidity.is_none() {
        missing.push("humidity");
    }

    let (Some(client_name), Some(device_id), Some(temperature), Some(humidity)) = (
        client_name,
        device_id,
        request.temperature,
        request.humidity,
    ) else {
        return Err(missing_fields(&missing));
    };

    // Line protocol has no representation for NaN or infinity
    if !temperature.is_finite() {
        return Err(Error::InvalidInput(format!(
            "temperature {} is not a finite number",
            temperature
        )));
    }
    if !humidity.is_finite() {
        return Err(Error::InvalidInput(format!(
            "humidity {} is not a finite number",
            humidity
        )));
    }

    Ok(Reading {
        client_name,
        device_id,
        temperature,
        humidity,
    })
}

/// Validates the query string of a last-hour query
pub fn validate_query(params: QueryParams) -> Result<DeviceQuery> {
    match (non_empty(params.client_name), non_empty(params.device_id)) {
        (Some(client_name), Some(device_id)) => Ok(DeviceQuery {
            client_name,
            device_id,
        }),
        (None, None) => Err(missing_fields(&["clientName", "deviceId"])),
        (None, Some(_)) => Err(missing_fields(&["clientName"])),
        (Some(_), None) => Err(missing_fields(&["deviceId"])),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn missing_fields(fields: &[&str]) -> Error {
    Error::InvalidInput(format!("missing required field(s): {}", fields.join(", ")))
}
