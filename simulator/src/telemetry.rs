use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const TEMPERATURE_RANGE: Range<f64> = 18.0..30.0;
pub const HUMIDITY_RANGE: Range<f64> = 30.0..70.0;

/// Body of one `POST /write`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub client_name: String,
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    pub fn random(rng: &mut impl Rng, client_name: &str, device_id: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            device_id: device_id.to_string(),
            temperature: one_decimal(rng.gen_range(TEMPERATURE_RANGE)),
            humidity: one_decimal(rng.gen_range(HUMIDITY_RANGE)),
        }
    }

    /// Human readable values, always with one decimal
    pub fn summary(&self) -> String {
        format!("temp={:.1}°C, humidity={:.1}%", self.temperature, self.humidity)
    }
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
