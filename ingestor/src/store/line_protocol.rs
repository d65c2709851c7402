use crate::model::{Reading, DEVICE_TAG, MEASUREMENT};
use std::fmt::{self, Write};

/// One time-series point. The store stamps it with the write time.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, f64)>,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn float_field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Encodes the point as one line of InfluxDB line protocol, without a
    /// timestamp.
    pub fn to_line_protocol(&self) -> String {
        let mut line = String::new();
        // Writing into a String cannot fail
        let _ = self.write_line(&mut line);
        line
    }

    fn write_line(&self, out: &mut String) -> fmt::Result {
        out.push_str(&escape(&self.measurement, &[',', ' ']));
        for (key, value) in &self.tags {
            write!(
                out,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            )?;
        }
        for (i, (key, value)) in self.fields.iter().enumerate() {
            out.push(if i == 0 { ' ' } else { ',' });
            write!(out, "{}={}", escape(key, &[',', '=', ' ']), value)?;
        }
        Ok(())
    }
}

impl From<&Reading> for Point {
    fn from(reading: &Reading) -> Self {
        Point::new(MEASUREMENT)
            .tag(DEVICE_TAG, reading.device_id.as_str())
            .float_field("temperature", reading.temperature)
            .float_field("humidity", reading.humidity)
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
