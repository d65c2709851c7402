use crate::errors::{Error, Result};
use crate::model::{Record, DEVICE_TAG};
use serde_json::{Number, Value};
use std::io::Read;

/// Builds the Flux query selecting the last hour of `measurement` for one
/// device.
pub fn last_hour_query(bucket: &str, measurement: &str, device_id: &str) -> String {
    format!(
        r#"from(bucket: "{}")
  |> range(start: -1h)
  |> filter(fn: (r) => r["_measurement"] == "{}" and r["{}"] == "{}")"#,
        escape_string(bucket),
        escape_string(measurement),
        DEVICE_TAG,
        escape_string(device_id)
    )
}

/// Escapes a value for use inside a Flux string literal. `${` would
/// otherwise start an interpolation.
fn escape_string(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace("${", r"\${")
}

#[derive(Debug, Default)]
struct TableMeta {
    datatypes: Vec<String>,
    defaults: Vec<String>,
    labels: Option<Vec<String>>,
}

impl TableMeta {
    fn is_error_table(labels: &[String]) -> bool {
        labels.get(1).map(String::as_str) == Some("error")
            && labels.get(2).map(String::as_str) == Some("reference")
    }
}

/// Lazily decodes an annotated CSV query response into records.
///
/// Each table in the response starts with its own `#datatype` annotation
/// row, followed by `#group`, `#default` and the header row. The first
/// column of every row is the annotation column and carries no data.
///
/// Iteration stops after the first error; the sequence cannot be restarted.
pub struct FluxRecords<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    table: TableMeta,
    done: bool,
}

impl<R: Read> FluxRecords<R> {
    pub fn new(reader: R) -> Self {
        let rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();
        Self {
            rows,
            table: TableMeta::default(),
            done: false,
        }
    }

    fn decode_row(&self, labels: &[String], row: &csv::StringRecord) -> Result<Record> {
        if row.len() > labels.len() {
            return Err(Error::Decode(format!(
                "row has {} columns but the table header has {}",
                row.len(),
                labels.len()
            )));
        }

        let mut record = Record::new();
        for (i, cell) in row.iter().enumerate().skip(1) {
            let label = &labels[i];
            if label.is_empty() {
                continue;
            }
            let datatype = self.table.datatypes.get(i).map(String::as_str).unwrap_or("string");
            let default = self.table.defaults.get(i).map(String::as_str).unwrap_or("");
            let raw = if cell.is_empty() { default } else { cell };
            let value = to_value(datatype, raw)
                .map_err(|reason| Error::Decode(format!("column {}: {}", label, reason)))?;
            record.insert(label.clone(), value);
        }
        Ok(record)
    }
}

impl<R: Read> Iterator for FluxRecords<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let row = match self.rows.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                Some(Ok(row)) => row,
            };

            match row.get(0).unwrap_or("") {
                "#datatype" => {
                    self.table = TableMeta {
                        datatypes: row.iter().map(String::from).collect(),
                        ..TableMeta::default()
                    };
                    continue;
                }
                "#default" => {
                    self.table.defaults = row.iter().map(String::from).collect();
                    continue;
                }
                annotation if annotation.starts_with('#') => continue,
                _ => {}
            }

            if self.table.labels.is_none() {
                self.table.labels = Some(row.iter().map(String::from).collect());
                continue;
            }
            let labels = self.table.labels.as_deref().unwrap_or_default();

            if TableMeta::is_error_table(labels) {
                self.done = true;
                let message = row.get(1).unwrap_or("unknown error").to_string();
                return Some(Err(Error::Query(message)));
            }

            let decoded = self.decode_row(labels, &row);
            if decoded.is_err() {
                self.done = true;
            }
            return Some(decoded);
        }
        None
    }
}

fn to_value(datatype: &str, raw: &str) -> std::result::Result<Value, String> {
    let is_string = !matches!(datatype, "boolean" | "long" | "unsignedLong" | "double");
    if raw.is_empty() && !is_string {
        return Ok(Value::Null);
    }

    match datatype {
        "boolean" => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(format!("invalid boolean {:?}", other)),
        },
        "long" => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| format!("invalid long {:?}: {}", raw, e)),
        "unsignedLong" => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| format!("invalid unsignedLong {:?}: {}", raw, e)),
        "double" => raw
            .parse::<f64>()
            .map(|v| Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null))
            .map_err(|e| format!("invalid double {:?}: {}", raw, e)),
        _ => Ok(Value::String(raw.to_string())),
    }
}
