use crate::roster::User;
use crate::telemetry::Reading;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct WriteAck {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Posts readings to the ingestor's write endpoint
#[derive(Clone)]
pub struct Sender {
    http: reqwest::Client,
    url: String,
}

impl Sender {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Sends one reading and returns the server's acknowledgement message
    pub async fn send(&self, reading: &Reading) -> Result<String> {
        let resp = self
            .http
            .post(&self.url)
            .json(reading)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            bail!("server answered {}: {}", status, detail);
        }

        let ack: WriteAck = resp
            .json()
            .await
            .context("unreadable acknowledgement")?;
        Ok(ack.message)
    }

    /// Sends a fresh reading for every device of every user, one at a time.
    /// The first failure abandons the devices not yet sent.
    pub async fn send_all(&self, roster: &[User]) -> Result<usize> {
        let mut sent = 0;
        for user in roster {
            for device in &user.devices {
                let reading =
                    Reading::random(&mut rand::thread_rng(), &user.client_name, &device.device_id);

                let message = self.send(&reading).await.with_context(|| {
                    format!("sending {}/{}", user.client_name, device.device_id)
                })?;

                info!(
                    client = %user.client_name,
                    device_id = %device.device_id,
                    location = %device.location,
                    "Sent data: {}",
                    reading.summary()
                );
                info!("Server response: {}", message);
                sent += 1;
            }
        }
        Ok(sent)
    }
}
