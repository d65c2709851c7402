//! Access to the time-series store.
//!
//! [`Store`] exposes the primitive calls the service needs from the store
//! (org lookup, bucket listing and creation, point write, last-hour query).
//! Org resolution and bucket provisioning are provided methods layered on
//! top, so every implementation shares the same provisioning rules.

mod flux;
mod influx;
mod line_protocol;

pub use flux::{last_hour_query, FluxRecords};
pub use influx::InfluxStore;
pub use line_protocol::Point;

use crate::errors::{Error, Result};
use crate::model::Record;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Retention applied to every client bucket
pub const BUCKET_RETENTION: Duration = Duration::from_secs(3600 * 24 * 365);

/// Opaque identifier of an organization in the store
pub type OrgId = String;

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
}

/// Outcome of a bucket create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketCreation {
    Created,
    /// Somebody else created it between our list and create calls
    AlreadyExists,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Organizations visible to the credential whose name matches `name`
    async fn list_orgs(&self, name: &str) -> Result<Vec<Organization>>;

    /// Buckets of the organization named `name`
    async fn list_buckets(&self, org_id: &str, name: &str) -> Result<Vec<Bucket>>;

    async fn create_bucket(
        &self,
        org_id: &str,
        name: &str,
        retention: Duration,
    ) -> Result<BucketCreation>;

    /// Writes one point; returns once the store has acknowledged it.
    async fn write_point(&self, org_id: &str, bucket: &str, point: &Point) -> Result<()>;

    /// Every record of `measurement` tagged with `device_id` written in the
    /// last hour.
    async fn query_last_hour(
        &self,
        org_id: &str,
        bucket: &str,
        measurement: &str,
        device_id: &str,
    ) -> Result<Vec<Record>>;

    async fn resolve_org_id(&self, org_name: &str) -> Result<OrgId> {
        let orgs = self.list_orgs(org_name).await?;
        orgs.into_iter()
            .find(|org| org.name == org_name)
            .map(|org| org.id)
            .ok_or_else(|| Error::OrgNotFound(org_name.to_string()))
    }

    async fn bucket_exists(&self, org_id: &str, name: &str) -> Result<bool> {
        let buckets = self.list_buckets(org_id, name).await?;
        Ok(buckets.iter().any(|b| b.name == name))
    }

    /// Makes sure the bucket exists, returning whether this call created it.
    ///
    /// The existence check and the creation are two separate calls; a
    /// concurrent creator in between is reported by the store as a
    /// conflict, which counts as the bucket existing.
    async fn ensure_bucket(&self, org_id: &str, name: &str) -> Result<bool> {
        let existing = self.list_buckets(org_id, name).await?;
        if let Some(bucket) = existing.iter().find(|b| b.name == name) {
            debug!(bucket = name, id = %bucket.id, "bucket already exists");
            return Ok(false);
        }

        info!(bucket = name, "creating bucket");
        match self.create_bucket(org_id, name, BUCKET_RETENTION).await? {
            BucketCreation::Created => Ok(true),
            BucketCreation::AlreadyExists => {
                info!(bucket = name, "bucket was created concurrently");
                Ok(false)
            }
        }
    }
}
