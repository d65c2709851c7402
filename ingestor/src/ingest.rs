use crate::errors::Result;
use crate::metrics::{BUCKETS_CREATED_TOTAL, WRITES_TOTAL, WRITE_LATENCY_SECONDS};
use crate::model::{bucket_name, Reading};
use crate::store::{Point, Store};
use tokio::time::Instant;
use tracing::{debug, info};

/// Stores one reading in its client's bucket, provisioning the bucket on the
/// client's first write.
///
/// Steps run strictly in order: resolve org, ensure bucket, write point.
/// Nothing is retried.
pub async fn record_reading(store: &dyn Store, org_name: &str, reading: &Reading) -> Result<()> {
    let start = Instant::now();
    let bucket = bucket_name(&reading.client_name);

    let org_id = store.resolve_org_id(org_name).await?;

    if store.ensure_bucket(&org_id, &bucket).await? {
        BUCKETS_CREATED_TOTAL.inc();
        info!(client = %reading.client_name, bucket = %bucket, "provisioned bucket for new client");
    }

    store
        .write_point(&org_id, &bucket, &Point::from(reading))
        .await?;

    WRITES_TOTAL.inc();
    let elapsed = start.elapsed().as_secs_f64();
    WRITE_LATENCY_SECONDS.observe(elapsed);
    debug!(
        bucket = %bucket,
        device_id = %reading.device_id,
        "reading stored in {:.3}s",
        elapsed
    );
    Ok(())
}
