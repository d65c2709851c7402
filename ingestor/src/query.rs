use crate::errors::Result;
use crate::metrics::QUERIES_TOTAL;
use crate::model::{bucket_name, DeviceQuery, Record, MEASUREMENT};
use crate::store::Store;
use tracing::debug;

/// Returns every record written for the device in the last hour.
///
/// A client that never wrote has no bucket yet; that is reported as an
/// empty result rather than a store error.
pub async fn last_hour_readings(
    store: &dyn Store,
    org_name: &str,
    query: &DeviceQuery,
) -> Result<Vec<Record>> {
    let bucket = bucket_name(&query.client_name);
    let org_id = store.resolve_org_id(org_name).await?;

    if !store.bucket_exists(&org_id, &bucket).await? {
        debug!(bucket = %bucket, "no bucket for client, nothing to query");
        QUERIES_TOTAL.inc();
        return Ok(Vec::new());
    }

    let records = store
        .query_last_hour(&org_id, &bucket, MEASUREMENT, &query.device_id)
        .await?;
    QUERIES_TOTAL.inc();
    Ok(records)
}
