//! Related-table fetching by attribute query.

use tracing::warn;

use crate::arcgis::{Attributes, FeatureServiceClient, FeatureServiceError};
use crate::domain::CrossingLocationId;

use super::config::{ADVISORY_FIELDS, CrossingConfig, DOCUMENT_FIELDS, KEY_FIELD, LANE_FIELDS};
use super::normalize::RelatedRows;

/// Rows of one related table that belong to a crossing, in service order.
pub async fn fetch_related(
    client: &FeatureServiceClient,
    crossing_id: CrossingLocationId,
    table_id: i64,
    fields: &[&str],
) -> Result<Vec<Attributes>, FeatureServiceError> {
    let where_clause = format!("{KEY_FIELD}={crossing_id}");
    let response = client.query(table_id, &where_clause, fields).await?;

    if response.exceeded_transfer_limit == Some(true) {
        warn!(
            table = table_id,
            crossing = %crossing_id,
            "related query hit the transfer limit, results are truncated"
        );
    }

    Ok(response
        .features
        .into_iter()
        .map(|f| f.attributes)
        .collect())
}

/// Query lanes, advisories and documents concurrently.
///
/// The first failure drops the other requests.
pub async fn fetch_related_rows(
    client: &FeatureServiceClient,
    crossing_id: CrossingLocationId,
    config: &CrossingConfig,
) -> Result<RelatedRows, FeatureServiceError> {
    let (lanes, advisories, documents) = futures::try_join!(
        fetch_related(client, crossing_id, config.layers.lanes, LANE_FIELDS),
        fetch_related(client, crossing_id, config.layers.advisories, ADVISORY_FIELDS),
        fetch_related(client, crossing_id, config.layers.documents, DOCUMENT_FIELDS),
    )?;

    Ok(RelatedRows {
        lanes,
        advisories,
        documents,
    })
}
