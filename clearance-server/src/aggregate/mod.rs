//! Crossing aggregation.
//!
//! Fetches a crossing location and its related lanes, advisory notes and
//! documents, then normalizes them into one [`Crossing`]. How the related
//! tables are reached is chosen by [`JoinStrategy`]; every strategy yields
//! the same result for the same service data.

mod config;
mod extension;
mod normalize;
mod related;
mod relationship;

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::arcgis::{
    CrossingLocationDto, Feature, FeatureServiceClient, FeatureServiceError, ServiceConfig,
    convert_location, from_attributes,
};
use crate::domain::{Crossing, CrossingLocation, CrossingLocationId};

pub use config::{
    CrossingConfig, DEFAULT_EXTENSION_PATH, JoinStrategy, KEY_FIELD, LayerIds, RelationshipIds,
    UnknownStrategy, discover_config,
};
pub use extension::fetch_from_extension;
pub use normalize::{IntegrityWarning, Normalized, RelatedRows, normalize, normalize_rows};
pub use related::{fetch_related, fetch_related_rows};
pub use relationship::{
    RelationshipQuery, RelationshipRecords, ResolvedRelationships, fetch_by_relationship,
};

use config::{ADVISORY_FIELDS, DOCUMENT_FIELDS, LANE_FIELDS};
use normalize::lane_gaps;

/// Error from crossing aggregation.
#[derive(Debug, thiserror::Error)]
pub enum CrossingError {
    #[error(transparent)]
    FeatureService(#[from] FeatureServiceError),

    #[error("crossing location {0} not found")]
    NotFound(CrossingLocationId),

    #[error("requested crossing location {requested} but the service returned {returned}")]
    IdentifierMismatch {
        requested: CrossingLocationId,
        returned: CrossingLocationId,
    },

    #[error("no response for crossing location within {0:?}")]
    Timeout(Duration),
}

/// A crossing and the integrity warnings raised while assembling it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingReport {
    pub crossing: Crossing,
    pub warnings: Vec<IntegrityWarning>,
}

/// Fetches crossings from one feature service.
///
/// Cheap to clone. Nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct CrossingClient {
    client: FeatureServiceClient,
    config: CrossingConfig,
}

impl CrossingClient {
    pub fn new(client: FeatureServiceClient, config: CrossingConfig) -> Self {
        Self { client, config }
    }

    /// Client for `service_root` with default configuration.
    pub fn for_service_root(service_root: &str) -> Result<Self, CrossingError> {
        let client = FeatureServiceClient::new(ServiceConfig::parse(service_root)?)?;
        Ok(Self::new(client, CrossingConfig::default()))
    }

    pub fn config(&self) -> &CrossingConfig {
        &self.config
    }

    pub fn feature_service(&self) -> &FeatureServiceClient {
        &self.client
    }

    /// Re-derive layer and relationship IDs from the service metadata.
    pub async fn discover(self) -> Result<Self, CrossingError> {
        let config = discover_config(&self.client, self.config).await?;
        Ok(Self {
            client: self.client,
            config,
        })
    }

    /// Fetch and assemble one crossing.
    pub async fn fetch_crossing_info(
        &self,
        id: CrossingLocationId,
    ) -> Result<Crossing, CrossingError> {
        self.fetch_crossing_report(id).await.map(|r| r.crossing)
    }

    /// Fetch one crossing along with any integrity warnings.
    pub async fn fetch_crossing_report(
        &self,
        id: CrossingLocationId,
    ) -> Result<CrossingReport, CrossingError> {
        debug!(crossing = %id, strategy = %self.config.strategy, "fetching crossing");

        let report = match self.config.strategy {
            JoinStrategy::RelatedQueries => self.via_related_queries(id).await?,
            JoinStrategy::Relationships => self.via_relationships(id).await?,
            JoinStrategy::Extension => {
                let crossing =
                    fetch_from_extension(&self.client, id, &self.config.extension_path).await?;
                let warnings = lane_gaps(&crossing.related);
                CrossingReport { crossing, warnings }
            }
        };

        let returned = report.crossing.location.id;
        if returned != id {
            return Err(CrossingError::IdentifierMismatch {
                requested: id,
                returned,
            });
        }

        info!(
            crossing = %id,
            route = %report.crossing.location.state_route,
            milepost = %report.crossing.location.milepost_label(),
            increase = report.crossing.related.increase.is_some(),
            decrease = report.crossing.related.decrease.is_some(),
            warnings = report.warnings.len(),
            "crossing assembled"
        );
        Ok(report)
    }

    /// [`Self::fetch_crossing_report`] with a deadline.
    ///
    /// On timeout every outstanding request is dropped.
    pub async fn with_timeout(
        &self,
        id: CrossingLocationId,
        timeout: Duration,
    ) -> Result<CrossingReport, CrossingError> {
        tokio::time::timeout(timeout, self.fetch_crossing_report(id))
            .await
            .map_err(|_| CrossingError::Timeout(timeout))?
    }

    async fn via_related_queries(
        &self,
        id: CrossingLocationId,
    ) -> Result<CrossingReport, CrossingError> {
        let layer = self.config.layers.crossings.to_string();

        let (primary, rows) = futures::try_join!(
            self.client.get_feature(&layer, id.get()),
            fetch_related_rows(&self.client, id, &self.config),
        )?;

        let location = self.location(id, &primary.feature)?;
        let normalized = normalize_rows(&rows);
        Ok(CrossingReport {
            crossing: Crossing::assemble(location, normalized.related),
            warnings: normalized.warnings,
        })
    }

    async fn via_relationships(
        &self,
        id: CrossingLocationId,
    ) -> Result<CrossingReport, CrossingError> {
        let rel = &self.config.relationships;
        let queries = [
            RelationshipQuery {
                relationship_id: rel.lanes,
                out_fields: LANE_FIELDS,
            },
            RelationshipQuery {
                relationship_id: rel.advisories,
                out_fields: ADVISORY_FIELDS,
            },
            RelationshipQuery {
                relationship_id: rel.documents,
                out_fields: DOCUMENT_FIELDS,
            },
        ];

        let resolved =
            fetch_by_relationship(&self.client, id, self.config.layers.crossings, &queries)
                .await?;
        let location = self.location(id, &resolved.feature)?;

        let object_id = resolved.object_id;
        let mut records = resolved.records.into_iter();
        let mut next = || records.next().map(|mut r| r.take(object_id)).unwrap_or_default();
        let rows = RelatedRows {
            lanes: next(),
            advisories: next(),
            documents: next(),
        };

        let normalized = normalize_rows(&rows);
        Ok(CrossingReport {
            crossing: Crossing::assemble(location, normalized.related),
            warnings: normalized.warnings,
        })
    }

    /// Project the primary feature into a location.
    fn location(
        &self,
        id: CrossingLocationId,
        feature: &Feature,
    ) -> Result<CrossingLocation, CrossingError> {
        if feature.attributes.is_empty() {
            return Err(CrossingError::NotFound(id));
        }

        from_attributes::<CrossingLocationDto>(&feature.attributes)
            .and_then(convert_location)
            .map_err(|source| {
                let layer = self.config.layers.crossings.to_string();
                let url = self
                    .client
                    .endpoint(&[&layer, &id.to_string()])
                    .map(|u| u.to_string())
                    .unwrap_or(layer);
                CrossingError::from(FeatureServiceError::Conversion { url, source })
            })
    }
}

/// Fetch one crossing from `service_root` with default configuration.
pub async fn fetch_crossing_info(
    id: CrossingLocationId,
    service_root: &str,
) -> Result<Crossing, CrossingError> {
    CrossingClient::for_service_root(service_root)?
        .fetch_crossing_info(id)
        .await
}
