//! Aggregation configuration.
//!
//! Layer and relationship IDs are properties of the published service, not
//! of this code. The defaults match the WSDOT service at the time of
//! writing; [`CrossingConfig::discovered`] re-derives them from service
//! metadata when a schema has drifted.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::arcgis::{FeatureServiceClient, FeatureServiceError, LayersResponse};

/// Join key shared by the crossings layer and every related table.
pub const KEY_FIELD: &str = "CrossingLocationId";

/// Default path of the server extension's crossing endpoint.
pub const DEFAULT_EXTENSION_PATH: &str = "exts/BridgeVC/crossing";

pub(crate) const LANE_FIELDS: &[&str] = &[
    KEY_FIELD,
    "Direction",
    "LaneNumber",
    "MinimumVerticalClearance",
];

pub(crate) const ADVISORY_FIELDS: &[&str] = &[KEY_FIELD, "Direction", "AdvisoryNote"];

// DocContent holds the image bytes and is never requested.
pub(crate) const DOCUMENT_FIELDS: &[&str] = &[KEY_FIELD, "Direction", "Document"];

/// IDs of the layers and tables in the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerIds {
    pub crossings: i64,
    pub lanes: i64,
    pub documents: i64,
    pub advisories: i64,
}

impl Default for LayerIds {
    fn default() -> Self {
        Self {
            crossings: 0,
            lanes: 2,
            documents: 3,
            advisories: 4,
        }
    }
}

impl LayerIds {
    /// Find layers and tables by name, keeping defaults for anything missing.
    pub fn discover(info: &LayersResponse) -> Self {
        let mut ids = Self::default();

        for layer in &info.layers {
            if short_name(&layer.name) == "crossings" {
                ids.crossings = layer.id;
            }
        }

        for table in &info.tables {
            match short_name(&table.name).as_str() {
                "lanes" | "maplanes" => ids.lanes = table.id,
                "documents" => ids.documents = table.id,
                "advisories" | "advisorynotes" | "mapadvisorynote" => ids.advisories = table.id,
                _ => {}
            }
        }

        ids
    }
}

/// Relationship class IDs from the crossings layer to each related table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipIds {
    pub lanes: i64,
    pub documents: i64,
    pub advisories: i64,
}

impl Default for RelationshipIds {
    fn default() -> Self {
        Self {
            lanes: 0,
            documents: 1,
            advisories: 2,
        }
    }
}

impl RelationshipIds {
    /// Match the crossings layer's relationships to tables by related table ID.
    pub fn discover(info: &LayersResponse, layers: &LayerIds) -> Self {
        let mut ids = Self::default();

        let Some(crossings) = info.layers.iter().find(|l| l.id == layers.crossings) else {
            return ids;
        };

        for rel in &crossings.relationships {
            if rel.related_table_id == layers.lanes {
                ids.lanes = rel.id;
            } else if rel.related_table_id == layers.documents {
                ids.documents = rel.id;
            } else if rel.related_table_id == layers.advisories {
                ids.advisories = rel.id;
            }
        }

        ids
    }
}

/// How related data is joined to the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStrategy {
    /// One filtered query per related table.
    #[default]
    RelatedQueries,
    /// One `queryRelatedRecords` per relationship class.
    Relationships,
    /// The `BridgeVC` server extension, which joins server-side.
    Extension,
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown join strategy {0:?} (expected related, relationships or extension)")]
pub struct UnknownStrategy(String);

impl FromStr for JoinStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "related" | "related-queries" | "query" => Ok(JoinStrategy::RelatedQueries),
            "relationships" | "relationship" => Ok(JoinStrategy::Relationships),
            "extension" | "soe" => Ok(JoinStrategy::Extension),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinStrategy::RelatedQueries => "related",
            JoinStrategy::Relationships => "relationships",
            JoinStrategy::Extension => "extension",
        })
    }
}

/// Configuration for crossing aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossingConfig {
    pub layers: LayerIds,
    pub relationships: RelationshipIds,
    pub strategy: JoinStrategy,
    /// Path of the server extension's crossing endpoint.
    pub extension_path: String,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self {
            layers: LayerIds::default(),
            relationships: RelationshipIds::default(),
            strategy: JoinStrategy::default(),
            extension_path: DEFAULT_EXTENSION_PATH.to_string(),
        }
    }
}

impl CrossingConfig {
    pub fn with_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_layers(mut self, layers: LayerIds) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_relationships(mut self, relationships: RelationshipIds) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn with_extension_path(mut self, path: impl Into<String>) -> Self {
        self.extension_path = path.into();
        self
    }

    /// Replace layer and relationship IDs with those found in `info`.
    pub fn discovered(self, info: &LayersResponse) -> Self {
        let layers = LayerIds::discover(info);
        let relationships = RelationshipIds::discover(info, &layers);
        self.with_layers(layers).with_relationships(relationships)
    }
}

/// Read `{root}/layers` and re-derive IDs on top of `base`.
pub async fn discover_config(
    client: &FeatureServiceClient,
    base: CrossingConfig,
) -> Result<CrossingConfig, FeatureServiceError> {
    let info = client.layers().await?;
    let config = base.discovered(&info);
    info!(
        layers = ?config.layers,
        relationships = ?config.relationships,
        "discovered service schema"
    );
    Ok(config)
}

/// Table names may be qualified, e.g. `VerticalClearance.DBO.Lanes`.
fn short_name(name: &str) -> String {
    name.rsplit('.')
        .next()
        .unwrap_or(name)
        .trim_start_matches('%')
        .to_ascii_lowercase()
}
