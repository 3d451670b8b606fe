//! Feature service response DTOs.
//!
//! These map directly onto ArcGIS REST JSON after [`super::decode`] has run,
//! so date fields already hold RFC 3339 strings and document fields hold
//! URLs. They use `Option` liberally because the service omits or nulls
//! fields freely; [`super::convert`] decides what is actually required.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Attribute bag of a single feature or table row.
pub type Attributes = serde_json::Map<String, Value>;

/// A feature or table row.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Attributes,

    /// Never requested for related tables.
    #[serde(default)]
    pub geometry: Option<Value>,
}

/// Response from a feature resource, `{layer}/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureResponse {
    pub feature: Feature,
}

/// Response from `{layer}/query`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub features: Vec<Feature>,

    pub object_id_field_name: Option<String>,

    /// Set when the service truncated the result.
    pub exceeded_transfer_limit: Option<bool>,
}

/// Response from `{layer}/queryRelatedRecords`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedRecordsResponse {
    #[serde(default)]
    pub related_record_groups: Vec<RelatedRecordGroup>,
}

/// Related records belonging to one origin feature.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedRecordGroup {
    /// Object ID of the origin feature.
    pub object_id: i64,

    #[serde(default)]
    pub related_records: Vec<Feature>,
}

/// Response from `{service}/layers`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayersResponse {
    #[serde(default)]
    pub layers: Vec<LayerInfo>,

    #[serde(default)]
    pub tables: Vec<LayerInfo>,
}

/// A layer or table in the service.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerInfo {
    pub id: i64,

    pub name: String,

    /// "Feature Layer" or "Table".
    #[serde(rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub relationships: Vec<RelationshipInfo>,
}

/// A relationship class declared on a layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipInfo {
    pub id: i64,

    pub name: String,

    pub related_table_id: i64,

    /// "esriRelRoleOrigin" or "esriRelRoleDestination".
    pub role: Option<String>,

    pub key_field: Option<String>,
}

/// A yes/no flag, which services variously encode as booleans, 0/1 or Y/N.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl Flag {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Flag::Bool(b) => Some(*b),
            Flag::Number(n) => Some(*n != 0),
            Flag::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                "Y" | "YES" | "T" | "TRUE" | "1" => Some(true),
                "N" | "NO" | "F" | "FALSE" | "0" | "" => Some(false),
                _ => None,
            },
        }
    }
}

/// Attributes of a crossing location feature.
#[derive(Debug, Clone, Deserialize)]
pub struct CrossingLocationDto {
    #[serde(rename = "CrossingLocationId")]
    pub crossing_location_id: Option<i64>,

    #[serde(rename = "StateStructureId")]
    pub state_structure_id: Option<String>,

    #[serde(rename = "BridgeNumber")]
    pub bridge_number: Option<String>,

    #[serde(rename = "StateRouteIdentifier")]
    pub state_route_identifier: Option<String>,

    /// State route milepost.
    #[serde(rename = "SRMP")]
    pub srmp: Option<f64>,

    #[serde(rename = "ABInd")]
    pub ab_ind: Option<String>,

    #[serde(rename = "DirectionInd")]
    pub direction_ind: Option<String>,

    #[serde(rename = "CrossingDesc")]
    pub crossing_desc: Option<String>,

    #[serde(rename = "OnUnderCode")]
    pub on_under_code: Option<String>,

    #[serde(rename = "IncreasingDirReviewCmltInd")]
    pub increasing_review: Option<Flag>,

    #[serde(rename = "DecreasingDirReviewCmltInd")]
    pub decreasing_review: Option<Flag>,

    /// The extension spells this `RecordCreateData`.
    #[serde(rename = "RecordCreateDate", alias = "RecordCreateData")]
    pub record_create_date: Option<DateTime<Utc>>,

    #[serde(rename = "RecordUpdateDate")]
    pub record_update_date: Option<DateTime<Utc>>,
}

/// A row of the lanes table.
#[derive(Debug, Clone, Deserialize)]
pub struct LaneRecordDto {
    #[serde(rename = "Direction", alias = "DirectionInd")]
    pub direction: Option<String>,

    #[serde(rename = "LaneNumber")]
    pub lane_number: Option<i64>,

    /// Inches. Some services publish this as a double.
    #[serde(rename = "MinimumVerticalClearance")]
    pub minimum_vertical_clearance: Option<f64>,
}

/// A row of the advisory notes table.
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisoryRecordDto {
    #[serde(rename = "Direction", alias = "DirectionInd")]
    pub direction: Option<String>,

    #[serde(rename = "AdvisoryNote")]
    pub advisory_note: Option<String>,
}

/// A row of the documents table.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRecordDto {
    #[serde(rename = "Direction", alias = "DirectionInd")]
    pub direction: Option<String>,

    /// Image URL, already resolved from the document OID.
    #[serde(rename = "Document")]
    pub document: Option<Url>,
}

/// Response from the `exts/BridgeVC/crossing/{id}` server extension.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionCrossingDto {
    #[serde(rename = "CrossingLocation")]
    pub crossing_location: CrossingLocationDto,

    #[serde(rename = "RelatedData", default)]
    pub related_data: ExtensionRelatedDto,
}

/// Per-direction data as the server extension groups it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionRelatedDto {
    #[serde(rename = "Increase")]
    pub increase: Option<ExtensionDirectionalDto>,

    #[serde(rename = "Decrease")]
    pub decrease: Option<ExtensionDirectionalDto>,
}

/// One direction's data from the server extension.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionDirectionalDto {
    #[serde(rename = "Direction")]
    pub direction: Option<String>,

    /// Clearances ordered by lane number.
    #[serde(rename = "Lanes", default)]
    pub lanes: Vec<Option<f64>>,

    #[serde(rename = "Document")]
    pub document: Option<Url>,

    #[serde(rename = "AdvisoryNote")]
    pub advisory_note: Option<String>,
}
