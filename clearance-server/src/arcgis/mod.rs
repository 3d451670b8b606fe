//! ArcGIS REST feature service client.
//!
//! This module knows how to talk to a map/feature service and how to turn
//! its JSON into domain types. Some characteristics of the service that
//! shape the code here:
//! - Every request must carry `f=json`; without it the service returns HTML
//! - Failures arrive as `{"error": {...}}` bodies with HTTP 200
//! - Dates are epoch milliseconds from query endpoints but ISO strings from
//!   the `BridgeVC` server extension
//! - Documents are referenced by OID and served by the extension's image
//!   endpoint

mod client;
mod convert;
mod decode;
mod envelope;
mod error;
mod types;

pub use client::{
    DEFAULT_IMAGE_ENDPOINT, DEFAULT_SERVICE_ROOT, FeatureServiceClient, ServiceConfig,
};
pub use convert::{
    AdvisoryRecord, ConversionError, DocumentRecord, LaneRecord, convert_advisory,
    convert_document, convert_extension_crossing, convert_lane, convert_location,
    from_attributes, from_value,
};
pub use decode::{
    Coercion, CoercionRules, FieldPattern, combine_url, decode, format_timestamp,
    parse_timestamp,
};
pub use envelope::classify;
pub use error::FeatureServiceError;
pub use types::{
    AdvisoryRecordDto, Attributes, CrossingLocationDto, DocumentRecordDto, ExtensionCrossingDto,
    Feature, FeatureResponse, Flag, LaneRecordDto, LayerInfo, LayersResponse, QueryResponse,
    RelatedRecordGroup, RelatedRecordsResponse, RelationshipInfo,
};
