//! Conversion from decoded feature service DTOs to domain types.
//!
//! This is the projection half of the decode pipeline. It runs on trees that
//! [`super::decode`] has already coerced, and decides which fields are
//! required and how loose wire encodings map onto domain enums.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{
    AheadBack, Crossing, CrossingLocation, CrossingLocationId, Direction, DirectionalData,
    LaneClearances, OnUnder, RelatedData,
};

use super::types::{
    AdvisoryRecordDto, Attributes, CrossingLocationDto, DocumentRecordDto,
    ExtensionCrossingDto, ExtensionDirectionalDto, LaneRecordDto,
};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// The JSON did not match the expected structure
    #[error("unexpected structure: {0}")]
    Shape(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but its value is not usable
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// One lane's clearance, as read from the lanes table.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneRecord {
    pub direction: Direction,
    pub lane_number: i64,
    /// Inches.
    pub clearance: u32,
}

/// An advisory note row.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryRecord {
    pub direction: Direction,
    pub note: String,
}

/// A document row with its resolved image URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub direction: Direction,
    pub url: url::Url,
}

/// Deserialize an attribute bag into a DTO.
pub fn from_attributes<T: DeserializeOwned>(attributes: &Attributes) -> Result<T, ConversionError> {
    from_value(Value::Object(attributes.clone()))
}

/// Deserialize a decoded tree into a DTO.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ConversionError> {
    serde_json::from_value(value).map_err(|e| ConversionError::Shape(e.to_string()))
}

/// Convert crossing location attributes to a domain location.
pub fn convert_location(dto: CrossingLocationDto) -> Result<CrossingLocation, ConversionError> {
    let id = dto
        .crossing_location_id
        .ok_or(ConversionError::MissingField("CrossingLocationId"))?;

    let on_under_code = dto
        .on_under_code
        .ok_or(ConversionError::MissingField("OnUnderCode"))?;
    let on_under = OnUnder::parse(&on_under_code).ok_or(ConversionError::InvalidValue {
        field: "OnUnderCode",
        value: on_under_code,
    })?;

    let direction = match dto.direction_ind.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(parse_direction("DirectionInd", code)?),
    };

    let increasing_review_complete = match dto.increasing_review {
        None => false,
        Some(flag) => flag.as_bool().ok_or_else(|| ConversionError::InvalidValue {
            field: "IncreasingDirReviewCmltInd",
            value: format!("{flag:?}"),
        })?,
    };
    let decreasing_review_complete = match dto.decreasing_review {
        None => false,
        Some(flag) => flag.as_bool().ok_or_else(|| ConversionError::InvalidValue {
            field: "DecreasingDirReviewCmltInd",
            value: format!("{flag:?}"),
        })?,
    };

    Ok(CrossingLocation {
        id: CrossingLocationId::new(id),
        state_structure_id: dto.state_structure_id.unwrap_or_default(),
        bridge_number: dto.bridge_number.unwrap_or_default(),
        state_route: dto
            .state_route_identifier
            .ok_or(ConversionError::MissingField("StateRouteIdentifier"))?,
        srmp: dto.srmp.ok_or(ConversionError::MissingField("SRMP"))?,
        ahead_back: dto.ab_ind.as_deref().and_then(AheadBack::parse),
        direction,
        description: dto.crossing_desc.unwrap_or_default(),
        on_under,
        increasing_review_complete,
        decreasing_review_complete,
        created: dto
            .record_create_date
            .ok_or(ConversionError::MissingField("RecordCreateDate"))?,
        updated: dto.record_update_date,
    })
}

/// Convert a lanes table row.
pub fn convert_lane(dto: LaneRecordDto) -> Result<LaneRecord, ConversionError> {
    let direction = required_direction(dto.direction)?;
    let lane_number = dto
        .lane_number
        .ok_or(ConversionError::MissingField("LaneNumber"))?;
    let clearance = dto
        .minimum_vertical_clearance
        .ok_or(ConversionError::MissingField("MinimumVerticalClearance"))
        .and_then(|c| inches("MinimumVerticalClearance", c))?;

    Ok(LaneRecord {
        direction,
        lane_number,
        clearance,
    })
}

/// Convert an advisory notes row. Blank notes carry no information.
pub fn convert_advisory(dto: AdvisoryRecordDto) -> Result<Option<AdvisoryRecord>, ConversionError> {
    let direction = required_direction(dto.direction)?;
    Ok(dto
        .advisory_note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .map(|note| AdvisoryRecord { direction, note }))
}

/// Convert a documents row. Rows without a document carry no information.
pub fn convert_document(dto: DocumentRecordDto) -> Result<Option<DocumentRecord>, ConversionError> {
    let direction = required_direction(dto.direction)?;
    Ok(dto.document.map(|url| DocumentRecord { direction, url }))
}

/// Convert the server extension's pre-assembled crossing.
pub fn convert_extension_crossing(dto: ExtensionCrossingDto) -> Result<Crossing, ConversionError> {
    let location = convert_location(dto.crossing_location)?;
    let increase = dto
        .related_data
        .increase
        .map(|d| convert_extension_directional(d, Direction::Increase))
        .transpose()?;
    let decrease = dto
        .related_data
        .decrease
        .map(|d| convert_extension_directional(d, Direction::Decrease))
        .transpose()?;

    Ok(Crossing::assemble(
        location,
        RelatedData::new(increase.flatten(), decrease.flatten()),
    ))
}

/// Returns `None` for a bucket with nothing in it, matching the query paths.
fn convert_extension_directional(
    dto: ExtensionDirectionalDto,
    bucket: Direction,
) -> Result<Option<DirectionalData>, ConversionError> {
    let slots = dto
        .lanes
        .into_iter()
        .map(|lane| lane.map(|c| inches("Lanes", c)).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    let advisory_note = dto
        .advisory_note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    if slots.is_empty() && advisory_note.is_none() && dto.document.is_none() {
        return Ok(None);
    }

    Ok(Some(DirectionalData {
        direction: bucket,
        lanes: LaneClearances::from_slots(slots),
        advisory_note,
        document: dto.document,
    }))
}

fn required_direction(raw: Option<String>) -> Result<Direction, ConversionError> {
    let raw = raw.ok_or(ConversionError::MissingField("Direction"))?;
    parse_direction("Direction", &raw)
}

fn parse_direction(field: &'static str, raw: &str) -> Result<Direction, ConversionError> {
    Direction::parse(raw).map_err(|_| ConversionError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

/// Clearances are whole inches; tolerate doubles but not negatives.
///
/// Fractions round down so a minimum is never overstated.
fn inches(field: &'static str, value: f64) -> Result<u32, ConversionError> {
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(ConversionError::InvalidValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(value.floor() as u32)
}
