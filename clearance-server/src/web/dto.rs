//! Data transfer objects for web responses.

use serde::Serialize;

use crate::aggregate::CrossingReport;
use crate::domain::{Crossing, DirectionalData, FeetInches};

/// Response for a crossing lookup.
#[derive(Debug, Serialize)]
pub struct CrossingResponse {
    /// The assembled crossing
    pub crossing: Crossing,

    /// Lowest clearance in each direction, for quick display
    pub minimum_clearance: MinimumClearance,

    /// Integrity warnings raised while assembling the crossing
    pub warnings: Vec<String>,
}

/// Lowest measured clearance per direction.
#[derive(Debug, Serialize)]
pub struct MinimumClearance {
    pub increase: Option<ClearanceResult>,
    pub decrease: Option<ClearanceResult>,
}

/// A clearance in inches and as feet and inches.
#[derive(Debug, PartialEq, Serialize)]
pub struct ClearanceResult {
    /// Total inches
    pub inches: u32,

    /// e.g. `15' 10"`
    pub display: String,
}

/// Error body, `{"error": {"code": .., "message": ..}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Feature service error code if there was one, otherwise the HTTP status
    pub code: i64,
    pub message: String,
}

// Conversion implementations

impl From<CrossingReport> for CrossingResponse {
    fn from(report: CrossingReport) -> Self {
        let related = &report.crossing.related;
        let minimum_clearance = MinimumClearance {
            increase: related.increase.as_ref().and_then(ClearanceResult::minimum_of),
            decrease: related.decrease.as_ref().and_then(ClearanceResult::minimum_of),
        };

        Self {
            minimum_clearance,
            warnings: report.warnings.iter().map(|w| w.to_string()).collect(),
            crossing: report.crossing,
        }
    }
}

impl ClearanceResult {
    pub fn from_inches(inches: u32) -> Self {
        Self {
            inches,
            display: FeetInches::from_inches(inches).to_string(),
        }
    }

    fn minimum_of(data: &DirectionalData) -> Option<Self> {
        data.lanes.minimum().map(Self::from_inches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::IntegrityWarning;
    use crate::domain::{
        CrossingLocation, CrossingLocationId, Direction, LaneClearances, OnUnder, RelatedData,
    };
    use chrono::DateTime;

    fn make_crossing(related: RelatedData) -> Crossing {
        Crossing::assemble(
            CrossingLocation {
                id: CrossingLocationId::new(7),
                state_structure_id: String::new(),
                bridge_number: "5/1".into(),
                state_route: "005".into(),
                srmp: 100.2,
                ahead_back: None,
                direction: None,
                description: String::new(),
                on_under: OnUnder::On,
                increasing_review_complete: false,
                decreasing_review_complete: false,
                created: DateTime::from_timestamp_millis(0).unwrap(),
                updated: None,
            },
            related,
        )
    }

    #[test]
    fn response_from_report() {
        let related = RelatedData::new(
            Some(DirectionalData {
                direction: Direction::Increase,
                lanes: LaneClearances::from_slots(vec![Some(192), None, Some(190)]),
                advisory_note: None,
                document: None,
            }),
            None,
        );
        let report = CrossingReport {
            crossing: make_crossing(related),
            warnings: vec![IntegrityWarning::LaneGap {
                direction: Direction::Increase,
                lane_number: 2,
            }],
        };

        let response = CrossingResponse::from(report);
        assert_eq!(
            response.minimum_clearance.increase,
            Some(ClearanceResult {
                inches: 190,
                display: "15' 10\"".into()
            })
        );
        assert!(response.minimum_clearance.decrease.is_none());
        assert_eq!(response.warnings, vec!["Increase: no clearance for lane 2"]);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["crossing"]["location"]["id"], 7);
        assert_eq!(json["crossing"]["related"]["increase"]["lanes"][1], serde_json::Value::Null);
    }

    #[test]
    fn no_lanes_no_minimum() {
        let related = RelatedData::new(
            None,
            Some(DirectionalData {
                direction: Direction::Decrease,
                lanes: LaneClearances::default(),
                advisory_note: Some("Height restricted".into()),
                document: None,
            }),
        );
        let response = CrossingResponse::from(CrossingReport {
            crossing: make_crossing(related),
            warnings: vec![],
        });
        assert!(response.minimum_clearance.decrease.is_none());
        assert!(response.warnings.is_empty());
    }
}
