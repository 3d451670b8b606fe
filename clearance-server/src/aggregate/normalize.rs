//! Direction normalization.
//!
//! Related tables arrive as flat rows tagged with a direction code. This
//! module groups them into the increasing and decreasing buckets and turns
//! each bucket's lane rows into a lane-indexed sequence.
//!
//! Rules:
//! - A `Both` row belongs to both buckets
//! - Lanes are stable-sorted by lane number; the first row for a lane wins
//! - Missing lane numbers are kept as holes, not renumbered
//! - Only the first advisory note and document in input order are kept
//! - An empty bucket is `None`
//!
//! Anything surprising is reported as an [`IntegrityWarning`] rather than
//! failing the aggregation.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::arcgis::{
    AdvisoryRecord, Attributes, ConversionError, DocumentRecord, LaneRecord, LaneRecordDto,
    convert_advisory, convert_document, convert_lane, from_attributes,
};
use crate::domain::{Direction, DirectionalData, LaneClearances, RelatedData};

/// Upper bound on lane numbers, so one bad row cannot size a huge sequence.
const MAX_LANE_NUMBER: i64 = 1_000;

/// A non-fatal problem found in related data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// No row for a lane below the highest lane number.
    LaneGap {
        direction: Direction,
        lane_number: usize,
    },
    /// More than one row for the same lane; the first was kept.
    DuplicateLane {
        direction: Direction,
        lane_number: i64,
        kept: u32,
        dropped: u32,
    },
    /// Lane number outside `1..=MAX_LANE_NUMBER`; the row was skipped.
    InvalidLaneNumber {
        direction: Direction,
        lane_number: i64,
    },
    ExtraAdvisories { direction: Direction, count: usize },
    ExtraDocuments { direction: Direction, count: usize },
    /// A row that could not be read at all.
    UnreadableRecord { table: &'static str, reason: String },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::LaneGap {
                direction,
                lane_number,
            } => write!(f, "{direction}: no clearance for lane {lane_number}"),
            IntegrityWarning::DuplicateLane {
                direction,
                lane_number,
                kept,
                dropped,
            } => write!(
                f,
                "{direction}: lane {lane_number} listed twice (kept {kept}, dropped {dropped})"
            ),
            IntegrityWarning::InvalidLaneNumber {
                direction,
                lane_number,
            } => write!(f, "{direction}: invalid lane number {lane_number}"),
            IntegrityWarning::ExtraAdvisories { direction, count } => {
                write!(f, "{direction}: {count} advisory notes, using the first")
            }
            IntegrityWarning::ExtraDocuments { direction, count } => {
                write!(f, "{direction}: {count} documents, using the first")
            }
            IntegrityWarning::UnreadableRecord { table, reason } => {
                write!(f, "skipped unreadable {table} row: {reason}")
            }
        }
    }
}

/// Raw related rows for one crossing, before conversion.
#[derive(Debug, Clone, Default)]
pub struct RelatedRows {
    pub lanes: Vec<Attributes>,
    pub advisories: Vec<Attributes>,
    pub documents: Vec<Attributes>,
}

/// Result of normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub related: RelatedData,
    pub warnings: Vec<IntegrityWarning>,
}

/// Convert raw rows and normalize them.
///
/// Rows that fail conversion are skipped with an
/// [`IntegrityWarning::UnreadableRecord`].
pub fn normalize_rows(rows: &RelatedRows) -> Normalized {
    let mut warnings = Vec::new();

    let lanes = read_rows("lanes", &rows.lanes, &mut warnings, |dto: LaneRecordDto| {
        convert_lane(dto).map(Some)
    });
    let advisories = read_rows("advisories", &rows.advisories, &mut warnings, convert_advisory);
    let documents = read_rows("documents", &rows.documents, &mut warnings, convert_document);

    let mut normalized = normalize(&lanes, &advisories, &documents);
    warnings.append(&mut normalized.warnings);
    normalized.warnings = warnings;
    normalized
}

/// Group converted records by direction.
pub fn normalize(
    lanes: &[LaneRecord],
    advisories: &[AdvisoryRecord],
    documents: &[DocumentRecord],
) -> Normalized {
    let mut warnings = Vec::new();

    let increase = bucket(Direction::Increase, lanes, advisories, documents, &mut warnings);
    let decrease = bucket(Direction::Decrease, lanes, advisories, documents, &mut warnings);

    log_warnings(&warnings);

    Normalized {
        related: RelatedData::new(increase, decrease),
        warnings,
    }
}

fn bucket(
    direction: Direction,
    lanes: &[LaneRecord],
    advisories: &[AdvisoryRecord],
    documents: &[DocumentRecord],
    warnings: &mut Vec<IntegrityWarning>,
) -> Option<DirectionalData> {
    let mut lane_rows: Vec<&LaneRecord> = Vec::new();
    for lane in lanes.iter().filter(|l| l.direction.applies_to(direction)) {
        if (1..=MAX_LANE_NUMBER).contains(&lane.lane_number) {
            lane_rows.push(lane);
        } else {
            warnings.push(IntegrityWarning::InvalidLaneNumber {
                direction,
                lane_number: lane.lane_number,
            });
        }
    }
    // sort_by_key is stable, so duplicates keep input order
    lane_rows.sort_by_key(|l| l.lane_number);

    let notes: Vec<&AdvisoryRecord> = advisories
        .iter()
        .filter(|a| a.direction.applies_to(direction))
        .collect();
    if notes.len() > 1 {
        warnings.push(IntegrityWarning::ExtraAdvisories {
            direction,
            count: notes.len(),
        });
    }

    let docs: Vec<&DocumentRecord> = documents
        .iter()
        .filter(|d| d.direction.applies_to(direction))
        .collect();
    if docs.len() > 1 {
        warnings.push(IntegrityWarning::ExtraDocuments {
            direction,
            count: docs.len(),
        });
    }

    if lane_rows.is_empty() && notes.is_empty() && docs.is_empty() {
        return None;
    }

    Some(DirectionalData {
        direction,
        lanes: lane_sequence(direction, &lane_rows, warnings),
        advisory_note: notes.first().map(|a| a.note.clone()),
        document: docs.first().map(|d| d.url.clone()),
    })
}

/// `sorted` must be sorted by lane number, all within range.
fn lane_sequence(
    direction: Direction,
    sorted: &[&LaneRecord],
    warnings: &mut Vec<IntegrityWarning>,
) -> LaneClearances {
    let len = sorted.last().map_or(0, |l| l.lane_number as usize);
    let mut slots: Vec<Option<u32>> = vec![None; len];

    for lane in sorted {
        let slot = &mut slots[lane.lane_number as usize - 1];
        match *slot {
            None => *slot = Some(lane.clearance),
            Some(kept) => warnings.push(IntegrityWarning::DuplicateLane {
                direction,
                lane_number: lane.lane_number,
                kept,
                dropped: lane.clearance,
            }),
        }
    }

    for (i, slot) in slots.iter().enumerate() {
        if slot.is_none() {
            warnings.push(IntegrityWarning::LaneGap {
                direction,
                lane_number: i + 1,
            });
        }
    }

    LaneClearances::from_slots(slots)
}

/// `LaneGap` warnings for holes in already-assembled lane sequences.
pub(crate) fn lane_gaps(related: &RelatedData) -> Vec<IntegrityWarning> {
    let warnings: Vec<IntegrityWarning> = [&related.increase, &related.decrease]
        .into_iter()
        .flatten()
        .flat_map(|data| {
            data.lanes
                .missing_lanes()
                .into_iter()
                .map(|lane_number| IntegrityWarning::LaneGap {
                    direction: data.direction,
                    lane_number,
                })
        })
        .collect();
    log_warnings(&warnings);
    warnings
}

fn log_warnings(warnings: &[IntegrityWarning]) {
    for w in warnings {
        warn!(warning = %w, "related data integrity");
    }
}

fn read_rows<D, R>(
    table: &'static str,
    rows: &[Attributes],
    warnings: &mut Vec<IntegrityWarning>,
    convert: impl Fn(D) -> Result<Option<R>, ConversionError>,
) -> Vec<R>
where
    D: serde::de::DeserializeOwned,
{
    rows.iter()
        .filter_map(|row| match from_attributes::<D>(row).and_then(&convert) {
            Ok(record) => record,
            Err(e) => {
                let warning = IntegrityWarning::UnreadableRecord {
                    table,
                    reason: e.to_string(),
                };
                warn!(warning = %warning, "related data integrity");
                warnings.push(warning);
                None
            }
        })
        .collect()
}
