//! Per-direction related data.

use serde::Serialize;
use url::Url;

use super::{Direction, LaneClearances};

/// Everything known about one direction of travel through a crossing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionalData {
    pub direction: Direction,
    pub lanes: LaneClearances,
    pub advisory_note: Option<String>,
    /// Photograph of the lanes, absent when none was taken.
    pub document: Option<Url>,
}

/// Related data grouped into the increasing and decreasing directions.
///
/// A well-formed crossing has at least one member, but both being absent
/// is valid and consumers must handle it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelatedData {
    pub increase: Option<DirectionalData>,
    pub decrease: Option<DirectionalData>,
}

impl RelatedData {
    pub fn new(increase: Option<DirectionalData>, decrease: Option<DirectionalData>) -> Self {
        Self { increase, decrease }
    }

    /// Data for one direction. `Both` has no bucket of its own.
    pub fn get(&self, direction: Direction) -> Option<&DirectionalData> {
        match direction {
            Direction::Increase => self.increase.as_ref(),
            Direction::Decrease => self.decrease.as_ref(),
            Direction::Both => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.increase.is_none() && self.decrease.is_none()
    }
}
