//! The crossing location feature.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Direction;

/// Unique integer identifying a crossing location.
///
/// This is the join key for the primary layer and every related table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CrossingLocationId(i64);

impl CrossingLocationId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for CrossingLocationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for CrossingLocationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for CrossingLocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ahead/back indicator for a state route milepost.
///
/// "Back" mileage arises where a route was realigned and mileposts repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AheadBack {
    Ahead,
    Back,
}

impl AheadBack {
    /// Parse the `ABInd` field. Blank values mean no indicator.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(AheadBack::Ahead),
            "B" => Some(AheadBack::Back),
            _ => None,
        }
    }
}

/// Whether the route passes over or under the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OnUnder {
    On,
    Under,
}

impl OnUnder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON" => Some(OnUnder::On),
            "UNDER" => Some(OnUnder::Under),
            _ => None,
        }
    }
}

/// Immutable facts about a physical crossing location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingLocation {
    pub id: CrossingLocationId,
    pub state_structure_id: String,
    pub bridge_number: String,
    pub state_route: String,
    /// State route milepost.
    pub srmp: f64,
    pub ahead_back: Option<AheadBack>,
    pub direction: Option<Direction>,
    pub description: String,
    pub on_under: OnUnder,
    pub increasing_review_complete: bool,
    pub decreasing_review_complete: bool,
    pub created: DateTime<Utc>,
    /// `None` if the record has never been updated since creation.
    pub updated: Option<DateTime<Utc>>,
}

impl CrossingLocation {
    /// Milepost formatted the way WSDOT prints it, e.g. `12.34B` for back mileage.
    pub fn milepost_label(&self) -> String {
        match self.ahead_back {
            Some(AheadBack::Back) => format!("{:.2}B", self.srmp),
            _ => format!("{:.2}", self.srmp),
        }
    }
}
