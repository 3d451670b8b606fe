//! Per-lane vertical clearance values.

use std::fmt;

use serde::Serialize;

/// Minimum vertical clearance of each lane, in inches.
///
/// Index 0 is lane 1. The length is the highest lane number that was
/// observed. A lane number with no measurement is kept as `None` rather
/// than renumbering the lanes after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LaneClearances(Vec<Option<u32>>);

impl LaneClearances {
    /// Build from a gap-free sequence of clearances, lane 1 first.
    pub fn from_complete(clearances: impl IntoIterator<Item = u32>) -> Self {
        Self(clearances.into_iter().map(Some).collect())
    }

    /// Build from a possibly holey sequence, lane 1 first.
    pub fn from_slots(slots: Vec<Option<u32>>) -> Self {
        Self(slots)
    }

    /// Clearance for a 1-based lane number.
    pub fn get(&self, lane_number: usize) -> Option<u32> {
        lane_number
            .checked_sub(1)
            .and_then(|i| self.0.get(i).copied().flatten())
    }

    /// Number of lanes, including lanes with no measurement.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if every lane up to the highest has a measurement.
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// Lane numbers (1-based) with no measurement.
    pub fn missing_lanes(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// The lowest measured clearance across all lanes.
    pub fn minimum(&self) -> Option<u32> {
        self.0.iter().flatten().copied().min()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<u32>> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Option<u32>] {
        &self.0
    }
}

/// A clearance split into whole feet and remaining inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeetInches {
    pub feet: u32,
    pub inches: u32,
}

impl FeetInches {
    pub fn from_inches(total: u32) -> Self {
        Self {
            feet: total / 12,
            inches: total % 12,
        }
    }
}

impl fmt::Display for FeetInches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}' {}\"", self.feet, self.inches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_sequence() {
        let lanes = LaneClearances::from_complete([190, 188, 192]);
        assert_eq!(lanes.len(), 3);
        assert_eq!(lanes.get(1), Some(190));
        assert_eq!(lanes.get(3), Some(192));
        assert_eq!(lanes.get(0), None);
        assert_eq!(lanes.get(4), None);
        assert!(lanes.is_complete());
        assert_eq!(lanes.minimum(), Some(188));
    }

    #[test]
    fn holes_are_reported() {
        let lanes = LaneClearances::from_slots(vec![Some(200), None, Some(195), None]);
        assert_eq!(lanes.len(), 4);
        assert!(!lanes.is_complete());
        assert_eq!(lanes.missing_lanes(), vec![2, 4]);
        assert_eq!(lanes.get(2), None);
        assert_eq!(lanes.minimum(), Some(195));
    }

    #[test]
    fn serializes_as_array() {
        let lanes = LaneClearances::from_slots(vec![Some(200), None]);
        assert_eq!(serde_json::to_string(&lanes).unwrap(), "[200,null]");
    }

    #[test]
    fn feet_and_inches() {
        let fi = FeetInches::from_inches(190);
        assert_eq!(fi, FeetInches { feet: 15, inches: 10 });
        assert_eq!(fi.to_string(), "15' 10\"");
        assert_eq!(FeetInches::from_inches(12).to_string(), "1' 0\"");
    }
}
