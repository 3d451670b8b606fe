//! Milepost direction.

use std::fmt;

use serde::Serialize;

/// Error returned when parsing an unrecognized direction code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid direction: {0:?}")]
pub struct InvalidDirection(String);

/// Direction of travel relative to milepost numbering.
///
/// The feature service encodes directions as single letters (`I`, `D`, `B`).
/// The spelled-out forms are accepted too, case-insensitively.
///
/// # Examples
///
/// ```
/// use clearance_server::domain::Direction;
///
/// assert_eq!(Direction::parse("I").unwrap(), Direction::Increase);
/// assert_eq!(Direction::parse("decrease").unwrap(), Direction::Decrease);
/// assert!(Direction::parse("X").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Increasing milepost.
    Increase,
    /// Decreasing milepost.
    Decrease,
    /// Applies regardless of direction.
    Both,
}

impl Direction {
    /// Parse a direction code.
    pub fn parse(s: &str) -> Result<Self, InvalidDirection> {
        let trimmed = s.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "I" | "INCREASE" => Ok(Direction::Increase),
            "D" | "DECREASE" => Ok(Direction::Decrease),
            "B" | "BOTH" => Ok(Direction::Both),
            _ => Err(InvalidDirection(trimmed.to_string())),
        }
    }

    /// The single-letter wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Direction::Increase => "I",
            Direction::Decrease => "D",
            Direction::Both => "B",
        }
    }

    /// Whether a record tagged with `self` belongs in the `bucket` direction.
    ///
    /// `Both` matches every bucket.
    pub fn applies_to(&self, bucket: Direction) -> bool {
        *self == Direction::Both || *self == bucket
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Increase => "Increase",
            Direction::Decrease => "Decrease",
            Direction::Both => "Both",
        };
        f.write_str(name)
    }
}
