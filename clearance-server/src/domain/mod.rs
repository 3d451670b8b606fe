//! Domain types for crossing clearance data.
//!
//! These are the validated, strongly-typed entities produced from feature
//! service responses. Wire-format quirks stay in [`crate::arcgis`]; code that
//! receives these types can trust their shape.

mod crossing;
mod direction;
mod lanes;
mod location;
mod related;

pub use crossing::Crossing;
pub use direction::{Direction, InvalidDirection};
pub use lanes::{FeetInches, LaneClearances};
pub use location::{AheadBack, CrossingLocation, CrossingLocationId, OnUnder};
pub use related::{DirectionalData, RelatedData};
