//! The assembled crossing record.

use serde::Serialize;

use super::{CrossingLocation, RelatedData};

/// A crossing location together with its related per-direction data.
///
/// This is the unit handed to display layers. It owns everything it
/// contains and nothing else refers to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crossing {
    pub location: CrossingLocation,
    pub related: RelatedData,
}

impl Crossing {
    /// Combine a location with its related data.
    pub fn assemble(location: CrossingLocation, related: RelatedData) -> Self {
        Self { location, related }
    }
}
