//! Bridge vertical clearance server.
//!
//! Answers: "how much headroom does each lane of this crossing have, in
//! each direction of travel?" by assembling a crossing location and its
//! related tables from an ArcGIS feature service.

pub mod aggregate;
pub mod arcgis;
pub mod domain;
pub mod web;

#[cfg(test)]
mod test_support;
