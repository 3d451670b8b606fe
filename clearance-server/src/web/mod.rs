//! Web layer for the clearance server.
//!
//! Provides HTTP endpoints for looking up assembled crossings.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, DEFAULT_REQUEST_TIMEOUT};
