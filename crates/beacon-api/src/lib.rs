//! # beacon-api
//!
//! HTTP API layer for Beacon built on Axum.
//!
//! Provides the WebSocket upgrade endpoint with its pump loops, the event
//! publish endpoint, health checks, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
