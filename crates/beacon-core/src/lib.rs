//! # beacon-core
//!
//! Core crate for Beacon. Contains configuration schemas, the unified
//! error system, the `Event` domain message, and collaborator traits.
//!
//! This crate has **no** internal dependencies on other Beacon crates.

pub mod config;
pub mod error;
pub mod event;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use event::Event;
pub use result::AppResult;
