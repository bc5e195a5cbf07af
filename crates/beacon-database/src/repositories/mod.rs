//! Repository implementations.

pub mod event;
