//! HTTP and WebSocket handlers.

pub mod event;
pub mod health;
pub mod ws;
