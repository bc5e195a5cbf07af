//! # beacon-database
//!
//! PostgreSQL persistence layer for Beacon: connection pooling, migration
//! running, and the event repository used by the bridge subscriber.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::event::EventRepository;
