//! Collaborator traits implemented outside the fan-out core.

pub mod store;

pub use store::EventStore;
