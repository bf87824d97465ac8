//! # Data Inventory
//!
//! Field registrations, per-subject discovered locations, and the service
//! that composes them with live key lookups into a discovery result
//!.

pub mod service;
pub mod store;

pub use service::DataInventoryService;
pub use store::InMemoryDataInventoryStore;
