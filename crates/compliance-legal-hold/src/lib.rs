//! # Legal Hold
//!
//! Retention overrides that block erasure, their
//! in-memory store, and a background expiration worker.

pub mod service;
pub mod store;

pub use service::{CreateHoldRequest, ExpirationWorkerHandle, LegalHoldService};
pub use store::InMemoryLegalHoldStore;
