//! # Erasure
//!
//! The erasure request/status store, the `ErasureService` state machine
//! (scheduling, legal-hold gating, contributor fan-out, signed certificate
//! generation), the BFS `CascadeErasureResolver`, and the
//! multi-method `VerificationService` that sits on top of both.

pub mod cascade;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod verification;

pub use cascade::{CascadeErasureResolver, CascadeErasureTemplate, CascadeOptions, CascadeResult};
pub use report::ComplianceReport;
pub use scheduler::{ErasureSchedulerWorker, SchedulerHandle, SchedulerOptions};
pub use service::{ErasureService, ErasureServiceOptions, ExecutionResult, ScheduleResult};
pub use store::InMemoryErasureStore;
pub use verification::{VerificationResult, VerificationService};
