//! # Compliance Runtime — Data Model
//!
//! Shared entities and error taxonomy consumed by every crate in the
//! compliance runtime: key metadata, the encryption envelope, erasure
//! requests/status, legal holds, data inventory, and signed certificates.

pub mod certificate;
pub mod contracts;
pub mod encryption;
pub mod erasure;
pub mod error;
pub mod hasher;
pub mod inventory;
pub mod key;
pub mod legal_hold;

pub use certificate::*;
pub use contracts::*;
pub use encryption::*;
pub use erasure::*;
pub use error::*;
pub use hasher::*;
pub use inventory::*;
pub use key::*;
pub use legal_hold::*;
