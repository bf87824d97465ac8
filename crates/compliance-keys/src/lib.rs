//! # Key Management
//!
//! The key cache (single-flight `get_or_add`), an in-memory
//! reference `KeyManagementProvider`, and the multi-region provider with
//! failover/failback and a background health-check loop.

pub mod cache;
pub mod in_memory;
pub mod multi_region;

pub use cache::KeyCache;
pub use in_memory::{InMemoryKeyManagementProvider, SharedInMemoryKeyManagementProvider};
pub use multi_region::{MultiRegionKeyProvider, MultiRegionOptions, RegionConfig, ReplicationMode, ReplicationStatus};
