//! Cache-line aligned metric storage.
//!
//! `CacheAlignedCounter` and `CacheAlignedTimestamp` pad their atomic onto a
//! full 64-byte line so neighbouring hot counters never false-share across
//! cores. `AlignedBuffer` gives callers that need raw aligned storage the
//! same guarantee without the base-pointer/aligned-pointer mismatch that a
//! manual offset scheme would produce: it bundles the allocation's `Layout`
//! with its pointer and frees itself on drop, so there is never a second,
//! differently-valued pointer to reconcile.

use chrono::{DateTime, Utc};
use crossbeam_utils::CachePadded;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::sync::atomic::{AtomicI64, Ordering};

pub const CACHE_LINE: usize = 64;

pub(crate) fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

/// A 64-bit counter on its own cache line. Loads/stores use relaxed
/// ordering; `set`/`reset` use sequentially-consistent stores per the
/// metrics memory model (resets must be visible before any subsequent
/// read observes the new window).
#[derive(Debug)]
pub struct CacheAlignedCounter(CachePadded<AtomicI64>);

impl Default for CacheAlignedCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CacheAlignedCounter {
    pub fn new(initial: i64) -> Self {
        Self(CachePadded::new(AtomicI64::new(initial)))
    }

    pub fn increment(&self, amount: i64) -> i64 {
        self.0.fetch_add(amount, Ordering::Relaxed) + amount
    }

    pub fn decrement(&self, amount: i64) -> i64 {
        self.0.fetch_sub(amount, Ordering::Relaxed) - amount
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// A timestamp (nanoseconds since the Unix epoch) on its own cache line.
#[derive(Debug)]
pub struct CacheAlignedTimestamp(CachePadded<AtomicI64>);

impl Default for CacheAlignedTimestamp {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheAlignedTimestamp {
    pub fn new() -> Self {
        Self(CachePadded::new(AtomicI64::new(now_nanos())))
    }

    pub fn touch(&self) {
        self.0.store(now_nanos(), Ordering::SeqCst);
    }

    pub fn nanos(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        let nanos = self.nanos();
        DateTime::from_timestamp(nanos.div_euclid(1_000_000_000), nanos.rem_euclid(1_000_000_000) as u32)
            .unwrap_or_else(Utc::now)
    }
}

/// An opaque, self-freeing handle to a 64-byte-aligned allocation.
pub struct AlignedBuffer {
    ptr: *mut u8,
    layout: Layout,
}

unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocates `size` zeroed bytes aligned to [`CACHE_LINE`]. The
    /// returned handle owns the allocation; dropping it is the only
    /// supported way to free it.
    pub fn allocate(size: usize) -> Self {
        let layout = Layout::from_size_align(size.max(1), CACHE_LINE).expect("valid aligned layout");
        let ptr = unsafe { alloc_zeroed(layout) };
        assert!(!ptr.is_null(), "aligned allocation failed for {size} bytes");
        Self { ptr, layout }
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_aligned(&self) -> bool {
        (self.ptr as usize) & (CACHE_LINE - 1) == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.layout.size()) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}
