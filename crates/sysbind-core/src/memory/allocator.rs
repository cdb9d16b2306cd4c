//! Pluggable allocators for native buffers and wrapper payloads.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

/// An allocation request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation of {bytes} bytes failed")]
pub struct AllocError {
    pub bytes: usize,
}

/// Source of zero-initialized memory blocks.
///
/// Every block handed out by [`allocate_zeroed`](Self::allocate_zeroed) is
/// given back exactly once through [`release`](Self::release) with the same
/// layout. Callers never request zero-sized blocks.
pub trait BufferAllocator: Send + Sync + fmt::Debug {
    /// Allocate a zeroed block, or `None` if the request cannot be served.
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate_zeroed` on this allocator with the same
    /// `layout`, and must not have been released already.
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Shared allocator handle.
pub type SharedAllocator = Arc<dyn BufferAllocator>;

/// The global Rust allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Shared handle to the system allocator.
    pub fn shared() -> SharedAllocator {
        Arc::new(SystemAllocator)
    }
}

impl BufferAllocator for SystemAllocator {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        // SAFETY: callers never request zero-sized layouts.
        NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller's contract.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// Counters reported by [`TrackingAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationStats {
    /// Successful allocations.
    pub allocations: usize,
    /// Blocks given back.
    pub releases: usize,
    /// Bytes currently outstanding.
    pub live_bytes: usize,
    /// Blocks that still held non-zero bytes when released.
    pub dirty_releases: usize,
    /// Requests refused because of the byte limit.
    pub refused: usize,
}

impl AllocationStats {
    /// Every allocation has been released.
    pub fn is_balanced(&self) -> bool {
        self.allocations == self.releases && self.live_bytes == 0
    }
}

/// Allocator wrapper that counts traffic and can enforce a byte limit.
///
/// Used to bound how much memory scripts can pin in native buffers, and by
/// tests to prove every block is released exactly once.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    inner: SystemAllocator,
    limit: Option<usize>,
    allocations: AtomicUsize,
    releases: AtomicUsize,
    live_bytes: AtomicUsize,
    dirty_releases: AtomicUsize,
    refused: AtomicUsize,
}

impl TrackingAllocator {
    /// Unlimited tracking allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse requests that would push outstanding bytes past `limit`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> AllocationStats {
        AllocationStats {
            allocations: self.allocations.load(Ordering::Acquire),
            releases: self.releases.load(Ordering::Acquire),
            live_bytes: self.live_bytes.load(Ordering::Acquire),
            dirty_releases: self.dirty_releases.load(Ordering::Acquire),
            refused: self.refused.load(Ordering::Acquire),
        }
    }

    fn reserve(&self, bytes: usize) -> bool {
        let Some(limit) = self.limit else {
            self.live_bytes.fetch_add(bytes, Ordering::AcqRel);
            return true;
        };
        self.live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                live.checked_add(bytes).filter(|total| *total <= limit)
            })
            .is_ok()
    }
}

impl BufferAllocator for TrackingAllocator {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.reserve(layout.size()) {
            self.refused.fetch_add(1, Ordering::AcqRel);
            return None;
        }
        match self.inner.allocate_zeroed(layout) {
            Some(ptr) => {
                self.allocations.fetch_add(1, Ordering::AcqRel);
                Some(ptr)
            }
            None => {
                self.live_bytes.fetch_sub(layout.size(), Ordering::AcqRel);
                None
            }
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the block is live and `layout.size()` bytes long.
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), layout.size()) };
        if bytes.iter().any(|b| *b != 0) {
            self.dirty_releases.fetch_add(1, Ordering::AcqRel);
        }
        self.releases.fetch_add(1, Ordering::AcqRel);
        self.live_bytes.fetch_sub(layout.size(), Ordering::AcqRel);
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.inner.release(ptr, layout) }
    }
}
