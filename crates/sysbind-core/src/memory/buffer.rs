//! Owned, zero-initialized byte region backed by a [`BufferAllocator`].

use std::alloc::Layout;
use std::fmt;
use std::ptr::{self, NonNull};

use super::allocator::{AllocError, SharedAllocator};
use super::zeroize::zeroize;

struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
    allocator: SharedAllocator,
}

/// A heap block released exactly once, when the buffer is dropped.
///
/// Zero-length buffers never touch the allocator.
pub struct RawBuffer {
    block: Option<Block>,
}

// SAFETY: the buffer uniquely owns its block; shared access is read-only.
unsafe impl Send for RawBuffer {}
unsafe impl Sync for RawBuffer {}

impl RawBuffer {
    /// A zero-length buffer with no backing allocation.
    pub const fn empty() -> Self {
        Self { block: None }
    }

    /// Allocate `len` zeroed bytes aligned to `align`.
    pub fn zeroed(allocator: &SharedAllocator, len: usize, align: usize) -> Result<Self, AllocError> {
        if len == 0 {
            return Ok(Self::empty());
        }
        let layout =
            Layout::from_size_align(len, align.max(1)).map_err(|_| AllocError { bytes: len })?;
        let ptr = allocator
            .allocate_zeroed(layout)
            .ok_or(AllocError { bytes: len })?;
        Ok(Self {
            block: Some(Block {
                ptr,
                layout,
                allocator: SharedAllocator::clone(allocator),
            }),
        })
    }

    /// Allocate a buffer holding a copy of `bytes`.
    pub fn copy_from(allocator: &SharedAllocator, bytes: &[u8], align: usize) -> Result<Self, AllocError> {
        let mut buffer = Self::zeroed(allocator, bytes.len(), align)?;
        buffer.as_mut_slice().copy_from_slice(bytes);
        Ok(buffer)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.block.as_ref().map_or(0, |b| b.layout.size())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.block {
            // SAFETY: the block is live, initialized, and `size` bytes long.
            Some(b) => unsafe { std::slice::from_raw_parts(b.ptr.as_ptr(), b.layout.size()) },
            None => &[],
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.block {
            // SAFETY: as above, and `&mut self` makes the access exclusive.
            Some(b) => unsafe { std::slice::from_raw_parts_mut(b.ptr.as_ptr(), b.layout.size()) },
            None => &mut [],
        }
    }

    /// Pointer to the first byte, or null for an empty buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.block.as_ref().map_or(ptr::null(), |b| b.ptr.as_ptr().cast_const())
    }

    /// Mutable pointer to the first byte, or null for an empty buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.block.as_ref().map_or(ptr::null_mut(), |b| b.ptr.as_ptr())
    }

    /// Overwrite the contents with zeros.
    pub fn zeroize(&mut self) {
        zeroize(self.as_mut_slice());
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            // SAFETY: the block came from this allocator with this layout and
            // `take` guarantees it is released only once.
            unsafe { block.allocator.release(block.ptr, block.layout) }
        }
    }
}

impl Default for RawBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .finish()
    }
}
