//! Zeroing that the optimizer cannot elide.

use std::ptr;
use std::sync::atomic::{Ordering, compiler_fence};

/// Overwrite `bytes` with zeros using volatile writes.
///
/// Used on wrapper payloads before their storage goes back to the allocator,
/// so stale descriptors and pointers are not observable afterwards.
pub fn zeroize(bytes: &mut [u8]) {
    for byte in bytes.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference.
        unsafe { ptr::write_volatile(byte, 0) };
    }
    compiler_fence(Ordering::SeqCst);
}
