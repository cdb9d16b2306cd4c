//! Native memory: allocators, owned buffers and contiguous arrays.

mod allocator;
mod buffer;
mod native_array;
mod zeroize;

pub use allocator::{
    AllocError, AllocationStats, BufferAllocator, SharedAllocator, SystemAllocator,
    TrackingAllocator,
};
pub use buffer::RawBuffer;
pub use native_array::NativeArray;
pub use zeroize::zeroize;
