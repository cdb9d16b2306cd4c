//! Host-visible opaque values.
//!
//! - [`ValueHeap`]: generational arena owning every wrapper
//! - [`ValueHandle`]: copyable reference handed to the host
//! - [`OpaqueValue`]: one wrapper's shape, ownership links and payload

mod value_heap;

pub use value_heap::{OpaqueValue, ValueHandle, ValueHeap};
