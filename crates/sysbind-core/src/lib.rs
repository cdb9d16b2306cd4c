//! Core types for the sysbind marshaling engine.
//!
//! This crate holds everything the registry and the conversion engine share:
//!
//! - [`TypeCode`]: deterministic numeric identity of a native type
//! - [`ScalarKind`], [`FieldLayout`], [`ValueShape`]: native memory layouts
//! - [`NativeRecord`], [`NativeScalar`]: Rust types mirroring native records
//! - [`HostValue`], [`HostSequence`], [`HostTable`]: values of the scripting runtime
//! - [`ValueHeap`], [`ValueHandle`]: host-visible opaque wrappers
//! - [`NativeArray`], [`BufferAllocator`]: contiguous native buffers
//! - [`MarshalError`] and the per-layer error enums

pub mod error;
pub mod host;
pub mod layout;
pub mod memory;
pub mod record;
pub mod runtime;
pub mod type_code;

pub use error::{
    ConversionError, ElementError, ErrorKind, MarshalError, MarshalResult, RegistryError,
    ValueError,
};
pub use host::{HostSequence, HostTable, HostValue};
pub use layout::{FieldLayout, NarrowingMode, ScalarKind, ValueShape};
pub use memory::{
    AllocError, AllocationStats, BufferAllocator, NativeArray, RawBuffer, SharedAllocator,
    SystemAllocator, TrackingAllocator,
};
pub use record::{NativeRecord, NativeScalar};
pub use runtime::{OpaqueValue, ValueHandle, ValueHeap};
pub use type_code::{TypeCode, scalars};
