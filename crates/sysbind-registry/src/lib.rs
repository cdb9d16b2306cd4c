//! Type descriptor registry for the sysbind marshaling engine.
//!
//! - [`TypeDescriptor`]: static metadata and hooks for one native type
//! - [`ElementCodec`]: per-element host <-> native conversion
//! - [`TypeRegistry`]: descriptors keyed by [`TypeCode`](sysbind_core::TypeCode)
//! - [`LiveRegistry`]: lock-protected registry for late registration
//! - [`TypeSource`]: descriptor lookup shared by both registries
//! - [`BindingModule`]: descriptors of one wrapped header, installed atomically

mod codec;
mod descriptor;
mod module;
mod registry;

pub use codec::{CodecContext, ElementCodec, RecordCodec, ScalarCodec};
pub use descriptor::{DescriptorBuilder, ElementKind, TypeDescriptor, TypeFlags};
pub use module::BindingModule;
pub use registry::{LiveRegistry, TypeRegistry, TypeSource};
