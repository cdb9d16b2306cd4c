//! Typed-data marshaling for BSD/POSIX bindings in an embedded scripting
//! runtime.
//!
//! A [`Context`] collects type descriptors from binding modules and seals
//! them into a shared registry. A [`Marshaler`] created from the sealed
//! context wraps native records as opaque host values and converts between
//! host sequences and contiguous native arrays. A [`WorkerPool`] runs the
//! same conversions on background threads.
//!
//! # Example
//!
//! ```
//! use sysbind::Context;
//! use sysbind_core::{HostSequence, HostTable, HostValue, NativeRecord};
//! use sysbind_modules::Timespec;
//!
//! let mut ctx = Context::with_default_modules().unwrap();
//! ctx.seal().unwrap();
//! let mut marshaler = ctx.create_marshaler().unwrap();
//!
//! let input = HostValue::from(HostSequence::from(vec![
//!     HostValue::Table(HostTable::new().with("tv_sec", 1).with("tv_nsec", 500)),
//!     HostValue::Table(HostTable::new().with("tv_sec", 2)),
//! ]));
//! let array = marshaler.sequence_to_array(Timespec::CODE, &input, Some(2)).unwrap();
//! assert_eq!(array.byte_len(), 32);
//!
//! let output = marshaler.array_into_sequence(Timespec::CODE, array).unwrap();
//! assert_eq!(output.len(), 2);
//! ```

mod config;
mod context;
mod dispatch;
mod marshaler;

pub use config::MarshalConfig;
pub use context::{Context, ContextError};
pub use dispatch::{DispatchError, JobHandle, WorkerPool};
pub use marshaler::Marshaler;

pub use sysbind_core as core;
pub use sysbind_macros::NativeRecord;
pub use sysbind_modules as modules;
pub use sysbind_registry as registry;
