//! Values of the embedded scripting runtime.
//!
//! - [`HostValue`]: a single dynamically-typed value
//! - [`HostSequence`]: the runtime's one-based ordered container
//! - [`HostTable`]: string-keyed table for passing records by field name

mod sequence;
mod value;

pub use sequence::{HostSequence, HostTable};
pub use value::HostValue;
