//! Sysbind Proc Macros
//!
//! # Macros
//!
//! - `#[derive(NativeRecord)]` - Describe a `#[repr(C)]` struct as a native record
//!
//! # Example
//!
//! ```ignore
//! use sysbind_macros::NativeRecord;
//!
//! #[derive(Clone, Copy, NativeRecord)]
//! #[repr(C)]
//! #[native(name = "pollfd")]
//! pub struct PollFd {
//!     pub fd: i32,
//!     pub events: i16,
//!     pub revents: i16,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_record;

/// Derive `sysbind_core::NativeRecord` for a plain native struct.
///
/// Every field must be a fixed-width integer (`i8`..`u64`) and the struct
/// must be `#[repr(C)]` with no padding; padding is a compile error. Each
/// field becomes a named `FieldLayout` the host can read and write.
///
/// # Attributes
///
/// - `#[native(name = "...")]` - Host-visible type name (default: struct name)
/// - `#[native(code = N)]` - Explicit type code instead of one derived from the name
///
/// # Field Attributes
///
/// - `#[native(name = "...")]` - Override the field name seen by the host
#[proc_macro_derive(NativeRecord, attributes(native))]
pub fn derive_native_record(input: TokenStream) -> TokenStream {
    derive_record::derive_native_record_impl(input)
}
