//! Traits for Rust types that mirror native records.
//!
//! # Example
//!
//! ```
//! use sysbind_core::{FieldLayout, NativeRecord, ScalarKind, TypeCode};
//!
//! #[repr(C)]
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! struct Pair {
//!     a: i32,
//!     b: i32,
//! }
//!
//! unsafe impl NativeRecord for Pair {
//!     const NAME: &'static str = "pair";
//!     const CODE: TypeCode = TypeCode::from_name("pair");
//!     const FIELDS: &'static [FieldLayout] = &[
//!         FieldLayout::new("a", 0, ScalarKind::Int32),
//!         FieldLayout::new("b", 4, ScalarKind::Int32),
//!     ];
//! }
//!
//! let pair = Pair { a: 1, b: 2 };
//! assert_eq!(Pair::from_bytes(pair.as_bytes()), Some(pair));
//! ```
//!
//! With the derive macro from `sysbind-macros`:
//!
//! ```ignore
//! #[derive(Clone, Copy, NativeRecord)]
//! #[repr(C)]
//! #[native(name = "pollfd")]
//! pub struct PollFd {
//!     pub fd: i32,
//!     pub events: i16,
//!     pub revents: i16,
//! }
//! ```

use crate::{FieldLayout, ScalarKind, TypeCode, ValueShape};

/// A plain-old-data Rust type with the exact layout of a native record.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or a primitive integer), contain no
/// padding bytes, accept every bit pattern as a valid value, and describe
/// every field in [`FIELDS`](Self::FIELDS) with its true offset and width.
/// The engine copies instances as raw bytes in both directions.
pub unsafe trait NativeRecord: Copy + Send + Sync + 'static {
    /// Host-visible type name.
    const NAME: &'static str;

    /// Registry code.
    const CODE: TypeCode;

    /// Integer fields addressable by name from the host.
    const FIELDS: &'static [FieldLayout];

    /// Storage shape of a wrapper holding one instance.
    fn shape() -> ValueShape {
        ValueShape::of::<Self>(Self::CODE)
    }

    /// View this record as its native bytes.
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: the trait contract guarantees no padding, so every byte of
        // the value is initialized.
        unsafe {
            std::slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>())
        }
    }

    /// Copy a record out of native bytes.
    ///
    /// Returns `None` if `bytes` is shorter than the record. Alignment of
    /// `bytes` is not required.
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < size_of::<Self>() {
            return None;
        }
        // SAFETY: length checked above and every bit pattern is valid per the
        // trait contract.
        Some(unsafe { bytes.as_ptr().cast::<Self>().read_unaligned() })
    }
}

/// A primitive integer usable as a scalar array element.
pub trait NativeScalar: NativeRecord {
    const KIND: ScalarKind;

    /// Widen to a host integer.
    fn to_host(self) -> i64;
}

macro_rules! impl_native_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            // SAFETY: primitive integers have no padding and no invalid bit patterns.
            unsafe impl NativeRecord for $ty {
                const NAME: &'static str = ScalarKind::$kind.name();
                const CODE: TypeCode = ScalarKind::$kind.type_code();
                const FIELDS: &'static [FieldLayout] = &[];
            }

            impl NativeScalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn to_host(self) -> i64 {
                    self as i64
                }
            }
        )*
    };
}

impl_native_scalar!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
);
