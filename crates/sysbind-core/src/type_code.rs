//! Deterministic numeric type identity.
//!
//! Every wrapped native type is identified by a [`TypeCode`], a 32-bit value
//! computed from the type's host-visible name. Because the computation is a
//! `const fn`, binding glue can bake codes into constants and compare them
//! without consulting the registry:
//!
//! ```
//! use sysbind_core::TypeCode;
//!
//! const TIMESPEC: TypeCode = TypeCode::from_name("timespec");
//! assert_eq!(TIMESPEC, TypeCode::from_name("timespec"));
//! assert_ne!(TIMESPEC, TypeCode::from_name("timeval"));
//! ```
//!
//! Codes can also be assigned explicitly with [`TypeCode::new`], which is how
//! embedders keep identities stable across renames.

use std::fmt;

use xxhash_rust::const_xxh32::xxh32;

/// Domain marker mixed into name-derived codes.
const TYPE_DOMAIN: u32 = 0x2fac_10b6;

/// Stable numeric identity of a native type.
///
/// `TypeCode(0)` is reserved as the empty code and is never accepted by the
/// registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeCode(pub u32);

impl TypeCode {
    /// The reserved empty code.
    pub const EMPTY: TypeCode = TypeCode(0);

    /// Wrap an explicit numeric code.
    #[inline]
    pub const fn new(code: u32) -> Self {
        TypeCode(code)
    }

    /// Derive a code from a type name.
    ///
    /// The same name always produces the same code, and the result is never
    /// [`TypeCode::EMPTY`].
    #[inline]
    pub const fn from_name(name: &str) -> Self {
        let code = TYPE_DOMAIN ^ xxh32(name.as_bytes(), 0);
        if code == 0 {
            TypeCode(TYPE_DOMAIN)
        } else {
            TypeCode(code)
        }
    }

    /// Check if this is the reserved empty code.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode({:#010x})", self.0)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for TypeCode {
    fn from(code: u32) -> Self {
        TypeCode(code)
    }
}

/// Codes of the built-in fixed-width integer scalars.
///
/// Names follow `<stdint.h>`.
pub mod scalars {
    use super::TypeCode;

    pub const INT8: TypeCode = TypeCode::from_name("int8_t");
    pub const INT16: TypeCode = TypeCode::from_name("int16_t");
    pub const INT32: TypeCode = TypeCode::from_name("int32_t");
    pub const INT64: TypeCode = TypeCode::from_name("int64_t");
    pub const UINT8: TypeCode = TypeCode::from_name("uint8_t");
    pub const UINT16: TypeCode = TypeCode::from_name("uint16_t");
    pub const UINT32: TypeCode = TypeCode::from_name("uint32_t");
    pub const UINT64: TypeCode = TypeCode::from_name("uint64_t");
}
