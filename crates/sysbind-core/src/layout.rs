//! Native memory layouts: scalar kinds, record fields and wrapper shapes.

use std::fmt;

use crate::error::ElementError;
use crate::{TypeCode, scalars};

/// How a host integer is narrowed into a smaller native field.
///
/// `Mask` keeps only the low `8 * width` bits, which is what the historical
/// bindings did and what existing scripts rely on. `Checked` rejects values
/// that do not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NarrowingMode {
    #[default]
    Mask,
    Checked,
}

/// Fixed-width integer kinds a native field or array element can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl ScalarKind {
    /// All scalar kinds, narrowest first within each signedness.
    pub const ALL: [ScalarKind; 8] = [
        ScalarKind::Int8,
        ScalarKind::Int16,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Uint8,
        ScalarKind::Uint16,
        ScalarKind::Uint32,
        ScalarKind::Uint64,
    ];

    /// Width in bytes.
    pub const fn width(self) -> usize {
        match self {
            ScalarKind::Int8 | ScalarKind::Uint8 => 1,
            ScalarKind::Int16 | ScalarKind::Uint16 => 2,
            ScalarKind::Int32 | ScalarKind::Uint32 => 4,
            ScalarKind::Int64 | ScalarKind::Uint64 => 8,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarKind::Int8 | ScalarKind::Int16 | ScalarKind::Int32 | ScalarKind::Int64
        )
    }

    /// Bit mask covering the field's width.
    pub const fn mask(self) -> u64 {
        match self.width() {
            8 => u64::MAX,
            w => (1u64 << (8 * w)) - 1,
        }
    }

    /// The `<stdint.h>` name of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Int8 => "int8_t",
            ScalarKind::Int16 => "int16_t",
            ScalarKind::Int32 => "int32_t",
            ScalarKind::Int64 => "int64_t",
            ScalarKind::Uint8 => "uint8_t",
            ScalarKind::Uint16 => "uint16_t",
            ScalarKind::Uint32 => "uint32_t",
            ScalarKind::Uint64 => "uint64_t",
        }
    }

    /// Code of the built-in scalar descriptor for this kind.
    pub const fn type_code(self) -> TypeCode {
        match self {
            ScalarKind::Int8 => scalars::INT8,
            ScalarKind::Int16 => scalars::INT16,
            ScalarKind::Int32 => scalars::INT32,
            ScalarKind::Int64 => scalars::INT64,
            ScalarKind::Uint8 => scalars::UINT8,
            ScalarKind::Uint16 => scalars::UINT16,
            ScalarKind::Uint32 => scalars::UINT32,
            ScalarKind::Uint64 => scalars::UINT64,
        }
    }

    /// Inclusive range of host integers that fit without truncation.
    const fn range(self) -> (i64, i64) {
        match self {
            ScalarKind::Int8 => (i8::MIN as i64, i8::MAX as i64),
            ScalarKind::Int16 => (i16::MIN as i64, i16::MAX as i64),
            ScalarKind::Int32 => (i32::MIN as i64, i32::MAX as i64),
            ScalarKind::Int64 => (i64::MIN, i64::MAX),
            ScalarKind::Uint8 => (0, u8::MAX as i64),
            ScalarKind::Uint16 => (0, u16::MAX as i64),
            ScalarKind::Uint32 => (0, u32::MAX as i64),
            ScalarKind::Uint64 => (0, i64::MAX),
        }
    }

    /// Narrow a host integer to this kind's bit pattern.
    ///
    /// In [`NarrowingMode::Mask`] this never fails: `300` stored into a
    /// `uint8_t` becomes `44`, `-1` stored into a `uint16_t` becomes
    /// `0xffff`.
    pub fn narrow(self, value: i64, mode: NarrowingMode) -> Result<u64, ElementError> {
        if mode == NarrowingMode::Checked {
            let (min, max) = self.range();
            if value < min || value > max {
                return Err(ElementError::Overflow {
                    value,
                    target: self.name(),
                });
            }
        }
        Ok((value as u64) & self.mask())
    }

    /// Write a narrowed bit pattern into `dst` in native byte order.
    ///
    /// `dst` must be at least [`width`](Self::width) bytes.
    pub fn store(self, bits: u64, dst: &mut [u8]) {
        match self.width() {
            1 => dst[0] = bits as u8,
            2 => dst[..2].copy_from_slice(&(bits as u16).to_ne_bytes()),
            4 => dst[..4].copy_from_slice(&(bits as u32).to_ne_bytes()),
            _ => dst[..8].copy_from_slice(&bits.to_ne_bytes()),
        }
    }

    /// Read a value of this kind from `src`, widening to a host integer.
    ///
    /// Signed kinds sign-extend; `uint64_t` values above `i64::MAX` come back
    /// with their bit pattern reinterpreted.
    pub fn load(self, src: &[u8]) -> i64 {
        match self {
            ScalarKind::Int8 => src[0] as i8 as i64,
            ScalarKind::Uint8 => src[0] as i64,
            ScalarKind::Int16 => {
                let mut b = [0u8; 2];
                b.copy_from_slice(&src[..2]);
                i16::from_ne_bytes(b) as i64
            }
            ScalarKind::Uint16 => {
                let mut b = [0u8; 2];
                b.copy_from_slice(&src[..2]);
                u16::from_ne_bytes(b) as i64
            }
            ScalarKind::Int32 => {
                let mut b = [0u8; 4];
                b.copy_from_slice(&src[..4]);
                i32::from_ne_bytes(b) as i64
            }
            ScalarKind::Uint32 => {
                let mut b = [0u8; 4];
                b.copy_from_slice(&src[..4]);
                u32::from_ne_bytes(b) as i64
            }
            ScalarKind::Int64 | ScalarKind::Uint64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&src[..8]);
                i64::from_ne_bytes(b)
            }
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One integer field inside a native record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldLayout {
    pub name: &'static str,
    /// Byte offset from the start of the record.
    pub offset: usize,
    pub kind: ScalarKind,
}

impl FieldLayout {
    pub const fn new(name: &'static str, offset: usize, kind: ScalarKind) -> Self {
        Self { name, offset, kind }
    }

    /// One past the last byte of this field.
    pub const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }
}

/// Size and identity of an opaque value's storage.
///
/// The heap needs nothing else to allocate, initialize and destroy a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueShape {
    pub code: TypeCode,
    /// Size of the native record.
    pub element_size: usize,
    /// Size of the whole payload; bytes past `element_size` are a zeroed
    /// extension area owned by the binding glue.
    pub wrapper_size: usize,
    pub align: usize,
}

impl ValueShape {
    /// Shape whose payload is exactly the record.
    pub const fn new(code: TypeCode, element_size: usize, align: usize) -> Self {
        Self {
            code,
            element_size,
            wrapper_size: element_size,
            align,
        }
    }

    /// Shape of a Rust type laid out as the native record.
    pub const fn of<T>(code: TypeCode) -> Self {
        Self::new(code, size_of::<T>(), align_of::<T>())
    }

    /// Reserve `extra` bytes of extension area after the record.
    pub const fn with_extension(mut self, extra: usize) -> Self {
        self.wrapper_size = self.element_size + extra;
        self
    }
}
