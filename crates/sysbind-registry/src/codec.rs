//! Element codecs: per-type conversion between one host value and one native
//! element.
//!
//! The bulk conversion engine sizes buffers and walks sequences; codecs only
//! ever see a single element. Built-in codecs cover integers and plain
//! records. Types with a host representation of their own (an address
//! written as a string, say) supply a custom [`ElementCodec`].

use std::fmt;

use sysbind_core::{
    ElementError, HostTable, HostValue, NarrowingMode, ScalarKind, ValueError, ValueHandle,
    ValueHeap,
};

use crate::descriptor::TypeDescriptor;

/// Per-call state a codec may use.
pub struct CodecContext<'a> {
    /// Heap holding the opaque values of this conversion.
    pub heap: &'a mut ValueHeap,
    /// How host integers are narrowed into native fields.
    pub narrowing: NarrowingMode,
}

impl<'a> CodecContext<'a> {
    pub fn new(heap: &'a mut ValueHeap, narrowing: NarrowingMode) -> Self {
        Self { heap, narrowing }
    }
}

impl fmt::Debug for CodecContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecContext")
            .field("heap", &self.heap)
            .field("narrowing", &self.narrowing)
            .finish()
    }
}

/// Conversion hooks for one element of a registered type.
///
/// `dst` and `src` are exactly `element_size` bytes. `dst` starts zeroed.
pub trait ElementCodec: Send + Sync + fmt::Debug {
    /// Write the host value `value` into the native element `dst`.
    fn from_host(
        &self,
        ty: &TypeDescriptor,
        value: &HostValue,
        dst: &mut [u8],
        cx: &mut CodecContext<'_>,
    ) -> Result<(), ElementError>;

    /// Produce the host value for the native element `src`.
    fn to_host(
        &self,
        ty: &TypeDescriptor,
        src: &[u8],
        cx: &mut CodecContext<'_>,
    ) -> Result<HostValue, ElementError>;
}

/// Codec for fixed-width integer elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarCodec {
    kind: ScalarKind,
}

impl ScalarCodec {
    pub fn new(kind: ScalarKind) -> Self {
        Self { kind }
    }
}

impl ElementCodec for ScalarCodec {
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn from_host(
        &self,
        _ty: &TypeDescriptor,
        value: &HostValue,
        dst: &mut [u8],
        cx: &mut CodecContext<'_>,
    ) -> Result<(), ElementError> {
        let int = value
            .as_integer()
            .ok_or_else(|| ElementError::invalid(self.kind.name(), value.type_name()))?;
        let bits = self.kind.narrow(int, cx.narrowing)?;
        self.kind.store(bits, dst);
        Ok(())
    }

    fn to_host(
        &self,
        _ty: &TypeDescriptor,
        src: &[u8],
        _cx: &mut CodecContext<'_>,
    ) -> Result<HostValue, ElementError> {
        Ok(HostValue::Int(self.kind.load(src)))
    }
}

/// Codec for plain records.
///
/// Host to native accepts an opaque value of the same type (its record bytes
/// are copied) or, for types with named fields, a table of field values.
/// Native to host wraps each element in a new opaque value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCodec;

impl RecordCodec {
    /// Copy the record bytes of an opaque value of type `ty`.
    pub fn copy_opaque(
        ty: &TypeDescriptor,
        handle: ValueHandle,
        dst: &mut [u8],
        heap: &ValueHeap,
    ) -> Result<(), ElementError> {
        if handle.type_code != ty.code() {
            return Err(ElementError::invalid(
                ty.name(),
                format!("userdata of type {}", handle.type_code),
            ));
        }
        let bytes = heap.record_bytes(handle)?;
        let src = bytes.get(..dst.len()).ok_or(ValueError::SizeMismatch {
            expected: dst.len(),
            actual: bytes.len(),
        })?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Store each table entry into the field of the same name.
    ///
    /// Fields the table does not mention stay zero. A `Nil` entry is a
    /// non-integer value, not an omitted field, and fails as invalid.
    pub fn copy_table(
        ty: &TypeDescriptor,
        table: &HostTable,
        dst: &mut [u8],
        narrowing: NarrowingMode,
    ) -> Result<(), ElementError> {
        for (key, value) in table.iter() {
            let field = ty.field(key).ok_or_else(|| {
                ElementError::invalid(format!("a field of {}", ty.name()), format!("key '{key}'"))
            })?;
            let int = value.as_integer().ok_or_else(|| {
                ElementError::invalid(
                    format!("{} for field '{}'", field.kind, field.name),
                    value.type_name(),
                )
            })?;
            let bits = field.kind.narrow(int, narrowing)?;
            field.kind.store(bits, &mut dst[field.offset..field.end()]);
        }
        Ok(())
    }
}

impl ElementCodec for RecordCodec {
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn from_host(
        &self,
        ty: &TypeDescriptor,
        value: &HostValue,
        dst: &mut [u8],
        cx: &mut CodecContext<'_>,
    ) -> Result<(), ElementError> {
        match value {
            HostValue::Opaque(handle) => Self::copy_opaque(ty, *handle, dst, cx.heap),
            HostValue::Table(table) if !ty.fields().is_empty() => {
                Self::copy_table(ty, table, dst, cx.narrowing)
            }
            other => Err(ElementError::invalid(ty.name(), other.type_name())),
        }
    }

    fn to_host(
        &self,
        ty: &TypeDescriptor,
        src: &[u8],
        cx: &mut CodecContext<'_>,
    ) -> Result<HostValue, ElementError> {
        let handle = cx.heap.allocate(&ty.shape(), Some(src))?;
        Ok(HostValue::Opaque(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysbind_core::{FieldLayout, NativeRecord, TypeCode};

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Timeval {
        tv_sec: i64,
        tv_usec: i64,
    }

    unsafe impl NativeRecord for Timeval {
        const NAME: &'static str = "timeval";
        const CODE: TypeCode = TypeCode::from_name("timeval");
        const FIELDS: &'static [FieldLayout] = &[
            FieldLayout::new("tv_sec", 0, ScalarKind::Int64),
            FieldLayout::new("tv_usec", 8, ScalarKind::Int64),
        ];
    }

    #[test]
    fn scalar_masks_and_loads() {
        let ty = TypeDescriptor::scalar(ScalarKind::Uint8);
        let mut heap = ValueHeap::new();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
        let mut dst = [0u8; 1];
        ty.codec()
            .from_host(&ty, &HostValue::Int(300), &mut dst, &mut cx)
            .unwrap();
        assert_eq!(dst, [44]);
        assert_eq!(
            ty.codec().to_host(&ty, &dst, &mut cx).unwrap(),
            HostValue::Int(44)
        );
    }

    #[test]
    fn scalar_rejects_strings() {
        let ty = TypeDescriptor::scalar(ScalarKind::Int32);
        let mut heap = ValueHeap::new();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
        let err = ty
            .codec()
            .from_host(&ty, &HostValue::from("7"), &mut [0u8; 4], &mut cx)
            .unwrap_err();
        assert_eq!(err, ElementError::invalid("int32_t", "string"));
    }

    #[test]
    fn scalar_checked_overflow() {
        let ty = TypeDescriptor::scalar(ScalarKind::Uint16);
        let mut heap = ValueHeap::new();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Checked);
        let err = ty
            .codec()
            .from_host(&ty, &HostValue::Int(-1), &mut [0u8; 2], &mut cx)
            .unwrap_err();
        assert!(matches!(err, ElementError::Overflow { value: -1, .. }));
    }

    #[test]
    fn record_copies_opaque_bytes() {
        let ty = TypeDescriptor::record::<Timeval>().unwrap();
        let mut heap = ValueHeap::new();
        let tv = Timeval {
            tv_sec: 3,
            tv_usec: 9,
        };
        let handle = heap.allocate_record(&tv).unwrap();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
        let mut dst = [0u8; 16];
        ty.codec()
            .from_host(&ty, &HostValue::Opaque(handle), &mut dst, &mut cx)
            .unwrap();
        assert_eq!(&dst, tv.as_bytes());
    }

    #[test]
    fn record_rejects_foreign_opaque() {
        let ty = TypeDescriptor::record::<Timeval>().unwrap();
        let mut heap = ValueHeap::new();
        let other = heap.allocate_record(&5u64).unwrap();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
        let err = ty
            .codec()
            .from_host(&ty, &HostValue::Opaque(other), &mut [0u8; 16], &mut cx)
            .unwrap_err();
        assert!(matches!(err, ElementError::Invalid { .. }));
    }

    #[test]
    fn record_from_table_leaves_missing_fields_zero() {
        let ty = TypeDescriptor::record::<Timeval>().unwrap();
        let mut heap = ValueHeap::new();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
        let mut dst = [0u8; 16];
        let table = HostTable::new().with("tv_sec", 12);
        ty.codec()
            .from_host(&ty, &HostValue::Table(table), &mut dst, &mut cx)
            .unwrap();
        assert_eq!(
            Timeval::from_bytes(&dst),
            Some(Timeval {
                tv_sec: 12,
                tv_usec: 0
            })
        );
    }

    #[test]
    fn record_from_table_rejects_nil_entries() {
        let ty = TypeDescriptor::record::<Timeval>().unwrap();
        let mut heap = ValueHeap::new();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
        let table = HostTable::new().with("tv_sec", 1).with("tv_usec", HostValue::Nil);
        let err = ty
            .codec()
            .from_host(&ty, &HostValue::Table(table), &mut [0u8; 16], &mut cx)
            .unwrap_err();
        assert_eq!(
            err,
            ElementError::invalid("int64_t for field 'tv_usec'", "nil")
        );
    }

    #[test]
    fn record_from_table_rejects_unknown_keys() {
        let ty = TypeDescriptor::record::<Timeval>().unwrap();
        let mut heap = ValueHeap::new();
        let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
        let table = HostTable::new().with("tv_nsec", 1);
        let err = ty
            .codec()
            .from_host(&ty, &HostValue::Table(table), &mut [0u8; 16], &mut cx)
            .unwrap_err();
        assert_eq!(
            err,
            ElementError::invalid("a field of timeval", "key 'tv_nsec'")
        );
    }

    #[test]
    fn record_to_host_wraps() {
        let ty = TypeDescriptor::record::<Timeval>().unwrap();
        let mut heap = ValueHeap::new();
        let tv = Timeval {
            tv_sec: 1,
            tv_usec: 2,
        };
        let value = {
            let mut cx = CodecContext::new(&mut heap, NarrowingMode::Mask);
            ty.codec().to_host(&ty, tv.as_bytes(), &mut cx).unwrap()
        };
        let handle = value.as_opaque().unwrap();
        assert_eq!(handle.type_code, Timeval::CODE);
        assert_eq!(heap.read::<Timeval>(handle).unwrap(), tv);
    }
}
