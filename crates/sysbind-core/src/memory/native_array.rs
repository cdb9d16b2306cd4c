//! Contiguous native array of fixed-size elements.

use std::fmt;

use super::allocator::SharedAllocator;
use super::buffer::RawBuffer;
use crate::error::{ConversionError, ValueError};
use crate::{NativeRecord, TypeCode};

/// An exclusively owned buffer of `count` elements of one native type.
///
/// The data pointer is non-null exactly when `count * element_size > 0`.
/// Dropping the array releases the buffer once; passing it by value moves
/// the disposal responsibility along with it.
pub struct NativeArray {
    buffer: RawBuffer,
    count: usize,
    element_size: usize,
    type_code: TypeCode,
}

impl NativeArray {
    /// An array with no elements and no allocation.
    pub const fn empty(type_code: TypeCode, element_size: usize) -> Self {
        Self {
            buffer: RawBuffer::empty(),
            count: 0,
            element_size,
            type_code,
        }
    }

    /// Allocate `count` zeroed elements.
    ///
    /// Fails with [`ConversionError::OutOfMemory`] when the byte size
    /// overflows `usize` or the allocator refuses the request.
    pub fn zeroed(
        allocator: &SharedAllocator,
        type_code: TypeCode,
        count: usize,
        element_size: usize,
        align: usize,
    ) -> Result<Self, ConversionError> {
        let oom = ConversionError::OutOfMemory {
            count,
            element_size,
        };
        let bytes = count.checked_mul(element_size).ok_or_else(|| oom.clone())?;
        let buffer = RawBuffer::zeroed(allocator, bytes, align).map_err(|_| oom)?;
        Ok(Self {
            buffer,
            count,
            element_size,
            type_code,
        })
    }

    /// Build an array by copying typed records.
    pub fn from_records<T: NativeRecord>(
        allocator: &SharedAllocator,
        records: &[T],
    ) -> Result<Self, ConversionError> {
        let mut array = Self::zeroed(
            allocator,
            T::CODE,
            records.len(),
            size_of::<T>(),
            align_of::<T>(),
        )?;
        if size_of::<T>() > 0 {
            for (slot, record) in array
                .as_bytes_mut()
                .chunks_exact_mut(size_of::<T>())
                .zip(records)
            {
                slot.copy_from_slice(record.as_bytes());
            }
        }
        Ok(array)
    }

    #[inline]
    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Total size of the data in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut_slice()
    }

    /// Data pointer for handing to a native call. Null when empty.
    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.buffer.as_mut_ptr()
    }

    /// Bytes of the element at zero-based `index`.
    pub fn element(&self, index: usize) -> Option<&[u8]> {
        if index >= self.count {
            return None;
        }
        let start = index * self.element_size;
        self.as_bytes().get(start..start + self.element_size)
    }

    /// Mutable bytes of the element at zero-based `index`.
    pub fn element_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        if index >= self.count {
            return None;
        }
        let start = index * self.element_size;
        let size = self.element_size;
        self.as_bytes_mut().get_mut(start..start + size)
    }

    /// Iterate over element byte slices in order.
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.count).filter_map(move |i| self.element(i))
    }

    /// Copy the element at zero-based `index` out as `T`.
    pub fn record<T: NativeRecord>(&self, index: usize) -> Result<Option<T>, ValueError> {
        self.check_record::<T>()?;
        Ok(self.element(index).and_then(T::from_bytes))
    }

    /// Copy every element out as `T`.
    ///
    /// Fails with [`ValueError::TypeMismatch`] unless the array was built for
    /// `T`'s code and element size.
    pub fn to_records<T: NativeRecord>(&self) -> Result<Vec<T>, ValueError> {
        self.check_record::<T>()?;
        if size_of::<T>() == 0 {
            return Ok(Vec::new());
        }
        Ok(self.elements().filter_map(T::from_bytes).collect())
    }

    fn check_record<T: NativeRecord>(&self) -> Result<(), ValueError> {
        if self.type_code != T::CODE {
            return Err(ValueError::TypeMismatch {
                expected: T::CODE,
                actual: self.type_code,
            });
        }
        if self.element_size != size_of::<T>() {
            return Err(ValueError::SizeMismatch {
                expected: size_of::<T>(),
                actual: self.element_size,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for NativeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeArray")
            .field("type_code", &self.type_code)
            .field("count", &self.count)
            .field("element_size", &self.element_size)
            .field("data", &self.as_ptr())
            .finish()
    }
}
