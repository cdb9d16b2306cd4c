//! Generational arena of opaque host-visible values.

use std::fmt;

use crate::error::{ElementError, ValueError};
use crate::layout::{FieldLayout, NarrowingMode, ValueShape};
use crate::memory::{RawBuffer, SharedAllocator, SystemAllocator};
use crate::{NativeRecord, TypeCode};

/// Handle to an opaque value in a [`ValueHeap`].
///
/// Copyable and safe to hand to the host. The generation detects use after
/// destroy; the type code lets codecs reject foreign values without touching
/// the heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueHandle {
    /// Index into ValueHeap.slots
    pub index: u32,
    /// Generation for use-after-destroy detection
    pub generation: u32,
    /// Code of the wrapped native type
    pub type_code: TypeCode,
}

impl ValueHandle {
    pub fn new(index: u32, generation: u32, type_code: TypeCode) -> Self {
        Self {
            index,
            generation,
            type_code,
        }
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value#{}@{} ({})", self.index, self.generation, self.type_code)
    }
}

/// Storage behind one handle.
///
/// The payload is zeroed when the value is dropped, before its storage goes
/// back to the allocator.
pub struct OpaqueValue {
    shape: ValueShape,
    owner: Option<ValueHandle>,
    children: Vec<ValueHandle>,
    payload: RawBuffer,
}

impl OpaqueValue {
    pub fn shape(&self) -> &ValueShape {
        &self.shape
    }

    pub fn owner(&self) -> Option<ValueHandle> {
        self.owner
    }

    pub fn children(&self) -> &[ValueHandle] {
        &self.children
    }

    /// The embedded native record.
    pub fn record_bytes(&self) -> &[u8] {
        &self.payload.as_slice()[..self.shape.element_size]
    }

    pub fn record_bytes_mut(&mut self) -> &mut [u8] {
        let size = self.shape.element_size;
        &mut self.payload.as_mut_slice()[..size]
    }

    /// The whole payload, extension area included.
    pub fn wrapper_bytes(&self) -> &[u8] {
        self.payload.as_slice()
    }

    pub fn wrapper_bytes_mut(&mut self) -> &mut [u8] {
        self.payload.as_mut_slice()
    }
}

impl Drop for OpaqueValue {
    fn drop(&mut self) {
        self.payload.zeroize();
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueValue")
            .field("code", &self.shape.code)
            .field("owner", &self.owner)
            .field("children", &self.children.len())
            .field("payload", &self.payload)
            .finish()
    }
}

struct HeapSlot {
    generation: u32,
    value: Option<OpaqueValue>,
}

/// Arena of opaque values with generational handles.
///
/// Freed slots are reused with a bumped generation, so handles to destroyed
/// values stay detectably stale. Ownership between values is tracked with
/// handles: a value has at most one owner and destroying it destroys every
/// value it transitively owns.
pub struct ValueHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
    allocator: SharedAllocator,
    live: usize,
}

impl ValueHeap {
    /// Create an empty heap backed by the system allocator.
    pub fn new() -> Self {
        Self::with_allocator(SystemAllocator::shared())
    }

    pub fn with_allocator(allocator: SharedAllocator) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            allocator,
            live: 0,
        }
    }

    pub fn allocator(&self) -> &SharedAllocator {
        &self.allocator
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Check if the handle refers to a live value.
    pub fn contains(&self, handle: ValueHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Allocate a zeroed value of `shape`, optionally initialized from
    /// `init`.
    ///
    /// `init` must hold at least `element_size` bytes; extra bytes are
    /// ignored.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn allocate(
        &mut self,
        shape: &ValueShape,
        init: Option<&[u8]>,
    ) -> Result<ValueHandle, ValueError> {
        if let Some(bytes) = init {
            check_init_len(shape, bytes)?;
        }
        let reuse = self.free_list.last().copied();
        let index = match reuse {
            Some(index) => index,
            None => append_index(self.slots.len(), shape.wrapper_size)?,
        };

        let mut payload = RawBuffer::zeroed(&self.allocator, shape.wrapper_size, shape.align)
            .map_err(|e| ValueError::OutOfMemory { bytes: e.bytes })?;
        if let Some(bytes) = init {
            payload.as_mut_slice()[..shape.element_size]
                .copy_from_slice(&bytes[..shape.element_size]);
        }

        let value = OpaqueValue {
            shape: *shape,
            owner: None,
            children: Vec::new(),
            payload,
        };

        self.live += 1;
        if reuse.is_some() {
            self.free_list.pop();
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Ok(ValueHandle::new(index, slot.generation, shape.code))
        } else {
            self.slots.push(HeapSlot {
                generation: 0,
                value: Some(value),
            });
            Ok(ValueHandle::new(index, 0, shape.code))
        }
    }

    /// Allocate a value holding a copy of `record`.
    pub fn allocate_record<T: NativeRecord>(&mut self, record: &T) -> Result<ValueHandle, ValueError> {
        self.allocate(&T::shape(), Some(record.as_bytes()))
    }

    /// Get a live value.
    pub fn get(&self, handle: ValueHandle) -> Result<&OpaqueValue, ValueError> {
        let value = self
            .slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or(ValueError::StaleHandle {
                index: handle.index,
            })?;
        check_code(handle.type_code, value.shape.code)?;
        Ok(value)
    }

    pub fn get_mut(&mut self, handle: ValueHandle) -> Result<&mut OpaqueValue, ValueError> {
        let value = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
            .ok_or(ValueError::StaleHandle {
                index: handle.index,
            })?;
        check_code(handle.type_code, value.shape.code)?;
        Ok(value)
    }

    /// Copy caller bytes into an existing value's record.
    pub fn init(&mut self, handle: ValueHandle, bytes: &[u8]) -> Result<(), ValueError> {
        let value = self.get_mut(handle)?;
        check_init_len(&value.shape, bytes)?;
        let size = value.shape.element_size;
        value.record_bytes_mut().copy_from_slice(&bytes[..size]);
        Ok(())
    }

    /// Record bytes of a live value.
    pub fn record_bytes(&self, handle: ValueHandle) -> Result<&[u8], ValueError> {
        Ok(self.get(handle)?.record_bytes())
    }

    /// Pointer to the embedded record, for passing to a native call.
    ///
    /// Null for zero-sized records. Valid until the value is destroyed.
    pub fn raw_ptr(&mut self, handle: ValueHandle) -> Result<*mut u8, ValueError> {
        Ok(self.get_mut(handle)?.payload.as_mut_ptr())
    }

    /// Copy the record out as `T`.
    pub fn read<T: NativeRecord>(&self, handle: ValueHandle) -> Result<T, ValueError> {
        let value = self.get(handle)?;
        check_code(T::CODE, value.shape.code)?;
        T::from_bytes(value.record_bytes()).ok_or(ValueError::SizeMismatch {
            expected: size_of::<T>(),
            actual: value.shape.element_size,
        })
    }

    /// Overwrite the record with `record`.
    pub fn write<T: NativeRecord>(&mut self, handle: ValueHandle, record: &T) -> Result<(), ValueError> {
        let value = self.get_mut(handle)?;
        check_code(T::CODE, value.shape.code)?;
        check_init_len(&value.shape, record.as_bytes())?;
        let size = value.shape.element_size;
        value.record_bytes_mut().copy_from_slice(&record.as_bytes()[..size]);
        Ok(())
    }

    /// Read one integer field, widened to a host integer.
    pub fn read_field(&self, handle: ValueHandle, field: &FieldLayout) -> Result<i64, ValueError> {
        let bytes = self.record_bytes(handle)?;
        let src = bytes
            .get(field.offset..field.end())
            .ok_or(ValueError::SizeMismatch {
                expected: field.end(),
                actual: bytes.len(),
            })?;
        Ok(field.kind.load(src))
    }

    /// Narrow `value` and store it into one integer field.
    pub fn write_field(
        &mut self,
        handle: ValueHandle,
        field: &FieldLayout,
        value: i64,
        mode: NarrowingMode,
    ) -> Result<(), ElementError> {
        let bits = field.kind.narrow(value, mode)?;
        let bytes = self.get_mut(handle)?.record_bytes_mut();
        let len = bytes.len();
        let dst = bytes
            .get_mut(field.offset..field.end())
            .ok_or(ValueError::SizeMismatch {
                expected: field.end(),
                actual: len,
            })?;
        field.kind.store(bits, dst);
        Ok(())
    }

    pub fn owner(&self, handle: ValueHandle) -> Result<Option<ValueHandle>, ValueError> {
        Ok(self.get(handle)?.owner)
    }

    pub fn children(&self, handle: ValueHandle) -> Result<&[ValueHandle], ValueError> {
        Ok(self.get(handle)?.children())
    }

    /// Make `parent` the owner of `child`, detaching it from any previous
    /// owner first.
    ///
    /// Fails with [`ValueError::OwnershipCycle`] if `child` is `parent` or
    /// one of its ancestors.
    pub fn adopt(&mut self, parent: ValueHandle, child: ValueHandle) -> Result<(), ValueError> {
        self.get(child)?;
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(ValueError::OwnershipCycle {
                    parent: parent.index,
                    child: child.index,
                });
            }
            cursor = self.get(current)?.owner;
        }

        self.detach(child)?;
        self.get_mut(parent)?.children.push(child);
        self.get_mut(child)?.owner = Some(parent);
        Ok(())
    }

    /// Clear `child`'s owner link. Returns the previous owner.
    pub fn detach(&mut self, child: ValueHandle) -> Result<Option<ValueHandle>, ValueError> {
        let Some(owner) = self.get_mut(child)?.owner.take() else {
            return Ok(None);
        };
        if let Ok(parent) = self.get_mut(owner) {
            parent.children.retain(|h| *h != child);
        }
        Ok(Some(owner))
    }

    /// Destroy a value and everything it owns.
    ///
    /// Returns `false` without doing anything if the handle is stale; a
    /// second destroy of the same handle is logged as a warning.
    pub fn destroy(&mut self, handle: ValueHandle) -> bool {
        match self.try_destroy(handle) {
            Ok(_) => true,
            Err(err) => {
                log::warn!("ignoring destroy of {handle}: {err}");
                false
            }
        }
    }

    /// Destroy a value and everything it owns, returning how many values
    /// were released.
    ///
    /// A handle whose slot exists but has moved on is reported as
    /// [`ValueError::DoubleDestroy`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn try_destroy(&mut self, handle: ValueHandle) -> Result<usize, ValueError> {
        if let Err(err) = self.get(handle) {
            return Err(match err {
                ValueError::StaleHandle { index } if (index as usize) < self.slots.len() => {
                    ValueError::DoubleDestroy { index }
                }
                other => other,
            });
        }
        self.detach(handle)?;

        let mut pending = vec![handle];
        let mut released = 0;
        while let Some(current) = pending.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            let Some(value) = slot.value.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(current.index);
            self.live -= 1;
            released += 1;
            pending.extend_from_slice(&value.children);
            drop(value);
        }
        Ok(released)
    }
}

impl Default for ValueHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValueHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueHeap")
            .field("live", &self.live)
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}

fn check_init_len(shape: &ValueShape, bytes: &[u8]) -> Result<(), ValueError> {
    if bytes.len() < shape.element_size {
        return Err(ValueError::SizeMismatch {
            expected: shape.element_size,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Index of a slot appended after `len` existing ones. Handles carry a
/// `u32` index, so the heap is full at `u32::MAX + 1` slots.
fn append_index(len: usize, bytes: usize) -> Result<u32, ValueError> {
    u32::try_from(len).map_err(|_| ValueError::OutOfMemory { bytes })
}

fn check_code(expected: TypeCode, actual: TypeCode) -> Result<(), ValueError> {
    if expected != actual {
        return Err(ValueError::TypeMismatch { expected, actual });
    }
    Ok(())
}
