//! The marshaling engine: opaque value lifecycle and bulk conversion between
//! host sequences and native arrays.

use std::sync::Arc;

use sysbind_core::{
    ConversionError, ElementError, FieldLayout, HostSequence, HostValue, MarshalResult,
    NativeArray, NativeRecord, RegistryError, TypeCode, ValueError, ValueHandle, ValueHeap,
};
use sysbind_registry::{CodecContext, TypeDescriptor, TypeSource};

use crate::config::MarshalConfig;

/// Conversion engine over a registry.
///
/// The registry is usually the sealed one of a [`Context`](crate::Context);
/// any [`TypeSource`] works, including a
/// [`LiveRegistry`](sysbind_registry::LiveRegistry) that keeps accepting
/// types. Each marshaler owns the heap of the opaque values it creates, so a
/// marshaler is used by one thread at a time. Create one per thread from
/// the same [`Context`](crate::Context).
///
/// # Example
///
/// ```
/// use sysbind::Context;
/// use sysbind_core::{HostSequence, HostValue};
/// use sysbind_modules::PollFd;
/// use sysbind_core::NativeRecord;
///
/// let mut ctx = Context::with_default_modules().unwrap();
/// ctx.seal().unwrap();
/// let mut marshaler = ctx.create_marshaler().unwrap();
///
/// let fd = marshaler
///     .create_record(&PollFd { fd: 3, events: 1, revents: 0 })
///     .unwrap();
/// let input = HostValue::from(HostSequence::from_iter([fd]));
/// let array = marshaler.sequence_to_array(PollFd::CODE, &input, Some(1)).unwrap();
/// assert_eq!(array.to_records::<PollFd>().unwrap()[0].fd, 3);
/// ```
#[derive(Debug)]
pub struct Marshaler {
    registry: Arc<dyn TypeSource>,
    heap: ValueHeap,
    config: MarshalConfig,
}

impl Marshaler {
    /// Create a marshaler with an empty heap backed by the configured
    /// allocator.
    pub fn new(registry: Arc<dyn TypeSource>, config: MarshalConfig) -> Self {
        Self {
            registry,
            heap: ValueHeap::with_allocator(config.allocator().clone()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<dyn TypeSource> {
        &self.registry
    }

    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// The heap holding every value this marshaler created.
    pub fn heap(&self) -> &ValueHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ValueHeap {
        &mut self.heap
    }

    pub fn lookup_type(&self, code: TypeCode) -> Result<Arc<TypeDescriptor>, RegistryError> {
        self.registry.lookup_shared(code)
    }

    // ========================================================================
    // Opaque values
    // ========================================================================

    /// Create a zeroed value of type `code`, optionally initialized with the
    /// first `element_size` bytes of `init`.
    pub fn create_value(&mut self, code: TypeCode, init: Option<&[u8]>) -> MarshalResult<ValueHandle> {
        let shape = self.registry.lookup_shared(code)?.shape();
        Ok(self.heap.allocate(&shape, init)?)
    }

    /// Create a value holding a copy of `record`.
    pub fn create_record<T: NativeRecord>(&mut self, record: &T) -> MarshalResult<ValueHandle> {
        let shape = self.registry.lookup_shared(T::CODE)?.shape();
        Ok(self.heap.allocate(&shape, Some(record.as_bytes()))?)
    }

    /// Overwrite a value's record with caller bytes.
    pub fn init_value(&mut self, handle: ValueHandle, bytes: &[u8]) -> MarshalResult<()> {
        Ok(self.heap.init(handle, bytes)?)
    }

    /// Destroy a value and everything it owns.
    ///
    /// Returns `false` for a stale handle, including a second destroy.
    pub fn destroy_value(&mut self, handle: ValueHandle) -> bool {
        self.heap.destroy(handle)
    }

    /// Like [`destroy_value`](Self::destroy_value), but reports a stale
    /// handle as an error. Returns how many values were released.
    pub fn try_destroy_value(&mut self, handle: ValueHandle) -> MarshalResult<usize> {
        Ok(self.heap.try_destroy(handle)?)
    }

    /// Pointer to the embedded record for a native call.
    pub fn raw_ptr(&mut self, handle: ValueHandle) -> MarshalResult<*mut u8> {
        Ok(self.heap.raw_ptr(handle)?)
    }

    pub fn record<T: NativeRecord>(&self, handle: ValueHandle) -> MarshalResult<T> {
        Ok(self.heap.read(handle)?)
    }

    pub fn set_record<T: NativeRecord>(&mut self, handle: ValueHandle, record: &T) -> MarshalResult<()> {
        Ok(self.heap.write(handle, record)?)
    }

    /// Read a named field of a record value as a host integer.
    pub fn get_field(&self, handle: ValueHandle, name: &str) -> MarshalResult<HostValue> {
        let field = self.field_of(handle, name)?;
        Ok(HostValue::Int(self.heap.read_field(handle, field)?))
    }

    /// Store a host integer into a named field, narrowed per the configured
    /// mode.
    pub fn set_field(&mut self, handle: ValueHandle, name: &str, value: &HostValue) -> MarshalResult<()> {
        let field = self.field_of(handle, name)?;
        let int = value.as_integer().ok_or_else(|| {
            ElementError::invalid(
                format!("{} for field '{}'", field.kind, field.name),
                value.type_name(),
            )
        })?;
        self.heap
            .write_field(handle, field, int, self.config.narrowing())?;
        Ok(())
    }

    fn field_of(&self, handle: ValueHandle, name: &str) -> MarshalResult<&'static FieldLayout> {
        let ty = self.registry.lookup_shared(handle.type_code)?;
        let field = ty.field(name).ok_or_else(|| ValueError::UnknownField {
            type_name: ty.name().to_string(),
            field: name.to_string(),
        })?;
        Ok(field)
    }

    /// Make `parent` own `child`; destroying `parent` destroys `child`.
    pub fn adopt(&mut self, parent: ValueHandle, child: ValueHandle) -> MarshalResult<()> {
        Ok(self.heap.adopt(parent, child)?)
    }

    pub fn detach(&mut self, child: ValueHandle) -> MarshalResult<Option<ValueHandle>> {
        Ok(self.heap.detach(child)?)
    }

    // ========================================================================
    // Bulk conversion
    // ========================================================================

    /// Convert a host sequence into a native array of type `code`.
    ///
    /// With `expected`, the sequence must have exactly that many slots.
    /// Every slot inside the declared length must hold a value; indices in
    /// errors are one-based. On failure nothing allocated by this call
    /// survives.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn sequence_to_array(
        &mut self,
        code: TypeCode,
        value: &HostValue,
        expected: Option<usize>,
    ) -> MarshalResult<NativeArray> {
        let descriptor = self.registry.lookup_shared(code)?;
        let ty = descriptor.as_ref();

        let sequence = value
            .as_sequence()
            .ok_or_else(|| ConversionError::NotASequence {
                found: value.type_name().to_string(),
            })?;
        let count = sequence.len();
        let element_size = ty.element_size();

        if let Some(expected) = expected.filter(|expected| *expected != count) {
            return Err(ConversionError::CardinalityMismatch {
                expected,
                actual: count,
            }
            .into());
        }
        if self.config.max_elements().is_some_and(|max| count > max) {
            return Err(ConversionError::OutOfMemory {
                count,
                element_size,
            }
            .into());
        }
        if count == 0 {
            return Ok(NativeArray::zeroed(
                self.config.allocator(),
                code,
                0,
                element_size,
                ty.align(),
            )?);
        }

        log::debug!("converting {count} host values to '{}'", ty.name());
        let mut array = NativeArray::zeroed(
            self.config.allocator(),
            code,
            count,
            element_size,
            ty.align(),
        )?;
        let mut cx = CodecContext::new(&mut self.heap, self.config.narrowing());
        if let Err(err) = fill_array(ty, sequence, &mut array, &mut cx) {
            log::debug!("aborting conversion to '{}': {err}", ty.name());
            return Err(err.into());
        }
        Ok(array)
    }

    /// Like [`sequence_to_array`](Self::sequence_to_array), but an absent
    /// (`Nil`) input yields `Ok(None)`.
    pub fn optional_sequence_to_array(
        &mut self,
        code: TypeCode,
        value: &HostValue,
        expected: Option<usize>,
    ) -> MarshalResult<Option<NativeArray>> {
        if value.is_nil() {
            return Ok(None);
        }
        self.sequence_to_array(code, value, expected).map(Some)
    }

    /// Convert a native array into a host sequence, leaving the array with
    /// the caller.
    ///
    /// Record elements become new opaque values; scalars become integers.
    /// On failure the values already created by this call are destroyed.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn array_to_sequence(&mut self, code: TypeCode, array: &NativeArray) -> MarshalResult<HostSequence> {
        let descriptor = self.registry.lookup_shared(code)?;
        let ty = descriptor.as_ref();
        if array.type_code() != code {
            return Err(RegistryError::TypeMismatch {
                expected: code,
                actual: array.type_code(),
            }
            .into());
        }
        if array.element_size() != ty.element_size() {
            return Err(ValueError::SizeMismatch {
                expected: ty.element_size(),
                actual: array.element_size(),
            }
            .into());
        }

        let mut sequence = HostSequence::with_capacity(array.len());
        let mut cx = CodecContext::new(&mut self.heap, self.config.narrowing());
        for (offset, src) in array.elements().enumerate() {
            match ty.codec().to_host(ty, src, &mut cx) {
                Ok(value) => sequence.push(value),
                Err(err) => {
                    let err = ConversionError::at(offset + 1, err);
                    log::debug!("aborting conversion from '{}': {err}", ty.name());
                    for value in sequence.iter() {
                        if let Some(handle) = value.as_opaque() {
                            cx.heap.destroy(handle);
                        }
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(sequence)
    }

    /// Convert a native array into a host sequence, taking ownership of
    /// the array. The buffer is released once the copy is complete, or on
    /// failure.
    pub fn array_into_sequence(&mut self, code: TypeCode, array: NativeArray) -> MarshalResult<HostSequence> {
        self.array_to_sequence(code, &array)
    }

    /// Copy typed records into a native array allocated from the
    /// configured allocator.
    pub fn records_to_array<T: NativeRecord>(&self, records: &[T]) -> MarshalResult<NativeArray> {
        self.registry.lookup_shared(T::CODE)?;
        Ok(NativeArray::from_records(self.config.allocator(), records)?)
    }
}

/// Walk the sequence, encoding slot `i` into element `i - 1`.
///
/// Every slot goes through the codec, zero-sized elements included.
fn fill_array(
    ty: &TypeDescriptor,
    sequence: &HostSequence,
    array: &mut NativeArray,
    cx: &mut CodecContext<'_>,
) -> Result<(), ConversionError> {
    let codec = ty.codec();
    for (offset, value) in sequence.iter().enumerate() {
        let index = offset + 1;
        if value.is_nil() {
            return Err(ConversionError::MissingElement { index });
        }
        let Some(dst) = array.element_mut(offset) else {
            break;
        };
        codec
            .from_host(ty, value, dst, cx)
            .map_err(|err| ConversionError::at(index, err))?;
    }
    Ok(())
}
