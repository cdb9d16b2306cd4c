//! Type descriptors: static metadata and conversion hooks for one native type.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use sysbind_core::{
    FieldLayout, NativeRecord, NativeScalar, RegistryError, ScalarKind, TypeCode, ValueShape,
};

use crate::codec::{ElementCodec, RecordCodec, ScalarCodec};

bitflags! {
    /// Properties of a registered type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// Elements are single fixed-width integers.
        const SCALAR = 1 << 0;
        /// The record is plain data and can be copied byte for byte.
        const POD = 1 << 1;
        /// Integer fields are addressable by name.
        const FIELDS = 1 << 2;
        /// Element conversion uses a type-specific codec.
        const CUSTOM_CODEC = 1 << 3;
    }
}

/// What one element of the type looks like in native memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A single fixed-width integer.
    Scalar(ScalarKind),
    /// A record with named integer fields.
    Record(&'static [FieldLayout]),
    /// Bytes with no field structure the engine knows about.
    Opaque,
}

/// Immutable description of a wrapped native type.
///
/// Created with [`DescriptorBuilder`] (or one of the shortcut constructors)
/// and never changed after registration.
#[derive(Clone)]
pub struct TypeDescriptor {
    code: TypeCode,
    name: String,
    element_size: usize,
    wrapper_size: usize,
    align: usize,
    element: ElementKind,
    flags: TypeFlags,
    codec: Arc<dyn ElementCodec>,
}

impl TypeDescriptor {
    /// Start building a descriptor whose code is derived from `name`.
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(name)
    }

    /// Descriptor for a built-in fixed-width integer.
    pub fn scalar(kind: ScalarKind) -> Self {
        Self {
            code: kind.type_code(),
            name: kind.name().to_string(),
            element_size: kind.width(),
            wrapper_size: kind.width(),
            align: kind.width(),
            element: ElementKind::Scalar(kind),
            flags: TypeFlags::SCALAR | TypeFlags::POD,
            codec: Arc::new(ScalarCodec::new(kind)),
        }
    }

    /// Descriptor for a [`NativeRecord`] type with the default record codec.
    pub fn record<T: NativeRecord>() -> Result<Self, RegistryError> {
        DescriptorBuilder::new(T::NAME).record::<T>().build()
    }

    /// Descriptor for a named alias of an integer type, such as `gid_t`.
    pub fn scalar_alias<T: NativeScalar>(name: impl Into<String>) -> Result<Self, RegistryError> {
        DescriptorBuilder::new(name)
            .layout(size_of::<T>(), align_of::<T>())
            .scalar(T::KIND)
            .build()
    }

    #[inline]
    pub fn code(&self) -> TypeCode {
        self.code
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the raw native record.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Size of a wrapper payload, extension area included.
    #[inline]
    pub fn wrapper_size(&self) -> usize {
        self.wrapper_size
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    #[inline]
    pub fn element(&self) -> ElementKind {
        self.element
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub fn codec(&self) -> &dyn ElementCodec {
        self.codec.as_ref()
    }

    pub fn is_scalar(&self) -> bool {
        self.flags.contains(TypeFlags::SCALAR)
    }

    /// Storage shape of one wrapper of this type.
    pub fn shape(&self) -> ValueShape {
        ValueShape::new(self.code, self.element_size, self.align)
            .with_extension(self.wrapper_size - self.element_size)
    }

    /// Named integer fields, empty unless the element is a record.
    pub fn fields(&self) -> &'static [FieldLayout] {
        match self.element {
            ElementKind::Record(fields) => fields,
            _ => &[],
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldLayout> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("code", &self.code)
            .field("name", &self.name)
            .field("element_size", &self.element_size)
            .field("wrapper_size", &self.wrapper_size)
            .field("align", &self.align)
            .field("element", &self.element)
            .field("flags", &self.flags)
            .field("codec", &self.codec)
            .finish()
    }
}

/// Builder for [`TypeDescriptor`].
///
/// # Example
///
/// ```
/// use sysbind_core::TypeCode;
/// use sysbind_registry::{TypeDescriptor, TypeFlags};
///
/// let desc = TypeDescriptor::builder("sockaddr_storage")
///     .layout(128, 8)
///     .extension(16)
///     .build()
///     .unwrap();
/// assert_eq!(desc.code(), TypeCode::from_name("sockaddr_storage"));
/// assert_eq!(desc.wrapper_size(), 144);
/// assert!(desc.flags().contains(TypeFlags::POD));
/// ```
#[derive(Debug)]
pub struct DescriptorBuilder {
    name: String,
    code: Option<TypeCode>,
    element_size: usize,
    align: usize,
    extension: usize,
    element: ElementKind,
    codec: Option<Arc<dyn ElementCodec>>,
}

impl DescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            element_size: 0,
            align: 1,
            extension: 0,
            element: ElementKind::Opaque,
            codec: None,
        }
    }

    /// Use an explicit code instead of one derived from the name.
    pub fn code(mut self, code: TypeCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the native record's size and alignment.
    pub fn layout(mut self, element_size: usize, align: usize) -> Self {
        self.element_size = element_size;
        self.align = align;
        self
    }

    /// Take layout and fields from a [`NativeRecord`] type.
    pub fn record<T: NativeRecord>(mut self) -> Self {
        self.element_size = size_of::<T>();
        self.align = align_of::<T>();
        self.element = if T::FIELDS.is_empty() {
            ElementKind::Opaque
        } else {
            ElementKind::Record(T::FIELDS)
        };
        if self.code.is_none() && self.name == T::NAME {
            self.code = Some(T::CODE);
        }
        self
    }

    /// Declare the element as a single integer.
    pub fn scalar(mut self, kind: ScalarKind) -> Self {
        self.element = ElementKind::Scalar(kind);
        self
    }

    /// Declare named integer fields.
    pub fn fields(mut self, fields: &'static [FieldLayout]) -> Self {
        self.element = ElementKind::Record(fields);
        self
    }

    /// Reserve a zeroed extension area after the record in every wrapper.
    pub fn extension(mut self, bytes: usize) -> Self {
        self.extension = bytes;
        self
    }

    /// Replace the default element codec.
    pub fn codec(mut self, codec: impl ElementCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Validate and build the descriptor.
    pub fn build(self) -> Result<TypeDescriptor, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidDescriptor {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("type name is empty".to_string()));
        }
        let code = self.code.unwrap_or_else(|| TypeCode::from_name(&self.name));
        if code.is_empty() {
            return Err(invalid("type code 0 is reserved".to_string()));
        }
        if !self.align.is_power_of_two() {
            return Err(invalid(format!("alignment {} is not a power of two", self.align)));
        }
        let wrapper_size = self
            .element_size
            .checked_add(self.extension)
            .ok_or_else(|| invalid("wrapper size overflows".to_string()))?;

        match self.element {
            ElementKind::Scalar(kind) if kind.width() != self.element_size => {
                return Err(invalid(format!(
                    "{} needs {} bytes, layout has {}",
                    kind,
                    kind.width(),
                    self.element_size
                )));
            }
            ElementKind::Record(fields) => {
                if let Some(field) = fields.iter().find(|f| f.end() > self.element_size) {
                    return Err(invalid(format!(
                        "field '{}' ends at byte {} past the {}-byte record",
                        field.name,
                        field.end(),
                        self.element_size
                    )));
                }
                for (i, field) in fields.iter().enumerate() {
                    if fields[..i].iter().any(|f| f.name == field.name) {
                        return Err(invalid(format!("field '{}' declared twice", field.name)));
                    }
                }
            }
            _ => {}
        }

        let mut flags = TypeFlags::POD;
        match self.element {
            ElementKind::Scalar(_) => flags |= TypeFlags::SCALAR,
            ElementKind::Record(fields) if !fields.is_empty() => flags |= TypeFlags::FIELDS,
            _ => {}
        }

        let codec: Arc<dyn ElementCodec> = match (self.codec, self.element) {
            (Some(codec), _) => {
                flags |= TypeFlags::CUSTOM_CODEC;
                codec
            }
            (None, ElementKind::Scalar(kind)) => Arc::new(ScalarCodec::new(kind)),
            (None, _) => Arc::new(RecordCodec),
        };

        Ok(TypeDescriptor {
            code,
            name: self.name,
            element_size: self.element_size,
            wrapper_size,
            align: self.align,
            element: self.element,
            flags,
            codec,
        })
    }
}
