//! Error types for the marshaling engine.
//!
//! Each layer has its own error enum so callers can match precisely, and
//! [`MarshalError`] wraps them all for code that just wants to propagate.
//!
//! ## Error Hierarchy
//!
//! ```text
//! MarshalError (top-level wrapper)
//! ├── RegistryError   - descriptor registration and lookup
//! ├── ValueError      - opaque value lifecycle (create/init/destroy/reparent)
//! └── ConversionError - bulk sequence <-> array conversion
//!         └── (built from ElementError + the failing index)
//! ```
//!
//! [`MarshalError::kind`] flattens the hierarchy to an [`ErrorKind`] for
//! callers that map failures onto host-visible error codes.
//!
//! Element indices in errors are one-based, matching the host sequence that
//! was being converted.

use std::fmt;

use thiserror::Error;

use crate::TypeCode;

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors raised while registering or looking up type descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A descriptor with the same code is already registered.
    #[error("duplicate type code {code} for '{name}'")]
    DuplicateId {
        /// The colliding code.
        code: TypeCode,
        /// Name of the descriptor that was rejected.
        name: String,
    },

    /// A descriptor with the same name is already registered.
    #[error("duplicate type name '{name}'")]
    DuplicateName {
        /// The colliding name.
        name: String,
    },

    /// No descriptor is registered under this code.
    #[error("unknown type code {code}")]
    UnknownType {
        /// The missing code.
        code: TypeCode,
    },

    /// No descriptor is registered under this name.
    #[error("unknown type name '{name}'")]
    UnknownName {
        /// The missing name.
        name: String,
    },

    /// A descriptor was found but it is not the one the caller expected.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Code the caller asked for.
        expected: TypeCode,
        /// Code that was presented.
        actual: TypeCode,
    },

    /// The descriptor is internally inconsistent.
    #[error("invalid descriptor '{name}': {reason}")]
    InvalidDescriptor {
        /// Descriptor name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

// ============================================================================
// Value Errors
// ============================================================================

/// Errors raised by the opaque value heap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The initializer is shorter than the native record.
    #[error("size mismatch: record needs {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Required byte count.
        expected: usize,
        /// Provided byte count.
        actual: usize,
    },

    /// The handle refers to a value that no longer exists.
    #[error("stale handle: value at index {index} has been destroyed")]
    StaleHandle {
        /// Heap slot index.
        index: u32,
    },

    /// The value was already destroyed.
    #[error("value at index {index} destroyed twice")]
    DoubleDestroy {
        /// Heap slot index.
        index: u32,
    },

    /// The handle or record type does not match the stored value.
    #[error("value type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Code the caller asked for.
        expected: TypeCode,
        /// Code of the stored value.
        actual: TypeCode,
    },

    /// Reparenting would make a value own one of its ancestors.
    #[error("ownership cycle: value {child} is an ancestor of {parent}")]
    OwnershipCycle {
        /// Slot index of the would-be parent.
        parent: u32,
        /// Slot index of the would-be child.
        child: u32,
    },

    /// The record type has no field with this name.
    #[error("type '{type_name}' has no field '{field}'")]
    UnknownField {
        /// Record type name.
        type_name: String,
        /// Requested field.
        field: String,
    },

    /// The allocator refused the wrapper storage.
    #[error("out of memory allocating {bytes} bytes")]
    OutOfMemory {
        /// Requested byte count.
        bytes: usize,
    },
}

// ============================================================================
// Element and Conversion Errors
// ============================================================================

/// Failure converting a single element, reported by element codecs.
///
/// The engine turns this into a [`ConversionError`] carrying the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    /// The host value has the wrong shape for this element type.
    #[error("expected {expected}, found {found}")]
    Invalid {
        /// What the codec needed.
        expected: String,
        /// What it got.
        found: String,
    },

    /// Checked narrowing rejected the value.
    #[error("integer overflow: {value} doesn't fit in {target}")]
    Overflow {
        /// The host integer.
        value: i64,
        /// Target scalar name.
        target: &'static str,
    },

    /// The codec touched the value heap and it failed.
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl ElementError {
    /// Shorthand for [`ElementError::Invalid`].
    pub fn invalid(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ElementError::Invalid {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Errors raised by bulk conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The input is not a host sequence.
    #[error("expected a sequence, found {found}")]
    NotASequence {
        /// Host type name of the input.
        found: String,
    },

    /// The sequence length differs from the required cardinality.
    #[error("cardinality mismatch: expected {expected} elements, got {actual}")]
    CardinalityMismatch {
        /// Required element count.
        expected: usize,
        /// Declared sequence length.
        actual: usize,
    },

    /// A slot inside the declared length is empty.
    #[error("missing element at index {index}")]
    MissingElement {
        /// One-based index.
        index: usize,
    },

    /// An element has the wrong host-side shape.
    #[error("invalid element at index {index}: expected {expected}, found {found}")]
    InvalidElement {
        /// One-based index.
        index: usize,
        /// What the codec needed.
        expected: String,
        /// What it got.
        found: String,
    },

    /// Checked narrowing rejected an element.
    #[error("integer overflow at index {index}: {value} doesn't fit in {target}")]
    IntegerOverflow {
        /// One-based index.
        index: usize,
        /// The host integer.
        value: i64,
        /// Target scalar name.
        target: &'static str,
    },

    /// The buffer could not be allocated (or its size overflows `usize`).
    #[error("out of memory allocating {count} elements of {element_size} bytes")]
    OutOfMemory {
        /// Requested element count.
        count: usize,
        /// Element size in bytes.
        element_size: usize,
    },

    /// Creating or reading an opaque value failed mid-conversion.
    #[error("element {index}: {source}")]
    Value {
        /// One-based index.
        index: usize,
        /// Underlying heap error.
        source: ValueError,
    },
}

impl ConversionError {
    /// Attach the one-based `index` to an element failure.
    pub fn at(index: usize, error: ElementError) -> Self {
        match error {
            ElementError::Invalid { expected, found } => ConversionError::InvalidElement {
                index,
                expected,
                found,
            },
            ElementError::Overflow { value, target } => ConversionError::IntegerOverflow {
                index,
                value,
                target,
            },
            ElementError::Value(source) => ConversionError::Value { index, source },
        }
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The unified error type for all marshaling operations.
///
/// Each variant uses `#[from]` so `?` lifts the layer-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// A registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An opaque value error.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A bulk conversion error.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A single field or element write outside a bulk conversion.
    #[error(transparent)]
    Element(#[from] ElementError),
}

/// Flat classification of every error the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateId,
    DuplicateName,
    UnknownType,
    UnknownName,
    TypeMismatch,
    InvalidDescriptor,
    SizeMismatch,
    StaleHandle,
    DoubleDestroy,
    OwnershipCycle,
    UnknownField,
    NotASequence,
    CardinalityMismatch,
    MissingElement,
    InvalidElement,
    IntegerOverflow,
    OutOfMemory,
}

impl ErrorKind {
    /// Stable lowercase name, suitable for host-visible error strings.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::DuplicateId => "duplicate_id",
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::UnknownType => "unknown_type",
            ErrorKind::UnknownName => "unknown_name",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::InvalidDescriptor => "invalid_descriptor",
            ErrorKind::SizeMismatch => "size_mismatch",
            ErrorKind::StaleHandle => "stale_handle",
            ErrorKind::DoubleDestroy => "double_destroy",
            ErrorKind::OwnershipCycle => "ownership_cycle",
            ErrorKind::UnknownField => "unknown_field",
            ErrorKind::NotASequence => "not_a_sequence",
            ErrorKind::CardinalityMismatch => "cardinality_mismatch",
            ErrorKind::MissingElement => "missing_element",
            ErrorKind::InvalidElement => "invalid_element",
            ErrorKind::IntegerOverflow => "integer_overflow",
            ErrorKind::OutOfMemory => "out_of_memory",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl RegistryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::DuplicateId { .. } => ErrorKind::DuplicateId,
            RegistryError::DuplicateName { .. } => ErrorKind::DuplicateName,
            RegistryError::UnknownType { .. } => ErrorKind::UnknownType,
            RegistryError::UnknownName { .. } => ErrorKind::UnknownName,
            RegistryError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            RegistryError::InvalidDescriptor { .. } => ErrorKind::InvalidDescriptor,
        }
    }
}

impl ValueError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValueError::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            ValueError::StaleHandle { .. } => ErrorKind::StaleHandle,
            ValueError::DoubleDestroy { .. } => ErrorKind::DoubleDestroy,
            ValueError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ValueError::OwnershipCycle { .. } => ErrorKind::OwnershipCycle,
            ValueError::UnknownField { .. } => ErrorKind::UnknownField,
            ValueError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
        }
    }
}

impl ElementError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ElementError::Invalid { .. } => ErrorKind::InvalidElement,
            ElementError::Overflow { .. } => ErrorKind::IntegerOverflow,
            ElementError::Value(e) => e.kind(),
        }
    }
}

impl ConversionError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::NotASequence { .. } => ErrorKind::NotASequence,
            ConversionError::CardinalityMismatch { .. } => ErrorKind::CardinalityMismatch,
            ConversionError::MissingElement { .. } => ErrorKind::MissingElement,
            ConversionError::InvalidElement { .. } => ErrorKind::InvalidElement,
            ConversionError::IntegerOverflow { .. } => ErrorKind::IntegerOverflow,
            ConversionError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            ConversionError::Value { source, .. } => source.kind(),
        }
    }
}

impl MarshalError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarshalError::Registry(e) => e.kind(),
            MarshalError::Value(e) => e.kind(),
            MarshalError::Conversion(e) => e.kind(),
            MarshalError::Element(e) => e.kind(),
        }
    }

    /// Check if this is a registry error.
    pub fn is_registry(&self) -> bool {
        matches!(self, MarshalError::Registry(_))
    }

    /// Check if this is a value lifecycle error.
    pub fn is_value(&self) -> bool {
        matches!(self, MarshalError::Value(_))
    }

    /// Check if this is a conversion error, bulk or single element.
    pub fn is_conversion(&self) -> bool {
        matches!(self, MarshalError::Conversion(_) | MarshalError::Element(_))
    }
}

/// Result alias used throughout the engine.
pub type MarshalResult<T> = Result<T, MarshalError>;

// ============================================================================
// Tests
// ============================================================================
