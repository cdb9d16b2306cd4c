//! TypeRegistry - descriptor storage keyed by type code.
//!
//! # Thread Safety
//!
//! `TypeRegistry` is **not** internally synchronized. It is populated during
//! single-threaded setup and then frozen behind an `Arc` (see
//! `Context::seal`), after which lookups need no locking. Embedders that must
//! keep registering after worker threads start use [`LiveRegistry`].
//!
//! Marshalers read descriptors through [`TypeSource`], which both implement.
//!
//! # Example
//!
//! ```
//! use sysbind_core::{ScalarKind, scalars};
//! use sysbind_registry::{TypeDescriptor, TypeRegistry};
//!
//! let registry = TypeRegistry::with_scalars();
//! let desc = registry.lookup(scalars::UINT16).unwrap();
//! assert_eq!(desc.name(), "uint16_t");
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(TypeDescriptor::scalar(ScalarKind::Int8)).unwrap();
//! assert!(registry.register(TypeDescriptor::scalar(ScalarKind::Int8)).is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use sysbind_core::{RegistryError, ScalarKind, TypeCode};

use crate::descriptor::TypeDescriptor;

/// Registry of type descriptors with O(1) lookup by code.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeCode, Arc<TypeDescriptor>>,
    /// Reverse index: name -> code.
    names: FxHashMap<String, TypeCode>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the eight fixed-width integers pre-registered.
    pub fn with_scalars() -> Self {
        let mut registry = Self::new();
        registry.register_scalars();
        registry
    }

    /// Register the fixed-width integers that are not already present.
    pub fn register_scalars(&mut self) {
        for kind in ScalarKind::ALL {
            if self.contains(kind.type_code()) {
                continue;
            }
            if let Err(err) = self.register(TypeDescriptor::scalar(kind)) {
                log::debug!("skipping built-in {kind}: {err}");
            }
        }
    }

    /// Register a descriptor.
    ///
    /// On failure the registry is unchanged.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), RegistryError> {
        self.check(&descriptor)?;
        log::debug!(
            "registered type '{}' as {} ({} bytes)",
            descriptor.name(),
            descriptor.code(),
            descriptor.element_size()
        );
        self.names
            .insert(descriptor.name().to_string(), descriptor.code());
        self.types.insert(descriptor.code(), Arc::new(descriptor));
        Ok(())
    }

    /// Check that `descriptor` could be registered without inserting it.
    pub fn check(&self, descriptor: &TypeDescriptor) -> Result<(), RegistryError> {
        if descriptor.code().is_empty() {
            return Err(RegistryError::InvalidDescriptor {
                name: descriptor.name().to_string(),
                reason: "type code 0 is reserved".to_string(),
            });
        }
        if self.types.contains_key(&descriptor.code()) {
            return Err(RegistryError::DuplicateId {
                code: descriptor.code(),
                name: descriptor.name().to_string(),
            });
        }
        if self.names.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }
        Ok(())
    }

    /// Look up a descriptor by code.
    #[inline]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lookup(&self, code: TypeCode) -> Result<&TypeDescriptor, RegistryError> {
        self.types
            .get(&code)
            .map(Arc::as_ref)
            .ok_or(RegistryError::UnknownType { code })
    }

    /// Look up a descriptor, requiring it to be `expected`.
    pub fn lookup_checked(
        &self,
        code: TypeCode,
        expected: TypeCode,
    ) -> Result<&TypeDescriptor, RegistryError> {
        let descriptor = self.lookup(code)?;
        if code != expected {
            return Err(RegistryError::TypeMismatch {
                expected,
                actual: code,
            });
        }
        Ok(descriptor)
    }

    /// Shared handle to a descriptor.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lookup_shared(&self, code: TypeCode) -> Result<Arc<TypeDescriptor>, RegistryError> {
        self.types
            .get(&code)
            .cloned()
            .ok_or(RegistryError::UnknownType { code })
    }

    /// Look up a descriptor by host-visible name.
    pub fn lookup_name(&self, name: &str) -> Result<&TypeDescriptor, RegistryError> {
        self.names
            .get(name)
            .and_then(|code| self.types.get(code))
            .map(Arc::as_ref)
            .ok_or_else(|| RegistryError::UnknownName {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, code: TypeCode) -> bool {
        self.types.contains_key(&code)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all descriptors in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values().map(Arc::as_ref)
    }
}

/// Where a marshaler finds the descriptor for a type code.
pub trait TypeSource: Send + Sync + fmt::Debug {
    /// Shared handle to the descriptor registered under `code`.
    fn lookup_shared(&self, code: TypeCode) -> Result<Arc<TypeDescriptor>, RegistryError>;

    fn contains(&self, code: TypeCode) -> bool {
        self.lookup_shared(code).is_ok()
    }
}

impl TypeSource for TypeRegistry {
    fn lookup_shared(&self, code: TypeCode) -> Result<Arc<TypeDescriptor>, RegistryError> {
        TypeRegistry::lookup_shared(self, code)
    }

    fn contains(&self, code: TypeCode) -> bool {
        TypeRegistry::contains(self, code)
    }
}

impl TypeSource for LiveRegistry {
    fn lookup_shared(&self, code: TypeCode) -> Result<Arc<TypeDescriptor>, RegistryError> {
        self.lookup(code)
    }

    fn contains(&self, code: TypeCode) -> bool {
        LiveRegistry::contains(self, code)
    }
}

/// A registry that stays open for registration while readers use it.
///
/// Lookups take a shared read lock and hand back an `Arc`, so the lock is
/// never held across a conversion.
#[derive(Debug, Default)]
pub struct LiveRegistry {
    inner: RwLock<TypeRegistry>,
}

impl LiveRegistry {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            inner: RwLock::new(registry),
        }
    }

    pub fn register(&self, descriptor: TypeDescriptor) -> Result<(), RegistryError> {
        self.inner.write().register(descriptor)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lookup(&self, code: TypeCode) -> Result<Arc<TypeDescriptor>, RegistryError> {
        self.inner.read().lookup_shared(code)
    }

    pub fn contains(&self, code: TypeCode) -> bool {
        self.inner.read().contains(code)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copy of the current contents, for handing to code that wants a plain
    /// registry.
    pub fn snapshot(&self) -> TypeRegistry {
        self.inner.read().clone()
    }
}
