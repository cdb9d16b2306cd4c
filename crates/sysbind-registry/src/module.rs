//! BindingModule - the descriptors of one wrapped header, installed together.

use rustc_hash::FxHashSet;
use sysbind_core::{NativeRecord, NativeScalar, RegistryError};

use crate::descriptor::TypeDescriptor;
use crate::registry::TypeRegistry;

/// A named group of descriptors, typically one per wrapped C header.
///
/// Builder methods never fail; descriptor errors are kept and reported by
/// [`install_into`](Self::install_into).
///
/// # Example
///
/// ```
/// use sysbind_registry::{BindingModule, TypeRegistry};
///
/// let module = BindingModule::new("unistd")
///     .scalar_alias::<u32>("uid_t")
///     .scalar_alias::<i32>("pid_t");
///
/// let mut registry = TypeRegistry::new();
/// assert_eq!(module.install_into(&mut registry).unwrap(), 2);
/// assert!(registry.lookup_name("uid_t").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct BindingModule {
    header: String,
    descriptors: Vec<TypeDescriptor>,
    errors: Vec<RegistryError>,
}

impl BindingModule {
    /// Create an empty module for `header`, e.g. `"sys/time"`.
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            descriptors: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Add a record type with the default codec.
    pub fn record<T: NativeRecord>(self) -> Self {
        self.try_descriptor(TypeDescriptor::record::<T>())
    }

    /// Add a named alias of an integer type.
    pub fn scalar_alias<T: NativeScalar>(self, name: &str) -> Self {
        self.try_descriptor(TypeDescriptor::scalar_alias::<T>(name))
    }

    /// Add a prebuilt descriptor.
    pub fn descriptor(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Add the result of a descriptor build, keeping the error for install.
    pub fn try_descriptor(mut self, descriptor: Result<TypeDescriptor, RegistryError>) -> Self {
        match descriptor {
            Ok(descriptor) => self.descriptors.push(descriptor),
            Err(err) => self.errors.push(err),
        }
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn descriptors(&self) -> &[TypeDescriptor] {
        &self.descriptors
    }

    /// Number of descriptors in the module.
    pub fn item_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.errors.is_empty()
    }

    /// Register every descriptor, or none of them.
    ///
    /// Fails on the first build error, or on a code or name that collides
    /// with the registry or with another descriptor in this module. On
    /// failure the registry is unchanged.
    pub fn install_into(&self, registry: &mut TypeRegistry) -> Result<usize, RegistryError> {
        if let Some(err) = self.errors.first() {
            return Err(err.clone());
        }

        let mut codes = FxHashSet::default();
        let mut names = FxHashSet::default();
        for descriptor in &self.descriptors {
            registry.check(descriptor)?;
            if !codes.insert(descriptor.code()) {
                return Err(RegistryError::DuplicateId {
                    code: descriptor.code(),
                    name: descriptor.name().to_string(),
                });
            }
            if !names.insert(descriptor.name()) {
                return Err(RegistryError::DuplicateName {
                    name: descriptor.name().to_string(),
                });
            }
        }

        for descriptor in &self.descriptors {
            registry.register(descriptor.clone())?;
        }
        log::debug!(
            "installed module '{}' ({} types)",
            self.header,
            self.descriptors.len()
        );
        Ok(self.descriptors.len())
    }
}
