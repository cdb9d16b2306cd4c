//! Marshaling context: type registration, then sealing.
//!
//! A `Context` collects the descriptors of every installed binding module.
//! Once sealed, the registry is frozen into an `Arc` and shared by every
//! marshaler and worker created from it.
//!
//! # Example
//!
//! ```
//! use sysbind::Context;
//! use sysbind_core::{HostSequence, HostValue, scalars};
//!
//! let mut ctx = Context::with_default_modules().unwrap();
//! ctx.seal().unwrap();
//!
//! let mut marshaler = ctx.create_marshaler().unwrap();
//! let input = HostValue::from(HostSequence::from_iter([1, 2, 3]));
//! let array = marshaler.sequence_to_array(scalars::INT32, &input, None).unwrap();
//! assert_eq!(array.len(), 3);
//! ```

use std::sync::Arc;
use thiserror::Error;

use sysbind_core::RegistryError;
use sysbind_modules::default_modules;
use sysbind_registry::{BindingModule, TypeDescriptor, TypeRegistry};

use crate::config::MarshalConfig;
use crate::dispatch::WorkerPool;
use crate::marshaler::Marshaler;

/// Owner of the type registry during initialization.
///
/// Types are registered with [`install`](Self::install) and
/// [`register_type`](Self::register_type); [`seal`](Self::seal) freezes the
/// registry, after which marshalers and worker pools can be created.
#[derive(Debug)]
pub struct Context {
    config: MarshalConfig,
    /// Headers of installed modules, in install order.
    modules: Vec<String>,
    /// Registry under construction (consumed on seal)
    builder: Option<TypeRegistry>,
    /// Frozen registry (available after seal)
    registry: Option<Arc<TypeRegistry>>,
}

impl Context {
    /// Create a context with the fixed-width integer types registered.
    pub fn new() -> Self {
        Self::with_config(MarshalConfig::new())
    }

    /// Create a context whose marshalers use `config`.
    pub fn with_config(config: MarshalConfig) -> Self {
        Self {
            config,
            modules: Vec::new(),
            builder: Some(TypeRegistry::with_scalars()),
            registry: None,
        }
    }

    /// Create a context with every module of `sysbind-modules` installed.
    ///
    /// The context is NOT sealed - call `seal()` when done adding types.
    pub fn with_default_modules() -> Result<Self, ContextError> {
        let mut ctx = Self::new();
        for module in default_modules() {
            ctx.install(module)?;
        }
        Ok(ctx)
    }

    /// Install every descriptor of `module`.
    ///
    /// Installation is all-or-nothing: on a conflict no descriptor of the
    /// module is registered.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::AlreadySealed` after `seal()`, or the
    /// registry error of the first conflicting descriptor.
    pub fn install(&mut self, module: BindingModule) -> Result<(), ContextError> {
        let builder = self.builder_mut()?;
        module.install_into(builder)?;
        self.modules.push(module.header().to_string());
        Ok(())
    }

    /// Register a single descriptor.
    pub fn register_type(&mut self, descriptor: TypeDescriptor) -> Result<(), ContextError> {
        self.builder_mut()?.register(descriptor)?;
        Ok(())
    }

    fn builder_mut(&mut self) -> Result<&mut TypeRegistry, ContextError> {
        if self.registry.is_some() {
            return Err(ContextError::AlreadySealed);
        }
        self.builder.as_mut().ok_or(ContextError::AlreadySealed)
    }

    /// Freeze the registry.
    ///
    /// Calling `seal()` multiple times is safe - subsequent calls return
    /// the same registry.
    pub fn seal(&mut self) -> Result<Arc<TypeRegistry>, ContextError> {
        if let Some(registry) = &self.registry {
            return Ok(Arc::clone(registry));
        }
        let registry = Arc::new(self.builder.take().unwrap_or_default());
        log::debug!(
            "sealed context: {} types from {} modules",
            registry.len(),
            self.modules.len()
        );
        self.registry = Some(Arc::clone(&registry));
        Ok(registry)
    }

    pub fn is_sealed(&self) -> bool {
        self.registry.is_some()
    }

    /// The frozen registry (available after sealing).
    pub fn registry(&self) -> Option<&Arc<TypeRegistry>> {
        self.registry.as_ref()
    }

    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// Headers of the installed modules.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Create a marshaler with its own value heap.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::NotSealed` if the context has not been sealed.
    pub fn create_marshaler(&self) -> Result<Marshaler, ContextError> {
        let registry = self.registry.as_ref().ok_or(ContextError::NotSealed)?;
        Ok(Marshaler::new(registry.clone(), self.config.clone()))
    }

    /// Start `workers` threads, each with its own marshaler.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::NotSealed` if the context has not been sealed.
    pub fn create_pool(&self, workers: usize) -> Result<WorkerPool, ContextError> {
        let registry = self.registry.as_ref().ok_or(ContextError::NotSealed)?;
        Ok(WorkerPool::new(registry.clone(), self.config.clone(), workers))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during context operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Context is already sealed - cannot register types
    #[error("context is already sealed - cannot register types after seal()")]
    AlreadySealed,

    /// Context is not sealed - must call seal() first
    #[error("context is not sealed - call seal() before creating marshalers")]
    NotSealed,

    /// Registration failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
