//! Engine configuration shared by every marshaler a context creates.

use sysbind_core::{NarrowingMode, SharedAllocator, SystemAllocator};

/// Settings applied to conversions and value storage.
///
/// # Example
///
/// ```
/// use sysbind::MarshalConfig;
/// use sysbind_core::NarrowingMode;
///
/// let config = MarshalConfig::new()
///     .with_narrowing(NarrowingMode::Checked)
///     .with_max_elements(4096);
/// assert_eq!(config.narrowing(), NarrowingMode::Checked);
/// assert_eq!(config.max_elements(), Some(4096));
/// ```
#[derive(Debug, Clone)]
pub struct MarshalConfig {
    narrowing: NarrowingMode,
    max_elements: Option<usize>,
    allocator: SharedAllocator,
}

impl MarshalConfig {
    /// Masking narrowing, no element cap, system allocator.
    pub fn new() -> Self {
        Self {
            narrowing: NarrowingMode::Mask,
            max_elements: None,
            allocator: SystemAllocator::shared(),
        }
    }

    /// How host integers are narrowed into smaller native fields.
    pub fn with_narrowing(mut self, mode: NarrowingMode) -> Self {
        self.narrowing = mode;
        self
    }

    /// Reject sequences longer than `limit` before allocating anything.
    pub fn with_max_elements(mut self, limit: usize) -> Self {
        self.max_elements = Some(limit);
        self
    }

    /// Allocator for native arrays and opaque value payloads.
    pub fn with_allocator(mut self, allocator: SharedAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn narrowing(&self) -> NarrowingMode {
        self.narrowing
    }

    pub fn max_elements(&self) -> Option<usize> {
        self.max_elements
    }

    pub fn allocator(&self) -> &SharedAllocator {
        &self.allocator
    }
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self::new()
    }
}
