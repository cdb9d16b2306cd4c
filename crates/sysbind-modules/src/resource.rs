//! `sys/resource.h` records.

use sysbind_macros::NativeRecord;
use sysbind_registry::BindingModule;

/// `rlim_t` value meaning "no limit".
pub const RLIM_INFINITY: u64 = u64::MAX;

/// `struct rlimit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, NativeRecord)]
#[repr(C)]
#[native(name = "rlimit")]
pub struct Rlimit {
    pub rlim_cur: u64,
    pub rlim_max: u64,
}

impl Rlimit {
    pub fn is_unlimited(&self) -> bool {
        self.rlim_max == RLIM_INFINITY
    }
}

/// Creates the `sys/resource` module.
pub fn module() -> BindingModule {
    BindingModule::new("sys/resource")
        .record::<Rlimit>()
        .scalar_alias::<u64>("rlim_t")
}
