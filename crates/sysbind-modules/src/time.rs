//! `sys/time.h` records.

use sysbind_macros::NativeRecord;
use sysbind_registry::BindingModule;

/// `struct timespec`: seconds and nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, NativeRecord)]
#[repr(C)]
#[native(name = "timespec")]
pub struct Timespec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

/// `struct timeval`: seconds and microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, NativeRecord)]
#[repr(C)]
#[native(name = "timeval")]
pub struct Timeval {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

impl From<Timeval> for Timespec {
    fn from(tv: Timeval) -> Self {
        Self {
            tv_sec: tv.tv_sec,
            tv_nsec: tv.tv_usec * 1_000,
        }
    }
}

/// Creates the `sys/time` module.
pub fn module() -> BindingModule {
    BindingModule::new("sys/time")
        .record::<Timespec>()
        .record::<Timeval>()
        .scalar_alias::<i64>("time_t")
}
