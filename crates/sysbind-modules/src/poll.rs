//! `poll.h` records.

use sysbind_macros::NativeRecord;
use sysbind_registry::BindingModule;

/// `struct pollfd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, NativeRecord)]
#[repr(C)]
#[native(name = "pollfd")]
pub struct PollFd {
    pub fd: i32,
    pub events: i16,
    pub revents: i16,
}

/// Creates the `poll` module.
pub fn module() -> BindingModule {
    BindingModule::new("poll")
        .record::<PollFd>()
        .scalar_alias::<u64>("nfds_t")
}
