//! Binding modules for common BSD/POSIX record types.
//!
//! Each module describes the native types of one C header:
//!
//! - **time** - `sys/time.h`: `timespec`, `timeval`, `time_t`
//! - **poll** - `poll.h`: `pollfd`, `nfds_t`
//! - **resource** - `sys/resource.h`: `rlimit`, `rlim_t`
//! - **unistd** - `unistd.h`: `gid_t`, `uid_t`, `pid_t`
//! - **inet** - `netinet/in.h`: `in_addr`, written as a dotted-quad string
//!
//! # Usage
//!
//! ```
//! use sysbind_modules::{poll, time};
//! use sysbind_registry::TypeRegistry;
//!
//! let mut registry = TypeRegistry::new();
//! time::module().install_into(&mut registry).unwrap();
//! poll::module().install_into(&mut registry).unwrap();
//! assert!(registry.lookup_name("pollfd").is_ok());
//! ```

pub mod inet;
pub mod poll;
pub mod resource;
pub mod time;
pub mod unistd;

pub use inet::InAddr;
pub use poll::PollFd;
pub use resource::Rlimit;
pub use time::{Timespec, Timeval};

use sysbind_registry::BindingModule;

/// Every module in this crate.
pub fn default_modules() -> Vec<BindingModule> {
    vec![
        time::module(),
        poll::module(),
        resource::module(),
        unistd::module(),
        inet::module(),
    ]
}
