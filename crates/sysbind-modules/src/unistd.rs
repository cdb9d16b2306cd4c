//! `unistd.h` integer aliases.

use sysbind_registry::BindingModule;

/// Creates the `unistd` module.
pub fn module() -> BindingModule {
    BindingModule::new("unistd")
        .scalar_alias::<u32>("gid_t")
        .scalar_alias::<u32>("uid_t")
        .scalar_alias::<i32>("pid_t")
}
