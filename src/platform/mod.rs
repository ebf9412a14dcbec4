//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{
    NOMINAL_PATH_LIMIT, SUPPORTS_EXTENDED_PREFIX, device_id, free_space_bytes, fsync_dir,
    open_log_file_secure_append, rename_permissive, rename_strict, set_dir_mode_0700,
    should_escalate, write_config_secure_new_0600,
};

#[cfg(windows)]
pub use windows::{
    NOMINAL_PATH_LIMIT, SUPPORTS_EXTENDED_PREFIX, device_id, free_space_bytes, fsync_dir,
    open_log_file_secure_append, rename_permissive, rename_strict, set_dir_mode_0700,
    should_escalate, write_config_secure_new_0600,
};
