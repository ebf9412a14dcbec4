//! Filesystem operations: copy, native move, long paths, free space.

pub(crate) mod helpers;
pub mod io_copy;
pub mod long_path;
pub(crate) mod meta;
pub mod native_move;
pub mod space;
pub(crate) mod util;

pub use helpers::io_error_with_help_anyhow;
pub use io_copy::{CopyResult, buffer_size_for, copy_with_hash};
pub use long_path::{LongPathPolicy, PreparedPaths, to_extended};
pub use native_move::{MoveStage, NativeMover, PlatformMover, move_native};
pub use space::format_bytes;
