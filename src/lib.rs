//! Core library for `forensic_transfer`.
//!
//! Moves or copies caller-supplied files and directories into a destination
//! root. Same-device items are renamed natively when allowed, everything else
//! is copied with an inline content hash. Every destination file gets a
//! [`TransferOutcome`], and a failed or cancelled run is rolled back.
//!
//! ```no_run
//! use forensic_transfer::{TransferItem, TransferOptions, NullProgress, transfer};
//!
//! let items = [TransferItem::directory("/evidence/case_17", "case_17")];
//! let result = transfer(&items, "/archive".as_ref(), TransferOptions::default(), NullProgress);
//! println!("{}", result.status());
//! ```

pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod transfer;

pub use config::{
    LogLevel, TransferConfig, default_config_path, default_log_path, path_has_symlink_ancestor,
};
pub use errors::{ErrorKind, TransferError};
pub use transfer::{
    BehaviorResolver, ChannelProgress, ContentHash, DestinationHasher, DiskHasher, FailurePolicy,
    HashAlgorithm, HashManifest, ItemKind, MoveBehavior, NullProgress, ProgressEvent,
    ProgressSink, RunStatus, TransferControl, TransferEngine, TransferItem, TransferMetrics,
    TransferOperation, TransferOptions, TransferOutcome, TransferResult, transfer,
};
