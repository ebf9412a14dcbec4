//! The transfer engine and its building blocks.

pub mod control;
pub mod device;
pub mod engine;
pub mod hashing;
pub mod item;
pub mod manifest;
pub mod metrics;
pub mod outcome;
pub mod planner;
pub mod progress;
pub mod rollback;
pub mod verify;

pub use control::TransferControl;
pub use device::{DeviceDetector, OsDeviceDetector, StaticTopology, same_device};
pub use engine::{BehaviorResolver, FailurePolicy, TransferEngine, TransferOptions, transfer};
pub use hashing::{ContentHash, DestinationHasher, DiskHasher, HashAlgorithm};
pub use item::{ItemKind, MoveBehavior, TransferItem, TransferOperation};
pub use manifest::HashManifest;
pub use metrics::{OperationMode, TransferMetrics};
pub use outcome::{OutcomeMap, RunStatus, TransferOutcome, TransferResult};
pub use planner::{ExplodedItem, TransferPlan, plan};
pub use progress::{ChannelProgress, NullProgress, ProgressEvent, ProgressSink};
pub use rollback::{RollbackReport, RollbackFailure};
