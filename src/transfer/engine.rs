//! Transfer orchestration.
//!
//! A run goes: create the destination root, resolve the move behavior, plan,
//! check free space, rename intact directories, verify what they contained,
//! transfer exploded files one by one, then cross-check the file count. Every
//! mutation lands in the rollback ledger first; a fatal error or cancellation
//! unwinds it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::errors::TransferError;
use crate::fs_ops::helpers::classify_io;
use crate::fs_ops::io_copy::{CopyProgress, copy_with_hash};
use crate::fs_ops::long_path::LongPathPolicy;
use crate::fs_ops::native_move::{NativeMover, PlatformMover, move_native};
use crate::fs_ops::space::{ensure_space_for_copy, format_bytes};
use crate::transfer::control::TransferControl;
use crate::transfer::device::{DeviceDetector, OsDeviceDetector};
use crate::transfer::hashing::{DestinationHasher, DiskHasher, HashAlgorithm};
use crate::transfer::item::{MoveBehavior, TransferItem, TransferOperation};
use crate::transfer::metrics::{OperationMode, TransferMetrics, format_eta, mib_per_sec};
use crate::transfer::outcome::{OutcomeMap, TransferOutcome, TransferResult, insert_unique};
use crate::transfer::planner::{self, ExplodedItem, TransferPlan};
use crate::transfer::progress::{
    DEFAULT_PROGRESS_INTERVAL, NullProgress, ProgressReporter, ProgressSink, percent_of,
};
use crate::transfer::rollback::{RollbackCoordinator, RollbackReport};
use crate::transfer::verify::{enumerate_files, validate_file_count, verify_moved_tree};

/// Decides `AskCaller` for the items that could be moved natively.
/// Returning `AskCaller` again counts as `AlwaysCopy`.
pub trait BehaviorResolver: Send {
    fn resolve(&self, same_device_items: &[TransferItem]) -> MoveBehavior;
}

impl<F> BehaviorResolver for F
where
    F: Fn(&[TransferItem]) -> MoveBehavior + Send,
{
    fn resolve(&self, same_device_items: &[TransferItem]) -> MoveBehavior {
        self(same_device_items)
    }
}

/// What happens to completed work when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    RollbackAll,
    PreserveCompleted,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::RollbackAll => f.write_str("rollback_all"),
            FailurePolicy::PreserveCompleted => f.write_str("preserve_completed"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rollback_all" | "rollback" => Ok(Self::RollbackAll),
            "preserve_completed" | "preserve" => Ok(Self::PreserveCompleted),
            other => Err(format!(
                "invalid failure policy '{other}' (expected rollback_all or preserve_completed)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub behavior: MoveBehavior,
    /// `None` disables hashing; outcomes are then never `verified`.
    pub hash_algorithm: Option<HashAlgorithm>,
    pub long_paths: LongPathPolicy,
    pub failure_policy: FailurePolicy,
    pub preserve_timestamps: bool,
    pub check_free_space: bool,
    pub progress_interval: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            behavior: MoveBehavior::default(),
            hash_algorithm: Some(HashAlgorithm::default()),
            long_paths: LongPathPolicy::default(),
            failure_policy: FailurePolicy::default(),
            preserve_timestamps: true,
            check_free_space: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

pub struct TransferEngine {
    options: TransferOptions,
    detector: Box<dyn DeviceDetector>,
    mover: Box<dyn NativeMover>,
    hasher: Box<dyn DestinationHasher>,
    progress: Box<dyn ProgressSink>,
    resolver: Option<Box<dyn BehaviorResolver>>,
    control: TransferControl,
}

impl TransferEngine {
    pub fn new(options: TransferOptions) -> Self {
        Self {
            options,
            detector: Box::new(OsDeviceDetector),
            mover: Box::new(PlatformMover),
            hasher: Box::new(DiskHasher),
            progress: Box::new(NullProgress),
            resolver: None,
            control: TransferControl::new(),
        }
    }

    pub fn with_detector(mut self, detector: impl DeviceDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_mover(mut self, mover: impl NativeMover + 'static) -> Self {
        self.mover = Box::new(mover);
        self
    }

    /// Replace how destinations are read back for verification.
    pub fn with_hasher(mut self, hasher: impl DestinationHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_resolver(mut self, resolver: impl BehaviorResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_control(mut self, control: TransferControl) -> Self {
        self.control = control;
        self
    }

    /// Handle for pausing or cancelling this engine from another thread.
    pub fn control(&self) -> TransferControl {
        self.control.clone()
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Transfer `items` under `destination_root`. Never panics on I/O failure;
    /// every outcome is in the returned result.
    pub fn run(&self, items: &[TransferItem], destination_root: &Path) -> TransferResult {
        let mut st = RunState {
            outcomes: OutcomeMap::new(),
            rollback: RollbackCoordinator::new(),
            metrics: TransferMetrics::start(),
            reporter: ProgressReporter::new(
                self.progress.as_ref(),
                self.options.progress_interval,
            ),
            work: WorkModel::default(),
        };
        st.reporter.milestone(0, "Preparing transfer");
        info!(
            items = items.len(),
            dest = %destination_root.display(),
            behavior = %self.options.behavior,
            hash = ?self.options.hash_algorithm,
            "transfer started"
        );

        let outcome = self.execute(items, destination_root, &mut st);
        st.metrics.finish();

        match outcome {
            Ok(()) => {
                st.rollback.commit();
                let m = &st.metrics;
                info!(
                    files = m.files_processed,
                    bytes = m.bytes_processed,
                    mode = %m.operation_mode,
                    elapsed_ms = m.elapsed().as_millis() as u64,
                    avg_mbps = m.average_speed_mbps(),
                    "transfer complete"
                );
                st.reporter.milestone(
                    100,
                    &format!(
                        "Transferred {} files ({})",
                        m.files_processed,
                        format_bytes(m.bytes_processed)
                    ),
                );
                TransferResult::Success {
                    outcomes: st.outcomes,
                    metrics: st.metrics,
                }
            }
            Err(TransferError::Cancelled) => {
                warn!(completed = st.outcomes.len(), "transfer cancelled; rolling back");
                let rollback = st
                    .rollback
                    .rollback_all(self.mover.as_ref(), &self.options.long_paths);
                st.reporter.milestone(100, "Transfer cancelled; changes rolled back");
                TransferResult::Cancelled {
                    partial_outcomes: st.outcomes,
                    rollback,
                    metrics: st.metrics,
                }
            }
            Err(err) => {
                error!(
                    code = %err.kind(),
                    error = %err,
                    completed = st.outcomes.len(),
                    "transfer failed"
                );
                let rollback = match self.options.failure_policy {
                    FailurePolicy::RollbackAll => {
                        st.rollback.rollback_all(self.mover.as_ref(), &self.options.long_paths)
                    }
                    FailurePolicy::PreserveCompleted => {
                        info!(entries = st.rollback.len(), "preserving completed work");
                        st.rollback.commit();
                        RollbackReport::preserved()
                    }
                };
                st.reporter.milestone(100, &format!("Transfer failed: {err}"));
                TransferResult::Failure {
                    error: err,
                    partial_outcomes: st.outcomes,
                    rollback,
                    metrics: st.metrics,
                }
            }
        }
    }

    fn execute(
        &self,
        items: &[TransferItem],
        destination_root: &Path,
        st: &mut RunState<'_>,
    ) -> Result<(), TransferError> {
        self.control.checkpoint()?;
        let root = prepare_root(destination_root, &mut st.rollback)?;
        let behavior = self.resolve_behavior(items, &root);
        let plan = planner::plan(items, &root, behavior, self.detector.as_ref())?;

        st.metrics.operation_mode =
            OperationMode::from_counts(plan.move_count(), plan.copy_count());
        st.metrics.total_files = plan.exploded_items.len();
        st.metrics.total_copy_bytes = plan.copy_bytes();
        st.work = WorkModel::for_plan(&plan);

        if self.options.check_free_space {
            ensure_space_for_copy(&root, plan.copy_bytes())?;
        }

        self.move_intact(&plan, &root, st)?;
        let moved_files = self.verify_intact(&plan, &root, st)?;
        self.transfer_exploded(&plan, &root, st)?;

        let mut on_disk = 0;
        for item in &plan.intact_moves {
            on_disk += enumerate_files(&root.join(item.relative_destination_path()))?.len();
        }
        if on_disk != moved_files {
            warn!(on_disk, moved_files, "moved tree changed during verification");
        }
        validate_file_count(plan.exploded_items.len() + on_disk, st.outcomes.len())
    }

    fn resolve_behavior(&self, items: &[TransferItem], root: &Path) -> MoveBehavior {
        if self.options.behavior != MoveBehavior::AskCaller {
            return self.options.behavior;
        }
        let candidates: Vec<TransferItem> = items
            .iter()
            .filter(|i| self.detector.same_device(i.source_path(), root))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return MoveBehavior::AlwaysCopy;
        }
        let chosen = match &self.resolver {
            Some(r) => r.resolve(&candidates),
            None => {
                warn!("no behavior resolver configured; copying same-device items");
                MoveBehavior::AlwaysCopy
            }
        };
        let chosen = match chosen {
            MoveBehavior::AskCaller => MoveBehavior::AlwaysCopy,
            b => b,
        };
        info!(candidates = candidates.len(), behavior = %chosen, "caller chose behavior");
        chosen
    }

    fn move_intact(
        &self,
        plan: &TransferPlan,
        root: &Path,
        st: &mut RunState<'_>,
    ) -> Result<(), TransferError> {
        let total = plan.intact_moves.len();
        for (i, item) in plan.intact_moves.iter().enumerate() {
            self.control.checkpoint()?;
            let dest = root.join(item.relative_destination_path());
            if let Some(parent) = dest.parent() {
                ensure_dir(parent, &mut st.rollback)?;
            }
            let stage = move_native(
                self.mover.as_ref(),
                item.source_path(),
                &dest,
                &self.options.long_paths,
            )?;
            st.rollback.record_move(item.source_path(), &dest);
            ensure_source_gone(item.source_path())?;
            info!(
                src = %item.source_path().display(),
                dest = %dest.display(),
                ?stage,
                "folder moved"
            );

            st.work.moves_done += 1;
            st.reporter.update(
                st.work.percent(),
                &format!(
                    "Moved folder {} ({}/{})",
                    item.relative_destination_path().display(),
                    i + 1,
                    total
                ),
            );
        }
        Ok(())
    }

    /// Emit per-file outcomes for the intact moves. Returns the file count.
    fn verify_intact(
        &self,
        plan: &TransferPlan,
        root: &Path,
        st: &mut RunState<'_>,
    ) -> Result<usize, TransferError> {
        if plan.intact_moves.is_empty() {
            return Ok(0);
        }
        let mut trees = Vec::with_capacity(plan.intact_moves.len());
        for item in &plan.intact_moves {
            let dest = root.join(item.relative_destination_path());
            trees.push((item, enumerate_files(&dest)?));
        }
        let total: usize = trees.iter().map(|(_, files)| files.len()).sum();
        st.reporter.milestone(st.work.percent(), &format!("Verifying {total} files"));

        for (item, files) in &trees {
            let control = &self.control;
            let outcomes = verify_moved_tree(
                files,
                item.source_path(),
                item.relative_destination_path(),
                self.options.hash_algorithm,
                self.hasher.as_ref(),
                |_| control.checkpoint(),
                |_| control.checkpoint(),
            )?;
            for outcome in outcomes {
                st.metrics.record(TransferOperation::Move, outcome.byte_size);
                self.record_outcome(st, outcome)?;
            }
        }
        Ok(total)
    }

    fn transfer_exploded(
        &self,
        plan: &TransferPlan,
        root: &Path,
        st: &mut RunState<'_>,
    ) -> Result<(), TransferError> {
        for item in &plan.exploded_items {
            self.control.checkpoint()?;
            let dest = root.join(&item.relative_path);
            if let Some(parent) = dest.parent() {
                ensure_dir(parent, &mut st.rollback)?;
            }
            let outcome = match item.operation {
                TransferOperation::Move => self.move_file(item, &dest, st)?,
                TransferOperation::Copy => self.copy_file(item, &dest, st)?,
            };
            self.record_outcome(st, outcome)?;
        }
        Ok(())
    }

    fn move_file(
        &self,
        item: &ExplodedItem,
        dest: &Path,
        st: &mut RunState<'_>,
    ) -> Result<TransferOutcome, TransferError> {
        move_native(self.mover.as_ref(), &item.source, dest, &self.options.long_paths)?;
        st.rollback.record_move(&item.source, dest);
        ensure_source_gone(&item.source)?;

        let content_hash = match self.options.hash_algorithm {
            Some(alg) => Some(self.hasher.hash_destination(dest, alg, &mut |_| {
                self.control.checkpoint()
            })?),
            None => None,
        };
        st.metrics.record(TransferOperation::Move, item.size);
        st.work.moves_done += 1;
        st.reporter.update(
            st.work.percent(),
            &format!("Moved {}", item.relative_path.display()),
        );
        Ok(TransferOutcome {
            relative_path: item.relative_path.clone(),
            source_path: item.source.clone(),
            destination_path: dest.to_path_buf(),
            byte_size: item.size,
            operation: TransferOperation::Move,
            verified: content_hash.is_some(),
            content_hash,
            source_hash: None,
            error: None,
        })
    }

    fn copy_file(
        &self,
        item: &ExplodedItem,
        dest: &Path,
        st: &mut RunState<'_>,
    ) -> Result<TransferOutcome, TransferError> {
        let name = item.relative_path.display().to_string();
        let interval = self.options.progress_interval.max(Duration::from_millis(1));
        let control = &self.control;
        let reporter = &mut st.reporter;
        let work = &mut st.work;
        let metrics = &mut st.metrics;
        let started = Instant::now();
        let mut file_bytes: u64 = 0;
        let mut window_start = started;
        let mut window_bytes: u64 = 0;

        let res = copy_with_hash(
            &item.source,
            dest,
            self.options.hash_algorithm,
            self.hasher.as_ref(),
            self.options.preserve_timestamps,
            |p| {
                if let CopyProgress::Written(n) = p {
                    let n = n as u64;
                    work.bytes_done += n;
                    file_bytes += n;
                    window_bytes += n;
                    metrics.add_copied(n);
                    let elapsed = window_start.elapsed();
                    if elapsed >= interval {
                        metrics.add_speed_sample(mib_per_sec(window_bytes, elapsed));
                        window_start = Instant::now();
                        window_bytes = 0;
                    }
                    let percent = work.percent();
                    if reporter.is_due(percent) {
                        let speed = mib_per_sec(file_bytes, started.elapsed());
                        let eta = metrics.eta().map_or_else(|| "--".to_string(), format_eta);
                        reporter.update(
                            percent,
                            &format!("Streaming {name} @ {speed:.1} MB/s, ETA {eta}"),
                        );
                    }
                }
                control.checkpoint()
            },
        )?;
        st.rollback.record_copy(&item.source, dest);
        st.metrics.record(TransferOperation::Copy, res.bytes);
        st.work.copies_done += 1;

        let mismatch = match (&res.source_hash, &res.dest_hash) {
            (Some(expected), Some(actual)) if expected != actual => {
                Some(TransferError::HashMismatch {
                    path: dest.to_path_buf(),
                    expected: expected.hex().to_string(),
                    actual: actual.hex().to_string(),
                })
            }
            _ => None,
        };
        if let Some(err) = &mismatch {
            warn!(error = %err, "copy failed verification; continuing with remaining files");
        }
        Ok(TransferOutcome {
            relative_path: item.relative_path.clone(),
            source_path: item.source.clone(),
            destination_path: dest.to_path_buf(),
            byte_size: res.bytes,
            operation: TransferOperation::Copy,
            verified: res.dest_hash.is_some() && mismatch.is_none(),
            content_hash: res.dest_hash,
            source_hash: res.source_hash,
            error: mismatch.as_ref().map(TransferError::kind),
        })
    }

    fn record_outcome(
        &self,
        st: &mut RunState<'_>,
        outcome: TransferOutcome,
    ) -> Result<(), TransferError> {
        let key = outcome.relative_path.clone();
        insert_unique(&mut st.outcomes, outcome)?;
        if let Some(o) = st.outcomes.get(&key) {
            st.reporter.file_completed(o);
        }
        Ok(())
    }
}

/// One-shot convenience over `TransferEngine`.
pub fn transfer(
    items: &[TransferItem],
    destination_root: &Path,
    options: TransferOptions,
    progress: impl ProgressSink + 'static,
) -> TransferResult {
    TransferEngine::new(options)
        .with_progress(progress)
        .run(items, destination_root)
}

struct RunState<'a> {
    outcomes: OutcomeMap,
    rollback: RollbackCoordinator,
    metrics: TransferMetrics,
    reporter: ProgressReporter<'a>,
    work: WorkModel,
}

/// Overall progress: moves count per planned unit, copies by bytes (or by
/// file when every copy is empty), weighted by their share of planned units.
#[derive(Debug, Default, Clone, Copy)]
struct WorkModel {
    move_units: u64,
    copy_units: u64,
    copy_bytes: u64,
    moves_done: u64,
    copies_done: u64,
    bytes_done: u64,
}

impl WorkModel {
    fn for_plan(plan: &TransferPlan) -> Self {
        Self {
            move_units: plan.move_count() as u64,
            copy_units: plan.copy_count() as u64,
            copy_bytes: plan.copy_bytes(),
            ..Self::default()
        }
    }

    fn percent(&self) -> u8 {
        let units = self.move_units + self.copy_units;
        if units == 0 {
            return 0;
        }
        let move_share = self.move_units as f64 / units as f64;
        let move_frac = percent_of(self.moves_done, self.move_units) as f64 / 100.0;
        let copy_frac = if self.copy_bytes > 0 {
            percent_of(self.bytes_done, self.copy_bytes) as f64 / 100.0
        } else {
            percent_of(self.copies_done, self.copy_units) as f64 / 100.0
        };
        let blended = if self.move_units == 0 {
            copy_frac
        } else if self.copy_units == 0 {
            move_frac
        } else {
            move_share * move_frac + (1.0 - move_share) * copy_frac
        };
        (blended * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

/// Create the root (and missing ancestors), recording what we created. Returns
/// the canonical root.
fn prepare_root(
    root: &Path,
    rollback: &mut RollbackCoordinator,
) -> Result<PathBuf, TransferError> {
    let absolute = std::path::absolute(root)
        .map_err(|e| classify_io("resolve destination root", root, e))?;
    ensure_dir(&absolute, rollback)?;
    dunce::canonicalize(&absolute)
        .map_err(|e| classify_io("canonicalize destination root", &absolute, e))
}

fn ensure_dir(dir: &Path, rollback: &mut RollbackCoordinator) -> Result<(), TransferError> {
    let mut missing = Vec::new();
    let mut cur = Some(dir);
    while let Some(p) = cur {
        if p.as_os_str().is_empty() || fs::symlink_metadata(p).is_ok() {
            break;
        }
        missing.push(p);
        cur = p.parent();
    }
    for p in missing.into_iter().rev() {
        match fs::create_dir(p) {
            Ok(()) => rollback.record_created_dir(p),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(classify_io("create directory", p, e)),
        }
    }
    Ok(())
}

fn ensure_source_gone(src: &Path) -> Result<(), TransferError> {
    match fs::symlink_metadata(src) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        _ => Err(TransferError::MoveInvariantViolated(src.to_path_buf())),
    }
}
