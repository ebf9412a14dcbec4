//! Run metrics: counts, bytes, timing and throughput.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

use crate::fs_ops::io_copy::MIB;
use crate::transfer::item::TransferOperation;

const MAX_SPEED_SAMPLES: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Move,
    Copy,
    Mixed,
    Empty,
}

impl OperationMode {
    pub fn from_counts(moves: usize, copies: usize) -> Self {
        match (moves, copies) {
            (0, 0) => OperationMode::Empty,
            (_, 0) => OperationMode::Move,
            (0, _) => OperationMode::Copy,
            _ => OperationMode::Mixed,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationMode::Move => "move",
            OperationMode::Copy => "copy",
            OperationMode::Mixed => "mixed",
            OperationMode::Empty => "empty",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SpeedSample {
    pub elapsed_secs: f64,
    pub mb_per_sec: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferMetrics {
    pub files_processed: usize,
    /// Bytes written by copies plus reported sizes of moved files.
    pub bytes_processed: u64,
    pub bytes_copied: u64,
    pub bytes_moved: u64,
    pub total_files: usize,
    /// Bytes the copy phase expects to write.
    pub total_copy_bytes: u64,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
    pub operation_mode: OperationMode,
    pub peak_speed_mbps: f64,
    /// Under 1 MiB.
    pub small_files: usize,
    /// 1 MiB up to 100 MiB.
    pub medium_files: usize,
    pub large_files: usize,
    pub speed_samples: Vec<SpeedSample>,
    #[serde(skip)]
    started: Instant,
    #[serde(skip)]
    elapsed: Option<Duration>,
}

impl Default for TransferMetrics {
    fn default() -> Self {
        Self::start()
    }
}

impl TransferMetrics {
    pub fn start() -> Self {
        Self {
            files_processed: 0,
            bytes_processed: 0,
            bytes_copied: 0,
            bytes_moved: 0,
            total_files: 0,
            total_copy_bytes: 0,
            start_time: Local::now(),
            end_time: None,
            operation_mode: OperationMode::Empty,
            peak_speed_mbps: 0.0,
            small_files: 0,
            medium_files: 0,
            large_files: 0,
            speed_samples: Vec::new(),
            started: Instant::now(),
            elapsed: None,
        }
    }

    /// Tally bytes as a copy writes them, so throughput and ETA are live.
    pub(crate) fn add_copied(&mut self, bytes: u64) {
        self.bytes_copied += bytes;
        self.bytes_processed += bytes;
    }

    /// Count a finished file. Copied bytes were already added chunk by chunk.
    pub(crate) fn record(&mut self, operation: TransferOperation, bytes: u64) {
        self.files_processed += 1;
        if operation == TransferOperation::Move {
            self.bytes_moved += bytes;
            self.bytes_processed += bytes;
        }
        if bytes < MIB {
            self.small_files += 1;
        } else if bytes < 100 * MIB {
            self.medium_files += 1;
        } else {
            self.large_files += 1;
        }
    }

    pub(crate) fn add_speed_sample(&mut self, mb_per_sec: f64) {
        if mb_per_sec > self.peak_speed_mbps {
            self.peak_speed_mbps = mb_per_sec;
        }
        if self.speed_samples.len() < MAX_SPEED_SAMPLES {
            self.speed_samples.push(SpeedSample {
                elapsed_secs: self.started.elapsed().as_secs_f64(),
                mb_per_sec,
            });
        }
    }

    pub(crate) fn finish(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
            self.end_time = Some(Local::now());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    /// Average over the whole run, in MiB/s.
    pub fn average_speed_mbps(&self) -> f64 {
        mib_per_sec(self.bytes_processed, self.elapsed())
    }

    /// Remaining copy time at the average copy rate so far.
    pub fn eta(&self) -> Option<Duration> {
        let secs = self.elapsed().as_secs_f64();
        if self.bytes_copied == 0 || secs <= 0.0 {
            return None;
        }
        let rate = self.bytes_copied as f64 / secs;
        let remaining = self.total_copy_bytes.saturating_sub(self.bytes_copied) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    }
}

/// MiB/s for `bytes` over `elapsed`; zero before any time has passed.
pub fn mib_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / MIB as f64 / secs
}

/// Compact `1h02m`, `3m05s` or `12s`.
pub fn format_eta(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m{s:02}s"),
        (h, m, _) => format!("{h}h{m:02}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_counts() {
        assert_eq!(OperationMode::from_counts(0, 0), OperationMode::Empty);
        assert_eq!(OperationMode::from_counts(3, 0), OperationMode::Move);
        assert_eq!(OperationMode::from_counts(0, 2), OperationMode::Copy);
        assert_eq!(OperationMode::from_counts(1, 1), OperationMode::Mixed);
    }

    #[test]
    fn record_splits_bytes_and_size_classes() {
        let mut m = TransferMetrics::start();
        m.add_copied(10);
        m.record(TransferOperation::Copy, 10);
        m.record(TransferOperation::Move, 5 * MIB);
        m.add_copied(200 * MIB);
        m.record(TransferOperation::Copy, 200 * MIB);
        assert_eq!(m.files_processed, 3);
        assert_eq!(m.bytes_processed, 10 + 205 * MIB);
        assert_eq!(m.bytes_copied, 10 + 200 * MIB);
        assert_eq!(m.bytes_moved, 5 * MIB);
        assert_eq!((m.small_files, m.medium_files, m.large_files), (1, 1, 1));
    }

    #[test]
    fn eta_follows_copied_bytes() {
        let mut m = TransferMetrics::start();
        m.total_copy_bytes = 100 * MIB;
        assert!(m.eta().is_none());
        std::thread::sleep(Duration::from_millis(10));
        m.add_copied(50 * MIB);
        assert!(m.eta().is_some());
        m.add_copied(50 * MIB);
        assert_eq!(m.eta(), Some(Duration::ZERO));
    }

    #[test]
    fn eta_formatting() {
        assert_eq!(format_eta(Duration::from_secs(12)), "12s");
        assert_eq!(format_eta(Duration::from_secs(185)), "3m05s");
        assert_eq!(format_eta(Duration::from_secs(3720)), "1h02m");
    }

    #[test]
    fn peak_tracks_highest_sample() {
        let mut m = TransferMetrics::start();
        m.add_speed_sample(10.0);
        m.add_speed_sample(50.0);
        m.add_speed_sample(20.0);
        assert_eq!(m.peak_speed_mbps, 50.0);
        assert_eq!(m.speed_samples.len(), 3);
    }

    #[test]
    fn finish_freezes_elapsed() {
        let mut m = TransferMetrics::start();
        m.finish();
        let first = m.elapsed();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(m.elapsed(), first);
        assert!(m.end_time.is_some());
    }
}
