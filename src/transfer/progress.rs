//! Progress reporting.
//!
//! The engine talks to a `ProgressSink`. Updates are throttled by a
//! `ProgressReporter`; the 0% and 100% milestones always go through.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::transfer::item::TransferOperation;
use crate::transfer::outcome::TransferOutcome;

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

pub trait ProgressSink: Send {
    fn report(&self, percent: u8, message: &str);

    /// Called once per file outcome as it is recorded.
    fn file_completed(&self, _outcome: &TransferOutcome) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str) + Send,
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Progress {
        percent: u8,
        message: String,
    },
    FileCompleted {
        relative_path: PathBuf,
        operation: TransferOperation,
        verified: bool,
    },
}

/// Forwards events across threads on a bounded channel.
///
/// Intermediate updates are dropped when the consumer lags; milestones and
/// file completions block until there is room.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, percent: u8, message: &str) {
        let ev = ProgressEvent::Progress {
            percent,
            message: message.to_string(),
        };
        if percent == 0 || percent == 100 {
            let _ = self.tx.send(ev);
            return;
        }
        if let Err(TrySendError::Full(_)) = self.tx.try_send(ev) {
            tracing::trace!(percent, "progress consumer lagging; update dropped");
        }
    }

    fn file_completed(&self, outcome: &TransferOutcome) {
        let _ = self.tx.send(ProgressEvent::FileCompleted {
            relative_path: outcome.relative_path.clone(),
            operation: outcome.operation,
            verified: outcome.verified,
        });
    }
}

pub(crate) fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u128 * 100) / total as u128) as u8
}

/// Throttles updates to one per interval and never repeats a percentage.
pub(crate) struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    interval: Duration,
    last_emit: Option<Instant>,
    last_percent: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, interval: Duration) -> Self {
        Self {
            sink,
            interval,
            last_emit: None,
            last_percent: None,
        }
    }

    /// Always emitted.
    pub(crate) fn milestone(&mut self, percent: u8, message: &str) {
        self.sink.report(percent.min(100), message);
        self.last_emit = Some(Instant::now());
        self.last_percent = Some(percent);
    }

    /// Whether `update(percent, ..)` would reach the sink right now.
    pub(crate) fn is_due(&self, percent: u8) -> bool {
        if self.last_percent == Some(percent.min(99)) {
            return false;
        }
        self.last_emit.is_none_or(|t| t.elapsed() >= self.interval)
    }

    pub(crate) fn update(&mut self, percent: u8, message: &str) {
        if !self.is_due(percent) {
            return;
        }
        let percent = percent.min(99);
        self.sink.report(percent, message);
        self.last_emit = Some(Instant::now());
        self.last_percent = Some(percent);
    }

    pub(crate) fn file_completed(&self, outcome: &TransferOutcome) {
        self.sink.file_completed(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<u8>>>);

    impl ProgressSink for Recorder {
        fn report(&self, percent: u8, _message: &str) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn percent_handles_empty_and_overflow() {
        assert_eq!(percent_of(0, 0), 100);
        assert_eq!(percent_of(5, 10), 50);
        assert_eq!(percent_of(20, 10), 100);
        assert_eq!(percent_of(u64::MAX / 2, u64::MAX), 49);
    }

    #[test]
    fn milestones_bypass_throttle() {
        let rec = Recorder::default();
        let mut r = ProgressReporter::new(&rec, Duration::from_secs(60));
        r.milestone(0, "start");
        r.update(10, "ignored");
        r.update(20, "ignored");
        r.milestone(100, "done");
        assert_eq!(*rec.0.lock().unwrap(), vec![0, 100]);
    }

    #[test]
    fn updates_never_claim_completion() {
        let rec = Recorder::default();
        let mut r = ProgressReporter::new(&rec, Duration::ZERO);
        r.update(100, "almost");
        assert_eq!(*rec.0.lock().unwrap(), vec![99]);
    }

    #[test]
    fn due_mirrors_update() {
        let rec = Recorder::default();
        let mut r = ProgressReporter::new(&rec, Duration::ZERO);
        assert!(r.is_due(5));
        r.update(5, "five");
        assert!(!r.is_due(5));
        assert!(r.is_due(6));
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let sink = move |p: u8, m: &str| s.lock().unwrap().push((p, m.to_string()));
        sink.report(42, "hello");
        assert_eq!(seen.lock().unwrap()[0], (42, "hello".to_string()));
    }

    #[test]
    fn channel_delivers_milestones() {
        let (sink, rx) = ChannelProgress::bounded(1);
        sink.report(0, "start");
        sink.report(50, "dropped, channel full");
        assert_eq!(
            rx.recv().unwrap(),
            ProgressEvent::Progress { percent: 0, message: "start".into() }
        );
        assert!(rx.try_recv().is_err());
    }
}
