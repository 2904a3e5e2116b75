//! Interval bookkeeping and wake-timer scheduling
//!
//! Each entry carries two countdowns: the min-interval counter rate-limits
//! change reports, the max-interval counter forces a heartbeat report when
//! it expires. The scheduler decrements counters by elapsed seconds, decides
//! eligibility, and arms a single one-shot timer for the nearest deadline.

use crate::change::exceeds_threshold;
use crate::table::{ReportEntry, ReportingTable};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zcl_core::{Attribute, BindingTable};

/// One-shot wake timer capability.
///
/// `arm` schedules a wake after the given number of seconds; the fired wake
/// carries that same value back as the elapsed-seconds payload for the next
/// decrement step.
pub trait WakeTimer: Send {
    fn arm(&mut self, seconds: u16);
    fn cancel(&mut self);
    fn is_armed(&self) -> bool;
}

/// Decrement both countdowns of every active entry by the elapsed seconds.
pub fn tick(table: &mut ReportingTable, bindings: &dyn BindingTable, elapsed: u16) {
    if table.active_count(bindings) == 0 {
        return;
    }
    for entry in table.slots_mut() {
        if !entry.is_active(bindings) {
            continue;
        }
        entry.min_count = entry.min_count.saturating_sub(elapsed);
        entry.max_count = entry.max_count.saturating_sub(elapsed);
    }
}

/// Decide whether an entry is eligible for reporting this pass.
///
/// Side effects: seeds the previous-value snapshot on first evaluation
/// (without reporting), and re-arms the min-interval window when it elapsed
/// without a qualifying change.
pub(crate) fn evaluate_entry(entry: &mut ReportEntry, current: &Attribute) -> bool {
    let changed = match &entry.prev_value {
        Some(prev) => exceeds_threshold(
            current.data_type,
            &current.value,
            prev,
            &entry.reportable_change,
        ),
        None => {
            entry.prev_value = Some(current.value.to_vec());
            false
        }
    };

    if entry.max_count == 0 {
        if entry.max_interval == 0 {
            // Pure change-driven mode, no periodic force
            changed
        } else {
            // Heartbeat deadline expired, report regardless of change
            true
        }
    } else if entry.min_count == 0 {
        if changed {
            true
        } else {
            entry.min_count = entry.min_interval;
            false
        }
    } else {
        false
    }
}

/// Minimal nonzero countdown across all active entries; `None` means idle.
#[must_use]
pub fn next_wake(table: &ReportingTable, bindings: &dyn BindingTable) -> Option<u16> {
    let mut seconds: Option<u16> = None;
    for entry in table.slots() {
        if !entry.is_active(bindings) {
            continue;
        }
        for count in [entry.min_count, entry.max_count] {
            if count > 0 && seconds.map_or(true, |s| count < s) {
                seconds = Some(count);
            }
        }
    }
    seconds
}

/// Owns the single outstanding wake timer
pub struct IntervalScheduler {
    timer: Box<dyn WakeTimer>,
}

impl IntervalScheduler {
    #[must_use]
    pub fn new(timer: Box<dyn WakeTimer>) -> Self {
        Self { timer }
    }

    /// Arm the timer for the nearest deadline. No-op if already armed or if
    /// no active entry has a pending countdown.
    pub fn start(&mut self, table: &ReportingTable, bindings: &dyn BindingTable) {
        if self.timer.is_armed() {
            return;
        }
        if let Some(seconds) = next_wake(table, bindings) {
            tracing::debug!(seconds, "arming report wake timer");
            self.timer.arm(seconds);
        }
    }

    /// Cancel any armed timer
    pub fn stop(&mut self) {
        if self.timer.is_armed() {
            tracing::debug!("cancelling report wake timer");
        }
        self.timer.cancel();
    }
}

/// Wake timer backed by a spawned tokio sleep task.
///
/// On expiry the armed delay is sent as the elapsed-seconds payload on the
/// wake channel; `cancel` aborts the task. The armed state lives in a shared
/// flag the task clears before delivering the wake, so once the engine has
/// received a wake the timer already reads as disarmed and the next
/// `IntervalScheduler::start` can arm a fresh deadline.
pub struct TokioWakeTimer {
    wake_tx: mpsc::UnboundedSender<u16>,
    armed: std::sync::Arc<std::sync::atomic::AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TokioWakeTimer {
    /// Returns the timer plus the receiver the engine loop drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<u16>) {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        (
            Self {
                wake_tx,
                armed: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
                handle: None,
            },
            wake_rx,
        )
    }
}

impl WakeTimer for TokioWakeTimer {
    fn arm(&mut self, seconds: u16) {
        use std::sync::atomic::Ordering;

        let tx = self.wake_tx.clone();
        let armed = self.armed.clone();
        armed.store(true, Ordering::SeqCst);
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(u64::from(seconds))).await;
            // Disarm before delivering: the channel send orders this store
            // ahead of the receiver seeing the wake.
            armed.store(false, Ordering::SeqCst);
            let _ = tx.send(seconds);
        }));
    }

    fn cancel(&mut self) {
        self.armed.store(false, std::sync::atomic::Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn is_armed(&self) -> bool {
        self.armed.load(std::sync::atomic::Ordering::SeqCst)
    }
}
