//! Latency Monitor
//!
//! Round-trip measurement with the bare `p` probe. The cycle re-arms a
//! one-shot timer after each echo instead of running a fixed interval, so
//! at most one probe is ever outstanding:
//!
//! ```text
//! start ──send p──► wait echo ──echo──► publish rtt ──arm 5s──► fire ──send p──► ...
//! ```
//!
//! The monitor is a plain state machine driven with explicit instants.
//! Timers are supplied through [`ProbeTimer`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delay between an echo and the next probe.
pub const PROBE_INTERVAL: Duration = Duration::from_millis(5000);

/// Latency bookkeeping.
#[derive(Debug, Clone)]
pub struct LatencyMonitor {
    interval: Duration,
    started: bool,
    last_sent: Option<Instant>,
    next_due: Option<Instant>,
    last_latency: Option<Duration>,
}

impl Default for LatencyMonitor {
    fn default() -> Self {
        Self::new(PROBE_INTERVAL)
    }
}

impl LatencyMonitor {
    /// Create an idle monitor.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: false,
            last_sent: None,
            next_due: None,
            last_latency: None,
        }
    }

    /// Delay between echo and next probe.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Begin the cycle. Returns true when the caller must send the first
    /// probe; later calls are ignored.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        self.last_sent = Some(now);
        true
    }

    /// Record an echo. Returns the round trip when a probe was
    /// outstanding; the caller then publishes it and arms the timer for
    /// [`interval`](Self::interval).
    pub fn on_echo(&mut self, now: Instant) -> Option<Duration> {
        let sent = self.last_sent.take()?;
        let elapsed = now.saturating_duration_since(sent);
        self.last_latency = Some(elapsed);
        self.next_due = Some(now + self.interval);
        Some(elapsed)
    }

    /// Timer fired. Returns true when the caller must send the next probe.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = None;
                self.last_sent = Some(now);
                true
            }
            _ => false,
        }
    }

    /// A probe is waiting for its echo.
    pub fn outstanding(&self) -> bool {
        self.last_sent.is_some()
    }

    /// Most recent round trip.
    pub fn last_latency(&self) -> Option<Duration> {
        self.last_latency
    }
}

// =============================================================================
// TIMERS
// =============================================================================

/// One-shot timer used to schedule the next probe.
pub trait ProbeTimer: Send {
    /// Fire once after `delay`.
    fn arm(&mut self, delay: Duration);

    /// Stop pending and future firings.
    fn cancel(&mut self);
}

/// Marker delivered when the probe timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeDue;

/// Tokio-backed timer that sends [`ProbeDue`] to the engine.
///
/// The `live` flag is checked when the sleep completes, so a firing that
/// races with cancellation is dropped.
pub struct TokioProbeTimer {
    tx: mpsc::UnboundedSender<ProbeDue>,
    live: Arc<AtomicBool>,
    pending: Option<JoinHandle<()>>,
}

impl TokioProbeTimer {
    /// Create a timer and the receiver for its firings.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProbeDue>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                live: Arc::new(AtomicBool::new(true)),
                pending: None,
            },
            rx,
        )
    }
}

impl ProbeTimer for TokioProbeTimer {
    fn arm(&mut self, delay: Duration) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }
        let tx = self.tx.clone();
        let live = self.live.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if live.load(Ordering::SeqCst) {
                let _ = tx.send(ProbeDue);
            } else {
                debug!("Probe timer fired after cancel");
            }
        }));
    }

    fn cancel(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for TokioProbeTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Timer that only records what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingProbeTimer {
    armed: Arc<Mutex<Vec<Duration>>>,
    cancelled: Arc<AtomicBool>,
}

impl RecordingProbeTimer {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays passed to `arm`.
    pub fn armed(&self) -> Vec<Duration> {
        self.armed.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Whether `cancel` was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl ProbeTimer for RecordingProbeTimer {
    fn arm(&mut self, delay: Duration) {
        if self.is_cancelled() {
            return;
        }
        if let Ok(mut armed) = self.armed.lock() {
            armed.push(delay);
        }
    }

    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
