//! Transfer progress accounting and reporting

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::utils::{humanize_bytes, throughput_mib_per_sec};

/// How often the reporter redraws its progress line
pub const REPORT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct PhaseState {
    status: String,
    total: u64,
    started: Instant,
}

/// Cumulative byte accounting shared between a transfer and its reporter
///
/// `observe` only touches an atomic counter and never blocks the transfer
/// path. `reset` swaps the counter to zero while holding the phase lock, so
/// the value it returns is exactly the sum observed since the previous reset.
#[derive(Debug)]
pub struct ProgressSession {
    transferred: AtomicU64,
    phase: Mutex<PhaseState>,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub status: String,
    pub transferred: u64,
    pub total: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Render the progress line without the leading carriage return
    pub fn line(&self) -> String {
        let rate = throughput_mib_per_sec(self.transferred, self.elapsed);
        if self.total > 0 {
            let pct = (self.transferred as f64 / self.total as f64 * 100.0).min(100.0);
            format!(
                "{}: {} of {} ({:.0}%), {:.2} MiB/s",
                self.status,
                humanize_bytes(self.transferred),
                humanize_bytes(self.total),
                pct,
                rate,
            )
        } else {
            format!(
                "{}: {}, {:.2} MiB/s",
                self.status,
                humanize_bytes(self.transferred),
                rate
            )
        }
    }
}

impl Default for ProgressSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSession {
    pub fn new() -> Self {
        Self {
            transferred: AtomicU64::new(0),
            phase: Mutex::new(PhaseState {
                status: String::new(),
                total: 0,
                started: Instant::now(),
            }),
        }
    }

    fn phase(&self) -> MutexGuard<'_, PhaseState> {
        // The guarded state is plain data; a poisoned lock is still usable.
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the human-readable label for the current phase
    pub fn set_status(&self, status: impl Into<String>) {
        self.phase().status = status.into();
    }

    /// Set the number of bytes the current phase is expected to move
    pub fn set_total(&self, total: u64) {
        self.phase().total = total;
    }

    /// Account for `n` bytes moved
    pub fn observe(&self, n: u64) {
        self.transferred.fetch_add(n, Ordering::Relaxed);
    }

    /// Bytes observed since the last reset
    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }

    /// Zero the counter and restart the phase clock, returning the bytes
    /// observed since the previous reset
    pub fn reset(&self) -> u64 {
        let mut phase = self.phase();
        let transferred = self.transferred.swap(0, Ordering::AcqRel);
        phase.started = Instant::now();
        transferred
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let phase = self.phase();
        ProgressSnapshot {
            status: phase.status.clone(),
            transferred: self.transferred.load(Ordering::Acquire),
            total: phase.total,
            elapsed: phase.started.elapsed(),
        }
    }

    /// Emit a progress line every [`REPORT_INTERVAL`] until `cancel` fires
    ///
    /// Each line starts with `\r` so it redraws the previous one. Once
    /// cancelled, the last line is ended with a newline before returning.
    /// Write errors are ignored; progress output is purely informational.
    pub async fn report<W>(&self, cancel: CancellationToken, mut out: W)
    where
        W: AsyncWrite + Unpin,
    {
        let mut ticker = tokio::time::interval(REPORT_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut drawn = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let line = format!("\r{}", self.snapshot().line());
                    drawn |= out.write_all(line.as_bytes()).await.is_ok();
                    let _ = out.flush().await;
                }
            }
        }

        if drawn {
            let _ = out.write_all(b"\n").await;
            let _ = out.flush().await;
        }
        debug!("progress reporting stopped");
    }

    /// Drive `work` to completion while reporting progress to `out`
    ///
    /// The reporter runs on a child token of `parent`. It is cancelled as
    /// soon as `work` finishes and has returned by the time this does, so
    /// nothing it writes can follow later output on `out`.
    pub async fn while_reporting<F, W>(&self, parent: &CancellationToken, out: W, work: F) -> F::Output
    where
        F: Future,
        W: AsyncWrite + Unpin,
    {
        let token = parent.child_token();
        let stop = token.clone().drop_guard();
        let (output, ()) = tokio::join!(
            async move {
                let output = work.await;
                drop(stop);
                output
            },
            self.report(token, out),
        );
        output
    }
}
