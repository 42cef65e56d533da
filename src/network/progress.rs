// file: src/network/progress.rs
// version: 1.0.1
// guid: 09814690-57ee-4803-8894-254f623ccc50

//! Download progress tracking
//!
//! [`CountingWriter`] wraps any async writer and adds every byte that passes
//! through it to a shared counter. [`DownloadProgress`] reads that counter and
//! renders it; the arithmetic lives in [`ProgressSnapshot`] so it can be tested
//! without a terminal.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::AsyncWrite;

/// Writer decorator that counts the bytes accepted by the inner writer
pub struct CountingWriter<W> {
    inner: W,
    written: Arc<AtomicU64>,
}

impl<W> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_counter(inner, Arc::new(AtomicU64::new(0)))
    }

    /// Share an existing counter, e.g. one a progress renderer already holds
    pub fn with_counter(inner: W, written: Arc<AtomicU64>) -> Self {
        Self { inner, written }
    }

    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.written)
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for CountingWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            self.written.fetch_add(n as u64, Ordering::Relaxed);
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Point-in-time view of a transfer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub downloaded: u64,
    /// Expected size from `Content-Length`; 0 when unknown
    pub total: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn new(downloaded: u64, total: u64, elapsed: Duration) -> Self {
        Self {
            downloaded,
            total,
            elapsed,
        }
    }

    /// Percentage complete, if the total is known
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.downloaded as f64 * 100.0 / self.total as f64).min(100.0))
    }

    /// Average throughput since the start
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.downloaded as f64 / secs
        } else {
            0.0
        }
    }

    /// Estimated time remaining at the average rate so far
    pub fn eta(&self) -> Option<Duration> {
        if self.total == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.downloaded);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// One line summary in the same shape as the terminal output
    pub fn describe(&self) -> String {
        match (self.percent(), self.eta()) {
            (Some(percent), Some(eta)) => format!(
                "{} of {} bytes ({:.2}%) complete. ETA: {:.2}s",
                self.downloaded,
                self.total,
                percent,
                eta.as_secs_f64()
            ),
            (Some(percent), None) => format!(
                "{} of {} bytes ({:.2}%) complete.",
                self.downloaded, self.total, percent
            ),
            _ => format!("{} bytes complete.", self.downloaded),
        }
    }
}

/// Renders a shared byte counter as a progress bar
pub struct DownloadProgress {
    counter: Arc<AtomicU64>,
    total: u64,
    start: Instant,
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Progress for a transfer of `total` bytes (0 when unknown), drawn on stderr
    pub fn new(total: u64) -> Self {
        Self::with_target(total, ProgressDrawTarget::stderr())
    }

    /// Progress that tracks the counter without drawing anything
    pub fn hidden(total: u64) -> Self {
        Self::with_target(total, ProgressDrawTarget::hidden())
    }

    fn with_target(total: u64, target: ProgressDrawTarget) -> Self {
        let bar = if total > 0 {
            let bar = ProgressBar::with_draw_target(Some(total), target);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} Downloading [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        } else {
            let bar = ProgressBar::with_draw_target(None, target);
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.green} Downloading [{elapsed_precise}] {msg}")
            {
                bar.set_style(style);
            }
            bar
        };

        Self {
            counter: Arc::new(AtomicU64::new(0)),
            total,
            start: Instant::now(),
            bar,
        }
    }

    /// Counter to hand to a [`CountingWriter`]
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.counter)
    }

    /// Current state of the transfer
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(
            self.counter.load(Ordering::Relaxed),
            self.total,
            self.start.elapsed(),
        )
    }

    /// Redraw from the shared counter
    pub fn refresh(&self) -> ProgressSnapshot {
        let snapshot = self.snapshot();
        self.bar.set_position(snapshot.downloaded);
        self.bar.set_message(snapshot.describe());
        snapshot
    }

    /// Text currently shown next to the bar
    pub fn message(&self) -> String {
        self.bar.message()
    }

    pub fn finish(&self) -> ProgressSnapshot {
        let snapshot = self.refresh();
        self.bar.finish_and_clear();
        snapshot
    }
}
