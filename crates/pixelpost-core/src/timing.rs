//! Elapsed-time measurement and progress reporting.
//!
//! Every encode, every upload and every batch is wrapped in a [`Stopwatch`]
//! and reported as a [`TimingEvent`] to a [`ProgressObserver`]. Instrumentation
//! only observes: the wrapped result is passed through untouched, whether it
//! succeeded or failed.
//!
//! Events from concurrent workers may arrive in any order.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::format::ImageFormat;

/// One measured unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingEvent {
    /// An encode step finished.
    EncodeCompleted {
        index: usize,
        format: ImageFormat,
        quality: u8,
        elapsed: Duration,
        success: bool,
    },
    /// An upload step finished.
    UploadCompleted {
        index: usize,
        key: String,
        elapsed: Duration,
        success: bool,
    },
    /// A whole batch finished.
    BatchCompleted {
        tasks: usize,
        failed: usize,
        elapsed: Duration,
    },
}

impl TimingEvent {
    pub fn elapsed(&self) -> Duration {
        match self {
            TimingEvent::EncodeCompleted { elapsed, .. }
            | TimingEvent::UploadCompleted { elapsed, .. }
            | TimingEvent::BatchCompleted { elapsed, .. } => *elapsed,
        }
    }
}

/// Receives progress events. Called from worker tasks, so it must be cheap
/// and thread-safe.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &TimingEvent);
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&self, event: &TimingEvent) {
        match event {
            TimingEvent::EncodeCompleted {
                index,
                format,
                quality,
                elapsed,
                success,
            } => tracing::info!(
                index,
                %format,
                quality,
                elapsed_ms = elapsed.as_millis() as u64,
                success,
                "Converted image in {} ms - {} - {}",
                elapsed.as_millis(),
                format,
                quality
            ),
            TimingEvent::UploadCompleted {
                index,
                key,
                elapsed,
                success,
            } => tracing::info!(
                index,
                key = key.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                success,
                "Uploaded image to {} in {} ms",
                key,
                elapsed.as_millis()
            ),
            TimingEvent::BatchCompleted {
                tasks,
                failed,
                elapsed,
            } => tracing::info!(
                tasks,
                failed,
                elapsed_ms = elapsed.as_millis() as u64,
                "All {} images converted and uploaded in {} ms",
                tasks,
                elapsed.as_millis()
            ),
        }
    }
}

/// Keeps every event it sees, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<TimingEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<TimingEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&self, event: &TimingEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}

/// Monotonic elapsed-time measurement.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Run `work`, returning its result together with how long it took.
pub fn timed<T>(work: impl FnOnce() -> T) -> (T, Duration) {
    let watch = Stopwatch::start();
    let value = work();
    (value, watch.elapsed())
}

/// Await `work`, returning its output together with how long it took.
pub async fn timed_async<F: Future>(work: F) -> (F::Output, Duration) {
    let watch = Stopwatch::start();
    let value = work.await;
    (value, watch.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_passes_result_through() {
        let (value, elapsed) = timed(|| Err::<u8, &str>("boom"));
        assert_eq!(value, Err("boom"));
        assert!(elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_timed_async_measures_sleep() {
        let (value, elapsed) = timed_async(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            7
        })
        .await;
        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_event(&TimingEvent::UploadCompleted {
            index: 1,
            key: "k".to_string(),
            elapsed: Duration::from_millis(3),
            success: true,
        });
        observer.on_event(&TimingEvent::BatchCompleted {
            tasks: 1,
            failed: 0,
            elapsed: Duration::from_millis(5),
        });

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].elapsed(), Duration::from_millis(3));
        assert!(matches!(events[1], TimingEvent::BatchCompleted { tasks: 1, .. }));
    }

    #[test]
    fn test_tracing_observer_accepts_every_event() {
        // No subscriber installed: must not panic
        let observer = TracingObserver;
        observer.on_event(&TimingEvent::EncodeCompleted {
            index: 0,
            format: ImageFormat::Jpeg,
            quality: 100,
            elapsed: Duration::ZERO,
            success: true,
        });
        observer.on_event(&TimingEvent::BatchCompleted {
            tasks: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        });
    }
}
