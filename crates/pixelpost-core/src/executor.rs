//! Batch executor: fans a [`TaskBatch`] out to one worker per task and gathers
//! the outcomes back into submission order.
//!
//! Workers live in a `JoinSet` owned by a single `run` call. They race freely;
//! each one reports a [`TaskOutcome`] tagged with its submission index, and the
//! executor drops it into a pre-allocated slot for that index. Slots are
//! written exactly once, so arrival order never leaks into the result.
//!
//! Task failures (bad input, rejected upload, even a panicking store) stay in
//! their own outcome. Only a broken scheduling mechanism fails the whole call,
//! and then no outcomes are returned at all.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, PipelineConfig};
use crate::encode::{Encoder, ImageCodec};
use crate::outcome::{BatchReport, TaskError, TaskOutcome};
use crate::store::ObjectStore;
use crate::task::{EncodeUploadTask, TaskBatch};
use crate::timing::{ProgressObserver, Stopwatch, TimingEvent, TracingObserver};

/// The batch mechanism itself failed; no outcomes are available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    /// The batch needs more workers than the executor may allocate.
    #[error("Batch of {requested} tasks exceeds the worker limit of {limit}")]
    WorkerLimit { requested: usize, limit: usize },

    /// `run` was polled outside a tokio runtime.
    #[error("No async runtime available to host workers: {0}")]
    NoRuntime(String),

    /// The per-call runtime of `run_blocking` could not be created.
    #[error("Failed to build worker runtime: {0}")]
    Runtime(String),

    /// A worker ended without delivering its outcome.
    #[error("Worker exited without reporting: {0}")]
    WorkerLost(String),

    #[error("Task {index} reported more than once")]
    DuplicateOutcome { index: usize },

    #[error("Task {index} never reported an outcome")]
    MissingOutcome { index: usize },
}

/// Runs batches of encode-then-upload tasks concurrently.
pub struct BatchExecutor {
    config: PipelineConfig,
    encoder: Arc<dyn Encoder>,
    store: Arc<dyn ObjectStore>,
    observer: Arc<dyn ProgressObserver>,
}

impl BatchExecutor {
    /// Create an executor that encodes with [`ImageCodec`] and reports
    /// progress through `tracing`.
    ///
    /// # Errors
    ///
    /// Returns the first problem [`PipelineConfig::validate`] finds.
    pub fn new(config: PipelineConfig, store: Arc<dyn ObjectStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: Arc::new(ImageCodec),
            store,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn task(&self) -> EncodeUploadTask {
        EncodeUploadTask::new(
            Arc::clone(&self.encoder),
            Arc::clone(&self.store),
            Arc::clone(&self.observer),
            self.config.dimensions(),
            self.config.object_stem.as_str(),
        )
    }

    fn check_worker_limit(&self, requested: usize) -> Result<(), SchedulingError> {
        match self.config.max_workers {
            Some(limit) if requested > limit => {
                Err(SchedulingError::WorkerLimit { requested, limit })
            }
            _ => Ok(()),
        }
    }

    /// Run every task of `batch` concurrently and return their outcomes in
    /// submission order.
    ///
    /// Waits for all workers; a failing task never stops its siblings.
    ///
    /// # Errors
    ///
    /// Only [`SchedulingError`]s. Per-task failures are inside the report.
    pub async fn run(&self, batch: &TaskBatch, prefix: &str) -> Result<BatchReport, SchedulingError> {
        self.run_with_cancel(batch, prefix, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops waiting once `cancel` fires.
    ///
    /// Workers still running at that point are aborted and reported as
    /// [`TaskError::Cancelled`]; workers that already finished keep their
    /// outcome.
    pub async fn run_with_cancel(
        &self,
        batch: &TaskBatch,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, SchedulingError> {
        let watch = Stopwatch::start();
        let total = batch.len();

        self.check_worker_limit(total)?;
        let handle =
            Handle::try_current().map_err(|e| SchedulingError::NoRuntime(e.to_string()))?;

        let task = self.task();
        let mut workers = JoinSet::new();
        for (index, spec) in batch.iter().enumerate() {
            let task = task.clone();
            let spec = spec.clone();
            let prefix = prefix.to_string();
            tracing::debug!(
                index,
                format = %spec.format(),
                quality = spec.quality(),
                "Spawning worker"
            );

            workers.spawn_on(
                async move {
                    let key = task.key_for(&spec, &prefix);
                    let result = AssertUnwindSafe(task.execute(index, &spec, &prefix))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(TaskError::Panicked(panic_message(&*panic))));
                    TaskOutcome { index, key, result }
                },
                &handle,
            );
        }

        let mut slots: Vec<Option<TaskOutcome>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let mut cancelled = false;

        while !workers.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(pending = workers.len(), "Batch cancelled, aborting remaining workers");
                    workers.abort_all();
                    cancelled = true;
                    break;
                }
                joined = workers.join_next() => match joined {
                    Some(joined) => place(&mut slots, joined)?,
                    None => break,
                },
            }
        }

        if cancelled {
            // Workers that finished before the abort still deliver their outcome
            while let Some(joined) = workers.join_next().await {
                if let Ok(outcome) = joined {
                    place(&mut slots, Ok(outcome))?;
                }
            }
        }

        let mut outcomes = Vec::with_capacity(total);
        for (index, slot) in slots.into_iter().enumerate() {
            let outcome = match (slot, batch.get(index)) {
                (Some(outcome), _) => outcome,
                (None, Some(spec)) if cancelled => TaskOutcome {
                    index,
                    key: task.key_for(spec, prefix),
                    result: Err(TaskError::Cancelled),
                },
                (None, _) => return Err(SchedulingError::MissingOutcome { index }),
            };
            if let Some(error) = outcome.error() {
                tracing::warn!(index, kind = error.kind(), key = outcome.key.as_str(), "Task failed: {}", error);
            }
            outcomes.push(outcome);
        }

        let report = BatchReport::new(outcomes, watch.elapsed());
        self.observer.on_event(&TimingEvent::BatchCompleted {
            tasks: report.len(),
            failed: report.failure_count(),
            elapsed: report.elapsed(),
        });
        Ok(report)
    }

    /// Synchronous entry point: builds a worker runtime sized to the batch,
    /// runs the batch on it and tears it down before returning.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`run`](Self::run), fails with
    /// `SchedulingError::Runtime` if called from inside an async runtime or if
    /// the runtime cannot be built.
    pub fn run_blocking(&self, batch: &TaskBatch, prefix: &str) -> Result<BatchReport, SchedulingError> {
        if Handle::try_current().is_ok() {
            return Err(SchedulingError::Runtime(
                "run_blocking called from within an async runtime".to_string(),
            ));
        }
        self.check_worker_limit(batch.len())?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(batch.len().max(1))
            .thread_name("pixelpost-worker")
            .enable_all()
            .build()
            .map_err(|e| SchedulingError::Runtime(e.to_string()))?;

        runtime.block_on(self.run(batch, prefix))
    }
}

/// Store a finished worker's outcome in its slot.
fn place(
    slots: &mut [Option<TaskOutcome>],
    joined: Result<TaskOutcome, JoinError>,
) -> Result<(), SchedulingError> {
    let outcome = joined.map_err(|e| SchedulingError::WorkerLost(e.to_string()))?;
    let index = outcome.index;
    match slots.get_mut(index) {
        Some(slot) if slot.is_none() => {
            *slot = Some(outcome);
            Ok(())
        }
        _ => Err(SchedulingError::DuplicateOutcome { index }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
