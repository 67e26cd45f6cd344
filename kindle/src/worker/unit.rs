use super::state::{StageKind, StageStatus};
use crate::config::{ErrorPolicy, PipelineConfig, StartupParameters};
use crate::error::{PipelineError, Result};
use crate::queue::{QueueReader, QueueWriter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub type UnitFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub(crate) const PROCESSOR_QUEUE: &str = "processor";
pub(crate) const DISTRIBUTOR_QUEUE: &str = "distributor";

/// Per-unit runtime settings taken from the [`PipelineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSettings {
    pub error_policy: ErrorPolicy,
    pub idle_pause: Duration,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for UnitSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            error_policy: config.error_policy,
            idle_pause: config.idle_pause,
        }
    }
}

/// Lifecycle contract the orchestrator drives for every stage.
///
/// The orchestrator calls `startup` once, then `action` repeatedly until the
/// stage's cancellation token fires, then `finalise` once. The state held in
/// [`WorkerUnit::status`] follows those calls.
pub trait WorkerUnit: Send {
    fn kind(&self) -> StageKind;

    fn name(&self) -> &str;

    fn status(&self) -> Arc<StageStatus>;

    fn configure(&mut self, settings: UnitSettings);

    fn startup<'a>(&'a mut self, parameters: &'a StartupParameters) -> UnitFuture<'a>;

    /// Perform at most one unit of work. Returns an error only when the
    /// failure must stop the stage.
    fn action<'a>(&'a mut self, cancel: &'a CancellationToken) -> UnitFuture<'a>;

    /// True once the unit's input queue is closed and empty. A unit with no
    /// input never runs dry.
    fn input_drained(&self) -> bool {
        false
    }

    /// Drain the input queue and tear the stage down. Fails with
    /// [`PipelineError::InvalidState`] outside `Draining`.
    fn finalise(&mut self) -> UnitFuture<'_>;
}

/// A unit that writes the processor queue.
pub trait LoaderWorker<T>: WorkerUnit {
    fn register_processor_queue(&mut self, queue: QueueWriter<T>);

    fn into_unit(self: Box<Self>) -> Box<dyn WorkerUnit>;
}

/// A unit that reads the processor queue and writes the distributor queue.
pub trait ProcessorWorker<I, O>: WorkerUnit {
    fn register_processor_queue(&mut self, queue: QueueReader<I>);

    fn register_distributor_queue(&mut self, queue: QueueWriter<O>);

    fn into_unit(self: Box<Self>) -> Box<dyn WorkerUnit>;
}

/// A unit that reads the distributor queue.
pub trait DistributorWorker<T>: WorkerUnit {
    fn register_distributor_queue(&mut self, queue: QueueReader<T>);

    fn into_unit(self: Box<Self>) -> Box<dyn WorkerUnit>;
}

pub(crate) fn registered<'q, Q>(slot: &'q Option<Q>, queue: &str) -> Result<&'q Q> {
    slot.as_ref()
        .ok_or_else(|| PipelineError::invalid_state(format!("{queue} queue not registered")))
}

/// Idle policy while running: pause, but wake as soon as the stage is
/// cancelled.
pub(crate) async fn idle(pause: Duration, cancel: &CancellationToken) {
    tokio::select! {
        () = tokio::time::sleep(pause) => {}
        () = cancel.cancelled() => {}
    }
}
