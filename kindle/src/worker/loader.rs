use super::policy::settle;
use super::state::{StageKind, StageStatus, WorkerState};
use super::unit::{
    idle, registered, LoaderWorker, UnitFuture, UnitSettings, WorkerUnit, PROCESSOR_QUEUE,
};
use crate::config::StartupParameters;
use crate::error::{PipelineError, Result};
use crate::queue::QueueWriter;
use crate::stage::loader::Loader;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs a [`Loader`] plugin and feeds the processor queue.
pub struct LoaderUnit<L: Loader> {
    plugin: L,
    queue: Option<QueueWriter<L::Output>>,
    status: Arc<StageStatus>,
    settings: UnitSettings,
}

impl<L: Loader> LoaderUnit<L> {
    #[must_use]
    pub fn new(plugin: L) -> Self {
        Self {
            plugin,
            queue: None,
            status: Arc::new(StageStatus::new(StageKind::Loader)),
            settings: UnitSettings::default(),
        }
    }

    pub fn plugin(&self) -> &L {
        &self.plugin
    }

    /// Push an item onto the processor queue, suspending while it is full.
    ///
    /// # Errors
    ///
    /// Fails with [`PipelineError::InvalidState`] if no queue is registered
    /// or the queue is closed.
    pub async fn enqueue(&self, item: L::Output) -> Result<()> {
        registered(&self.queue, PROCESSOR_QUEUE)?.enqueue(item).await
    }

    pub fn processor_queue_count(&self) -> usize {
        self.queue.as_ref().map_or(0, QueueWriter::count)
    }
}

impl<L: Loader + 'static> WorkerUnit for LoaderUnit<L> {
    fn kind(&self) -> StageKind {
        StageKind::Loader
    }

    fn name(&self) -> &str {
        self.plugin.name()
    }

    fn status(&self) -> Arc<StageStatus> {
        Arc::clone(&self.status)
    }

    fn configure(&mut self, settings: UnitSettings) {
        self.settings = settings;
    }

    fn startup<'a>(&'a mut self, parameters: &'a StartupParameters) -> UnitFuture<'a> {
        Box::pin(async move {
            self.status.expect(WorkerState::Idle)?;
            registered(&self.queue, PROCESSOR_QUEUE)?;
            self.plugin
                .startup(parameters)
                .await
                .map_err(|e| PipelineError::StartupFailure {
                    stage: StageKind::Loader,
                    source: Box::new(e),
                })
        })
    }

    fn action<'a>(&'a mut self, cancel: &'a CancellationToken) -> UnitFuture<'a> {
        Box::pin(async move {
            let loaded = self.plugin.load(cancel).await;
            match loaded {
                Ok(Some(item)) => {
                    let queue = registered(&self.queue, PROCESSOR_QUEUE)?;
                    queue.enqueue(item).await
                }
                Ok(None) => {
                    idle(self.settings.idle_pause, cancel).await;
                    Ok(())
                }
                Err(e) => settle(
                    StageKind::Loader,
                    &mut self.plugin,
                    self.settings.error_policy,
                    e,
                ),
            }
        })
    }

    fn finalise(&mut self) -> UnitFuture<'_> {
        Box::pin(async move {
            self.status.expect(WorkerState::Draining)?;
            info!(
                remaining = self.processor_queue_count(),
                "Starting loader finalisation"
            );
            let finalised = self.plugin.finalise().await;
            // Nothing else will be produced; let the processor see the end.
            if let Some(queue) = &self.queue {
                queue.close();
            }
            debug!("Processor queue closed");
            finalised.map_err(|e| PipelineError::FinaliseFailure {
                stage: StageKind::Loader,
                source: Box::new(e),
            })
        })
    }
}

impl<L: Loader + 'static> LoaderWorker<L::Output> for LoaderUnit<L> {
    fn register_processor_queue(&mut self, queue: QueueWriter<L::Output>) {
        self.queue = Some(queue);
    }

    fn into_unit(self: Box<Self>) -> Box<dyn WorkerUnit> {
        self
    }
}
