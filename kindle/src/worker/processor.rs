use super::policy::settle;
use super::state::{StageKind, StageStatus, WorkerState};
use super::unit::{
    idle, registered, ProcessorWorker, UnitFuture, UnitSettings, WorkerUnit, DISTRIBUTOR_QUEUE,
    PROCESSOR_QUEUE,
};
use crate::config::StartupParameters;
use crate::error::{PipelineError, Result};
use crate::queue::{QueueReader, QueueWriter};
use crate::stage::processor::Processor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs a [`Processor`] plugin between the processor and distributor queues.
pub struct ProcessorUnit<P: Processor> {
    plugin: P,
    input: Option<QueueReader<P::Input>>,
    output: Option<QueueWriter<P::Output>>,
    status: Arc<StageStatus>,
    settings: UnitSettings,
}

impl<P: Processor> ProcessorUnit<P> {
    #[must_use]
    pub fn new(plugin: P) -> Self {
        Self {
            plugin,
            input: None,
            output: None,
            status: Arc::new(StageStatus::new(StageKind::Processor)),
            settings: UnitSettings::default(),
        }
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Wait for the next processor-queue item; `None` once the queue is
    /// closed and empty or not registered.
    pub async fn dequeue(&self) -> Option<P::Input> {
        match &self.input {
            Some(input) => input.dequeue().await,
            None => None,
        }
    }

    pub fn try_dequeue(&self) -> Option<P::Input> {
        self.input.as_ref().and_then(QueueReader::try_dequeue)
    }

    pub fn processor_queue_count(&self) -> usize {
        self.input.as_ref().map_or(0, QueueReader::count)
    }

    pub fn distributor_queue_count(&self) -> usize {
        self.output.as_ref().map_or(0, QueueWriter::count)
    }

    async fn handle(&mut self, item: P::Input) -> Result<()> {
        let processed = self.plugin.process(item).await;
        match processed {
            Ok(result) => {
                let output = registered(&self.output, DISTRIBUTOR_QUEUE)?;
                output.enqueue(result).await
            }
            Err(e) => settle(
                StageKind::Processor,
                &mut self.plugin,
                self.settings.error_policy,
                e,
            ),
        }
    }
}

impl<P: Processor + 'static> WorkerUnit for ProcessorUnit<P> {
    fn kind(&self) -> StageKind {
        StageKind::Processor
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
            registered(&self.input, PROCESSOR_QUEUE)?;
            registered(&self.output, DISTRIBUTOR_QUEUE)?;
            self.plugin
                .startup(parameters)
                .await
                .map_err(|e| PipelineError::StartupFailure {
                    stage: StageKind::Processor,
                    source: Box::new(e),
                })
        })
    }

    fn action<'a>(&'a mut self, cancel: &'a CancellationToken) -> UnitFuture<'a> {
        Box::pin(async move {
            let next = registered(&self.input, PROCESSOR_QUEUE)?.try_dequeue();
            match next {
                Some(item) => self.handle(item).await,
                None => {
                    idle(self.settings.idle_pause, cancel).await;
                    Ok(())
                }
            }
        })
    }

    fn input_drained(&self) -> bool {
        self.input.as_ref().is_some_and(QueueReader::is_drained)
    }

    fn finalise(&mut self) -> UnitFuture<'_> {
        Box::pin(async move {
            self.status.expect(WorkerState::Draining)?;
            info!(
                remaining = self.processor_queue_count(),
                "Starting processor finalisation"
            );

            // Keep the first escalated failure but never stop draining.
            let mut failure = None;
            loop {
                let next = registered(&self.input, PROCESSOR_QUEUE)?.dequeue().await;
                let Some(item) = next else { break };
                if let Err(e) = self.handle(item).await {
                    failure.get_or_insert(e);
                }
            }

            if let Some(output) = &self.output {
                output.close();
            }
            let finalised = self.plugin.finalise().await;
            info!(
                remaining = self.processor_queue_count(),
                "Finished processor finalisation"
            );

            if let Some(e) = failure {
                return Err(e);
            }
            finalised.map_err(|e| PipelineError::FinaliseFailure {
                stage: StageKind::Processor,
                source: Box::new(e),
            })
        })
    }
}

impl<P: Processor + 'static> ProcessorWorker<P::Input, P::Output> for ProcessorUnit<P> {
    fn register_processor_queue(&mut self, queue: QueueReader<P::Input>) {
        self.input = Some(queue);
    }

    fn register_distributor_queue(&mut self, queue: QueueWriter<P::Output>) {
        self.output = Some(queue);
    }

    fn into_unit(self: Box<Self>) -> Box<dyn WorkerUnit> {
        self
    }
}
