use super::policy::settle;
use super::state::{StageKind, StageStatus, WorkerState};
use super::unit::{
    idle, registered, DistributorWorker, UnitFuture, UnitSettings, WorkerUnit, DISTRIBUTOR_QUEUE,
};
use crate::config::StartupParameters;
use crate::error::{PipelineError, Result};
use crate::queue::QueueReader;
use crate::stage::distributor::Distributor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs a [`Distributor`] plugin off the distributor queue.
pub struct DistributorUnit<D: Distributor> {
    plugin: D,
    input: Option<QueueReader<D::Input>>,
    status: Arc<StageStatus>,
    settings: UnitSettings,
}

impl<D: Distributor> DistributorUnit<D> {
    #[must_use]
    pub fn new(plugin: D) -> Self {
        Self {
            plugin,
            input: None,
            status: Arc::new(StageStatus::new(StageKind::Distributor)),
            settings: UnitSettings::default(),
        }
    }

    pub fn plugin(&self) -> &D {
        &self.plugin
    }

    pub async fn dequeue(&self) -> Option<D::Input> {
        match &self.input {
            Some(input) => input.dequeue().await,
            None => None,
        }
    }

    pub fn try_dequeue(&self) -> Option<D::Input> {
        self.input.as_ref().and_then(QueueReader::try_dequeue)
    }

    pub fn distributor_queue_count(&self) -> usize {
        self.input.as_ref().map_or(0, QueueReader::count)
    }

    async fn handle(&mut self, item: D::Input) -> Result<()> {
        let distributed = self.plugin.distribute(item).await;
        match distributed {
            Ok(()) => Ok(()),
            Err(e) => settle(
                StageKind::Distributor,
                &mut self.plugin,
                self.settings.error_policy,
                e,
            ),
        }
    }
}

impl<D: Distributor + 'static> WorkerUnit for DistributorUnit<D> {
    fn kind(&self) -> StageKind {
        StageKind::Distributor
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
            registered(&self.input, DISTRIBUTOR_QUEUE)?;
            self.plugin
                .startup(parameters)
                .await
                .map_err(|e| PipelineError::StartupFailure {
                    stage: StageKind::Distributor,
                    source: Box::new(e),
                })
        })
    }

    fn action<'a>(&'a mut self, cancel: &'a CancellationToken) -> UnitFuture<'a> {
        Box::pin(async move {
            let next = registered(&self.input, DISTRIBUTOR_QUEUE)?.try_dequeue();
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
                remaining = self.distributor_queue_count(),
                "Starting distributor finalisation"
            );

            let mut failure = None;
            // Ends once the upstream stage has closed the queue and it is empty
            loop {
                let next = registered(&self.input, DISTRIBUTOR_QUEUE)?.dequeue().await;
                let Some(item) = next else { break };
                if let Err(e) = self.handle(item).await {
                    failure.get_or_insert(e);
                }
            }

            let finalised = self.plugin.finalise().await;
            info!(
                remaining = self.distributor_queue_count(),
                "Finished distributor finalisation"
            );

            if let Some(e) = failure {
                return Err(e);
            }
            finalised.map_err(|e| PipelineError::FinaliseFailure {
                stage: StageKind::Distributor,
                source: Box::new(e),
            })
        })
    }
}

impl<D: Distributor + 'static> DistributorWorker<D::Input> for DistributorUnit<D> {
    fn register_distributor_queue(&mut self, queue: QueueReader<D::Input>) {
        self.input = Some(queue);
    }

    fn into_unit(self: Box<Self>) -> Box<dyn WorkerUnit> {
        self
    }
}
