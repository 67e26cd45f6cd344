use crate::config::{PipelineConfig, ShutdownPolicy, StartupParameters};
use crate::error::{PipelineError, Result};
use crate::queue::QueueProbe;
use crate::worker::runner::{join_outcome, UnitRunner};
use crate::worker::{StageKind, StageStatus, WorkerState, WorkerUnit};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

type JoinResult = std::result::Result<Result<()>, JoinError>;

/// A wired loader → processor → distributor pipeline.
///
/// Built by [`PipelineFactory`](super::PipelineFactory). Each stage runs as
/// its own tokio task once [`Pipeline::start`] is called; [`Pipeline::stop`]
/// signals shutdown according to the configured [`ShutdownPolicy`] and waits
/// for every stage to drain.
pub struct Pipeline<A, B> {
    config: PipelineConfig,
    /// Loader, processor, distributor; taken on start
    units: Option<[Box<dyn WorkerUnit>; 3]>,
    statuses: [Arc<StageStatus>; 3],
    processor_queue: QueueProbe<A>,
    distributor_queue: QueueProbe<B>,
    shutdown: CancellationToken,
    /// Per-stage cancellation, same order as `units`
    tokens: [CancellationToken; 3],
    handles: Vec<(StageKind, JoinHandle<Result<()>>)>,
}

impl<A, B> Pipeline<A, B> {
    pub(crate) fn new(
        config: PipelineConfig,
        units: [Box<dyn WorkerUnit>; 3],
        processor_queue: QueueProbe<A>,
        distributor_queue: QueueProbe<B>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let downstream = || match config.shutdown_policy {
            ShutdownPolicy::LoaderOnly => CancellationToken::new(),
            ShutdownPolicy::AllStages => shutdown.child_token(),
        };
        let tokens = [shutdown.child_token(), downstream(), downstream()];
        let statuses = [units[0].status(), units[1].status(), units[2].status()];

        Self {
            config,
            units: Some(units),
            statuses,
            processor_queue,
            distributor_queue,
            shutdown,
            tokens,
            handles: Vec::new(),
        }
    }

    /// Run every stage's startup and begin their loops concurrently.
    ///
    /// Returns once all three stages are running. If any startup fails the
    /// other stages are shut down and the first failure is returned.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyStarted`] on a second call, or the first
    /// [`PipelineError::StartupFailure`].
    #[instrument(skip_all)]
    pub async fn start(&mut self, parameters: StartupParameters) -> Result<()> {
        let units = self.units.take().ok_or(PipelineError::AlreadyStarted)?;
        info!(
            shutdown_policy = ?self.config.shutdown_policy,
            error_policy = ?self.config.error_policy,
            "Starting pipeline"
        );

        let mut reports = FuturesUnordered::new();
        for (index, unit) in units.into_iter().enumerate() {
            let kind = unit.kind();
            let (report, startup) = oneshot::channel();
            let runner = UnitRunner {
                unit,
                cancel: self.tokens[index].clone(),
                shutdown: self.shutdown.clone(),
                downstream: self.tokens.get(index + 1).cloned(),
            };
            let handle = tokio::spawn(runner.run(parameters.clone(), report));
            self.handles.push((kind, handle));
            reports.push(async move { (kind, startup.await) });
        }

        while let Some((kind, startup)) = reports.next().await {
            let outcome = startup.unwrap_or_else(|_| {
                Err(PipelineError::Join {
                    stage: kind,
                    message: "stage exited before reporting startup".to_string(),
                })
            });
            if let Err(e) = outcome {
                error!(stage = %kind, error = %e, "Pipeline failed to start");
                self.abort().await;
                return Err(e);
            }
        }

        info!("Pipeline running");
        Ok(())
    }

    /// Signal shutdown and wait for every stage to drain and stop.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotStarted`] if the pipeline never started, otherwise
    /// the first escalated or finalisation failure of any stage.
    #[instrument(skip_all)]
    pub async fn stop(&mut self) -> Result<()> {
        if self.units.is_some() {
            return Err(PipelineError::NotStarted);
        }
        info!(
            processor_queue = self.processor_queue_count(),
            distributor_queue = self.distributor_queue_count(),
            "Stopping pipeline"
        );
        self.shutdown.cancel();
        self.join().await
    }

    /// Wait for every stage to stop without signalling shutdown.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::stop`].
    pub async fn join(&mut self) -> Result<()> {
        if self.units.is_some() {
            return Err(PipelineError::NotStarted);
        }
        let mut failure = None;
        for (kind, handle) in std::mem::take(&mut self.handles) {
            if let Err(e) = self.settle_stage(kind, handle.await) {
                warn!(stage = %kind, error = %e, "Stage stopped with an error");
                failure.get_or_insert(e);
            }
        }
        info!("Pipeline stopped");
        failure.map_or(Ok(()), Err)
    }

    async fn abort(&mut self) {
        self.shutdown.cancel();
        for token in &self.tokens {
            token.cancel();
        }
        for (kind, handle) in std::mem::take(&mut self.handles) {
            if let Err(e) = self.settle_stage(kind, handle.await) {
                warn!(stage = %kind, error = %e, "Stage failed while aborting");
            }
        }
    }

    /// A task that panicked never finished its lifecycle; record it as
    /// stopped so the pipeline state stays consistent.
    fn settle_stage(&self, stage: StageKind, joined: JoinResult) -> Result<()> {
        if joined.is_err() {
            self.statuses[Self::index(stage)].halt();
        }
        join_outcome(stage, joined)
    }

    const fn index(stage: StageKind) -> usize {
        match stage {
            StageKind::Loader => 0,
            StageKind::Processor => 1,
            StageKind::Distributor => 2,
        }
    }

    /// Token that stops the pipeline when cancelled, for callers that want
    /// to trigger or observe shutdown from elsewhere.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Items waiting between the loader and the processor.
    pub fn processor_queue_count(&self) -> usize {
        self.processor_queue.count()
    }

    /// Items waiting between the processor and the distributor.
    pub fn distributor_queue_count(&self) -> usize {
        self.distributor_queue.count()
    }

    pub fn state(&self, stage: StageKind) -> WorkerState {
        self.statuses[Self::index(stage)].get()
    }

    pub fn states(&self) -> [(StageKind, WorkerState); 3] {
        StageKind::ALL.map(|stage| (stage, self.state(stage)))
    }

    /// True while any stage has not stopped since `start`.
    pub fn is_running(&self) -> bool {
        self.units.is_none()
            && self
                .statuses
                .iter()
                .any(|status| status.get() != WorkerState::Stopped)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl<A, B> Drop for Pipeline<A, B> {
    fn drop(&mut self) {
        // Stages keep draining in the background; they are not left running.
        self.shutdown.cancel();
    }
}
