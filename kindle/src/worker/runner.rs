use super::state::WorkerState;
use super::unit::WorkerUnit;
use crate::config::StartupParameters;
use crate::error::{PipelineError, Result};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a unit's startup, reported back to `Pipeline::start`.
pub(crate) type StartupReport = oneshot::Sender<Result<()>>;

/// Drives one unit through `Idle → Running → Draining → Stopped`.
pub(crate) struct UnitRunner {
    pub(crate) unit: Box<dyn WorkerUnit>,
    /// Fires when this stage should stop taking new actions.
    pub(crate) cancel: CancellationToken,
    /// Pipeline-wide shutdown, fired by an escalated failure.
    pub(crate) shutdown: CancellationToken,
    /// Cancelled once this stage has stopped.
    pub(crate) downstream: Option<CancellationToken>,
}

impl UnitRunner {
    #[instrument(skip_all, fields(stage = %self.unit.kind(), plugin = self.unit.name()))]
    pub(crate) async fn run(
        mut self,
        parameters: StartupParameters,
        report: StartupReport,
    ) -> Result<()> {
        let status = self.unit.status();
        // Cancels the next stage when this task ends, unwinding included.
        let _cascade = self.downstream.clone().map(CancellationToken::drop_guard);

        let started = tokio::select! {
            biased;
            started = self.unit.startup(&parameters) => Some(started),
            () = self.cancel.cancelled() => None,
        };
        let failure = match started {
            Some(Ok(())) => None,
            Some(Err(e)) => Some(e),
            None => Some(PipelineError::invalid_state(format!(
                "{} cancelled during startup",
                self.unit.kind()
            ))),
        };
        if let Some(e) = failure {
            error!(error = %e, "Startup failed");
            status.advance(WorkerState::Idle, WorkerState::Stopped)?;
            if let Err(Err(e)) = report.send(Err(e)) {
                // start() is gone; nobody else will see this failure
                warn!(error = %e, "Startup failure went unreported");
            }
            return Ok(());
        }

        status.advance(WorkerState::Idle, WorkerState::Running)?;
        if report.send(Ok(())).is_err() {
            warn!("Startup success went unreported, pipeline handle dropped");
        }
        info!("Stage running");

        let mut escalated = None;
        while !self.cancel.is_cancelled() && !self.unit.input_drained() {
            if let Err(e) = self.unit.action(&self.cancel).await {
                error!(error = %e, "Escalating action failure, shutting pipeline down");
                self.shutdown.cancel();
                escalated = Some(e);
                break;
            }
        }

        status.advance(WorkerState::Running, WorkerState::Draining)?;
        debug!("Stage draining");
        let drained = self.unit.finalise().await;
        status.advance(WorkerState::Draining, WorkerState::Stopped)?;
        info!("Stage stopped");

        if let Err(ref e) = drained {
            error!(error = %e, "Stage finalisation failed");
        }
        match escalated {
            Some(e) => Err(e),
            None => drained,
        }
    }
}

/// Map a stage task's join result into the pipeline's error type.
pub(crate) fn join_outcome(
    stage: super::state::StageKind,
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    joined.unwrap_or_else(|e| {
        Err(PipelineError::Join {
            stage,
            message: e.to_string(),
        })
    })
}
