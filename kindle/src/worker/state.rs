use crate::error::{PipelineError, Result};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// The three stage roles of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Loader,
    Processor,
    Distributor,
}

impl StageKind {
    pub const ALL: [Self; 3] = [Self::Loader, Self::Processor, Self::Distributor];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loader => "loader",
            Self::Processor => "processor",
            Self::Distributor => "distributor",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a worker unit.
///
/// `Idle → Running → Draining → Stopped`, or `Idle → Stopped` when startup
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl WorkerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }

    const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Stopped)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, lock-free cell holding a unit's [`WorkerState`].
#[derive(Debug)]
pub struct StageStatus {
    kind: StageKind,
    state: AtomicU8,
}

impl StageStatus {
    #[must_use]
    pub const fn new(kind: StageKind) -> Self {
        Self {
            kind,
            state: AtomicU8::new(WorkerState::Idle as u8),
        }
    }

    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`. Fails if the unit is not in `from` or the
    /// transition is not part of the lifecycle.
    pub(crate) fn advance(&self, from: WorkerState, to: WorkerState) -> Result<()> {
        if !from.can_advance_to(to) {
            return Err(PipelineError::invalid_state(format!(
                "{} cannot move from {from} to {to}",
                self.kind
            )));
        }
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| {
                PipelineError::invalid_state(format!(
                    "{} expected {from} but was {}",
                    self.kind,
                    WorkerState::from_u8(actual)
                ))
            })
    }

    /// Force `Stopped` for a unit whose task died without finishing its
    /// lifecycle.
    pub(crate) fn halt(&self) {
        self.state
            .store(WorkerState::Stopped as u8, Ordering::Release);
    }

    pub(crate) fn expect(&self, expected: WorkerState) -> Result<()> {
        let actual = self.get();
        if actual == expected {
            Ok(())
        } else {
            Err(PipelineError::invalid_state(format!(
                "{} expected {expected} but was {actual}",
                self.kind
            )))
        }
    }
}
