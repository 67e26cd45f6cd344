//! Worker units: the runtime side of each stage.
//!
//! A unit wraps one plugin, holds the queue handles the factory registered
//! on it and implements [`WorkerUnit`], the lifecycle the orchestrator drives.

pub mod distributor;
pub mod loader;
mod policy;
pub mod processor;
pub(crate) mod runner;
pub mod state;
pub mod unit;

pub use distributor::DistributorUnit;
pub use loader::LoaderUnit;
pub use processor::ProcessorUnit;
pub use state::{StageKind, StageStatus, WorkerState};
pub use unit::{
    DistributorWorker, LoaderWorker, ProcessorWorker, UnitFuture, UnitSettings, WorkerUnit,
};
