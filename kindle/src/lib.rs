//! Kindle is a three-stage concurrent pipeline runtime.
//!
//! A [`Loader`] produces items, a [`Processor`] transforms them and a
//! [`Distributor`] consumes the results. Each stage runs as its own tokio
//! task and the stages talk only through two bounded queues:
//!
//! ```text
//! Loader ──▶ processor queue ──▶ Processor ──▶ distributor queue ──▶ Distributor
//! ```
//!
//! A full queue suspends its producer (backpressure). On shutdown no new
//! actions start, and every stage drains what is left in its input queue
//! before it stops, so nothing that was enqueued is lost.

pub mod composer;
pub mod config;
pub mod error;
pub mod queue;
pub mod stage;
pub mod stock;
pub mod worker;

// Re-export main types for easier access
pub use composer::{Pipeline, PipelineFactory};
pub use config::{ErrorPolicy, PipelineConfig, ShutdownPolicy, StartupParameters};
pub use error::{BoxError, PipelineError, Result};
pub use queue::{BoundedQueue, QueueProbe, QueueReader, QueueWriter};
pub use stage::component::StageComponent;
pub use stage::distributor::Distributor;
pub use stage::loader::Loader;
pub use stage::processor::Processor;
pub use stage::types::StageFuture;
pub use stock::{DiscardDistributor, ForwardProcessor, IdleLoader};
pub use tokio_util::sync::CancellationToken;
pub use worker::{StageKind, WorkerState, WorkerUnit};
