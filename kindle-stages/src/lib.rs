//! Kindle Stages
//!
//! Ready-made loader, processor and distributor plugins for the kindle
//! pipeline runtime.
//!
//! # Example
//!
//! ```
//! use kindle::{PipelineFactory, StartupParameters};
//! use kindle_stages::{CollectDistributor, IterLoader, StageError, TransformProcessor};
//!
//! # tokio_test::block_on(async {
//! let collector = CollectDistributor::new();
//! let records = collector.records();
//! let square = TransformProcessor::new("square", |x: u32| Ok::<_, StageError>(x * x));
//!
//! let mut pipeline = PipelineFactory::with_processor(square)
//!     .loader(IterLoader::new(1..=3u32))
//!     .distributor(collector)
//!     .build();
//!
//! pipeline.start(StartupParameters::new()).await.unwrap();
//! while records.len() < 3 {
//!     tokio::time::sleep(std::time::Duration::from_millis(5)).await;
//! }
//! pipeline.stop().await.unwrap();
//! assert_eq!(records.snapshot(), vec![1, 4, 9]);
//! # });
//! ```

#![warn(missing_docs)]

pub mod distributors;
pub mod error;
pub mod latency;
pub mod loaders;
pub mod transform;

pub use distributors::{CollectDistributor, LogDistributor, Records};
pub use error::{Result, StageError};
pub use latency::Jittered;
pub use loaders::{ChannelLoader, IterLoader};
pub use transform::TransformProcessor;
