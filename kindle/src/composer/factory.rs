use super::Pipeline;
use crate::config::PipelineConfig;
use crate::queue::BoundedQueue;
use crate::stage::{distributor::Distributor, loader::Loader, processor::Processor};
use crate::stock::{DiscardDistributor, ForwardProcessor, IdleLoader};
use crate::worker::unit::{DISTRIBUTOR_QUEUE, PROCESSOR_QUEUE};
use crate::worker::{
    DistributorUnit, DistributorWorker, LoaderUnit, LoaderWorker, ProcessorUnit, ProcessorWorker,
    UnitSettings,
};
use tracing::debug;

/// Assembles a fully wired [`Pipeline`].
///
/// Any stage left unset is filled with a stock plugin: [`IdleLoader`],
/// [`ForwardProcessor`] or [`DiscardDistributor`].
///
/// # Examples
///
/// ```
/// use kindle::{PipelineFactory, StartupParameters};
///
/// # tokio_test::block_on(async {
/// let mut pipeline = PipelineFactory::<u32, u64>::new()
///     .processor_queue_bound(16)
///     .build();
///
/// pipeline.start(StartupParameters::new()).await.unwrap();
/// assert_eq!(pipeline.processor_queue_count(), 0);
/// pipeline.stop().await.unwrap();
/// # });
/// ```
pub struct PipelineFactory<A, B> {
    loader: Box<dyn LoaderWorker<A>>,
    processor: Box<dyn ProcessorWorker<A, B>>,
    distributor: Box<dyn DistributorWorker<B>>,
    config: PipelineConfig,
}

impl<A, B> PipelineFactory<A, B>
where
    A: Send + 'static,
    B: From<A> + Send + 'static,
{
    /// A factory whose processor forwards items with `B::from`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_processor(ForwardProcessor::new())
    }
}

impl<A, B> Default for PipelineFactory<A, B>
where
    A: Send + 'static,
    B: From<A> + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, B> PipelineFactory<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    /// A factory for payload types with no conversion between them.
    #[must_use]
    pub fn with_processor<P>(processor: P) -> Self
    where
        P: Processor<Input = A, Output = B> + 'static,
    {
        Self {
            loader: Box::new(LoaderUnit::new(IdleLoader::new())),
            processor: Box::new(ProcessorUnit::new(processor)),
            distributor: Box::new(DistributorUnit::new(DiscardDistributor::new())),
            config: PipelineConfig::default(),
        }
    }

    #[must_use]
    pub fn loader<L>(mut self, loader: L) -> Self
    where
        L: Loader<Output = A> + 'static,
    {
        self.loader = Box::new(LoaderUnit::new(loader));
        self
    }

    #[must_use]
    pub fn processor<P>(mut self, processor: P) -> Self
    where
        P: Processor<Input = A, Output = B> + 'static,
    {
        self.processor = Box::new(ProcessorUnit::new(processor));
        self
    }

    #[must_use]
    pub fn distributor<D>(mut self, distributor: D) -> Self
    where
        D: Distributor<Input = B> + 'static,
    {
        self.distributor = Box::new(DistributorUnit::new(distributor));
        self
    }

    /// Bound of the loader → processor queue; 0 means unbounded.
    #[must_use]
    pub const fn processor_queue_bound(mut self, bound: usize) -> Self {
        self.config.processor_queue_bound = bound;
        self
    }

    /// Bound of the processor → distributor queue; 0 means unbounded.
    #[must_use]
    pub const fn distributor_queue_bound(mut self, bound: usize) -> Self {
        self.config.distributor_queue_bound = bound;
        self
    }

    /// Replace the whole configuration, bounds included.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Create both queues, register them on the units and hand back the
    /// pipeline, ready to start.
    #[must_use]
    pub fn build(self) -> Pipeline<A, B> {
        let Self {
            mut loader,
            mut processor,
            mut distributor,
            config,
        } = self;

        let (processor_writer, processor_reader) =
            BoundedQueue::new(PROCESSOR_QUEUE, config.processor_queue_bound).split();
        let (distributor_writer, distributor_reader) =
            BoundedQueue::new(DISTRIBUTOR_QUEUE, config.distributor_queue_bound).split();
        let processor_queue = processor_writer.probe();
        let distributor_queue = distributor_writer.probe();

        loader.register_processor_queue(processor_writer);
        processor.register_processor_queue(processor_reader);
        processor.register_distributor_queue(distributor_writer);
        distributor.register_distributor_queue(distributor_reader);

        let settings = UnitSettings::from(&config);
        let mut units = [
            loader.into_unit(),
            processor.into_unit(),
            distributor.into_unit(),
        ];
        for unit in &mut units {
            unit.configure(settings);
        }

        debug!(
            loader = units[0].name(),
            processor = units[1].name(),
            distributor = units[2].name(),
            processor_queue_bound = config.processor_queue_bound,
            distributor_queue_bound = config.distributor_queue_bound,
            "Pipeline wired"
        );

        Pipeline::new(config, units, processor_queue, distributor_queue)
    }
}
