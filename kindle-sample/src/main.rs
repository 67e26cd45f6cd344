use kindle::{
    ErrorPolicy, PipelineConfig, PipelineFactory, Processor, ShutdownPolicy, StageComponent,
    StageFuture, StartupParameters,
};
use kindle_stages::{IterLoader, Jittered, LogDistributor};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Custom error type for our example
#[derive(Debug, Error)]
enum SampleError {
    #[error("divisor must be non-zero")]
    ZeroDivisor,
}

/// Output of the processor stage
#[derive(Debug, Clone, Copy)]
struct Halved {
    value: u64,
    half: u64,
}

impl fmt::Display for Halved {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.value, self.half)
    }
}

/// Divides every value by a divisor taken from the startup parameters
struct HalvingProcessor {
    divisor: u64,
}

impl StageComponent for HalvingProcessor {
    type Input = u64;
    type Output = Halved;
    type Error = SampleError;

    fn name(&self) -> &str {
        "halving-processor"
    }

    fn startup<'a>(
        &'a mut self,
        parameters: &'a StartupParameters,
    ) -> StageFuture<'a, (), Self::Error> {
        let divisor = parameters.get_parsed("divisor").unwrap_or(2);
        Box::pin(async move {
            if divisor == 0 {
                return Err(SampleError::ZeroDivisor);
            }
            self.divisor = divisor;
            Ok(())
        })
    }
}

impl Processor for HalvingProcessor {
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error> {
        let halved = Halved {
            value: input,
            half: input / self.divisor,
        };
        Box::pin(async move { Ok(halved) })
    }
}

/// Demo settings, read from `KINDLE_*` environment variables
#[derive(Debug)]
struct Settings {
    items: u64,
    run_for: Duration,
    seed: u64,
    processor_queue_bound: usize,
    distributor_queue_bound: usize,
    divisor: u64,
}

impl Settings {
    fn from_env() -> Self {
        Self {
            items: env_or("KINDLE_ITEMS", 200),
            run_for: Duration::from_millis(env_or("KINDLE_RUN_MS", 2_000)),
            seed: env_or("KINDLE_SEED", 57_000),
            processor_queue_bound: env_or("KINDLE_PROCESSOR_BOUND", 16),
            distributor_queue_bound: env_or("KINDLE_DISTRIBUTOR_BOUND", 0),
            divisor: env_or("KINDLE_DIVISOR", 2),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, raw, "Ignoring unparseable setting");
            default
        }),
        Err(_) => default,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kindle=info,kindle_sample=info,kindle_stages=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let settings = Settings::from_env();
    info!(?settings, "Starting sample pipeline");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let config = PipelineConfig::default()
            .with_processor_queue_bound(settings.processor_queue_bound)
            .with_distributor_queue_bound(settings.distributor_queue_bound)
            .with_shutdown_policy(ShutdownPolicy::LoaderOnly)
            .with_error_policy(ErrorPolicy::LogAndContinue);

        let loader = Jittered::seeded(
            IterLoader::new(0..settings.items),
            Duration::from_millis(1),
            Duration::from_millis(20),
            settings.seed,
        );
        let distributor = Jittered::seeded(
            LogDistributor::<Halved>::new("halved"),
            Duration::from_millis(1),
            Duration::from_millis(25),
            settings.seed.wrapping_add(1),
        );

        let mut pipeline = PipelineFactory::with_processor(HalvingProcessor { divisor: 2 })
            .config(config)
            .loader(loader)
            .distributor(distributor)
            .build();

        let parameters = StartupParameters::new().with("divisor", settings.divisor.to_string());
        pipeline.start(parameters).await?;

        let shutdown = pipeline.shutdown_token();
        tokio::select! {
            () = tokio::time::sleep(settings.run_for) => info!("Run time elapsed"),
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            () = shutdown.cancelled() => warn!("Pipeline shut itself down"),
        }

        info!(
            processor_queue = pipeline.processor_queue_count(),
            distributor_queue = pipeline.distributor_queue_count(),
            "Draining"
        );
        pipeline.stop().await?;
        info!(states = ?pipeline.states(), "Sample finished");
        Ok::<(), Box<dyn Error>>(())
    })
}
