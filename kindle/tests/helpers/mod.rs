use kindle::{
    CancellationToken, Distributor, ErrorPolicy, Loader, Processor, StageComponent, StageFuture,
    StartupParameters,
};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

// Error Types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError(pub String);

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Test error: {}", self.0)
    }
}

impl Error for TestError {}

// Test Components

/// Loads a fixed list of values, then stays idle
pub struct VecLoader {
    pub items: std::vec::IntoIter<u32>,
    pub loaded: Arc<AtomicUsize>,
}

impl VecLoader {
    pub fn new(items: Vec<u32>) -> Self {
        Self {
            items: items.into_iter(),
            loaded: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Doubles every value
pub struct DoublingProcessor;

/// Doubles values, failing on odd ones
pub struct OddFailingProcessor {
    pub escalate: bool,
}

/// Doubles values once its gate is opened
pub struct GatedProcessor {
    pub gate: watch::Receiver<bool>,
    pub finalised: Arc<AtomicUsize>,
}

/// Records every value it receives
#[derive(Default)]
pub struct CollectingDistributor {
    pub received: Arc<Mutex<Vec<u32>>>,
    pub finalised: Arc<AtomicUsize>,
}

/// A distributor whose startup always fails
pub struct BrokenDistributor;

/// A loader that panics on its first load
pub struct PanickingLoader;

/// A loader whose startup never completes
pub struct StalledLoader;

// Implementations
impl StageComponent for VecLoader {
    type Input = ();
    type Output = u32;
    type Error = TestError;

    fn name(&self) -> &str {
        "vec-loader"
    }
}

impl Loader for VecLoader {
    fn load<'a>(
        &'a mut self,
        _cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error> {
        let next = self.items.next();
        if next.is_some() {
            self.loaded.fetch_add(1, Ordering::SeqCst);
        }
        Box::pin(async move { Ok(next) })
    }
}

impl StageComponent for DoublingProcessor {
    type Input = u32;
    type Output = u32;
    type Error = TestError;
}

impl Processor for DoublingProcessor {
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error> {
        Box::pin(async move { Ok(input * 2) })
    }
}

impl StageComponent for OddFailingProcessor {
    type Input = u32;
    type Output = u32;
    type Error = TestError;

    fn on_error(&mut self, _error: &Self::Error, policy: ErrorPolicy) -> ErrorPolicy {
        if self.escalate {
            ErrorPolicy::Escalate
        } else {
            policy
        }
    }
}

impl Processor for OddFailingProcessor {
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error> {
        Box::pin(async move {
            if input % 2 == 1 {
                Err(TestError(format!("odd value {input}")))
            } else {
                Ok(input * 2)
            }
        })
    }
}

impl StageComponent for GatedProcessor {
    type Input = u32;
    type Output = u32;
    type Error = TestError;

    fn finalise(&mut self) -> StageFuture<'_, (), Self::Error> {
        self.finalised.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

impl Processor for GatedProcessor {
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error> {
        let mut gate = self.gate.clone();
        Box::pin(async move {
            gate.wait_for(|open| *open)
                .await
                .map_err(|_| TestError("gate dropped".to_string()))?;
            Ok(input * 2)
        })
    }
}

impl StageComponent for CollectingDistributor {
    type Input = u32;
    type Output = ();
    type Error = TestError;

    fn finalise(&mut self) -> StageFuture<'_, (), Self::Error> {
        self.finalised.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

impl Distributor for CollectingDistributor {
    fn distribute(&mut self, input: Self::Input) -> StageFuture<'_, (), Self::Error> {
        self.received.lock().unwrap().push(input);
        Box::pin(async { Ok(()) })
    }
}

impl StageComponent for BrokenDistributor {
    type Input = u32;
    type Output = ();
    type Error = TestError;

    fn startup<'a>(
        &'a mut self,
        _parameters: &'a StartupParameters,
    ) -> StageFuture<'a, (), Self::Error> {
        Box::pin(async { Err(TestError("no connection".to_string())) })
    }
}

impl Distributor for BrokenDistributor {
    fn distribute(&mut self, _input: Self::Input) -> StageFuture<'_, (), Self::Error> {
        Box::pin(async { Ok(()) })
    }
}

impl StageComponent for PanickingLoader {
    type Input = ();
    type Output = u32;
    type Error = TestError;
}

impl Loader for PanickingLoader {
    fn load<'a>(
        &'a mut self,
        _cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error> {
        panic!("loader lost its source")
    }
}

impl StageComponent for StalledLoader {
    type Input = ();
    type Output = u32;
    type Error = TestError;

    fn startup<'a>(
        &'a mut self,
        _parameters: &'a StartupParameters,
    ) -> StageFuture<'a, (), Self::Error> {
        Box::pin(std::future::pending::<Result<(), TestError>>())
    }
}

impl Loader for StalledLoader {
    fn load<'a>(
        &'a mut self,
        _cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error> {
        Box::pin(async { Ok(None) })
    }
}

// Helper Functions

/// Poll `check` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

pub fn received(values: &Arc<Mutex<Vec<u32>>>) -> Vec<u32> {
    values.lock().unwrap().clone()
}

pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("kindle=debug".parse().unwrap())
                .add_directive("runtime=debug".parse().unwrap()),
        )
        .with_test_writer()
        .with_thread_ids(true)
        .with_target(false)
        .compact()
        .try_init();

    if subscriber.is_err() {
        println!("Warning: tracing already initialized");
    }
}
