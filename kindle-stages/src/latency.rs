//! Simulated latency for demos and load tests
//!
//! [`Jittered`] wraps any plugin and sleeps for a random duration before each
//! call. The random source is injected, so a fixed seed gives the same
//! sequence of delays on every run.

use kindle::{
    CancellationToken, Distributor, ErrorPolicy, Loader, Processor, StageComponent, StageFuture,
    StartupParameters,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// A plugin wrapper that adds a random delay in `[min, max]` to every call
pub struct Jittered<P> {
    inner: P,
    min: Duration,
    max: Duration,
    rng: StdRng,
}

impl<P> Jittered<P> {
    /// Wraps `inner`, drawing delays from `rng`. The bounds may be given in
    /// either order.
    #[must_use]
    pub fn new(inner: P, min: Duration, max: Duration, rng: StdRng) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            inner,
            min,
            max,
            rng,
        }
    }

    /// Wraps `inner` with a deterministic random source
    #[must_use]
    pub fn seeded(inner: P, min: Duration, max: Duration, seed: u64) -> Self {
        Self::new(inner, min, max, StdRng::seed_from_u64(seed))
    }

    /// The wrapped plugin
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    /// Draw the next delay
    pub fn next_delay(&mut self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        self.rng.gen_range(self.min..=self.max)
    }
}

impl<P: StageComponent> StageComponent for Jittered<P> {
    type Input = P::Input;
    type Output = P::Output;
    type Error = P::Error;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn startup<'a>(
        &'a mut self,
        parameters: &'a StartupParameters,
    ) -> StageFuture<'a, (), Self::Error> {
        self.inner.startup(parameters)
    }

    fn finalise(&mut self) -> StageFuture<'_, (), Self::Error> {
        self.inner.finalise()
    }

    fn on_error(&mut self, error: &Self::Error, policy: ErrorPolicy) -> ErrorPolicy {
        self.inner.on_error(error, policy)
    }
}

impl<L: Loader> Loader for Jittered<L> {
    fn load<'a>(
        &'a mut self,
        cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error> {
        let delay = self.next_delay();
        Box::pin(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => self.inner.load(cancel).await,
                () = cancel.cancelled() => Ok(None),
            }
        })
    }
}

impl<P: Processor> Processor for Jittered<P> {
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error> {
        let delay = self.next_delay();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            self.inner.process(input).await
        })
    }
}

impl<D: Distributor> Distributor for Jittered<D> {
    fn distribute(&mut self, input: Self::Input) -> StageFuture<'_, (), Self::Error> {
        let delay = self.next_delay();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            self.inner.distribute(input).await
        })
    }
}
