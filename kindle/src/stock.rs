//! Stock plugins the factory substitutes for omitted stages.
//!
//! None of them does useful work; they exist so a pipeline can always be
//! wired and run.

use crate::stage::component::StageComponent;
use crate::stage::distributor::Distributor;
use crate::stage::loader::Loader;
use crate::stage::processor::Processor;
use crate::stage::types::StageFuture;
use std::convert::Infallible;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Loader that never produces an item.
#[derive(Debug)]
pub struct IdleLoader<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> IdleLoader<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for IdleLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> StageComponent for IdleLoader<T> {
    type Input = ();
    type Output = T;
    type Error = Infallible;

    fn name(&self) -> &str {
        "idle-loader"
    }
}

impl<T: Send + 'static> Loader for IdleLoader<T> {
    fn load<'a>(
        &'a mut self,
        _cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error> {
        Box::pin(async { Ok(None) })
    }
}

/// Processor that converts each item with `From`.
#[derive(Debug)]
pub struct ForwardProcessor<I, O> {
    _phantom: PhantomData<fn(I) -> O>,
}

impl<I, O> ForwardProcessor<I, O> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<I, O> Default for ForwardProcessor<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> StageComponent for ForwardProcessor<I, O>
where
    I: Send + 'static,
    O: From<I> + Send + 'static,
{
    type Input = I;
    type Output = O;
    type Error = Infallible;

    fn name(&self) -> &str {
        "forward-processor"
    }
}

impl<I, O> Processor for ForwardProcessor<I, O>
where
    I: Send + 'static,
    O: From<I> + Send + 'static,
{
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error> {
        let output = O::from(input);
        Box::pin(async move { Ok(output) })
    }
}

/// Distributor that drops every item.
#[derive(Debug)]
pub struct DiscardDistributor<T> {
    _phantom: PhantomData<fn(T)>,
}

impl<T> DiscardDistributor<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for DiscardDistributor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> StageComponent for DiscardDistributor<T> {
    type Input = T;
    type Output = ();
    type Error = Infallible;

    fn name(&self) -> &str {
        "discard-distributor"
    }
}

impl<T: Send + 'static> Distributor for DiscardDistributor<T> {
    fn distribute(&mut self, input: Self::Input) -> StageFuture<'_, (), Self::Error> {
        drop(input);
        Box::pin(async { Ok(()) })
    }
}
