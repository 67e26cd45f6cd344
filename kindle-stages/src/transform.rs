//! Transform processors for pipeline items

use kindle::{Processor, StageComponent, StageFuture};
use std::marker::PhantomData;

/// A processor that maps each item through a fallible function
///
/// The function may keep state between calls; it runs on the processor's
/// task only.
pub struct TransformProcessor<I, O, F, E>
where
    F: FnMut(I) -> Result<O, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    name: String,
    transform: F,
    _phantom: PhantomData<fn(I) -> Result<O, E>>,
}

impl<I, O, F, E> TransformProcessor<I, O, F, E>
where
    F: FnMut(I) -> Result<O, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Creates a new transform processor with the given transformation function
    #[must_use]
    pub fn new(name: impl Into<String>, transform: F) -> Self {
        Self {
            name: name.into(),
            transform,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F, E> StageComponent for TransformProcessor<I, O, F, E>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Result<O, E> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }
}

impl<I, O, F, E> Processor for TransformProcessor<I, O, F, E>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Result<O, E> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error> {
        let output = (self.transform)(input);
        Box::pin(async move { output })
    }
}
