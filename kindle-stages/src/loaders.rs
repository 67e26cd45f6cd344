//! Loader implementations

use kindle::{CancellationToken, Loader, StageComponent, StageFuture};
use std::convert::Infallible;

/// A loader that yields the items of an iterator, one per action
///
/// Once the iterator is exhausted the loader stays idle until shutdown.
pub struct IterLoader<I: Iterator> {
    items: I,
    loaded: usize,
}

impl<I: Iterator> IterLoader<I> {
    /// Creates a loader over anything iterable
    pub fn new(items: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            items: items.into_iter(),
            loaded: 0,
        }
    }

    /// Number of items handed to the pipeline so far
    pub const fn loaded(&self) -> usize {
        self.loaded
    }
}

impl<I> StageComponent for IterLoader<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Input = ();
    type Output = I::Item;
    type Error = Infallible;

    fn name(&self) -> &str {
        "iter-loader"
    }
}

impl<I> Loader for IterLoader<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    fn load<'a>(
        &'a mut self,
        _cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error> {
        let next = self.items.next();
        if next.is_some() {
            self.loaded += 1;
        }
        Box::pin(async move { Ok(next) })
    }
}

/// A loader fed from outside the pipeline through a flume channel
///
/// Each action waits for the next message; the wait ends early when the
/// loader is cancelled. When every sender is gone the loader stays idle.
pub struct ChannelLoader<T> {
    receiver: flume::Receiver<T>,
}

impl<T> ChannelLoader<T> {
    /// Creates a loader reading from an existing receiver
    #[must_use]
    pub const fn new(receiver: flume::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Creates a channel and a loader reading from it. `capacity == 0`
    /// makes the channel unbounded.
    #[must_use]
    pub fn channel(capacity: usize) -> (flume::Sender<T>, Self) {
        let (sender, receiver) = if capacity > 0 {
            flume::bounded(capacity)
        } else {
            flume::unbounded()
        };
        (sender, Self::new(receiver))
    }
}

impl<T: Send + 'static> StageComponent for ChannelLoader<T> {
    type Input = ();
    type Output = T;
    type Error = Infallible;

    fn name(&self) -> &str {
        "channel-loader"
    }
}

impl<T: Send + 'static> Loader for ChannelLoader<T> {
    fn load<'a>(
        &'a mut self,
        cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error> {
        Box::pin(async move {
            tokio::select! {
                received = self.receiver.recv_async() => Ok(received.ok()),
                () = cancel.cancelled() => Ok(None),
            }
        })
    }
}
