//! Distributor implementations

use kindle::{Distributor, StageComponent, StageFuture};
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Shared view of the items a [`CollectDistributor`] has received
#[derive(Debug)]
pub struct Records<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Records<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Records<T> {
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of items received so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing has been received yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the received items, in arrival order
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.lock().clone()
    }
}

/// A distributor that records every item it receives
#[derive(Debug)]
pub struct CollectDistributor<T> {
    records: Records<T>,
}

impl<T> CollectDistributor<T> {
    /// Creates an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Records {
                items: Arc::new(Mutex::new(Vec::new())),
            },
        }
    }

    /// Handle for reading the records from outside the pipeline
    #[must_use]
    pub fn records(&self) -> Records<T> {
        self.records.clone()
    }
}

impl<T> Default for CollectDistributor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> StageComponent for CollectDistributor<T> {
    type Input = T;
    type Output = ();
    type Error = Infallible;

    fn name(&self) -> &str {
        "collect-distributor"
    }
}

impl<T: Send + 'static> Distributor for CollectDistributor<T> {
    fn distribute(&mut self, input: Self::Input) -> StageFuture<'_, (), Self::Error> {
        self.records.lock().push(input);
        Box::pin(async { Ok(()) })
    }
}

/// A distributor that logs every item through `tracing`
pub struct LogDistributor<T> {
    label: String,
    distributed: u64,
    _phantom: std::marker::PhantomData<fn(T)>,
}

impl<T> LogDistributor<T> {
    /// Creates a logger whose lines are tagged with `label`
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            distributed: 0,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Number of items logged so far
    pub const fn distributed(&self) -> u64 {
        self.distributed
    }
}

impl<T: Display + Send + 'static> StageComponent for LogDistributor<T> {
    type Input = T;
    type Output = ();
    type Error = Infallible;

    fn name(&self) -> &str {
        &self.label
    }

    fn finalise(&mut self) -> StageFuture<'_, (), Self::Error> {
        info!(label = %self.label, total = self.distributed, "Distribution finished");
        Box::pin(async { Ok(()) })
    }
}

impl<T: Display + Send + 'static> Distributor for LogDistributor<T> {
    fn distribute(&mut self, input: Self::Input) -> StageFuture<'_, (), Self::Error> {
        self.distributed += 1;
        info!(label = %self.label, seq = self.distributed, "{input}");
        Box::pin(async { Ok(()) })
    }
}
