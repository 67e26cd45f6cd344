use super::types::StageFuture;
use crate::config::{ErrorPolicy, StartupParameters};
use std::error::Error;

/// Shared contract of every stage plugin.
///
/// Plugin methods take `&mut self`: a plugin is owned by its stage's task
/// and never shared, so it can keep counters or buffered writers without
/// locking.
pub trait StageComponent: Send {
    type Input: Send + 'static;
    type Output: Send + 'static;
    type Error: Error + Send + Sync + 'static;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once before the stage starts running. An error here is fatal
    /// to the stage and the pipeline does not start.
    fn startup<'a>(
        &'a mut self,
        _parameters: &'a StartupParameters,
    ) -> StageFuture<'a, (), Self::Error> {
        Box::pin(async { Ok(()) })
    }

    /// Called once after the stage has drained its input queue.
    fn finalise(&mut self) -> StageFuture<'_, (), Self::Error> {
        Box::pin(async { Ok(()) })
    }

    /// Sees every action failure. Returns the policy to apply; the default
    /// keeps the one chosen when the pipeline was built.
    fn on_error(&mut self, _error: &Self::Error, policy: ErrorPolicy) -> ErrorPolicy {
        policy
    }
}
