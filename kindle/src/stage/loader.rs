use super::component::StageComponent;
use super::types::StageFuture;
use tokio_util::sync::CancellationToken;

/// First stage: produces items for the processor queue.
pub trait Loader: StageComponent<Input = ()> {
    /// Produce at most one item. `None` means nothing is ready yet and the
    /// stage applies its idle pause. The token lets a long wait end early
    /// on shutdown.
    fn load<'a>(
        &'a mut self,
        cancel: &'a CancellationToken,
    ) -> StageFuture<'a, Option<Self::Output>, Self::Error>;
}
