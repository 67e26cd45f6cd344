use super::component::StageComponent;
use super::types::StageFuture;

/// Middle stage: transforms one processor-queue item into one
/// distributor-queue item.
pub trait Processor: StageComponent {
    fn process(&mut self, input: Self::Input) -> StageFuture<'_, Self::Output, Self::Error>;
}
