use super::component::StageComponent;
use super::types::StageFuture;

/// Last stage: consumes distributor-queue items.
pub trait Distributor: StageComponent<Output = ()> {
    fn distribute(&mut self, input: Self::Input) -> StageFuture<'_, (), Self::Error>;
}
