use super::state::StageKind;
use crate::config::ErrorPolicy;
use crate::error::{PipelineError, Result};
use crate::stage::component::StageComponent;
use tracing::warn;

/// Run a plugin failure through its `on_error` hook and apply the policy it
/// returns.
pub(crate) fn settle<C>(
    stage: StageKind,
    plugin: &mut C,
    policy: ErrorPolicy,
    error: C::Error,
) -> Result<()>
where
    C: StageComponent + ?Sized,
{
    match plugin.on_error(&error, policy) {
        ErrorPolicy::Ignore => Ok(()),
        ErrorPolicy::LogAndContinue => {
            warn!(%stage, plugin = plugin.name(), error = %error, "Action failed, continuing");
            Ok(())
        }
        ErrorPolicy::Escalate => Err(PipelineError::ActionFailure {
            stage,
            source: Box::new(error),
        }),
    }
}
