//! Letting failed messages continue unchanged.

use super::{message_id, FailureStrategy};
use crate::errors::PipelineError;
use crate::pipeline::{IncomingStepContext, Next};
use crate::validation::{ValidationOutcome, Validator};
use async_trait::async_trait;
use tracing::warn;

/// Continues the pipeline with the failed message unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl FailureStrategy for PassThrough {
    fn name(&self) -> &str {
        "pass_through"
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        next: Next<'_, IncomingStepContext>,
        _validator: &dyn Validator,
        _outcome: ValidationOutcome,
    ) -> Result<(), PipelineError> {
        let envelope = ctx.envelope();
        warn!(
            message_id = %message_id(envelope),
            message_type = %envelope.message_type(),
            "Message {} of type {} is configured to pass through",
            message_id(envelope),
            envelope.message_type()
        );
        next.run(ctx).await
    }
}
