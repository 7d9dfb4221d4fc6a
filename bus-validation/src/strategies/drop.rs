//! Dropping failed messages.

use super::{message_id, FailureStrategy};
use crate::errors::PipelineError;
use crate::pipeline::{IncomingStepContext, Next};
use crate::validation::{ValidationOutcome, Validator};
use async_trait::async_trait;
use tracing::warn;

/// Discards the failed message. The remainder of the pipeline does not run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropMessage;

#[async_trait]
impl FailureStrategy for DropMessage {
    fn name(&self) -> &str {
        "drop"
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        _next: Next<'_, IncomingStepContext>,
        _validator: &dyn Validator,
        _outcome: ValidationOutcome,
    ) -> Result<(), PipelineError> {
        let envelope = ctx.envelope();
        warn!(
            message_id = %message_id(envelope),
            message_type = %envelope.message_type(),
            "Message {} of type {} is configured to be dropped",
            message_id(envelope),
            envelope.message_type()
        );
        Ok(())
    }
}
