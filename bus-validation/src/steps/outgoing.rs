//! Validation of sent messages.

use super::{resolve, validate};
use crate::errors::{PipelineError, ValidationFailure};
use crate::message::headers;
use crate::pipeline::{Next, OutgoingStepContext, Step};
use crate::validation::ValidatorFactory;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Rejects outgoing messages that fail validation before they reach the
/// transport.
pub struct ValidateOutgoingStep {
    factory: Arc<dyn ValidatorFactory>,
}

impl ValidateOutgoingStep {
    /// The step's name in the outgoing pipeline.
    pub const NAME: &'static str = "validate-outgoing";

    /// Creates the step.
    #[must_use]
    pub fn new(factory: Arc<dyn ValidatorFactory>) -> Self {
        Self { factory }
    }
}

impl fmt::Debug for ValidateOutgoingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateOutgoingStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step<OutgoingStepContext> for ValidateOutgoingStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(
        &self,
        ctx: &mut OutgoingStepContext,
        next: Next<'_, OutgoingStepContext>,
    ) -> Result<(), PipelineError> {
        let message_type = ctx.envelope().message_type();
        let Some(validator) = resolve(self.factory.as_ref(), &message_type) else {
            return next.run(ctx).await;
        };

        let body = Arc::clone(&ctx.envelope().body);
        let outcome = validate(validator.as_ref(), body.as_ref(), ctx.cancellation()).await?;
        ctx.envelope_mut().headers.insert(
            headers::VALIDATOR_TYPE.to_string(),
            validator.validator_type().name().to_string(),
        );

        if !outcome.is_valid() {
            debug!(
                message_type = %message_type,
                destination = ctx.destination(),
                "Message of type {} failed to validate: {}",
                message_type,
                outcome
            );
            return Err(ValidationFailure::new(message_type, &outcome).into());
        }
        next.run(ctx).await
    }
}
