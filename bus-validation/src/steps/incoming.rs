//! Validation of received messages.

use super::{resolve, validate};
use crate::errors::PipelineError;
use crate::message::headers;
use crate::pipeline::{IncomingStepContext, Next, Step};
use crate::strategies::StrategyTable;
use crate::validation::ValidatorFactory;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Validates every received body that has a validator and hands failures to
/// the strategy registered for the body's type.
///
/// Messages without a validator pass through untouched. Whenever a validator
/// ran, the `ValidatorType` header names it.
pub struct ValidateIncomingStep {
    factory: Arc<dyn ValidatorFactory>,
    strategies: Arc<StrategyTable>,
}

impl ValidateIncomingStep {
    /// The step's name in the incoming pipeline.
    pub const NAME: &'static str = "validate-incoming";

    /// Creates the step.
    #[must_use]
    pub fn new(factory: Arc<dyn ValidatorFactory>, strategies: Arc<StrategyTable>) -> Self {
        Self {
            factory,
            strategies,
        }
    }

    /// Returns the strategy table.
    #[must_use]
    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }
}

impl fmt::Debug for ValidateIncomingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateIncomingStep")
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step<IncomingStepContext> for ValidateIncomingStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        next: Next<'_, IncomingStepContext>,
    ) -> Result<(), PipelineError> {
        let message_type = ctx.envelope().message_type();
        let Some(validator) = resolve(self.factory.as_ref(), &message_type) else {
            return next.run(ctx).await;
        };

        let body = Arc::clone(&ctx.envelope().body);
        let outcome = validate(validator.as_ref(), body.as_ref(), ctx.cancellation()).await?;

        let validator_type = validator.validator_type();
        ctx.envelope_mut().headers.insert(
            headers::VALIDATOR_TYPE.to_string(),
            validator_type.name().to_string(),
        );

        let message_id = ctx.envelope().message_id().unwrap_or("<unknown>").to_string();
        if outcome.is_valid() {
            debug!(
                message_id = %message_id,
                validator = %validator_type,
                "Message {} was validated successfully",
                message_id
            );
            return next.run(ctx).await;
        }

        debug!(
            message_id = %message_id,
            message_type = %message_type,
            validator = %validator_type,
            "Message {} failed to validate: {}",
            message_id,
            outcome
        );
        let strategy = Arc::clone(self.strategies.get(&message_type));
        strategy.process(ctx, next, validator.as_ref(), outcome).await
    }
}
