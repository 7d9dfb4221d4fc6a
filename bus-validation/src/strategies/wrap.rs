//! Wrapping failed messages as `ValidationFailed<T>`.

use super::{message_id, FailureStrategy};
use crate::errors::PipelineError;
use crate::message::{headers, Envelope};
use crate::pipeline::{IncomingStepContext, Next};
use crate::validation::{ValidationOutcome, Validator};
use crate::wrap::{FailureDetails, WrapperCache};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Replaces the failed body with `ValidationFailed<T>` and continues the
/// pipeline, so that a handler for the wrapper can deal with it.
///
/// The replacement envelope carries a copy of the original headers plus the
/// `ValidatorType` header.
#[derive(Debug, Clone, Default)]
pub struct WrapAsValidationFailed {
    cache: Arc<WrapperCache>,
}

impl WrapAsValidationFailed {
    /// Creates the strategy with its own wrap cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the strategy over a shared wrap cache.
    #[must_use]
    pub fn with_cache(cache: Arc<WrapperCache>) -> Self {
        Self { cache }
    }

    /// Returns the wrap cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<WrapperCache> {
        &self.cache
    }
}

#[async_trait]
impl FailureStrategy for WrapAsValidationFailed {
    fn name(&self) -> &str {
        "wrap"
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        next: Next<'_, IncomingStepContext>,
        validator: &dyn Validator,
        outcome: ValidationOutcome,
    ) -> Result<(), PipelineError> {
        let envelope = ctx.envelope();
        let operation = self.cache.operation_for(envelope.body.as_ref())?;
        info!(
            message_id = %message_id(envelope),
            message_type = %envelope.message_type(),
            "Message {} of type {} is configured to be wrapped as {}",
            message_id(envelope),
            envelope.message_type(),
            operation.target()
        );

        let validator_type = validator.validator_type();
        let mut cloned = envelope.headers.clone();
        cloned.insert(
            headers::VALIDATOR_TYPE.to_string(),
            validator_type.name().to_string(),
        );

        let details = FailureDetails::new(cloned.clone(), outcome, validator_type);
        let wrapped = operation.apply(Arc::clone(&envelope.body), details)?;
        ctx.set_envelope(Envelope::with_headers(cloned, wrapped));

        next.run(ctx).await
    }
}
