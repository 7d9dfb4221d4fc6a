//! Pipeline steps that validate message bodies.

mod incoming;
mod outgoing;

pub use incoming::ValidateIncomingStep;
pub use outgoing::ValidateOutgoingStep;

use crate::cancellation::CancellationToken;
use crate::errors::PipelineError;
use crate::message::{Message, MessageType};
use crate::validation::{ValidationOutcome, Validator, ValidatorFactory};
use std::sync::Arc;

/// Returns the validator that applies to `message_type`, if any.
fn resolve(factory: &dyn ValidatorFactory, message_type: &MessageType) -> Option<Arc<dyn Validator>> {
    factory
        .validator_for(message_type)
        .filter(|validator| validator.can_validate(message_type))
}

/// Runs the validator unless the token is cancelled first.
async fn validate(
    validator: &dyn Validator,
    body: &dyn Message,
    cancellation: &CancellationToken,
) -> Result<ValidationOutcome, PipelineError> {
    tokio::select! {
        biased;
        () = cancellation.cancelled() => {
            Err(PipelineError::Cancelled(cancellation.reason().unwrap_or_default()))
        }
        outcome = validator.validate(body) => Ok(outcome?),
    }
}
