//! The validation-failed envelope.

use crate::message::{Headers, Message};
use crate::validation::{ValidationOutcome, ValidatorType};
use crate::wrap::WrapOperation;
use std::any::Any;
use std::sync::Arc;

/// Everything known about a failed validation, minus the body itself.
#[derive(Debug, Clone)]
pub struct FailureDetails {
    /// Headers of the message at the time of failure.
    pub headers: Headers,
    /// The failed outcome.
    pub outcome: ValidationOutcome,
    /// The validator that produced the outcome.
    pub validator_type: ValidatorType,
}

impl FailureDetails {
    /// Creates failure details.
    #[must_use]
    pub fn new(headers: Headers, outcome: ValidationOutcome, validator_type: ValidatorType) -> Self {
        Self {
            headers,
            outcome,
            validator_type,
        }
    }
}

/// A message of type `T` that failed incoming validation.
///
/// Handlers registered for `ValidationFailed<T>` receive these when the wrap
/// strategy is selected for `T`. The wrapped body is the same allocation that
/// was received.
#[derive(Debug)]
pub struct ValidationFailed<T> {
    message: Arc<T>,
    headers: Headers,
    outcome: ValidationOutcome,
    validator_type: ValidatorType,
}

impl<T: Message> ValidationFailed<T> {
    /// Wraps a failed message.
    #[must_use]
    pub fn new(message: Arc<T>, details: FailureDetails) -> Self {
        Self {
            message,
            headers: details.headers,
            outcome: details.outcome,
            validator_type: details.validator_type,
        }
    }

    /// Returns the original message.
    #[must_use]
    pub const fn message(&self) -> &Arc<T> {
        &self.message
    }

    /// Returns the headers the message carried when it failed.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the failed outcome.
    #[must_use]
    pub const fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    /// Returns the validator that rejected the message.
    #[must_use]
    pub const fn validator_type(&self) -> ValidatorType {
        self.validator_type
    }
}

impl<T: Message> Message for ValidationFailed<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    // Wrappers are never wrapped again.
    fn wrap_operation(&self) -> Option<WrapOperation> {
        None
    }
}
