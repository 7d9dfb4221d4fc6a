//! Message types and validators used throughout the tests.

use crate::message::Message;
use crate::validation::{FieldError, TypedValidator, ValidationOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

/// A message whose validity is decided by a flag.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TestMessage {
    /// Whether [`TestMessageValidator`] accepts the message.
    pub should_pass_validation: bool,
    #[serde(skip)]
    is_validated: AtomicBool,
}

impl TestMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(should_pass_validation: bool) -> Self {
        Self {
            should_pass_validation,
            is_validated: AtomicBool::new(false),
        }
    }

    /// Creates a message that passes validation.
    #[must_use]
    pub fn valid() -> Self {
        Self::new(true)
    }

    /// Creates a message that fails validation.
    #[must_use]
    pub fn invalid() -> Self {
        Self::new(false)
    }

    /// Returns true once a validator has looked at this instance.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.is_validated.load(Ordering::SeqCst)
    }

    fn mark_validated(&self) {
        self.is_validated.store(true, Ordering::SeqCst);
    }
}

/// A message type no validator is registered for by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherMessage {
    /// Free text.
    pub text: String,
}

/// First of two otherwise identical message types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMessage1 {
    /// Payload.
    pub value: i64,
}

/// Second of two otherwise identical message types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMessage2 {
    /// Payload.
    pub value: i64,
}

crate::impl_message!(TestMessage, OtherMessage, TestMessage1, TestMessage2);

/// Accepts a [`TestMessage`] exactly when its flag says so, and marks the
/// instance as validated either way.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestMessageValidator;

#[async_trait]
impl TypedValidator<TestMessage> for TestMessageValidator {
    async fn validate(&self, message: &TestMessage) -> ValidationOutcome {
        message.mark_validated();
        if message.should_pass_validation {
            return ValidationOutcome::valid();
        }
        ValidationOutcome::invalid(vec![FieldError::new(
            "ShouldPassValidation",
            "The specified condition was not met for 'Should Pass Validation'.",
        )
        .with_attempted_value(serde_json::json!(false))])
    }
}

/// Requires [`OtherMessage::text`] to be non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtherMessageValidator;

#[async_trait]
impl TypedValidator<OtherMessage> for OtherMessageValidator {
    async fn validate(&self, message: &OtherMessage) -> ValidationOutcome {
        if message.text.is_empty() {
            return ValidationOutcome::invalid(vec![FieldError::new("Text", "must not be empty")]);
        }
        ValidationOutcome::valid()
    }
}

/// Rejects every message of type `T`.
pub struct RejectingValidator<T>(PhantomData<fn() -> T>);

impl<T> RejectingValidator<T> {
    /// Creates the validator.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for RejectingValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Message> TypedValidator<T> for RejectingValidator<T> {
    async fn validate(&self, _message: &T) -> ValidationOutcome {
        ValidationOutcome::invalid(vec![FieldError::new("Value", "is always rejected")])
    }
}
